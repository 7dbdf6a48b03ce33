use std::time::Duration;
use uuid::Uuid;

pub struct InviteMessage {}

impl InviteMessage {
    pub fn generate(
        inviter_name: &str,
        account_name: &str,
        accept_url: &str,
        invitation_id: Uuid,
        invite_lifetime: Duration,
    ) -> String {
        let link = format!("{}?invitation_id={}", accept_url, invitation_id);

        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>You've been invited to a shared account</h1>
               <p><b>{}</b> invited you to join <b>{}</b> on Tally.</p>
               <p><a href=\"{}\" rel=\"nofollow\">Open the invitation</a></p>
               <p><b>This invitation expires in {} days.</b></p>
               <br />
               <p><i>Not expecting this? You can safely ignore this email.</i></p>
             </body>
             </html>",
            inviter_name,
            account_name,
            link,
            invite_lifetime.as_secs() / (60 * 60 * 24),
        )
    }
}
