use async_trait::async_trait;

use crate::push::{PushError, PushNotification, SendPush};

#[derive(Default)]
pub struct MockPushSender {}

impl MockPushSender {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl SendPush for MockPushSender {
    async fn send<'a>(
        &self,
        endpoint: &str,
        _subscription_keys: &serde_json::Value,
        notification: PushNotification<'a>,
    ) -> Result<(), PushError> {
        println!("\n\nPush to {}:\n{:#?}\n\n", endpoint, notification);
        Ok(())
    }
}
