mod mock_sender;
mod smtp;

pub use mock_sender::MockSender;
pub use smtp::SmtpRelay;
