pub mod senders;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum PushError {
    GatewayConnectionFailed(String),
    ExpiredSubscription,
    DeliveryFailed(String),
}

impl std::error::Error for PushError {}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::GatewayConnectionFailed(e) => {
                write!(f, "PushError: Gateway connection failed: {e}")
            }
            PushError::ExpiredSubscription => {
                write!(f, "PushError: Subscription endpoint is no longer valid")
            }
            PushError::DeliveryFailed(e) => write!(f, "PushError: Failed to deliver: {e}"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PushNotification<'a> {
    pub title: &'a str,
    pub body: &'a str,
    /// Notifications with the same tag replace each other on the device
    pub tag: &'a str,
    pub data: &'a serde_json::Value,
}

#[async_trait]
pub trait SendPush: Send + Sync {
    async fn send<'a>(
        &self,
        endpoint: &str,
        subscription_keys: &serde_json::Value,
        notification: PushNotification<'a>,
    ) -> Result<(), PushError>;
}

pub type PushSender = Box<dyn SendPush>;
