mod http_gateway;
mod mock_sender;

pub use http_gateway::HttpGateway;
pub use mock_sender::MockPushSender;
