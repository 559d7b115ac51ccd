pub mod config;

pub use config::{GatewayConfig, ProviderConfig, StreamProfile};
