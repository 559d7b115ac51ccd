// 上游提供商定义
use std::collections::HashMap;

use crate::models::{GatewayConfig, StreamProfile};

/// Upstream providers behind the gateway.
///
/// The first path segment of the inbound request picks one; anything unrecognized
/// goes to the primary provider (`Nvidia`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Nvidia,
    SiliconFlow,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Nvidia, Provider::SiliconFlow];

    pub fn id(self) -> &'static str {
        match self {
            Provider::Nvidia => "nvidia",
            Provider::SiliconFlow => "siliconflow",
        }
    }

    /// `/siliconflow/v1/chat/completions` -> SiliconFlow, everything else -> Nvidia
    pub fn from_path(path: &str) -> Self {
        let first = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match first.as_str() {
            "siliconflow" => Provider::SiliconFlow,
            _ => Provider::Nvidia,
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Provider::Nvidia => "https://integrate.api.nvidia.com/v1",
            Provider::SiliconFlow => "https://api.siliconflow.cn/v1",
        }
    }

    fn default_temperature(self) -> f64 {
        match self {
            Provider::Nvidia => 0.6,
            Provider::SiliconFlow => 0.7,
        }
    }

    /// NIM rejects unknown model ids fast, so a one-token probe is cheap there
    fn default_supports_probe(self) -> bool {
        matches!(self, Provider::Nvidia)
    }

    fn default_stream_profile(self) -> StreamProfile {
        match self {
            Provider::Nvidia => StreamProfile::Reasoning,
            Provider::SiliconFlow => StreamProfile::Passthrough,
        }
    }

    /// Merge the user's overrides with this provider's built-in defaults
    pub fn settings(self, config: &GatewayConfig) -> ProviderSettings<'_> {
        let raw = match self {
            Provider::Nvidia => &config.nvidia,
            Provider::SiliconFlow => &config.siliconflow,
        };

        ProviderSettings {
            provider: self,
            base_url: raw
                .base_url
                .clone()
                .unwrap_or_else(|| self.default_base_url().to_string()),
            api_key: raw.api_key.as_deref(),
            default_temperature: raw
                .default_temperature
                .unwrap_or_else(|| self.default_temperature()),
            supports_probe: raw
                .supports_probe
                .unwrap_or_else(|| self.default_supports_probe()),
            stream_profile: raw
                .stream_profile
                .unwrap_or_else(|| self.default_stream_profile()),
            custom_mapping: &raw.custom_mapping,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Effective settings for one provider, borrowed from the gateway config
#[derive(Debug, Clone)]
pub struct ProviderSettings<'a> {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: Option<&'a str>,
    pub default_temperature: f64,
    pub supports_probe: bool,
    pub stream_profile: StreamProfile,
    pub custom_mapping: &'a HashMap<String, String>,
}

impl ProviderSettings<'_> {
    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
