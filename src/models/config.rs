use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 网关配置
///
/// Loaded once at startup and shared read-only (`Arc<GatewayConfig>`) with every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Show upstream reasoning to clients wrapped in `<think>` markup.
    /// When false the reasoning text is dropped entirely.
    #[serde(default = "default_true")]
    pub show_reasoning: bool,
    /// Ask every upstream request for extended reasoning, marker or not.
    #[serde(default)]
    pub force_thinking: bool,
    /// In-band marker a user puts in a message to request extended reasoning
    #[serde(default = "default_thinking_marker")]
    pub thinking_marker: String,
    /// Directory for daily rolling log files (stdout only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub nvidia: ProviderConfig,
    #[serde(default)]
    pub siliconflow: ProviderConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            show_reasoning: true,
            force_thinking: false,
            thinking_marker: default_thinking_marker(),
            log_dir: None,
            probe_timeout_secs: default_probe_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            nvidia: ProviderConfig::default(),
            siliconflow: ProviderConfig::default(),
        }
    }
}

/// Per-provider overrides. Unset fields fall back to the provider's built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_probe: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_profile: Option<StreamProfile>,
    /// 用户自定义映射 (exact keys or `*` wildcard patterns)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_mapping: HashMap<String, String>,
}

/// How a provider's event stream is rewritten on its way to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProfile {
    /// Reassemble lines and merge `reasoning_content` into think-delimited content
    Reasoning,
    /// Reassemble lines and re-frame them verbatim
    Passthrough,
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> String {
    "127.0.0.1:8045".to_string()
}

fn default_thinking_marker() -> String {
    "/think".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    600
}
