// 配置加载
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::GatewayConfig;

pub const CONFIG_ENV: &str = "REASONING_GATEWAY_CONFIG";
const CONFIG_FILE: &str = "gateway.toml";
const CONFIG_DIR: &str = "reasoning-gateway";

const NVIDIA_KEY_ENV: &str = "NVIDIA_API_KEY";
const SILICONFLOW_KEY_ENV: &str = "SILICONFLOW_API_KEY";

/// Locate the config file: `$REASONING_GATEWAY_CONFIG`, then `./gateway.toml`,
/// then `<config_dir>/reasoning-gateway/gateway.toml`.
pub fn find_config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p));
        }
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
        .filter(|p| p.exists())
}

/// Load, apply environment overrides, validate.
pub fn load_config() -> AppResult<GatewayConfig> {
    let mut config = match find_config_path() {
        Some(path) => load_config_from(&path)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, |k| std::env::var(k).ok());
    validate(&config)?;
    Ok(config)
}

pub fn load_config_from(path: &Path) -> AppResult<GatewayConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    let config: GatewayConfig = toml::from_str(&content)?;
    Ok(config)
}

/// API keys from the environment win over the file.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(NVIDIA_KEY_ENV).filter(|k| !k.trim().is_empty()) {
        config.nvidia.api_key = Some(key);
    }
    if let Some(key) = lookup(SILICONFLOW_KEY_ENV).filter(|k| !k.trim().is_empty()) {
        config.siliconflow.api_key = Some(key);
    }
}

pub fn validate(config: &GatewayConfig) -> AppResult<()> {
    config
        .listen_addr
        .parse::<std::net::SocketAddr>()
        .map_err(|e| AppError::Config(format!("invalid listen_addr '{}': {}", config.listen_addr, e)))?;

    if config.thinking_marker.trim().is_empty() {
        return Err(AppError::Config("thinking_marker must not be empty".to_string()));
    }

    for (name, provider) in [("nvidia", &config.nvidia), ("siliconflow", &config.siliconflow)] {
        if let Some(url) = &provider.base_url {
            reqwest::Url::parse(url)
                .map_err(|e| AppError::Config(format!("invalid {}.base_url '{}': {}", name, url, e)))?;
        }
        if let Some(t) = provider.default_temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(AppError::Config(format!(
                    "{}.default_temperature {} out of range [0, 2]",
                    name, t
                )));
            }
        }
    }

    Ok(())
}
