use once_cell::sync::Lazy;

/// User-Agent sent on every upstream call
pub static USER_AGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "reasoning-gateway/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
});

/// Opening think delimiter (includes the trailing newline)
pub const THINK_OPEN: &str = "<think>\n";

/// Closing think delimiter (blank line before the answer text)
pub const THINK_CLOSE: &str = "\n</think>\n\n";

/// SSE data line prefix used by OpenAI-style streams
pub const SSE_DATA_PREFIX: &str = "data:";

/// Stream terminator payload
pub const SSE_DONE: &str = "[DONE]";

/// Default completion length when the client omits `max_tokens`
pub const DEFAULT_MAX_TOKENS: u64 = 1024;
