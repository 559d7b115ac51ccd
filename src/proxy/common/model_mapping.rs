// 模型名称映射
use std::collections::HashMap;
use std::future::Future;

use once_cell::sync::Lazy;

use crate::proxy::provider::{Provider, ProviderSettings};
use crate::proxy::upstream::ProbeError;

static NVIDIA_MODELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    // OpenAI 协议别名
    m.insert("gpt-4", "meta/llama-3.1-405b-instruct");
    m.insert("gpt-4o", "meta/llama-3.1-405b-instruct");
    m.insert("gpt-4-turbo", "meta/llama-3.1-405b-instruct");
    m.insert("gpt-4o-mini", "meta/llama-3.1-8b-instruct");
    m.insert("gpt-3.5-turbo", "meta/llama-3.3-70b-instruct");

    // Claude 别名
    m.insert("claude-3-5-sonnet", "nvidia/llama-3.1-nemotron-70b-instruct");
    m.insert("claude-3-opus", "meta/llama-3.1-405b-instruct");

    // 推理模型
    m.insert("deepseek-r1", "deepseek-ai/deepseek-r1");
    m.insert("deepseek-v3", "deepseek-ai/deepseek-v3.1");
    m.insert("qwen3", "qwen/qwen3-235b-a22b");
    m.insert("nemotron", "nvidia/llama-3.3-nemotron-super-49b-v1");

    m
});

static SILICONFLOW_MODELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("gpt-4", "deepseek-ai/DeepSeek-V3");
    m.insert("gpt-4o", "deepseek-ai/DeepSeek-V3");
    m.insert("gpt-4-turbo", "deepseek-ai/DeepSeek-V3");
    m.insert("gpt-4o-mini", "Qwen/Qwen2.5-7B-Instruct");
    m.insert("gpt-3.5-turbo", "Qwen/Qwen2.5-72B-Instruct");

    m.insert("deepseek-r1", "deepseek-ai/DeepSeek-R1");
    m.insert("deepseek-v3", "deepseek-ai/DeepSeek-V3");
    m.insert("qwen3", "Qwen/Qwen3-235B-A22B");
    m.insert("glm-4", "THUDM/GLM-4-9B-0414");

    m
});

/// Size class picked by the keyword heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Large,
    Mid,
    Small,
}

/// Evaluated top to bottom, first hit wins. The keyword sets overlap on purpose
/// (`gpt-4o-mini` lands in `Large` via `gpt-4`); keep the order stable.
const TIER_RULES: &[(&[&str], ModelTier)] = &[
    (&["opus", "405b", "ultra", "gpt-4", "large"], ModelTier::Large),
    (&["sonnet", "70b", "72b", "pro", "medium", "turbo"], ModelTier::Mid),
];

/// Where a resolved model id came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    CustomExact,
    CustomWildcard,
    Builtin,
    Probe,
    Fallback(ModelTier),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub id: String,
    pub source: ResolutionSource,
}

fn builtin_table(provider: Provider) -> &'static HashMap<&'static str, &'static str> {
    match provider {
        Provider::Nvidia => &NVIDIA_MODELS,
        Provider::SiliconFlow => &SILICONFLOW_MODELS,
    }
}

pub fn map_builtin_model(provider: Provider, input: &str) -> Option<&'static str> {
    builtin_table(provider).get(input).copied()
}

pub fn tier_model(provider: Provider, tier: ModelTier) -> &'static str {
    match (provider, tier) {
        (Provider::Nvidia, ModelTier::Large) => "meta/llama-3.1-405b-instruct",
        (Provider::Nvidia, ModelTier::Mid) => "meta/llama-3.3-70b-instruct",
        (Provider::Nvidia, ModelTier::Small) => "meta/llama-3.1-8b-instruct",
        (Provider::SiliconFlow, ModelTier::Large) => "deepseek-ai/DeepSeek-V3",
        (Provider::SiliconFlow, ModelTier::Mid) => "Qwen/Qwen2.5-72B-Instruct",
        (Provider::SiliconFlow, ModelTier::Small) => "Qwen/Qwen2.5-7B-Instruct",
    }
}

/// Case-insensitive keyword classification
pub fn classify_tier(input: &str) -> ModelTier {
    let lower = input.to_lowercase();
    TIER_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, tier)| *tier)
        .unwrap_or(ModelTier::Small)
}

/// Wildcard matching - supports multiple wildcards
///
/// **Note**: Matching is **case-sensitive**. Pattern `GPT-4*` will NOT match `gpt-4-turbo`.
///
/// Examples:
/// - `gpt-4*` matches `gpt-4`, `gpt-4-turbo` ✓
/// - `claude-*-sonnet-*` matches `claude-3-5-sonnet-20241022` ✓
/// - `a*b*c` matches `a123b456c` ✓
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    // No wildcard - exact match
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut text_pos = 0;

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue; // consecutive wildcards
        }

        if i == 0 {
            // First segment must match start
            if !text[text_pos..].starts_with(part) {
                return false;
            }
            text_pos += part.len();
        } else if i == parts.len() - 1 {
            // Last segment must match end
            return text[text_pos..].ends_with(part);
        } else if let Some(pos) = text[text_pos..].find(part) {
            // Middle segments - next occurrence
            text_pos += pos + part.len();
        } else {
            return false;
        }
    }

    true
}

/// User mapping lookup: exact key first, then the most specific wildcard
/// (most non-`*` characters). Equal specificity resolves to the
/// lexicographically smaller pattern so the result does not depend on map order.
pub fn resolve_custom_mapping(
    input: &str,
    custom_mapping: &HashMap<String, String>,
) -> Option<(String, ResolutionSource)> {
    if let Some(target) = custom_mapping.get(input) {
        return Some((target.clone(), ResolutionSource::CustomExact));
    }

    let mut best: Option<(&str, &str, usize)> = None;
    for (pattern, target) in custom_mapping.iter() {
        if !pattern.contains('*') || !wildcard_match(pattern, input) {
            continue;
        }
        let specificity = pattern.chars().count() - pattern.matches('*').count();
        let better = match best {
            None => true,
            Some((best_pattern, _, best_spec)) => {
                specificity > best_spec
                    || (specificity == best_spec && pattern.as_str() < best_pattern)
            }
        };
        if better {
            best = Some((pattern.as_str(), target.as_str(), specificity));
        }
    }

    best.map(|(pattern, target, _)| {
        tracing::debug!("[Router] Wildcard match: {} -> {} (rule: {})", input, target, pattern);
        (target.to_string(), ResolutionSource::CustomWildcard)
    })
}

/// Everything except the live probe. `None` means the probe step decides.
pub fn resolve_static(input: &str, settings: &ProviderSettings<'_>) -> Option<ResolvedModel> {
    if let Some((id, source)) = resolve_custom_mapping(input, settings.custom_mapping) {
        return Some(ResolvedModel { id, source });
    }

    map_builtin_model(settings.provider, input).map(|id| ResolvedModel {
        id: id.to_string(),
        source: ResolutionSource::Builtin,
    })
}

pub fn fallback_model(provider: Provider, input: &str) -> ResolvedModel {
    let tier = classify_tier(input);
    ResolvedModel {
        id: tier_model(provider, tier).to_string(),
        source: ResolutionSource::Fallback(tier),
    }
}

/// 核心模型路由解析
///
/// Priority: custom exact > custom wildcard > built-in table > live probe > keyword tier.
/// The probe is only attempted for providers that support it and for non-empty names.
/// A probe error is never propagated; it selects the fallback tier.
pub async fn resolve_model<F, Fut>(
    input: &str,
    settings: &ProviderSettings<'_>,
    probe: F,
) -> ResolvedModel
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<(), ProbeError>>,
{
    if let Some(resolved) = resolve_static(input, settings) {
        crate::modules::logger::log_info(&format!(
            "[Router] {} mapping: {} -> {}",
            settings.provider, input, resolved.id
        ));
        return resolved;
    }

    // the name goes upstream verbatim; trimming only decides whether there is one
    if settings.supports_probe && !input.trim().is_empty() {
        match probe(input.to_string()).await {
            Ok(()) => {
                tracing::info!("[Router] Probe accepted model '{}' on {}", input, settings.provider);
                return ResolvedModel {
                    id: input.to_string(),
                    source: ResolutionSource::Probe,
                };
            }
            Err(e) => {
                tracing::debug!("[Router] Probe rejected '{}': {}, using fallback", input, e);
            }
        }
    }

    let resolved = fallback_model(settings.provider, input);
    crate::modules::logger::log_info(&format!(
        "[Router] {} fallback: '{}' -> {} ({:?})",
        settings.provider, input, resolved.id, resolved.source
    ));
    resolved
}

/// Client-facing model names for `/v1/models`: built-in keys plus non-wildcard custom keys
pub fn list_client_models(settings: &ProviderSettings<'_>) -> Vec<String> {
    let mut ids: Vec<String> = builtin_table(settings.provider)
        .keys()
        .map(|s| s.to_string())
        .chain(
            settings
                .custom_mapping
                .keys()
                .filter(|k| !k.contains('*'))
                .cloned(),
        )
        .collect();
    ids.sort();
    ids.dedup();
    ids
}
