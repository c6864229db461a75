//! Router configuration.
//!
//! Every tunable lives here, grouped per component. All fields carry serde
//! defaults so a partial TOML file (or none at all) yields a working
//! configuration; tests construct sections directly via `Default`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::request::Tier;

/// Top-level configuration for the router.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub models: ModelTable,
    #[serde(default)]
    pub costs: CostTable,
}

impl RouterConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Fixed-window admission gate settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Admissions allowed per window per caller.
    #[serde(default = "default_ceiling")]
    pub ceiling: u32,
    /// How often the background sweep drops expired windows. Deliberately
    /// coarser than the window itself.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_ceiling() -> u32 {
    10
}

fn default_sweep_interval_ms() -> u64 {
    300_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            ceiling: default_ceiling(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Context cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
}

fn default_cache_ttl_ms() -> u64 {
    900_000 // 15 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Provider retry and deadline settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts against the primary model, including the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per attempt thereafter.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Ceiling on any single backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Deadline for each individual provider call.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_provider_timeout_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            provider_timeout_ms: default_provider_timeout_ms(),
        }
    }
}

impl RetryConfig {
    /// Backoff to sleep after attempt number `attempt` (1-based): the base
    /// delay doubled per attempt, capped at the maximum.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

/// Worker-to-thinker escalation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EscalationConfig {
    #[serde(default = "default_escalation_enabled")]
    pub enabled: bool,
    /// A worker response is only eligible for escalation when the analyzer's
    /// confidence was below this threshold.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_escalation_enabled() -> bool {
    true
}

fn default_confidence_threshold() -> f32 {
    0.6
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: default_escalation_enabled(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Primary and fallback model identities for one tier.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelPair {
    pub primary: String,
    pub fallback: String,
}

/// Per-tier model identities.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelTable {
    #[serde(default = "default_cleaner_models")]
    pub cleaner: ModelPair,
    #[serde(default = "default_worker_models")]
    pub worker: ModelPair,
    #[serde(default = "default_thinker_models")]
    pub thinker: ModelPair,
}

fn default_cleaner_models() -> ModelPair {
    ModelPair {
        primary: "haiku-latest".to_string(),
        fallback: "gpt-4o-mini".to_string(),
    }
}

fn default_worker_models() -> ModelPair {
    ModelPair {
        primary: "sonnet-latest".to_string(),
        fallback: "gpt-4o".to_string(),
    }
}

fn default_thinker_models() -> ModelPair {
    ModelPair {
        primary: "opus-latest".to_string(),
        fallback: "o1".to_string(),
    }
}

impl Default for ModelTable {
    fn default() -> Self {
        Self {
            cleaner: default_cleaner_models(),
            worker: default_worker_models(),
            thinker: default_thinker_models(),
        }
    }
}

impl ModelTable {
    pub fn for_tier(&self, tier: Tier) -> &ModelPair {
        match tier {
            Tier::Cleaner => &self.cleaner,
            Tier::Worker => &self.worker,
            Tier::Thinker => &self.thinker,
        }
    }
}

/// Credits charged per served request, per tier.
#[derive(Debug, Clone, Deserialize)]
pub struct CostTable {
    #[serde(default = "default_cleaner_cost")]
    pub cleaner: i64,
    #[serde(default = "default_worker_cost")]
    pub worker: i64,
    #[serde(default = "default_thinker_cost")]
    pub thinker: i64,
}

fn default_cleaner_cost() -> i64 {
    1
}

fn default_worker_cost() -> i64 {
    1
}

fn default_thinker_cost() -> i64 {
    5
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            cleaner: default_cleaner_cost(),
            worker: default_worker_cost(),
            thinker: default_thinker_cost(),
        }
    }
}

impl CostTable {
    pub fn cost(&self, tier: Tier) -> i64 {
        match tier {
            Tier::Cleaner => self.cleaner,
            Tier::Worker => self.worker,
            Tier::Thinker => self.thinker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let config = RouterConfig::default();
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.rate_limit.ceiling, 10);
        assert_eq!(config.cache.ttl_ms, 900_000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.costs.cost(Tier::Cleaner), 1);
        assert_eq!(config.costs.cost(Tier::Worker), 1);
        assert_eq!(config.costs.cost(Tier::Thinker), 5);
        assert!((config.escalation.confidence_threshold - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(2_000));
        assert_eq!(retry.backoff_delay(3), Duration::from_millis(4_000));
        assert_eq!(retry.backoff_delay(5), Duration::from_millis(10_000));
        assert_eq!(retry.backoff_delay(30), Duration::from_millis(10_000));
    }

    #[test]
    fn partial_toml_overrides() {
        let config = RouterConfig::from_toml_str(
            r#"
            [rate_limit]
            ceiling = 3

            [models.thinker]
            primary = "deep-1"
            fallback = "deep-0"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.ceiling, 3);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.models.thinker.primary, "deep-1");
        assert_eq!(config.models.worker.primary, "sonnet-latest");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = RouterConfig::from_toml_str("not = [valid").unwrap_err();
        assert!(matches!(err, crate::error::ConfigError::ParseError(_)));
    }
}
