//! Recovery configuration
//!
//! Loaded from TOML, then overlaid by environment variables:
//! - `UIR_STRATEGY` (`planned` | `direct` | `standalone`)
//! - `UI_ERROR_PLANNING` / `UI_MID_AGENT` boolean switches when `UIR_STRATEGY` is unset
//! - `MAX_UI_ACTION_RETRIES`, `MAX_ACTIONS_ALLOWED`, `UIR_SIMILARITY_THRESHOLD`

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uir_grounding::GroundingConfig;
use uir_guard::ToolLimits;
use uir_vision::{Resolution, VerifierConfig};

/// Recovery strategy, fixed per deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Plan, then execute step by step with replanning
    Planned,
    /// One grounded round without a plan
    Direct,
    /// Iterative grounding until `finished`
    #[default]
    Standalone,
}

impl StrategyKind {
    /// Lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Direct => "direct",
            Self::Standalone => "standalone",
        }
    }

    /// Resolve the legacy switch pair: planning wins over the mid agent
    #[inline]
    #[must_use]
    pub fn from_switches(error_planning: bool, mid_agent: bool) -> Self {
        if error_planning {
            Self::Planned
        } else if mid_agent {
            Self::Direct
        } else {
            Self::Standalone
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" | "planning" => Ok(Self::Planned),
            "direct" => Ok(Self::Direct),
            "standalone" => Ok(Self::Standalone),
            other => Err(format!("unknown strategy `{other}`")),
        }
    }
}

/// Grounding loop limits as stored in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingSettings {
    /// Attempt ceiling for single-shot grounding
    pub max_ui_action_retries: u32,
    /// Attempt ceiling for iterative grounding and grounding rounds per step
    pub max_actions_allowed: u32,
    /// Pause before the "after" capture, milliseconds
    pub settle_delay_ms: u64,
    /// `wait()` duration, milliseconds
    pub wait_ms: u64,
    /// Reference width of model coordinates
    pub reference_width: u32,
    /// Reference height of model coordinates
    pub reference_height: u32,
}

impl Default for GroundingSettings {
    fn default() -> Self {
        Self {
            max_ui_action_retries: 3,
            max_actions_allowed: 15,
            settle_delay_ms: 1000,
            wait_ms: 5000,
            reference_width: 1920,
            reference_height: 1080,
        }
    }
}

/// Recovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Strategy run by the orchestrator
    pub strategy: StrategyKind,
    /// Grounding limits
    pub grounding: GroundingSettings,
    /// Visual verifier settings
    pub verifier: VerifierConfig,
    /// Fresh plans allowed after the first one
    pub max_replans: u32,
    /// Per-tool call ceilings
    pub tool_limits: ToolLimits,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            grounding: GroundingSettings::default(),
            verifier: VerifierConfig::default(),
            max_replans: 3,
            tool_limits: ToolLimits::new(),
        }
    }
}

impl RecoveryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With strategy
    #[inline]
    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// With single-shot attempt ceiling
    #[inline]
    #[must_use]
    pub fn with_max_ui_action_retries(mut self, max: u32) -> Self {
        self.grounding.max_ui_action_retries = max;
        self
    }

    /// With iterative attempt ceiling
    #[inline]
    #[must_use]
    pub fn with_max_actions_allowed(mut self, max: u32) -> Self {
        self.grounding.max_actions_allowed = max;
        self
    }

    /// With settle delay and `wait()` duration
    #[inline]
    #[must_use]
    pub fn with_delays(mut self, settle: Duration, wait: Duration) -> Self {
        self.grounding.settle_delay_ms = u64::try_from(settle.as_millis()).unwrap_or(u64::MAX);
        self.grounding.wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With similarity threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.verifier.threshold = threshold;
        self
    }

    /// With replan ceiling
    #[inline]
    #[must_use]
    pub fn with_max_replans(mut self, max: u32) -> Self {
        self.max_replans = max;
        self
    }

    /// With a tool call ceiling
    #[inline]
    #[must_use]
    pub fn with_tool_limit(mut self, tool: impl Into<String>, max_calls: u64) -> Self {
        self.tool_limits = self.tool_limits.with_limit(tool, max_calls);
        self
    }

    /// Parse TOML
    ///
    /// # Errors
    /// [`ConfigError::Toml`] on syntax or shape errors.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] or [`ConfigError::Toml`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load: optional file, process environment overlay, validation
    ///
    /// # Errors
    /// Any [`ConfigError`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment lookup
    ///
    /// # Errors
    /// [`ConfigError::InvalidEnv`] when a variable does not parse.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup("UIR_STRATEGY") {
            self.strategy = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "UIR_STRATEGY",
                value: raw.clone(),
            })?;
        } else {
            let planning = lookup("UI_ERROR_PLANNING")
                .map(|raw| parse_switch("UI_ERROR_PLANNING", &raw))
                .transpose()?;
            let mid_agent = lookup("UI_MID_AGENT")
                .map(|raw| parse_switch("UI_MID_AGENT", &raw))
                .transpose()?;
            if planning.is_some() || mid_agent.is_some() {
                self.strategy = StrategyKind::from_switches(
                    planning.unwrap_or(false),
                    mid_agent.unwrap_or(false),
                );
            }
        }

        if let Some(raw) = lookup("MAX_UI_ACTION_RETRIES") {
            self.grounding.max_ui_action_retries = parse_env("MAX_UI_ACTION_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("MAX_ACTIONS_ALLOWED") {
            self.grounding.max_actions_allowed = parse_env("MAX_ACTIONS_ALLOWED", &raw)?;
        }
        if let Some(raw) = lookup("UIR_SIMILARITY_THRESHOLD") {
            self.verifier.threshold = parse_env("UIR_SIMILARITY_THRESHOLD", &raw)?;
        }
        Ok(self)
    }

    /// Check ranges
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| ConfigError::InvalidValue {
            field,
            reason: reason.to_string(),
        };
        if self.grounding.max_ui_action_retries == 0 {
            return Err(invalid("grounding.max_ui_action_retries", "must be at least 1"));
        }
        if self.grounding.max_actions_allowed == 0 {
            return Err(invalid("grounding.max_actions_allowed", "must be at least 1"));
        }
        if self.grounding.reference_width == 0 || self.grounding.reference_height == 0 {
            return Err(invalid("grounding.reference_*", "must be non-zero"));
        }
        if self.verifier.validate().is_err() {
            return Err(invalid("verifier.threshold", "must lie in (0, 1]"));
        }
        Ok(())
    }

    /// Grounding loop configuration
    #[must_use]
    pub fn grounding_config(&self) -> GroundingConfig {
        GroundingConfig::new()
            .with_max_ui_action_retries(self.grounding.max_ui_action_retries)
            .with_max_actions_allowed(self.grounding.max_actions_allowed)
            .with_settle_delay(Duration::from_millis(self.grounding.settle_delay_ms))
            .with_wait_duration(Duration::from_millis(self.grounding.wait_ms))
            .with_reference(Resolution::new(
                self.grounding.reference_width,
                self.grounding.reference_height,
            ))
    }
}

fn parse_switch(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: raw.to_string(),
        }),
    }
}

fn parse_env<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = RecoveryConfig::default();
        assert_eq!(config.strategy, StrategyKind::Standalone);
        assert_eq!(config.grounding.max_ui_action_retries, 3);
        assert!((config.verifier.threshold - 0.95).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn switches_pick_strategy() {
        let planned = RecoveryConfig::default()
            .with_env_overrides(env(&[("UI_ERROR_PLANNING", "true"), ("UI_MID_AGENT", "true")]))
            .unwrap();
        assert_eq!(planned.strategy, StrategyKind::Planned);

        let direct = RecoveryConfig::default()
            .with_env_overrides(env(&[("UI_MID_AGENT", "1")]))
            .unwrap();
        assert_eq!(direct.strategy, StrategyKind::Direct);

        let explicit = RecoveryConfig::default()
            .with_env_overrides(env(&[("UIR_STRATEGY", "direct"), ("UI_ERROR_PLANNING", "true")]))
            .unwrap();
        assert_eq!(explicit.strategy, StrategyKind::Direct);
    }

    #[test]
    fn numeric_overrides() {
        let config = RecoveryConfig::default()
            .with_env_overrides(env(&[("MAX_UI_ACTION_RETRIES", "5"), ("UIR_SIMILARITY_THRESHOLD", "0.9")]))
            .unwrap();
        assert_eq!(config.grounding.max_ui_action_retries, 5);
        assert!((config.verifier.threshold - 0.9).abs() < f64::EPSILON);

        let bad = RecoveryConfig::default().with_env_overrides(env(&[("MAX_ACTIONS_ALLOWED", "many")]));
        assert!(matches!(bad, Err(ConfigError::InvalidEnv { name: "MAX_ACTIONS_ALLOWED", .. })));
    }

    #[test]
    fn toml_partial_document() {
        let config = RecoveryConfig::from_toml_str(
            r#"
            strategy = "planned"
            max_replans = 1

            [grounding]
            max_actions_allowed = 5

            [tool_limits]
            plan_generator = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.strategy, StrategyKind::Planned);
        assert_eq!(config.grounding.max_actions_allowed, 5);
        assert_eq!(config.grounding.max_ui_action_retries, 3);
        assert_eq!(config.tool_limits.limit("plan_generator"), Some(2));
    }

    #[test]
    fn rejects_zero_ceiling() {
        let config = RecoveryConfig::default().with_max_ui_action_retries(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn grounding_config_conversion() {
        let grounding = RecoveryConfig::default()
            .with_delays(Duration::ZERO, Duration::from_millis(10))
            .grounding_config();
        assert_eq!(grounding.settle_delay, Duration::ZERO);
        assert_eq!(grounding.wait_duration, Duration::from_millis(10));
        assert_eq!(grounding.reference, Resolution::new(1920, 1080));
    }
}
