//! Per-tool call ceilings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from tool name to the maximum number of calls allowed per invocation.
///
/// Tools absent from the map are unlimited. A ceiling of `0` is treated the
/// same as an absent one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolLimits {
    limits: HashMap<String, u64>,
}

impl ToolLimits {
    /// Create an empty (unlimited) set of ceilings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a ceiling for one tool
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, tool: impl Into<String>, max_calls: u64) -> Self {
        self.limits.insert(tool.into(), max_calls);
        self
    }

    /// Effective ceiling for `tool`, if any
    #[must_use]
    pub fn limit(&self, tool: &str) -> Option<u64> {
        self.limits.get(tool).copied().filter(|max| *max > 0)
    }

    /// Number of configured entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.limits.len()
    }

    /// True when no ceiling is configured
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Iterate over configured ceilings
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.limits.iter().map(|(name, max)| (name.as_str(), *max))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ToolLimits {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            limits: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_tool_is_unlimited() {
        let limits = ToolLimits::new().with_limit("a", 2);
        assert_eq!(limits.limit("a"), Some(2));
        assert_eq!(limits.limit("b"), None);
    }

    #[test]
    fn zero_ceiling_means_unlimited() {
        let limits = ToolLimits::new().with_limit("a", 0);
        assert_eq!(limits.limit("a"), None);
        assert_eq!(limits.len(), 1);
    }

    #[test]
    fn collects_from_pairs() {
        let limits: ToolLimits = [("x", 1_u64), ("y", 4)].into_iter().collect();
        assert_eq!(limits.limit("y"), Some(4));
    }
}
