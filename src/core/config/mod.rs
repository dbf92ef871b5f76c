//! # Config Module
//!
//! Validated run configuration.
//!
//! All validation happens here, before any cache exists or any input is
//! read. A negative period is a configuration error, not a permanent-mode
//! fallback.

mod duration;

pub use duration::{parse_duration, SignedDuration};

use crate::core::cache::Retention;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Validated deduplication settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Retention period; zero means permanent
    pub period: Duration,
    /// Explicit reclamation interval, if the operator set one
    pub sweep_interval: Option<Duration>,
}

impl DedupConfig {
    /// Permanent deduplication
    pub fn permanent() -> Self {
        Self {
            period: Duration::ZERO,
            sweep_interval: None,
        }
    }

    /// Timed deduplication with the given period
    pub fn timed(period: Duration) -> Self {
        Self {
            period,
            sweep_interval: None,
        }
    }

    /// Build a config from raw operator input
    ///
    /// `period` absent or zero selects permanent mode. `sweep_interval`,
    /// when given, must be strictly positive.
    pub fn from_args(
        period: Option<&str>,
        sweep_interval: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let period = match period {
            None => Duration::ZERO,
            Some(raw) => {
                let parsed = parse_duration(raw)?;
                if parsed.is_negative() {
                    return Err(ConfigError::NegativePeriod {
                        value: raw.to_string(),
                    });
                }
                parsed.magnitude
            }
        };

        let sweep_interval = match sweep_interval {
            None => None,
            Some(raw) => {
                let parsed = parse_duration(raw)?;
                if parsed.negative || parsed.magnitude.is_zero() {
                    return Err(ConfigError::InvalidSweepInterval {
                        value: raw.to_string(),
                    });
                }
                Some(parsed.magnitude)
            }
        };

        Ok(Self {
            period,
            sweep_interval,
        })
    }

    /// The retention mode this config selects
    pub fn retention(&self) -> Retention {
        Retention::from_period(self.period)
    }

    /// The reclamation interval actually used, or `None` in permanent mode
    pub fn effective_sweep_interval(&self) -> Option<Duration> {
        self.retention()
            .period()
            .map(|period| self.sweep_interval.unwrap_or(period))
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self::permanent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_period_is_permanent() {
        let config = DedupConfig::from_args(None, None).unwrap();
        assert_eq!(config, DedupConfig::permanent());
        assert_eq!(config.retention(), Retention::Permanent);
        assert_eq!(config.effective_sweep_interval(), None);
    }

    #[test]
    fn zero_period_is_permanent() {
        for raw in ["0", "0s", "0h0m", "-0s"] {
            let config = DedupConfig::from_args(Some(raw), None).unwrap();
            assert_eq!(config.retention(), Retention::Permanent, "period {:?}", raw);
        }
    }

    #[test]
    fn positive_period_is_timed() {
        let config = DedupConfig::from_args(Some("5m"), None).unwrap();
        assert_eq!(config.retention(), Retention::Timed(Duration::from_secs(300)));
        assert_eq!(config.effective_sweep_interval(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn negative_period_is_rejected() {
        let error = DedupConfig::from_args(Some("-1s"), None).unwrap_err();
        assert_eq!(
            error,
            ConfigError::NegativePeriod {
                value: "-1s".to_string()
            }
        );
    }

    #[test]
    fn malformed_period_is_rejected() {
        assert!(matches!(
            DedupConfig::from_args(Some("forever"), None),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn sweep_interval_overrides_period() {
        let config = DedupConfig::from_args(Some("1h"), Some("1m")).unwrap();
        assert_eq!(config.effective_sweep_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn sweep_interval_is_ignored_when_permanent() {
        let config = DedupConfig::from_args(None, Some("1m")).unwrap();
        assert_eq!(config.effective_sweep_interval(), None);
    }

    #[test]
    fn non_positive_sweep_interval_is_rejected() {
        for raw in ["0s", "-5s"] {
            assert_eq!(
                DedupConfig::from_args(Some("1h"), Some(raw)),
                Err(ConfigError::InvalidSweepInterval {
                    value: raw.to_string()
                })
            );
        }
    }
}
