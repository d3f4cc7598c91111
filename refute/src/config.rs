//! Configuration for property runs.

use std::fmt;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid number of tries (must be > 0)
    InvalidTries(usize),
    /// Invalid number of shrinking steps (must be > 0)
    InvalidShrinkingSteps(usize),
    /// Edge case probability outside [0.0, 1.0]
    InvalidEdgeCaseProbability(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTries(n) => {
                write!(f, "Invalid tries count: {} (must be > 0)", n)
            }
            ConfigError::InvalidShrinkingSteps(n) => {
                write!(f, "Invalid shrinking steps count: {} (must be > 0)", n)
            }
            ConfigError::InvalidEdgeCaseProbability(p) => {
                write!(
                    f,
                    "Invalid edge case probability: {} (must be within [0.0, 1.0])",
                    p
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for a single property run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of generation tries before the property counts as satisfied
    pub tries: usize,
    /// Optional seed for reproducible runs
    pub seed: Option<u64>,
    /// Upper bound on accepted shrinking steps across all parameters
    pub max_shrinking_steps: usize,
    /// Probability that a single generation draws an edge case instead of a
    /// random value
    pub edge_case_probability: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tries: 1000,
            seed: None,
            max_shrinking_steps: 1000,
            edge_case_probability: 0.05,
        }
    }
}

impl RunConfig {
    /// Create a validated configuration
    pub fn new(
        tries: usize,
        seed: Option<u64>,
        max_shrinking_steps: usize,
        edge_case_probability: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            tries,
            seed,
            max_shrinking_steps,
            edge_case_probability,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a configuration with a fixed seed and defaults otherwise
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Create a configuration with a fixed number of tries and defaults
    /// otherwise
    pub fn with_tries(tries: usize) -> Self {
        Self {
            tries,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tries == 0 {
            return Err(ConfigError::InvalidTries(self.tries));
        }
        if self.max_shrinking_steps == 0 {
            return Err(ConfigError::InvalidShrinkingSteps(self.max_shrinking_steps));
        }
        if !(0.0..=1.0).contains(&self.edge_case_probability) {
            return Err(ConfigError::InvalidEdgeCaseProbability(
                self.edge_case_probability,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RunConfig::default();
        assert_eq!(config.tries, 1000);
        assert_eq!(config.max_shrinking_steps, 1000);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_tries_rejected() {
        let config = RunConfig {
            tries: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidTries(0)));
    }

    #[test]
    fn test_probability_bounds_are_inclusive() {
        for p in [0.0, 0.5, 1.0] {
            let config = RunConfig {
                edge_case_probability: p,
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }
        let config = RunConfig {
            edge_case_probability: 1.5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidEdgeCaseProbability(1.5))
        );
    }

    #[test]
    fn test_constructor_validates() {
        assert!(RunConfig::new(100, Some(42), 500, 0.1).is_ok());
        assert!(RunConfig::new(100, None, 0, 0.1).is_err());
    }
}
