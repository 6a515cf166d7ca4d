//! Scoring configuration.
//!
//! # Example
//!
//! ```
//! use framescore::scoring::ScoreConfig;
//! use framescore::Verbosity;
//!
//! let config = ScoreConfig::builder()
//!     .n_threads(4)
//!     .verbosity(Verbosity::Info)
//!     .thresholds(vec![0.25, 0.5, 0.75])
//!     .build()
//!     .unwrap();
//! assert_eq!(config.n_threads, 4);
//! ```

use bon::Builder;

use crate::error::ConfigError;
use crate::logger::Verbosity;

/// Settings for one scoring call.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct ScoreConfig {
    /// Worker threads. 0 uses all cores, 1 scores sequentially.
    #[builder(default)]
    pub n_threads: usize,

    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,

    /// Decision thresholds for binomial metrics. `None` uses 0.00..=1.00 in
    /// steps of 0.01.
    pub thresholds: Option<Vec<f32>>,
}

impl<S: score_config_builder::IsComplete> ScoreConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the threshold override is empty or holds a
    /// value outside `[0, 1]`.
    pub fn build(self) -> Result<ScoreConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl ScoreConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(thresholds) = &self.thresholds {
            if thresholds.is_empty() {
                return Err(ConfigError::EmptyThresholds);
            }
            if let Some(&bad) = thresholds.iter().find(|t| !(0.0..=1.0).contains(*t)) {
                return Err(ConfigError::InvalidThreshold(bad));
            }
        }
        Ok(())
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            n_threads: 0,
            verbosity: Verbosity::default(),
            thresholds: None,
        }
    }
}
