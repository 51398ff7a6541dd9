//! Configuration builders controlling validation, binning, and rank assignment.

use serde::{Deserialize, Serialize};

use crate::binning::NumericBinning;
use crate::error::{RarityError, Result};
use crate::rank::RankTiePolicy;

/// Options forwarded to the validation collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Accepts tokens that declare no attributes at all.
    pub allow_empty_tokens: bool,
    /// Accepts tokens declaring the same attribute name twice, keeping the first declaration.
    pub allow_duplicate_names: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allow_empty_tokens: true,
            allow_duplicate_names: false,
        }
    }
}

/// Configuration for a ranking run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingConfig {
    /// Binning policy applied to numeric attributes before aggregation.
    pub binning: NumericBinning,
    /// How tokens with identical sort keys are ranked.
    pub tie_policy: RankTiePolicy,
    /// Options forwarded to the token validator.
    pub validation: ValidationConfig,
    /// Enables per-stage summaries through the `log` facade.
    pub show_progress: bool,
}

impl RankingConfig {
    /// Returns a builder initialised with [`RankingConfig::default`].
    #[must_use]
    pub fn builder() -> RankingBuilder {
        RankingBuilder::default()
    }

    /// Validates the invariants required for ranking.
    pub fn validate(&self) -> Result<()> {
        match self.binning {
            NumericBinning::EqualWidth { bins } | NumericBinning::EqualFrequency { bins }
                if bins == 0 =>
            {
                Err(RarityError::InvalidConfig(
                    "numeric binning requires at least one bin".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            binning: NumericBinning::default(),
            tie_policy: RankTiePolicy::default(),
            validation: ValidationConfig::default(),
            show_progress: false,
        }
    }
}

/// Builder for [`RankingConfig`].
#[derive(Debug, Default, Clone)]
pub struct RankingBuilder {
    cfg: RankingConfig,
}

impl RankingBuilder {
    /// Creates a builder with [`RankingConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the numeric binning policy.
    #[must_use]
    pub fn binning(mut self, binning: NumericBinning) -> Self {
        self.cfg.binning = binning;
        self
    }

    /// Sets the rank tie policy.
    #[must_use]
    pub fn tie_policy(mut self, policy: RankTiePolicy) -> Self {
        self.cfg.tie_policy = policy;
        self
    }

    /// Accepts or rejects tokens without attributes.
    #[must_use]
    pub fn allow_empty_tokens(mut self, enabled: bool) -> Self {
        self.cfg.validation.allow_empty_tokens = enabled;
        self
    }

    /// Accepts or rejects repeated attribute names within one token.
    #[must_use]
    pub fn allow_duplicate_names(mut self, enabled: bool) -> Self {
        self.cfg.validation.allow_duplicate_names = enabled;
        self
    }

    /// Enables or disables per-stage logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`RankingConfig`].
    pub fn build(self) -> Result<RankingConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}
