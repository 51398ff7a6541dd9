//! Precondition checks applied to raw tokens before any statistics are computed.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::config::ValidationConfig;
use crate::error::{RarityError, Result};
use crate::schema::resolve_display_types;
use crate::token::{AttributeValue, RawToken, TokenId, TokenType};

/// Supply of a validated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupplyDescriptor {
    /// Every token weighs 1; carries the number of tokens.
    Uniform {
        /// Number of tokens in the collection.
        tokens: u64,
    },
    /// Per-variant supply for semi-fungible collections.
    PerToken(BTreeMap<TokenId, u64>),
}

impl SupplyDescriptor {
    /// Total supply of the collection.
    #[must_use]
    pub fn total(&self) -> u64 {
        match self {
            Self::Uniform { tokens } => *tokens,
            Self::PerToken(supplies) => supplies
                .values()
                .fold(0u64, |acc, supply| acc.saturating_add(*supply)),
        }
    }

    /// Supply weight of a single token, `None` when the token is unknown.
    #[must_use]
    pub fn supply_of(&self, token_id: &TokenId) -> Option<u64> {
        match self {
            Self::Uniform { .. } => Some(1),
            Self::PerToken(supplies) => supplies.get(token_id).copied(),
        }
    }
}

/// Tokens accepted by a [`TokenValidator`].
#[derive(Debug, Clone)]
pub struct ValidatedTokens {
    /// Supply weighting of the collection.
    pub supply: SupplyDescriptor,
    /// Tokens keyed and ordered by id.
    pub tokens: BTreeMap<TokenId, RawToken>,
}

/// Collaborator checking raw input shape at collection construction.
pub trait TokenValidator {
    /// Validates `tokens` under the rules of `token_type`.
    fn validate(
        &self,
        token_type: TokenType,
        tokens: Vec<(TokenId, RawToken)>,
    ) -> Result<ValidatedTokens>;
}

/// Default validator enforcing the collection invariants the pipeline relies on.
#[derive(Debug, Clone, Default)]
pub struct StandardValidator {
    config: ValidationConfig,
}

impl StandardValidator {
    /// Creates a validator with the supplied options.
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Returns the options this validator applies.
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    fn check_attributes(&self, token_id: &TokenId, token: &mut RawToken) -> Result<()> {
        if token.attributes.is_empty() && !self.config.allow_empty_tokens {
            return Err(RarityError::Validation(format!(
                "token {token_id} declares no attributes"
            )));
        }

        let mut seen = BTreeSet::new();
        let mut duplicates = false;
        for attr in &token.attributes {
            if attr.name.trim().is_empty() {
                return Err(RarityError::Validation(format!(
                    "token {token_id} declares an attribute with an empty name"
                )));
            }
            match &attr.value {
                AttributeValue::Null => {
                    return Err(RarityError::Validation(format!(
                        "token {token_id} attribute {:?} has a null value",
                        attr.name
                    )));
                }
                AttributeValue::Float(value) if !value.is_finite() => {
                    return Err(RarityError::Validation(format!(
                        "token {token_id} attribute {:?} has non-finite value {value}",
                        attr.name
                    )));
                }
                _ => {}
            }
            if !seen.insert(attr.name.as_str()) {
                if !self.config.allow_duplicate_names {
                    return Err(RarityError::Validation(format!(
                        "token {token_id} declares attribute {:?} more than once",
                        attr.name
                    )));
                }
                duplicates = true;
            }
        }

        if duplicates {
            warn!("token {token_id} repeats attribute names; keeping the first declaration");
            let mut kept = BTreeSet::new();
            token
                .attributes
                .retain(|attr| kept.insert(attr.name.clone()));
        }
        Ok(())
    }

    fn resolve_supply(
        token_type: TokenType,
        tokens: &BTreeMap<TokenId, RawToken>,
    ) -> Result<SupplyDescriptor> {
        match token_type {
            TokenType::NonFungible => {
                for (token_id, token) in tokens {
                    if let Some(supply) = token.supply.filter(|&supply| supply != 1) {
                        return Err(RarityError::Validation(format!(
                            "non-fungible token {token_id} declares supply {supply}"
                        )));
                    }
                }
                Ok(SupplyDescriptor::Uniform {
                    tokens: tokens.len() as u64,
                })
            }
            TokenType::SemiFungible => {
                let mut supplies = BTreeMap::new();
                let mut total = 0u64;
                for (token_id, token) in tokens {
                    let supply = token.supply.unwrap_or(1);
                    if supply == 0 {
                        return Err(RarityError::Validation(format!(
                            "token {token_id} declares zero supply"
                        )));
                    }
                    total = total.checked_add(supply).ok_or_else(|| {
                        RarityError::Validation("total collection supply overflows u64".into())
                    })?;
                    supplies.insert(token_id.clone(), supply);
                }
                Ok(SupplyDescriptor::PerToken(supplies))
            }
        }
    }
}

impl TokenValidator for StandardValidator {
    fn validate(
        &self,
        token_type: TokenType,
        tokens: Vec<(TokenId, RawToken)>,
    ) -> Result<ValidatedTokens> {
        if tokens.is_empty() {
            return Err(RarityError::Validation(
                "collection must contain at least one token".into(),
            ));
        }

        let mut validated = BTreeMap::new();
        for (token_id, mut token) in tokens {
            self.check_attributes(&token_id, &mut token)?;
            if validated.contains_key(&token_id) {
                return Err(RarityError::Validation(format!(
                    "duplicate token id {token_id}"
                )));
            }
            validated.insert(token_id, token);
        }

        let display_types = resolve_display_types(&validated)?;
        for (token_id, token) in &validated {
            for attr in &token.attributes {
                let numeric = display_types
                    .get(&attr.name)
                    .copied()
                    .flatten()
                    .is_some_and(|display| display.is_numeric());
                if numeric && attr.value.as_f64().is_none() {
                    return Err(RarityError::Validation(format!(
                        "token {token_id} attribute {:?} is numeric but has value {:?}",
                        attr.name,
                        attr.value.to_string()
                    )));
                }
            }
        }

        let supply = Self::resolve_supply(token_type, &validated)?;
        Ok(ValidatedTokens {
            supply,
            tokens: validated,
        })
    }
}
