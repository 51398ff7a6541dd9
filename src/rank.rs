//! Reduction of token statistics into per-token totals and rank assignment.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::token::{RankedToken, TokenId, TokenStatistic};

/// How tokens with identical sort keys are numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTiePolicy {
    /// Equal `(total_information, unique_trait_count)` share a rank; ranks have no gaps.
    ///
    /// Totals must be bit-identical to tie. Different trait sets whose totals are equal in exact
    /// arithmetic can round one ULP apart and then take adjacent ranks.
    #[default]
    Dense,
    /// Every token gets its 1-based position in the sorted order.
    Sequential,
}

#[derive(Default)]
struct TokenTotals<'a> {
    contributions: Vec<(&'a str, f64)>,
    unique_trait_count: usize,
}

struct Reduced<'a> {
    token_id: &'a TokenId,
    total_information: f64,
    unique_trait_count: usize,
    max_trait_information: f64,
}

impl Reduced<'_> {
    fn cmp_rarity(&self, other: &Self) -> Ordering {
        other
            .total_information
            .total_cmp(&self.total_information)
            .then_with(|| other.unique_trait_count.cmp(&self.unique_trait_count))
            .then_with(|| self.token_id.cmp(other.token_id))
    }

    fn ties_with(&self, other: &Self) -> bool {
        self.total_information.to_bits() == other.total_information.to_bits()
            && self.unique_trait_count == other.unique_trait_count
    }
}

/// Reduces per-token attribute statistics into ranked tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct RarityRanker {
    policy: RankTiePolicy,
}

impl RarityRanker {
    /// Creates a ranker applying `policy` to ties.
    #[must_use]
    pub fn new(policy: RankTiePolicy) -> Self {
        Self { policy }
    }

    /// Returns the tie policy of this ranker.
    #[must_use]
    pub fn policy(&self) -> RankTiePolicy {
        self.policy
    }

    /// Ranks every token in `token_ids`, rarest first.
    ///
    /// Tokens are ordered by total information (descending), then unique trait count
    /// (descending), then token id (ascending). Information is summed in attribute name order so
    /// equal trait sets produce bit-identical totals regardless of row order. Tokens without
    /// statistics rank with zero information. `collection_entropy` normalises
    /// [`RankedToken::rarity_score`].
    pub fn rank<'a, I>(
        &self,
        token_ids: I,
        statistics: &'a [TokenStatistic],
        collection_entropy: f64,
    ) -> Vec<RankedToken>
    where
        I: IntoIterator<Item = &'a TokenId>,
    {
        let mut totals: BTreeMap<&TokenId, TokenTotals<'_>> = token_ids
            .into_iter()
            .map(|token_id| (token_id, TokenTotals::default()))
            .collect();
        for stat in statistics {
            let entry = totals.entry(&stat.token_id).or_default();
            entry.contributions.push((stat.name.as_str(), stat.information));
            if !stat.value.is_null() {
                entry.unique_trait_count += 1;
            }
        }

        let mut reduced: Vec<Reduced<'_>> = totals
            .into_iter()
            .map(|(token_id, mut totals)| {
                totals
                    .contributions
                    .sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.total_cmp(&b.1)));
                let total_information: f64 =
                    totals.contributions.iter().map(|(_, info)| info).sum();
                let max_trait_information = totals
                    .contributions
                    .iter()
                    .map(|(_, info)| *info)
                    .fold(0.0, f64::max);
                Reduced {
                    token_id,
                    total_information,
                    unique_trait_count: totals.unique_trait_count,
                    max_trait_information,
                }
            })
            .collect();
        reduced.sort_by(Reduced::cmp_rarity);

        let mut ranked = Vec::with_capacity(reduced.len());
        let mut rank = 0usize;
        for (position, token) in reduced.iter().enumerate() {
            rank = match self.policy {
                RankTiePolicy::Sequential => position + 1,
                RankTiePolicy::Dense if position > 0 && token.ties_with(&reduced[position - 1]) => {
                    rank
                }
                RankTiePolicy::Dense => rank + 1,
            };
            let rarity_score = if collection_entropy > 0.0 {
                token.total_information / collection_entropy
            } else {
                0.0
            };
            ranked.push(RankedToken {
                token_id: token.token_id.clone(),
                total_information: token.total_information,
                probability: (-token.total_information).exp2(),
                unique_trait_count: token.unique_trait_count,
                max_trait_information: token.max_trait_information,
                rarity_score,
                rank,
            });
        }
        ranked
    }
}
