//! Probability and information-content scoring of aggregated attribute values.

use std::collections::BTreeMap;

use crate::error::{RarityError, Result};
use crate::token::{AttributeCount, AttributeStatistic};

/// Converts occurrence counts into probabilities and surprisal scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct InformationScorer;

impl InformationScorer {
    /// Scores every group against `total_supply`.
    ///
    /// `probability = supply / total_supply` and `information = -log2(probability)`, so a value
    /// held by the whole collection scores exactly zero bits.
    pub fn score(counts: Vec<AttributeCount>, total_supply: u64) -> Result<Vec<AttributeStatistic>> {
        if total_supply == 0 {
            return Err(RarityError::Division { total_supply });
        }

        counts
            .into_iter()
            .map(|count| {
                if count.supply == 0 || count.supply > total_supply {
                    return Err(RarityError::InternalConsistency {
                        token_id: "*".into(),
                        name: count.name,
                        value: count.value.to_string(),
                        reason: "group supply outside (0, total_supply]",
                    });
                }
                Ok(AttributeStatistic {
                    probability: count.supply as f64 / total_supply as f64,
                    information: information(count.supply, total_supply),
                    name: count.name,
                    value: count.value,
                    display_type: count.display_type,
                    token_count: count.token_count,
                    supply: count.supply,
                })
            })
            .collect()
    }
}

/// Surprisal in bits of an event with weight `supply` out of `total_supply`.
#[must_use]
pub fn information(supply: u64, total_supply: u64) -> f64 {
    (total_supply as f64 / supply as f64).log2()
}

/// Shannon entropy of each attribute name: `Σ p · I` over its value groups.
#[must_use]
pub fn attribute_entropies(statistics: &[AttributeStatistic]) -> BTreeMap<String, f64> {
    let mut entropies = BTreeMap::new();
    for stat in statistics {
        *entropies.entry(stat.name.clone()).or_insert(0.0) += stat.probability * stat.information;
    }
    entropies
}

/// Entropy of the whole collection, summed over attribute names in name order.
#[must_use]
pub fn collection_entropy(statistics: &[AttributeStatistic]) -> f64 {
    attribute_entropies(statistics).values().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{AttributeValue, GroupValue};
    use approx::assert_relative_eq;

    fn count(value: &str, token_count: usize, supply: u64) -> AttributeCount {
        AttributeCount {
            name: "color".into(),
            value: GroupValue::Value(AttributeValue::from(value)),
            display_type: None,
            token_count,
            supply,
        }
    }

    #[test]
    fn scores_probability_and_information() {
        let stats = InformationScorer::score(vec![count("blue", 1, 1), count("red", 2, 2)], 3)
            .expect("scores");
        assert_relative_eq!(stats[0].probability, 1.0 / 3.0);
        assert_relative_eq!(stats[0].information, 3f64.log2());
        assert_relative_eq!(stats[1].probability, 2.0 / 3.0);
        assert_relative_eq!(stats[1].information, 1.5f64.log2());
    }

    #[test]
    fn universal_value_carries_no_information() {
        let stats = InformationScorer::score(vec![count("red", 4, 4)], 4).expect("scores");
        assert_eq!(stats[0].probability, 1.0);
        assert_eq!(stats[0].information, 0.0);
        assert!(stats[0].information.is_sign_positive());
    }

    #[test]
    fn zero_total_supply_is_a_division_error() {
        let err = InformationScorer::score(vec![count("red", 1, 1)], 0).expect_err("no supply");
        assert!(matches!(err, RarityError::Division { total_supply: 0 }));
    }

    #[test]
    fn oversized_group_is_rejected() {
        let err = InformationScorer::score(vec![count("red", 5, 5)], 3).expect_err("5 > 3");
        assert!(matches!(err, RarityError::InternalConsistency { .. }));
    }

    #[test]
    fn entropy_of_uniform_binary_attribute_is_one_bit() {
        let stats = InformationScorer::score(vec![count("blue", 1, 1), count("red", 1, 1)], 2)
            .expect("scores");
        assert_relative_eq!(collection_entropy(&stats), 1.0);
        assert_relative_eq!(attribute_entropies(&stats)["color"], 1.0);
    }
}
