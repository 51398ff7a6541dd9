//! Join of per-token attribute rows against the scored attribute statistics.

use rustc_hash::FxHashMap;

use crate::error::{RarityError, Result};
use crate::token::{AttributeStatistic, GroupValue, TokenAttribute, TokenStatistic};

/// Attaches attribute-level statistics to every token attribute row.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenStatisticsMerger;

impl TokenStatisticsMerger {
    /// Joins `rows` against `statistics` on `(name, grouped value)`.
    ///
    /// Produces exactly one [`TokenStatistic`] per input row, in input order. A row without a
    /// matching statistic is a [`RarityError::InternalConsistency`]; rows are never dropped.
    pub fn merge(
        rows: &[TokenAttribute],
        statistics: &[AttributeStatistic],
    ) -> Result<Vec<TokenStatistic>> {
        let index: FxHashMap<(&str, &GroupValue), &AttributeStatistic> = statistics
            .iter()
            .map(|stat| ((stat.name.as_str(), &stat.value), stat))
            .collect();

        rows.iter()
            .map(|row| {
                let key = row.group_value();
                let stat = index.get(&(row.name.as_str(), &key)).ok_or_else(|| {
                    RarityError::InternalConsistency {
                        token_id: row.token_id.to_string(),
                        name: row.name.clone(),
                        value: key.to_string(),
                        reason: "no matching attribute statistic",
                    }
                })?;
                Ok(TokenStatistic {
                    token_id: row.token_id.clone(),
                    name: row.name.clone(),
                    value: row.value.clone(),
                    bin: row.bin,
                    display_type: row.display_type,
                    token_count: stat.token_count,
                    supply: stat.supply,
                    probability: stat.probability,
                    information: stat.information,
                })
            })
            .collect()
    }
}
