//! Grouping of attribute rows into per-value occurrence counts.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::error::{RarityError, Result};
use crate::token::{AttributeCount, DisplayType, GroupValue, TokenAttribute, TokenId};
use crate::validate::SupplyDescriptor;

/// Counts tokens and supply per `(name, value)` group.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeAggregator;

#[derive(Default)]
struct GroupAccumulator<'a> {
    tokens: BTreeSet<&'a TokenId>,
    supply: u64,
    display_type: Option<DisplayType>,
}

impl AttributeAggregator {
    /// Aggregates schema-filled rows, including the null sentinel groups.
    ///
    /// Output is ordered by attribute name, then by grouped value. Each attribute name is
    /// aggregated independently on the rayon pool.
    pub fn aggregate(
        rows: &[TokenAttribute],
        supply: &SupplyDescriptor,
    ) -> Result<Vec<AttributeCount>> {
        let mut partitions: BTreeMap<&str, Vec<&TokenAttribute>> = BTreeMap::new();
        for row in rows {
            partitions.entry(row.name.as_str()).or_default().push(row);
        }

        let partitions: Vec<(&str, Vec<&TokenAttribute>)> = partitions.into_iter().collect();
        let per_name: Vec<Vec<AttributeCount>> = partitions
            .into_par_iter()
            .map(|(name, partition)| aggregate_partition(name, &partition, supply))
            .collect::<Result<_>>()?;

        Ok(per_name.into_iter().flatten().collect())
    }
}

fn aggregate_partition(
    name: &str,
    rows: &[&TokenAttribute],
    supply: &SupplyDescriptor,
) -> Result<Vec<AttributeCount>> {
    let mut groups: BTreeMap<GroupValue, GroupAccumulator<'_>> = BTreeMap::new();
    for row in rows {
        let group = groups.entry(row.group_value()).or_default();
        group.display_type = row.display_type;
        if !group.tokens.insert(&row.token_id) {
            continue;
        }
        let weight = supply
            .supply_of(&row.token_id)
            .ok_or_else(|| RarityError::InternalConsistency {
                token_id: row.token_id.to_string(),
                name: row.name.clone(),
                value: row.group_value().to_string(),
                reason: "token has no recorded supply",
            })?;
        group.supply = group.supply.saturating_add(weight);
    }

    Ok(groups
        .into_iter()
        .map(|(value, group)| AttributeCount {
            name: name.to_string(),
            value,
            display_type: group.display_type,
            token_count: group.tokens.len(),
            supply: group.supply,
        })
        .collect())
}
