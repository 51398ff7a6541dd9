//! Flattening of per-token attribute lists into long-form rows and derivation of the
//! collection schema.
//!
//! Every attribute name observed anywhere in the collection yields exactly one row per token:
//! tokens that do not declare the attribute receive a row carrying the
//! [`AttributeValue::Null`] sentinel. Probability denominators downstream rely on this.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{RarityError, Result};
use crate::token::{AttributeValue, DisplayType, RawToken, TokenAttribute, TokenId};

/// Schema entry for one attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSchema {
    /// Canonical display type shared by every row of the attribute.
    pub display_type: Option<DisplayType>,
    /// Tokens that declare the attribute.
    pub token_count: usize,
    /// Distinct declared values.
    pub value_count: usize,
}

/// Canonical attribute schema of a collection, ordered by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TokenSchema {
    attributes: BTreeMap<String, AttributeSchema>,
}

impl TokenSchema {
    /// Returns the entry of an attribute name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    /// Canonical display type of an attribute name.
    #[must_use]
    pub fn display_type(&self, name: &str) -> Option<DisplayType> {
        self.attributes
            .get(name)
            .and_then(|entry| entry.display_type)
    }

    /// Iterates entries in attribute name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeSchema)> {
        self.attributes
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// Number of attribute names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` when no token declares any attribute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Resolves the canonical display type of every attribute name.
///
/// Explicit numeric and explicit textual declarations of one name are a
/// [`RarityError::Schema`]; undeclared display types never clash. The canonical display type is
/// the most frequent explicit one, ties going to the smallest [`DisplayType`].
pub fn resolve_display_types(
    tokens: &BTreeMap<TokenId, RawToken>,
) -> Result<BTreeMap<String, Option<DisplayType>>> {
    let mut first_seen: BTreeMap<&str, DisplayType> = BTreeMap::new();
    let mut counts: BTreeMap<&str, BTreeMap<DisplayType, usize>> = BTreeMap::new();

    for token in tokens.values() {
        for attr in &token.attributes {
            let per_name = counts.entry(attr.name.as_str()).or_default();
            let Some(display) = attr.display_type else {
                continue;
            };
            match first_seen.entry(attr.name.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(display);
                }
                Entry::Occupied(slot) => {
                    let first = *slot.get();
                    if first.is_numeric() != display.is_numeric() {
                        return Err(RarityError::Schema {
                            name: attr.name.clone(),
                            first,
                            second: display,
                        });
                    }
                }
            }
            *per_name.entry(display).or_insert(0) += 1;
        }
    }

    Ok(counts
        .into_iter()
        .map(|(name, per_display)| {
            let canonical = per_display
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|(display, _)| display);
            (name.to_string(), canonical)
        })
        .collect())
}

/// Builds the long-form attribute table and the schema of a collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Flattens `tokens` into rows ordered by `(token_id, name)` and derives the schema.
    ///
    /// Repeated declarations of one name within a token keep the first declaration.
    pub fn build(tokens: &BTreeMap<TokenId, RawToken>) -> Result<(TokenSchema, Vec<TokenAttribute>)> {
        let display_types = resolve_display_types(tokens)?;
        let mut rows = Vec::with_capacity(tokens.len() * display_types.len());
        let mut declared_values: BTreeMap<&str, (usize, BTreeSet<&AttributeValue>)> =
            BTreeMap::new();

        for (token_id, token) in tokens {
            let mut declared: BTreeMap<&str, &AttributeValue> = BTreeMap::new();
            for attr in &token.attributes {
                if let Entry::Vacant(slot) = declared.entry(attr.name.as_str()) {
                    slot.insert(&attr.value);
                }
            }

            for (name, display_type) in &display_types {
                let value = match declared.get(name.as_str()) {
                    Some(value) => {
                        let (count, values) = declared_values.entry(name.as_str()).or_default();
                        *count += 1;
                        values.insert(*value);
                        (*value).clone()
                    }
                    None => AttributeValue::Null,
                };
                rows.push(TokenAttribute {
                    token_id: token_id.clone(),
                    name: name.clone(),
                    value,
                    display_type: *display_type,
                    bin: None,
                });
            }
        }

        let attributes = display_types
            .iter()
            .map(|(name, display_type)| {
                let (token_count, value_count) = declared_values
                    .get(name.as_str())
                    .map_or((0, 0), |(count, values)| (*count, values.len()));
                (
                    name.clone(),
                    AttributeSchema {
                        display_type: *display_type,
                        token_count,
                        value_count,
                    },
                )
            })
            .collect();

        Ok((TokenSchema { attributes }, rows))
    }
}
