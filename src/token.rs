//! Token, attribute, and statistic types flowing through the ranking pipeline.
//!
//! Raw input enters as [`RawToken`]s keyed by [`TokenId`]. The pipeline turns them into
//! long-form [`TokenAttribute`] rows, aggregates those into [`AttributeStatistic`]s, joins the
//! statistics back onto tokens as [`TokenStatistic`]s and finally reduces them into
//! [`RankedToken`]s.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identifier of a token within a collection.
///
/// Integer identifiers order numerically and sort before all string identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenId {
    /// Numeric token identifier.
    Int(u64),
    /// Free-form token identifier.
    Str(String),
}

impl TokenId {
    /// Parses an identifier from text, preferring the integer form for decimal input.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<u64>() {
            Ok(id) => Self::Int(id),
            Err(_) => Self::Str(raw.to_string()),
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Str(id) => f.write_str(id),
        }
    }
}

impl From<u64> for TokenId {
    fn from(id: u64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for TokenId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_string())
    }
}

impl From<String> for TokenId {
    fn from(id: String) -> Self {
        Self::Str(id)
    }
}

/// Value carried by an attribute.
///
/// [`AttributeValue::Null`] is the sentinel synthesized for tokens that do not declare an
/// attribute present elsewhere in the collection. It never compares equal to the text `"null"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Missing-attribute sentinel.
    Null,
    /// Integer value.
    Int(i64),
    /// Floating point value; always finite once validated.
    Float(f64),
    /// Textual value.
    Text(String),
}

impl AttributeValue {
    /// Returns `true` for the missing-attribute sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as `f64` when it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Null | Self::Text(_) => None,
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Int(_) => 1,
            Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttributeValue {}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variant_rank().hash(state);
        match self {
            Self::Null => {}
            Self::Int(value) => value.hash(state),
            Self::Float(value) => value.to_bits().hash(state),
            Self::Text(value) => value.hash(state),
        }
    }
}

impl Ord for AttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

impl PartialOrd for AttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("<null>"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Display hint attached to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayType {
    /// Plain text trait.
    String,
    /// Numeric trait.
    Number,
    /// Numeric boost rendered as an absolute amount.
    BoostNumber,
    /// Numeric boost rendered as a percentage.
    BoostPercentage,
    /// Unix timestamp.
    Date,
}

impl DisplayType {
    /// Returns `true` when values of this display type are numeric and subject to binning.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::String)
    }

    /// Canonical serialized name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::BoostNumber => "boost_number",
            Self::BoostPercentage => "boost_percentage",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for DisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute as declared in raw token metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    /// Attribute name.
    #[serde(alias = "trait_type")]
    pub name: String,
    /// Declared value.
    pub value: AttributeValue,
    /// Optional display hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<DisplayType>,
}

impl MetadataAttribute {
    /// Creates an attribute without a display hint.
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            display_type: None,
        }
    }

    /// Attaches a display hint.
    #[must_use]
    pub fn with_display_type(mut self, display_type: DisplayType) -> Self {
        self.display_type = Some(display_type);
        self
    }
}

/// Input unit of a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawToken {
    /// Declared attributes.
    #[serde(default)]
    pub attributes: Vec<MetadataAttribute>,
    /// Supply of this token variant; only meaningful for semi-fungible collections.
    #[serde(default, alias = "token_supply", skip_serializing_if = "Option::is_none")]
    pub supply: Option<u64>,
}

impl RawToken {
    /// Creates a token from its attributes.
    pub fn new<I>(attributes: I) -> Self
    where
        I: IntoIterator<Item = MetadataAttribute>,
    {
        Self {
            attributes: attributes.into_iter().collect(),
            supply: None,
        }
    }

    /// Sets the supply of this token variant.
    #[must_use]
    pub fn with_supply(mut self, supply: u64) -> Self {
        self.supply = Some(supply);
        self
    }
}

/// Token standard governing validation and supply weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenType {
    /// Every token is unique and weighs 1.
    #[default]
    NonFungible,
    /// Each token id is a variant weighted by its supply.
    SemiFungible,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFungible => f.write_str("non-fungible"),
            Self::SemiFungible => f.write_str("semi-fungible"),
        }
    }
}

/// Closed numeric interval a binned value falls into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BinRange {
    /// Lower bound (inclusive).
    pub lower: f64,
    /// Upper bound (inclusive).
    pub upper: f64,
}

impl BinRange {
    /// Creates a new range.
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }
}

impl PartialEq for BinRange {
    fn eq(&self, other: &Self) -> bool {
        self.lower.to_bits() == other.lower.to_bits()
            && self.upper.to_bits() == other.upper.to_bits()
    }
}

impl Eq for BinRange {}

impl Hash for BinRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lower.to_bits().hash(state);
        self.upper.to_bits().hash(state);
    }
}

impl Ord for BinRange {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lower
            .total_cmp(&other.lower)
            .then_with(|| self.upper.total_cmp(&other.upper))
    }
}

impl PartialOrd for BinRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BinRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Key under which attribute rows are grouped: the value itself, or its bin for numeric traits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupValue {
    /// Ungrouped attribute value.
    Value(AttributeValue),
    /// Bin of a numeric attribute value.
    Bin(BinRange),
}

impl GroupValue {
    /// Returns `true` when the group collects the missing-attribute sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(AttributeValue::Null))
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => value.fmt(f),
            Self::Bin(range) => range.fmt(f),
        }
    }
}

/// Flattened attribute row: one per (token, attribute name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAttribute {
    /// Owning token.
    pub token_id: TokenId,
    /// Attribute name.
    pub name: String,
    /// Declared value or the null sentinel.
    pub value: AttributeValue,
    /// Canonical display type for the attribute name.
    pub display_type: Option<DisplayType>,
    /// Bin assigned to numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<BinRange>,
}

impl TokenAttribute {
    /// Returns the key this row is aggregated under.
    #[must_use]
    pub fn group_value(&self) -> GroupValue {
        match self.bin {
            Some(range) => GroupValue::Bin(range),
            None => GroupValue::Value(self.value.clone()),
        }
    }
}

/// Occurrence counts for one (name, value) group before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCount {
    /// Attribute name.
    pub name: String,
    /// Grouped value.
    pub value: GroupValue,
    /// Canonical display type.
    pub display_type: Option<DisplayType>,
    /// Distinct tokens exhibiting the value.
    pub token_count: usize,
    /// Summed supply of those tokens.
    pub supply: u64,
}

/// Scored statistic for one (name, value) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeStatistic {
    /// Attribute name.
    pub name: String,
    /// Grouped value.
    pub value: GroupValue,
    /// Canonical display type.
    pub display_type: Option<DisplayType>,
    /// Distinct tokens exhibiting the value.
    pub token_count: usize,
    /// Summed supply of those tokens.
    pub supply: u64,
    /// `supply / total_supply`.
    pub probability: f64,
    /// Surprisal in bits, `-log2(probability)`.
    pub information: f64,
}

/// Attribute-level statistic joined onto one token row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenStatistic {
    /// Owning token.
    pub token_id: TokenId,
    /// Attribute name.
    pub name: String,
    /// Value declared by the token, or the null sentinel.
    pub value: AttributeValue,
    /// Bin the value was grouped under, for numeric traits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<BinRange>,
    /// Canonical display type.
    pub display_type: Option<DisplayType>,
    /// Tokens sharing this attribute value.
    pub token_count: usize,
    /// Supply sharing this attribute value.
    pub supply: u64,
    /// Probability of the attribute value.
    pub probability: f64,
    /// Information content of the attribute value in bits.
    pub information: f64,
}

/// Final per-token rarity summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedToken {
    /// Ranked token.
    pub token_id: TokenId,
    /// Sum of the information of every attribute row of the token.
    pub total_information: f64,
    /// Joint probability of the token's trait combination, `2^-total_information`.
    pub probability: f64,
    /// Number of attributes the token actually declares.
    pub unique_trait_count: usize,
    /// Largest single-attribute information.
    pub max_trait_information: f64,
    /// `total_information` normalised by the collection entropy.
    pub rarity_score: f64,
    /// 1-based rank, 1 being the rarest.
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sentinel_differs_from_null_text() {
        assert_ne!(AttributeValue::Null, AttributeValue::from("null"));
        assert!(AttributeValue::Null.is_null());
        assert!(!AttributeValue::from("null").is_null());
    }

    #[test]
    fn token_ids_order_integers_first() {
        let mut ids = vec![
            TokenId::from("b"),
            TokenId::from(10),
            TokenId::from("a"),
            TokenId::from(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                TokenId::from(2),
                TokenId::from(10),
                TokenId::from("a"),
                TokenId::from("b"),
            ]
        );
    }

    #[test]
    fn parse_prefers_integer_ids() {
        assert_eq!(TokenId::parse("42"), TokenId::Int(42));
        assert_eq!(TokenId::parse("0x2a"), TokenId::Str("0x2a".into()));
        assert_eq!(TokenId::parse("007"), TokenId::Int(7));
    }

    #[test]
    fn metadata_accepts_trait_type_alias() {
        let attr: MetadataAttribute = serde_json::from_str(
            r#"{"trait_type": "level", "value": 3, "display_type": "boost_number"}"#,
        )
        .expect("attribute parses");
        assert_eq!(attr.name, "level");
        assert_eq!(attr.value, AttributeValue::Int(3));
        assert_eq!(attr.display_type, Some(DisplayType::BoostNumber));
    }

    #[test]
    fn json_null_value_becomes_sentinel() {
        let attr: MetadataAttribute =
            serde_json::from_str(r#"{"name": "hat", "value": null}"#).expect("attribute parses");
        assert!(attr.value.is_null());
    }

    #[test]
    fn float_values_compare_by_bits() {
        let a = AttributeValue::Float(1.5);
        let b = AttributeValue::Float(1.5);
        assert_eq!(a, b);
        assert_ne!(AttributeValue::Float(1.0), AttributeValue::Int(1));
        assert!(AttributeValue::Float(-2.0) < AttributeValue::Float(0.5));
    }
}
