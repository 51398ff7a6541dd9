//! JSON token input, rank output, and content checksums.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};

use super::RankWriter;
use crate::error::{RarityError, Result};
use crate::token::{MetadataAttribute, RankedToken, RawToken, TokenId};

#[derive(Deserialize)]
struct TokenRecord {
    token_id: TokenId,
    #[serde(default)]
    attributes: Vec<MetadataAttribute>,
    #[serde(default, alias = "token_supply")]
    supply: Option<u64>,
}

/// Reads raw tokens from a JSON file.
///
/// Accepts either an object keyed by token id (`{"1": {"attributes": [...]}}`) or an array of
/// records carrying a `token_id` field. Object keys that parse as integers become
/// [`TokenId::Int`].
pub fn load_tokens<P: AsRef<Path>>(path: P) -> Result<Vec<(TokenId, RawToken)>> {
    let path = path.as_ref();
    let data =
        fs::read_to_string(path).map_err(|err| RarityError::io(err, Some(path.to_path_buf())))?;
    parse_tokens(&data)
}

fn parse_tokens(data: &str) -> Result<Vec<(TokenId, RawToken)>> {
    let TokenFile(tokens) = serde_json::from_str(data)?;
    Ok(tokens)
}

/// Token document in either accepted layout, keeping repeated object keys so the validator
/// sees every entry.
struct TokenFile(Vec<(TokenId, RawToken)>);

impl<'de> Deserialize<'de> for TokenFile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TokenFileVisitor)
    }
}

struct TokenFileVisitor;

impl<'de> Visitor<'de> for TokenFileVisitor {
    type Value = TokenFile;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object keyed by token id or an array of token records")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut tokens = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((id, token)) = map.next_entry::<String, RawToken>()? {
            tokens.push((TokenId::parse(&id), token));
        }
        Ok(TokenFile(tokens))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut tokens = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(record) = seq.next_element::<TokenRecord>()? {
            let token = RawToken {
                attributes: record.attributes,
                supply: record.supply,
            };
            tokens.push((record.token_id, token));
        }
        Ok(TokenFile(tokens))
    }
}

/// Serialises ranks to a JSON array string.
pub fn ranks_json(ranks: &[RankedToken], pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(ranks)?)
    } else {
        Ok(serde_json::to_string(ranks)?)
    }
}

/// Writes ranks as a JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRankWriter {
    pretty: bool,
}

impl JsonRankWriter {
    /// Creates a writer; `pretty` selects indented output.
    #[must_use]
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl RankWriter for JsonRankWriter {
    fn write_ranks(&self, ranks: &[RankedToken], path: &Path) -> Result<()> {
        let json = ranks_json(ranks, self.pretty)?;
        fs::write(path, json).map_err(|err| RarityError::io(err, Some(path.to_path_buf())))
    }
}

/// Hex SHA-256 digest of the token JSON followed by the rank JSON.
pub fn checksum(tokens: &BTreeMap<TokenId, RawToken>, ranks: &[RankedToken]) -> Result<String> {
    let records: Vec<(&TokenId, &RawToken)> = tokens.iter().collect();
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&records)?);
    hasher.update(serde_json::to_vec(ranks)?);
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::TokenCollection;
    use crate::config::RankingConfig;
    use crate::token::{AttributeValue, TokenType};
    use tempfile::tempdir;

    fn ranked(id: u64, rank: usize) -> RankedToken {
        RankedToken {
            token_id: TokenId::from(id),
            total_information: 1.0,
            probability: 0.5,
            unique_trait_count: 1,
            max_trait_information: 1.0,
            rarity_score: 1.0,
            rank,
        }
    }

    #[test]
    fn parses_object_keyed_by_token_id() {
        let tokens = parse_tokens(
            r#"{"7": {"attributes": [{"trait_type": "hat", "value": "cap"}]}, "alpha": {}}"#,
        )
        .expect("object form parses");
        assert_eq!(tokens.len(), 2);
        let (id, token) = tokens
            .iter()
            .find(|(id, _)| *id == TokenId::from(7))
            .expect("token 7 present");
        assert_eq!(id, &TokenId::Int(7));
        assert_eq!(token.attributes[0].name, "hat");
        assert_eq!(token.attributes[0].value, AttributeValue::from("cap"));
        assert!(tokens.iter().any(|(id, token)| {
            *id == TokenId::from("alpha") && token.attributes.is_empty()
        }));
    }

    #[test]
    fn parses_array_of_records() {
        let tokens = parse_tokens(
            r#"[{"token_id": 1, "attributes": [{"name": "level", "value": 3, "display_type": "number"}], "supply": 4},
                {"token_id": "b", "token_supply": 2}]"#,
        )
        .expect("array form parses");
        assert_eq!(tokens[0].0, TokenId::from(1));
        assert_eq!(tokens[0].1.supply, Some(4));
        assert_eq!(tokens[0].1.attributes[0].value, AttributeValue::Int(3));
        assert_eq!(tokens[1].0, TokenId::from("b"));
        assert_eq!(tokens[1].1.supply, Some(2));
    }

    #[test]
    fn rejects_scalar_documents() {
        let err = parse_tokens("42").expect_err("scalar input");
        assert!(!err.is_validation());
        assert!(err.to_string().contains("invalid type"));
    }

    #[test]
    fn repeated_object_keys_reach_the_validator() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tokens.json");
        fs::write(
            &path,
            r#"{"1": {"attributes": [{"trait_type": "color", "value": "red"}]},
                "1": {"attributes": [{"trait_type": "color", "value": "blue"}]}}"#,
        )
        .expect("write tokens");

        let tokens = load_tokens(&path).expect("object form parses");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].1.attributes[0].value, AttributeValue::from("red"));

        let err = TokenCollection::new(TokenType::NonFungible, tokens, RankingConfig::default())
            .expect_err("duplicate token id");
        assert!(err.is_validation());
        assert!(err.to_string().contains("duplicate token id 1"));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempdir().expect("tempdir");
        let err = load_tokens(dir.path().join("absent.json")).expect_err("missing file");
        assert!(matches!(err, RarityError::Io { path: Some(_), .. }));
    }

    #[test]
    fn writer_persists_ranks() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ranks.json");
        let ranks = vec![ranked(2, 1), ranked(1, 2)];
        JsonRankWriter::new(false)
            .write_ranks(&ranks, &path)
            .expect("write");
        let written = fs::read_to_string(&path).expect("read back");
        assert!(!written.contains('\n'));
        let parsed: Vec<RankedToken> = serde_json::from_str(&written).expect("parse");
        assert_eq!(parsed, ranks);
    }

    #[test]
    fn checksum_depends_on_ranks() {
        let mut tokens = BTreeMap::new();
        tokens.insert(TokenId::from(1), RawToken::default());
        let first = checksum(&tokens, &[ranked(1, 1)]).expect("checksum");
        let second = checksum(&tokens, &[ranked(1, 2)]).expect("checksum");
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
