//! Collection façade that validates raw tokens and drives the ranking pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};

use crate::aggregate::AttributeAggregator;
use crate::binning::apply_binning;
use crate::config::RankingConfig;
use crate::error::{RarityError, Result};
use crate::merge::TokenStatisticsMerger;
use crate::metrics::{PipelineMetrics, PipelineStage};
use crate::rank::RarityRanker;
use crate::schema::{SchemaBuilder, TokenSchema};
use crate::scoring::{collection_entropy, InformationScorer};
use crate::serialization::{self, JsonRankWriter, RankWriter};
use crate::token::{
    AttributeStatistic, RankedToken, RawToken, TokenAttribute, TokenId, TokenStatistic, TokenType,
};
use crate::validate::{StandardValidator, SupplyDescriptor, TokenValidator};

const RANK_METHOD: &str = "rank_collection";

/// Every view derived by a pipeline run.
#[derive(Debug, Clone)]
pub struct RankedArtifacts {
    /// Canonical attribute schema.
    pub schema: TokenSchema,
    /// Schema-filled, binned long-form attribute rows.
    pub token_attributes: Vec<TokenAttribute>,
    /// Scored statistic per `(name, value)` group.
    pub attribute_statistics: Vec<AttributeStatistic>,
    /// Statistics joined onto every token attribute row.
    pub token_statistics: Vec<TokenStatistic>,
    /// Ranked tokens, rarest first.
    pub ranks: Vec<RankedToken>,
    /// Entropy of the collection in bits.
    pub collection_entropy: f64,
    /// Timing and row counts per stage.
    pub metrics: PipelineMetrics,
}

#[derive(Debug, Clone)]
enum PipelineState {
    Validated,
    Ranked(Box<RankedArtifacts>),
}

/// Validated token collection.
///
/// Derived views become readable together once [`TokenCollection::rank_collection`] has run;
/// before that every accessor returns [`RarityError::NotReady`].
#[derive(Debug, Clone)]
pub struct TokenCollection {
    token_type: TokenType,
    tokens: BTreeMap<TokenId, RawToken>,
    supply: SupplyDescriptor,
    config: RankingConfig,
    state: PipelineState,
}

impl TokenCollection {
    /// Validates `tokens` with the [`StandardValidator`] and builds a collection.
    pub fn new<I>(token_type: TokenType, tokens: I, config: RankingConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (TokenId, RawToken)>,
    {
        let validator = StandardValidator::new(config.validation);
        Self::with_validator(token_type, tokens, config, &validator)
    }

    /// Builds a collection using a caller-supplied validation collaborator.
    pub fn with_validator<I, V>(
        token_type: TokenType,
        tokens: I,
        config: RankingConfig,
        validator: &V,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (TokenId, RawToken)>,
        V: TokenValidator + ?Sized,
    {
        config.validate()?;
        let validated = validator.validate(token_type, tokens.into_iter().collect())?;
        debug!(
            "validated {} {token_type} tokens with total supply {}",
            validated.tokens.len(),
            validated.supply.total()
        );
        Ok(Self {
            token_type,
            tokens: validated.tokens,
            supply: validated.supply,
            config,
            state: PipelineState::Validated,
        })
    }

    /// Token standard of the collection.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// Validated raw tokens ordered by id.
    #[must_use]
    pub fn tokens(&self) -> &BTreeMap<TokenId, RawToken> {
        &self.tokens
    }

    /// Supply weighting of the collection.
    #[must_use]
    pub fn supply(&self) -> &SupplyDescriptor {
        &self.supply
    }

    /// Total supply: the token count, or the summed variant supplies for semi-fungible tokens.
    #[must_use]
    pub fn total_supply(&self) -> u64 {
        self.supply.total()
    }

    /// Configuration the collection ranks with.
    #[must_use]
    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Returns `true` once the pipeline has run.
    #[must_use]
    pub fn is_ranked(&self) -> bool {
        matches!(self.state, PipelineState::Ranked(_))
    }

    /// Runs the full pipeline once and returns the ranks.
    ///
    /// Results are cached; later calls return the cached ranks unchanged. On error nothing is
    /// cached and the collection stays unranked.
    pub fn rank_collection(&mut self) -> Result<&[RankedToken]> {
        if let PipelineState::Validated = self.state {
            let artifacts = run_pipeline(&self.tokens, &self.supply, &self.config)?;
            self.state = PipelineState::Ranked(Box::new(artifacts));
        }
        self.ranks()
    }

    /// All derived views of the ranked collection.
    pub fn artifacts(&self) -> Result<&RankedArtifacts> {
        match &self.state {
            PipelineState::Ranked(artifacts) => Ok(artifacts),
            PipelineState::Validated => Err(RarityError::NotReady {
                method: RANK_METHOD,
            }),
        }
    }

    /// Canonical attribute schema.
    pub fn schema(&self) -> Result<&TokenSchema> {
        Ok(&self.artifacts()?.schema)
    }

    /// Schema-filled long-form attribute rows.
    pub fn token_attributes(&self) -> Result<&[TokenAttribute]> {
        Ok(&self.artifacts()?.token_attributes)
    }

    /// Scored statistic per `(name, value)` group.
    pub fn attribute_statistics(&self) -> Result<&[AttributeStatistic]> {
        Ok(&self.artifacts()?.attribute_statistics)
    }

    /// Statistics joined onto token attribute rows.
    pub fn token_statistics(&self) -> Result<&[TokenStatistic]> {
        Ok(&self.artifacts()?.token_statistics)
    }

    /// Ranked tokens, rarest first.
    pub fn ranks(&self) -> Result<&[RankedToken]> {
        Ok(&self.artifacts()?.ranks)
    }

    /// Stage metrics of the pipeline run.
    pub fn metrics(&self) -> Result<&PipelineMetrics> {
        Ok(&self.artifacts()?.metrics)
    }

    /// Hands the ranks to an output collaborator.
    pub fn write_ranks<W, P>(&self, writer: &W, path: P) -> Result<()>
    where
        W: RankWriter + ?Sized,
        P: AsRef<Path>,
    {
        writer.write_ranks(self.ranks()?, path.as_ref())
    }

    /// Persists the ranks as pretty-printed JSON.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_ranks(&JsonRankWriter::new(true), path)
    }

    /// Hex SHA-256 over the raw tokens followed by the ranks.
    pub fn checksum(&self) -> Result<String> {
        serialization::checksum(&self.tokens, self.ranks()?)
    }
}

impl fmt::Display for TokenCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Collection({})", self.token_type)
    }
}

/// Runs every pipeline stage over validated tokens.
///
/// Pure function of its inputs: identical tokens, supply, and configuration yield identical
/// artifacts (metrics timings aside).
pub fn run_pipeline(
    tokens: &BTreeMap<TokenId, RawToken>,
    supply: &SupplyDescriptor,
    config: &RankingConfig,
) -> Result<RankedArtifacts> {
    let pipeline_start = Instant::now();
    let mut metrics = PipelineMetrics::new();

    let started = Instant::now();
    let (schema, mut token_attributes) = SchemaBuilder::build(tokens)?;
    metrics.record(PipelineStage::Schema, token_attributes.len(), started);
    debug!(
        "flattened {} tokens into {} rows over {} attributes",
        tokens.len(),
        token_attributes.len(),
        schema.len()
    );

    let started = Instant::now();
    let binned = apply_binning(&mut token_attributes, &config.binning);
    metrics.record(PipelineStage::Binning, binned, started);
    debug!("binned {binned} numeric rows with {:?}", config.binning);

    let started = Instant::now();
    let counts = AttributeAggregator::aggregate(&token_attributes, supply)?;
    metrics.record(PipelineStage::Aggregation, counts.len(), started);
    debug!("aggregated {} attribute value groups", counts.len());

    let started = Instant::now();
    let total_supply = supply.total();
    let attribute_statistics = InformationScorer::score(counts, total_supply)?;
    let entropy = collection_entropy(&attribute_statistics);
    metrics.record(PipelineStage::Scoring, attribute_statistics.len(), started);
    debug!("scored against total supply {total_supply}; collection entropy {entropy:.4} bits");

    let started = Instant::now();
    let token_statistics = TokenStatisticsMerger::merge(&token_attributes, &attribute_statistics)?;
    metrics.record(PipelineStage::Merge, token_statistics.len(), started);

    let started = Instant::now();
    let ranks = RarityRanker::new(config.tie_policy).rank(tokens.keys(), &token_statistics, entropy);
    metrics.record(PipelineStage::Ranking, ranks.len(), started);

    metrics.total_duration = pipeline_start.elapsed();
    if config.show_progress {
        info!(
            "ranked {} tokens over {} attributes ({} value groups) in {:.2?}",
            ranks.len(),
            schema.len(),
            attribute_statistics.len(),
            metrics.total_duration
        );
    }

    Ok(RankedArtifacts {
        schema,
        token_attributes,
        attribute_statistics,
        token_statistics,
        ranks,
        collection_entropy: entropy,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MetadataAttribute;
    use crate::validate::ValidatedTokens;
    use tempfile::tempdir;

    fn colours() -> Vec<(TokenId, RawToken)> {
        [(1u64, "red"), (2, "red"), (3, "blue")]
            .into_iter()
            .map(|(id, colour)| {
                (
                    TokenId::from(id),
                    RawToken::new([MetadataAttribute::new("color", colour)]),
                )
            })
            .collect()
    }

    fn collection() -> TokenCollection {
        TokenCollection::new(TokenType::NonFungible, colours(), RankingConfig::default())
            .expect("valid collection")
    }

    #[test]
    fn views_are_not_ready_before_ranking() {
        let collection = collection();
        assert!(!collection.is_ranked());
        for err in [
            collection.ranks().map(|_| ()).expect_err("ranks not ready"),
            collection
                .attribute_statistics()
                .map(|_| ())
                .expect_err("attribute statistics not ready"),
            collection
                .token_statistics()
                .map(|_| ())
                .expect_err("token statistics not ready"),
            collection.checksum().map(|_| ()).expect_err("checksum needs ranks"),
        ] {
            assert!(matches!(err, RarityError::NotReady { method: "rank_collection" }));
        }
        assert_eq!(collection.total_supply(), 3);
    }

    #[test]
    fn ranking_populates_every_view() {
        let mut collection = collection();
        let ranks = collection.rank_collection().expect("ranks").to_vec();
        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks[0].token_id, TokenId::from(3));
        assert_eq!(collection.attribute_statistics().expect("ready").len(), 2);
        assert_eq!(collection.token_statistics().expect("ready").len(), 3);
        assert_eq!(collection.schema().expect("ready").len(), 1);
        assert_eq!(collection.metrics().expect("ready").stages.len(), 6);
    }

    #[test]
    fn ranking_twice_returns_identical_ranks() {
        let mut collection = collection();
        let first = collection.rank_collection().expect("ranks").to_vec();
        let second = collection.rank_collection().expect("ranks").to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn display_names_token_type() {
        assert_eq!(collection().to_string(), "Collection(non-fungible)");
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = RankingConfig {
            binning: crate::binning::NumericBinning::EqualFrequency { bins: 0 },
            ..RankingConfig::default()
        };
        let err = TokenCollection::new(TokenType::NonFungible, colours(), config)
            .expect_err("zero bins");
        assert!(matches!(err, RarityError::InvalidConfig(_)));
    }

    #[test]
    fn custom_validator_is_consulted() {
        struct RejectAll;
        impl TokenValidator for RejectAll {
            fn validate(
                &self,
                _token_type: TokenType,
                _tokens: Vec<(TokenId, RawToken)>,
            ) -> Result<ValidatedTokens> {
                Err(RarityError::Validation("rejected by policy".into()))
            }
        }

        let err = TokenCollection::with_validator(
            TokenType::NonFungible,
            colours(),
            RankingConfig::default(),
            &RejectAll,
        )
        .expect_err("validator rejects");
        assert!(err.to_string().contains("rejected by policy"));
    }

    #[test]
    fn to_json_writes_only_ranks() {
        let mut collection = collection();
        collection.rank_collection().expect("ranks");
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ranks.json");
        collection.to_json(&path).expect("write ranks");

        let written: Vec<RankedToken> =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read ranks"))
                .expect("ranks parse");
        assert_eq!(written, collection.ranks().expect("ready"));
    }

    #[test]
    fn checksum_is_stable() {
        let mut first = collection();
        let mut second = collection();
        first.rank_collection().expect("ranks");
        second.rank_collection().expect("ranks");
        let checksum = first.checksum().expect("checksum");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, second.checksum().expect("checksum"));
    }
}
