//! Information-content rarity ranking for token collections.
//!
//! The crate exposes both a library API and a `rarank` command line interface for
//! ranking collections of tokens whose attribute sets vary from token to token.
//! Raw tokens are validated into a [`TokenCollection`], flattened against a
//! canonical schema (missing attributes become an explicit null value), scored by
//! surprisal (`-log2 p`) per attribute value, and reduced into a rank per token.
//!
//! ```no_run
//! use rarity_rank::serialization::load_tokens;
//! use rarity_rank::{RankingConfig, TokenCollection, TokenType};
//!
//! # fn main() -> rarity_rank::Result<()> {
//! let config = RankingConfig::builder()
//!     .show_progress(false)
//!     .build()?;
//! let tokens = load_tokens("/path/to/tokens.json")?;
//! let mut collection = TokenCollection::new(TokenType::NonFungible, tokens, config)?;
//! for token in collection.rank_collection()? {
//!     println!("{} -> {}", token.token_id, token.rank);
//! }
//! collection.to_json("ranks.json")?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Users targeting the
//! library portion only can disable default features to avoid the CLI
//! dependencies: `rarity-rank = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions,
    clippy::cast_precision_loss
)]

pub mod aggregate;
pub mod binning;
pub mod collection;
pub mod config;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod rank;
pub mod schema;
pub mod scoring;
pub mod serialization;
pub mod token;
pub mod validate;

pub use aggregate::AttributeAggregator;
pub use binning::{apply_binning, BinningStrategy, NumericBinning};
pub use collection::{run_pipeline, RankedArtifacts, TokenCollection};
pub use config::{RankingBuilder, RankingConfig, ValidationConfig};
pub use error::{RarityError, Result};
pub use merge::TokenStatisticsMerger;
pub use metrics::{PipelineMetrics, PipelineStage, StageMetrics};
pub use rank::{RankTiePolicy, RarityRanker};
pub use schema::{SchemaBuilder, TokenSchema};
pub use scoring::InformationScorer;
pub use serialization::{JsonRankWriter, RankWriter};
pub use token::{
    AttributeCount, AttributeStatistic, AttributeValue, BinRange, DisplayType, GroupValue,
    MetadataAttribute, RankedToken, RawToken, TokenAttribute, TokenId, TokenStatistic, TokenType,
};
pub use validate::{StandardValidator, SupplyDescriptor, TokenValidator, ValidatedTokens};
