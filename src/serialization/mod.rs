//! Loading raw collections and persisting rank tables.

pub mod json;

use std::path::Path;

use crate::error::Result;
use crate::token::RankedToken;

pub use json::{checksum, load_tokens, ranks_json, JsonRankWriter};

/// Output collaborator receiving the final rank table.
pub trait RankWriter {
    /// Persists `ranks` to `path`.
    fn write_ranks(&self, ranks: &[RankedToken], path: &Path) -> Result<()>;
}
