use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;
use rarity_rank::binning::DEFAULT_BIN_COUNT;
use rarity_rank::serialization::{load_tokens, JsonRankWriter};
use rarity_rank::{
    DisplayType, NumericBinning, RankTiePolicy, RankingConfig, SchemaBuilder, TokenCollection,
    TokenType,
};
use rayon::ThreadPoolBuilder;
use serde_json::json;

const DEFAULT_OUTPUT: &str = "ranks.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Token collection rarity ranking", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank a collection and write the rank table
    Rank(RankArgs),
    /// Print the canonical attribute schema of a collection
    Schema(SchemaArgs),
    /// Rank a collection and print its content checksum
    Checksum(ChecksumArgs),
}

#[derive(Args, Debug)]
struct CollectionArgs {
    /// Token JSON file (object keyed by id, or array of records)
    input: PathBuf,

    /// Token standard of the collection
    #[arg(long, value_enum, default_value_t = TokenTypeArg::NonFungible)]
    token_type: TokenTypeArg,

    /// Keep the first of repeated attribute names instead of rejecting the token
    #[arg(long)]
    allow_duplicate_names: bool,

    /// Reject tokens that declare no attributes
    #[arg(long)]
    deny_empty_tokens: bool,
}

#[derive(Args, Debug)]
struct RankingArgs {
    /// Numeric attribute binning strategy
    #[arg(long, value_enum, default_value_t = BinningArg::EqualFrequency)]
    binning: BinningArg,

    /// Bin count for equal-width and equal-frequency binning
    #[arg(long, value_name = "N", default_value_t = DEFAULT_BIN_COUNT)]
    bins: usize,

    /// Rank numbering for tied tokens
    #[arg(long, value_enum, default_value_t = TiePolicyArg::Dense)]
    tie_policy: TiePolicyArg,

    /// Limit Rayon worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct RankArgs {
    #[command(flatten)]
    collection: CollectionArgs,

    #[command(flatten)]
    ranking: RankingArgs,

    /// Output path for the rank table
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,

    /// Disable pipeline summary logging
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    #[command(flatten)]
    collection: CollectionArgs,

    /// Emit machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ChecksumArgs {
    #[command(flatten)]
    collection: CollectionArgs,

    #[command(flatten)]
    ranking: RankingArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TokenTypeArg {
    NonFungible,
    SemiFungible,
}

impl From<TokenTypeArg> for TokenType {
    fn from(arg: TokenTypeArg) -> Self {
        match arg {
            TokenTypeArg::NonFungible => TokenType::NonFungible,
            TokenTypeArg::SemiFungible => TokenType::SemiFungible,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BinningArg {
    Distinct,
    EqualWidth,
    EqualFrequency,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TiePolicyArg {
    Dense,
    Sequential,
}

impl From<TiePolicyArg> for RankTiePolicy {
    fn from(arg: TiePolicyArg) -> Self {
        match arg {
            TiePolicyArg::Dense => RankTiePolicy::Dense,
            TiePolicyArg::Sequential => RankTiePolicy::Sequential,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Rank(args) => run_rank(args),
        Commands::Schema(args) => run_schema(args),
        Commands::Checksum(args) => run_checksum(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn configure_threads(threads: Option<usize>) -> Result<()> {
    if let Some(threads) = threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }
    Ok(())
}

fn build_config(
    collection: &CollectionArgs,
    ranking: Option<&RankingArgs>,
    show_progress: bool,
) -> Result<RankingConfig> {
    let mut builder = RankingConfig::builder()
        .allow_duplicate_names(collection.allow_duplicate_names)
        .allow_empty_tokens(!collection.deny_empty_tokens)
        .show_progress(show_progress);
    if let Some(ranking) = ranking {
        let binning = match ranking.binning {
            BinningArg::Distinct => NumericBinning::Distinct,
            BinningArg::EqualWidth => NumericBinning::EqualWidth { bins: ranking.bins },
            BinningArg::EqualFrequency => NumericBinning::EqualFrequency { bins: ranking.bins },
        };
        builder = builder
            .binning(binning)
            .tie_policy(ranking.tie_policy.into());
    }
    builder.build().context("invalid ranking configuration")
}

fn load_collection(args: &CollectionArgs, config: RankingConfig) -> Result<TokenCollection> {
    let tokens = load_tokens(&args.input)
        .with_context(|| format!("failed to load tokens from {}", args.input.display()))?;
    TokenCollection::new(args.token_type.into(), tokens, config)
        .with_context(|| format!("{} is not a valid collection", args.input.display()))
}

fn run_rank(args: RankArgs) -> Result<()> {
    configure_threads(args.ranking.threads)?;
    let config = build_config(&args.collection, Some(&args.ranking), !args.no_progress)?;
    let mut collection = load_collection(&args.collection, config)?;

    let ranks = collection.rank_collection().context("ranking failed")?;
    let rarest = ranks.first().map(|token| token.token_id.to_string());
    let count = ranks.len();

    collection
        .write_ranks(&JsonRankWriter::new(args.pretty), &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        "{collection}: wrote {count} ranks to {} (rarest: {})",
        args.output.display(),
        rarest.as_deref().unwrap_or("none")
    );
    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<()> {
    let config = build_config(&args.collection, None, false)?;
    let collection = load_collection(&args.collection, config)?;
    let (schema, _) =
        SchemaBuilder::build(collection.tokens()).context("failed to derive schema")?;

    if args.json {
        let summary = json!({
            "path": args.collection.input.display().to_string(),
            "token_type": collection.token_type(),
            "tokens": collection.tokens().len(),
            "total_supply": collection.total_supply(),
            "attributes": schema,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Token type  : {}", collection.token_type());
        println!("Tokens      : {}", collection.tokens().len());
        println!("Total supply: {}", collection.total_supply());
        if schema.is_empty() {
            println!("Attributes  : (none)");
        }
        for (name, attribute) in schema.iter() {
            let display_type = attribute
                .display_type
                .map_or("string", DisplayType::as_str);
            println!(
                "{name}: {display_type} ({} tokens, {} values)",
                attribute.token_count, attribute.value_count
            );
        }
    }

    Ok(())
}

fn run_checksum(args: ChecksumArgs) -> Result<()> {
    configure_threads(args.ranking.threads)?;
    let config = build_config(&args.collection, Some(&args.ranking), false)?;
    let mut collection = load_collection(&args.collection, config)?;
    collection.rank_collection().context("ranking failed")?;
    let digest = collection
        .checksum()
        .context("failed to compute checksum")?;
    println!("{digest}");
    Ok(())
}
