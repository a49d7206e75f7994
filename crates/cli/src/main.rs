use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use inat_history::{LastMention, LastMentionTracker, LinkRecognizers, DEFAULT_HISTORY_LIMIT};
use inat_protocol::{HistoryMessage, Observation, PlaceId, Rank, Taxon};
use inat_query::CompoundQuery;
use inat_search::{
    fetch_ancestor, Relatedness, ResolveContext, ResolveOptions, StaticTaxonomy, TaxonResolver,
};
use serde::Serialize;
use std::env;
use std::path::PathBuf;

mod fixtures;

use fixtures::FileHistory;

#[derive(Parser)]
#[command(name = "inat-query")]
#[command(about = "Resolve natural-language iNaturalist taxon queries", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Link pattern config, JSON or TOML (overrides INAT_LINKS_CONFIG)
    #[arg(long, global = true)]
    links: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a query into clause buckets and rank filters
    Parse {
        query: String,
    },

    /// Resolve a query to a single taxon
    Taxon(TaxonArgs),

    /// Resolve a query, then show its ancestor at a rank
    Ancestor(AncestorArgs),

    /// Resolve a comma-separated list and group it by relatedness
    Related {
        #[arg(long)]
        taxa: PathBuf,

        list: String,
    },

    /// Find the most recent observation or taxon link in a channel history
    Last(LastArgs),

    /// Print the JSON schema of a fixture file
    Schema {
        #[arg(value_enum)]
        fixture: FixtureKind,
    },

    /// Show the links and inline `.taxon.` mention recognized in a message
    Mention {
        /// Accept a bare number as an observation id
        #[arg(long)]
        allow_bare_id: bool,

        text: String,
    },
}

#[derive(Args)]
struct TaxonArgs {
    /// JSON array of taxa, in search relevance order
    #[arg(long)]
    taxa: PathBuf,

    /// Place for establishment means
    #[arg(long)]
    place_id: Option<PlaceId>,

    /// Report ties instead of picking by relevance
    #[arg(long)]
    strict: bool,

    /// Only accept species
    #[arg(long)]
    species: bool,

    query: String,
}

#[derive(Args)]
struct AncestorArgs {
    #[arg(long)]
    taxa: PathBuf,

    /// Rank keyword, e.g. `family` or `fam`
    #[arg(long)]
    rank: String,

    query: String,
}

#[derive(Args)]
struct LastArgs {
    #[arg(long)]
    taxa: PathBuf,

    #[arg(long)]
    observations: Option<PathBuf>,

    /// JSON array of messages, newest first
    #[arg(long)]
    history: PathBuf,

    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,

    #[arg(value_enum)]
    kind: MentionKind,

    /// Show this ancestor of the mentioned taxon instead of the mention
    #[arg(long)]
    rank: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MentionKind {
    #[value(alias = "observation")]
    Obs,
    #[value(alias = "t")]
    Taxon,
}

impl MentionKind {
    fn label(self) -> &'static str {
        match self {
            MentionKind::Obs => "observation",
            MentionKind::Taxon => "taxon",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FixtureKind {
    Taxa,
    Observations,
    History,
}

#[derive(Serialize)]
struct MentionOutput {
    observation: Option<inat_history::LinkMatch>,
    taxon: Option<inat_history::LinkMatch>,
    dot_taxon: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let links = load_links(cli.links.clone())?;

    match cli.command {
        Commands::Parse { query } => {
            let parsed = CompoundQuery::parse(&query)?;
            print_json(&parsed)?;
        }
        Commands::Taxon(args) => run_taxon(args).await?,
        Commands::Ancestor(args) => run_ancestor(args).await?,
        Commands::Related { taxa, list } => {
            let taxonomy = StaticTaxonomy::new(fixtures::load_taxa(&taxa)?);
            let resolved = TaxonResolver::new(&taxonomy)
                .resolve_many(&list, &ResolveContext::default())
                .await?;
            print_json(&Relatedness::compute(resolved))?;
        }
        Commands::Last(args) => run_last(args, links).await?,
        Commands::Schema { fixture } => {
            let schema = match fixture {
                FixtureKind::Taxa => schemars::schema_for!(Vec<Taxon>),
                FixtureKind::Observations => schemars::schema_for!(Vec<Observation>),
                FixtureKind::History => schemars::schema_for!(Vec<HistoryMessage>),
            };
            print_json(&schema)?;
        }
        Commands::Mention {
            allow_bare_id,
            text,
        } => {
            print_json(&MentionOutput {
                observation: links.match_observation(&text, allow_bare_id),
                taxon: links.find_taxon(&text),
                dot_taxon: links.dot_taxon_query(&text),
            })?;
        }
    }

    Ok(())
}

fn load_links(flag: Option<PathBuf>) -> Result<LinkRecognizers> {
    let path = flag.or_else(|| env::var_os("INAT_LINKS_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => LinkRecognizers::from_file(&path)
            .with_context(|| format!("Invalid link config {}", path.display())),
        None => Ok(LinkRecognizers::default()),
    }
}

fn parse_rank(keyword: &str) -> Result<Rank> {
    Rank::from_keyword(keyword).ok_or_else(|| anyhow!("Unknown rank `{keyword}`"))
}

async fn run_taxon(args: TaxonArgs) -> Result<()> {
    let taxonomy = StaticTaxonomy::new(fixtures::load_taxa(&args.taxa)?);
    let resolver = TaxonResolver::new(&taxonomy).with_options(ResolveOptions {
        auto_pick: !args.strict,
        ..ResolveOptions::default()
    });

    let mut query = CompoundQuery::parse(&args.query)?;
    if args.species {
        query = query.with_rank(Rank::Species);
    }
    let context = ResolveContext {
        place_id: args.place_id,
    };
    let resolved = resolver.resolve(&query, &context).await?;
    print_json(&resolved)
}

async fn run_ancestor(args: AncestorArgs) -> Result<()> {
    let rank = parse_rank(&args.rank)?;
    let taxonomy = StaticTaxonomy::new(fixtures::load_taxa(&args.taxa)?);
    let resolved = TaxonResolver::new(&taxonomy)
        .resolve_text(&args.query, &ResolveContext::default())
        .await?;
    let ancestor = fetch_ancestor(&taxonomy, &resolved.taxon, rank, None).await?;
    print_json(&ancestor)
}

async fn run_last(args: LastArgs, links: LinkRecognizers) -> Result<()> {
    let rank = args.rank.as_deref().map(parse_rank).transpose()?;
    let observations = match &args.observations {
        Some(path) => fixtures::load_observations(path)?,
        None => Vec::new(),
    };
    let taxonomy =
        StaticTaxonomy::new(fixtures::load_taxa(&args.taxa)?).with_observations(observations);
    let history = FileHistory::open(&args.history)?;
    let tracker = LastMentionTracker::new(links);

    let mention = match args.kind {
        MentionKind::Obs => {
            tracker
                .last_observation_in(&history, args.history_limit, &taxonomy)
                .await?
        }
        MentionKind::Taxon => {
            tracker
                .last_taxon_in(&history, args.history_limit, &taxonomy)
                .await?
        }
    };
    let Some(mention) = mention else {
        bail!("No {} link in the last {} messages", args.kind.label(), args.history_limit);
    };

    match rank {
        None => print_json(&mention),
        Some(rank) => {
            let taxon = mention_taxon(&mention, args.kind)?;
            let ancestor = fetch_ancestor(&taxonomy, taxon, rank, None)
                .await
                .with_context(|| format!("The last {} has no {rank} ancestor", args.kind.label()))?;
            print_json(&ancestor)
        }
    }
}

fn mention_taxon(mention: &LastMention, kind: MentionKind) -> Result<&Taxon> {
    mention
        .taxon()
        .ok_or_else(|| anyhow!("The last {} has no taxon", kind.label()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
