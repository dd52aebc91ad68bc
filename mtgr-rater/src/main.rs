//! mtgr-rater - command-line card rater
//!
//! Loads a collection from the ratings backend and the card API, then lists,
//! shows, rates, clears or exports cards.
//!
//! ```bash
//! mtgr-rater collections
//! mtgr-rater browse --collection otj --exclude-rarity common
//! mtgr-rater rate --collection otj --card otj/12 --format limited --rating 4
//! mtgr-rater export --collection otj --out .
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use mtgr_common::config::TomlConfig;
use mtgr_common::events::EventBus;
use mtgr_common::{CardIdentity, Color, FilterConfig, Rarity, RatingValue};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mtgr_rater::config::{Overrides, RaterConfig};
use mtgr_rater::{build_session, RaterSession};

/// Command-line arguments for mtgr-rater
#[derive(Parser, Debug)]
#[command(name = "mtgr-rater")]
#[command(about = "Rate trading cards per format and browse rating distributions")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/mtgr/config.toml)
    #[arg(long, env = "MTGR_CONFIG")]
    config: Option<PathBuf>,

    /// Data folder holding the local rating cache
    #[arg(long, env = "MTGR_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Ratings backend base URL
    #[arg(long, env = "MTGR_BACKEND_URL")]
    backend_url: Option<String>,

    /// Card API base URL
    #[arg(long, env = "MTGR_SCRYFALL_URL")]
    scryfall_url: Option<String>,

    /// Card art language ("en", "ja", ...)
    #[arg(long)]
    language: Option<String>,

    /// Order cards by the collection's set order
    #[arg(long)]
    apply_set_order: bool,

    #[command(subcommand)]
    command: Command,
}

/// Collection selection plus filter
#[derive(ClapArgs, Debug, Clone)]
struct ViewArgs {
    /// Collection id (default: the backend's latest)
    #[arg(short, long)]
    collection: Option<String>,

    /// Hide a rarity (repeatable): common, uncommon, rare, mythic
    #[arg(long = "exclude-rarity", value_name = "RARITY")]
    exclude_rarity: Vec<Rarity>,

    /// Hide a color (repeatable): white, blue, black, red, green, colorless
    #[arg(long = "exclude-color", value_name = "COLOR")]
    exclude_color: Vec<Color>,
}

impl ViewArgs {
    fn filter(&self) -> FilterConfig {
        FilterConfig::excluding(&self.exclude_rarity, &self.exclude_color)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available collections and formats
    Collections,

    /// Show one card with its rating distributions
    Show {
        #[command(flatten)]
        view: ViewArgs,

        /// Position in the filtered view
        #[arg(short, long, default_value = "0")]
        index: usize,
    },

    /// Rate a card in one format
    Rate {
        #[arg(short, long)]
        collection: Option<String>,

        /// Card as <set>/<collector number>, e.g. otj/12
        #[arg(long, value_parser = parse_card)]
        card: CardIdentity,

        #[arg(short, long)]
        format: String,

        /// 1 to 5
        #[arg(short, long)]
        rating: RatingValue,
    },

    /// Forget your rating for a card in one format (counts are kept)
    Clear {
        #[arg(short, long)]
        collection: Option<String>,

        #[arg(long, value_parser = parse_card)]
        card: CardIdentity,

        #[arg(short, long)]
        format: String,
    },

    /// Write your ratings for the filtered view as CSV
    Export {
        #[command(flatten)]
        view: ViewArgs,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// List the filtered view grouped by set
    Browse {
        #[command(flatten)]
        view: ViewArgs,
    },
}

fn parse_card(value: &str) -> std::result::Result<CardIdentity, String> {
    match value.split_once('/') {
        Some((set, number)) if !set.is_empty() && !number.is_empty() => {
            Ok(CardIdentity::new(set.to_lowercase(), number))
        }
        _ => Err(format!("expected <set>/<number>, got '{}'", value)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    let default_filter = format!(
        "mtgr_rater={level},mtgr_common={level}",
        level = toml.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting mtgr-rater v{}", env!("CARGO_PKG_VERSION"));

    let config = RaterConfig::resolve(
        &toml,
        Overrides {
            root_folder: args.root_folder,
            backend_url: args.backend_url,
            scryfall_url: args.scryfall_url,
            language: args.language,
            apply_set_order: args.apply_set_order,
        },
    );

    let events = EventBus::new(256);
    let mut session = build_session(&config, events).context("Failed to initialize session")?;

    match args.command {
        Command::Collections => list_collections(&mut session).await,
        Command::Show { view, index } => show(&mut session, &view, index).await,
        Command::Rate {
            collection,
            card,
            format,
            rating,
        } => rate(&mut session, collection.as_deref(), card, &format, rating).await,
        Command::Clear {
            collection,
            card,
            format,
        } => clear(&mut session, collection.as_deref(), &card, &format).await,
        Command::Export { view, out } => export(&mut session, &view, &out).await,
        Command::Browse { view } => browse(&mut session, &view).await,
    }
}

async fn open(session: &mut RaterSession, collection: Option<&str>, filter: FilterConfig) -> Result<()> {
    session
        .load(collection)
        .await
        .context("Failed to load collection")?;
    session.apply_filter(filter).context("Failed to apply filter")?;
    Ok(())
}

async fn list_collections(session: &mut RaterSession) -> Result<()> {
    let collections = session
        .collections()
        .await
        .context("Failed to fetch collections")?;

    let mut ids: Vec<&String> = collections.entries.keys().collect();
    ids.sort();
    for id in ids {
        let entry = &collections.entries[id];
        let latest = if *id == collections.latest { " (latest)" } else { "" };
        let releasing = if entry.releasing { " [releasing]" } else { "" };
        println!("{:<16} {}{}{}", id, entry.title, latest, releasing);
    }
    println!("formats: {}", collections.formats.join(", "));
    Ok(())
}

async fn show(session: &mut RaterSession, view: &ViewArgs, index: usize) -> Result<()> {
    open(session, view.collection.as_deref(), view.filter()).await?;

    let engine = session
        .engine_mut()
        .ok_or_else(|| anyhow!("No cards match the filter"))?;
    engine.go_to(index)?;
    engine.settle().await;

    let displayed = engine
        .displayed()
        .cloned()
        .ok_or_else(|| anyhow!("Card art could not be resolved"))?;
    let entry = engine
        .view()
        .get(displayed.index)
        .cloned()
        .ok_or_else(|| anyhow!("Index {} not in view", displayed.index))?;

    println!(
        "[{}/{}] {} ({})",
        displayed.index + 1,
        engine.len(),
        entry.metadata.name,
        entry.identity
    );
    if let Some(type_line) = &entry.metadata.type_line {
        println!("  {}", type_line);
    }
    for (face, uri) in displayed.images.iter().enumerate() {
        let label = if face == 0 { "front" } else { "back" };
        println!("  {}: {}", label, uri);
    }

    let loaded = session
        .loaded()
        .ok_or_else(|| anyhow!("Collection not loaded"))?;
    for format in loaded.enabled_formats() {
        if let Some(aggregate) = loaded.ratings.aggregate(&entry.identity, &format.id) {
            let mine = aggregate
                .local_rating
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<12} {:?} total {} yours {}",
                format.id,
                aggregate.distribution(),
                aggregate.total(),
                mine
            );
        }
    }
    Ok(())
}

async fn rate(
    session: &mut RaterSession,
    collection: Option<&str>,
    card: CardIdentity,
    format: &str,
    rating: RatingValue,
) -> Result<()> {
    open(session, collection, FilterConfig::default()).await?;

    let handle = session.submit_for(card.clone(), format, rating)?;
    // Let the background write finish before the runtime shuts down
    handle.await.context("Rating write task failed")?;

    if let Some(aggregate) = session.aggregate(&card, format) {
        println!("{} {}: {:?}", card, format, aggregate.distribution());
    }
    Ok(())
}

async fn clear(
    session: &mut RaterSession,
    collection: Option<&str>,
    card: &CardIdentity,
    format: &str,
) -> Result<()> {
    open(session, collection, FilterConfig::default()).await?;

    if session.clear(card, format)? {
        println!("Cleared your {} rating for {}", format, card);
    } else {
        println!("No {} rating for {} to clear", format, card);
    }
    Ok(())
}

async fn export(session: &mut RaterSession, view: &ViewArgs, out: &std::path::Path) -> Result<()> {
    open(session, view.collection.as_deref(), view.filter()).await?;

    let path = session
        .write_export(out)
        .with_context(|| format!("Failed to write export to {}", out.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn browse(session: &mut RaterSession, view: &ViewArgs) -> Result<()> {
    open(session, view.collection.as_deref(), view.filter()).await?;

    let items = session.navigator_items();
    for segment in session.segments() {
        println!("{} ({} cards)", segment.header, segment.card_count());
        for item in &items[segment.start..=segment.end] {
            let rated = if item.rated { "*" } else { " " };
            let swatch = item.swatch.hex().unwrap_or("       ");
            println!("  {} {:>4} {} {}", rated, item.index, swatch, item.name);
        }
    }
    Ok(())
}
