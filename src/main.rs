use lookalike::cli::{Cli, Commands, ConfigAction};
use lookalike::config::{Config, ConfigValidator};
use lookalike::embedding::{EmbeddingProvider, FastEmbedProvider};
use lookalike::error::{LookalikeError, Result};
use lookalike::persist::SnapshotStore;
use lookalike::search::{SearchEngine, SearchError};
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Add {
            id,
            image,
            title,
            description,
        } => {
            cmd_add(cli.config, &id, &image, &title, &description).await?;
        }
        Commands::Search {
            text,
            image,
            limit,
            text_weight,
            json,
        } => {
            cmd_search(cli.config, text, image, limit, text_weight, json).await?;
        }
        Commands::Stats { json } => {
            cmd_stats(cli.config, json).await?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lookalike=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Construct the engine for the configured data dir and restore its snapshot
async fn open_engine(config: &Config) -> Result<SearchEngine> {
    let snapshot_dir = config.storage.data_dir.join("snapshot");
    let store = SnapshotStore::new(snapshot_dir);
    let engine = SearchEngine::new(store, config.engine.lock_timeout());
    engine.load().await?;
    Ok(engine)
}

fn open_provider(config: &Config) -> Result<FastEmbedProvider> {
    Ok(FastEmbedProvider::new(
        &config.embedding.text_model,
        &config.embedding.image_model,
    )?)
}

async fn cmd_add(
    config_path: Option<PathBuf>,
    id: &str,
    image: &Path,
    title: &str,
    description: &str,
) -> Result<()> {
    let config = Config::load_or_default(config_path.as_deref())?;
    let engine = open_engine(&config).await?;
    let provider = open_provider(&config)?;

    // Encoding runs before the engine lock is touched.
    let image_vector = provider.embed_image(image)?;
    let text = if description.is_empty() {
        title.to_string()
    } else {
        format!("{} {}", title, description)
    };
    let text_vector = provider.embed_text(&text)?;

    let slot = engine
        .add_product(
            id,
            &image_vector,
            &text_vector,
            title,
            description,
            &image.display().to_string(),
        )
        .await?;
    engine.save().await?;

    println!("Indexed product '{}' at slot {}", id, slot);
    Ok(())
}

async fn cmd_search(
    config_path: Option<PathBuf>,
    text: Option<String>,
    image: Option<PathBuf>,
    limit: Option<usize>,
    text_weight: Option<f32>,
    json: bool,
) -> Result<()> {
    if text.is_none() && image.is_none() {
        return Err(LookalikeError::Search(SearchError::InvalidQuery(
            "Provide at least one of --text or --image".to_string(),
        )));
    }

    let config = Config::load_or_default(config_path.as_deref())?;
    let engine = open_engine(&config).await?;
    let provider = open_provider(&config)?;

    let limit = limit.unwrap_or(config.search.default_limit);
    let text_weight = text_weight.unwrap_or(config.search.default_text_weight);

    let text_vector = text.as_deref().map(|t| provider.embed_text(t)).transpose()?;
    let image_vector = image
        .as_deref()
        .map(|p| provider.embed_image(p))
        .transpose()?;

    let hits = engine
        .hybrid_search(
            text_vector.as_deref(),
            image_vector.as_deref(),
            limit,
            text_weight,
        )
        .await
        .map_err(LookalikeError::from)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&hits).map_err(|e| LookalikeError::Json {
                source: e,
                context: "Failed to serialize search results".to_string(),
            })?
        );
    } else if hits.is_empty() {
        println!("No matching products.");
    } else {
        for (rank, hit) in hits.iter().enumerate() {
            println!(
                "{:>3}. [{:.4}] {} - {} (text {:.4}, image {:.4})",
                rank + 1,
                hit.hybrid_score,
                hit.product_id,
                hit.title,
                hit.text_component,
                hit.image_component
            );
        }
    }

    Ok(())
}

async fn cmd_stats(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = Config::load_or_default(config_path.as_deref())?;
    let engine = open_engine(&config).await?;
    let stats = engine.stats().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).map_err(|e| LookalikeError::Json {
                source: e,
                context: "Failed to serialize stats".to_string(),
            })?
        );
    } else {
        println!("Indexed products: {}", stats.products);
        match stats.image_dimension {
            Some(d) => println!("Image index dimension: {}", d),
            None => println!("Image index dimension: (no vectors yet)"),
        }
        match stats.text_dimension {
            Some(d) => println!("Text index dimension: {}", d),
            None => println!("Text index dimension: (no vectors yet)"),
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    let path = match &config_path {
        Some(p) => p.clone(),
        None => Config::default_path()?,
    };

    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(LookalikeError::Config(format!(
                    "Config already exists at {:?} (use --force to overwrite)",
                    path
                )));
            }
            let config = Config::default();
            config.save(&path)?;
            println!("Wrote default configuration to {:?}", path);
        }
        ConfigAction::Show => {
            let config = Config::load_or_default(config_path.as_deref())?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Validate => {
            let config = Config::load(&path)?;
            ConfigValidator::validate(&config)?;
            println!("Configuration at {:?} is valid", path);
        }
    }

    Ok(())
}
