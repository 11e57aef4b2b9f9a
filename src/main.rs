//! wl-sync CLI: publish a site's content to the linked-data triple-store.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use wordlift_sync::client::{DryRunEndpoint, RedlinkClient, SparqlEndpoint};
use wordlift_sync::config::SyncConfig;
use wordlift_sync::entity::EntityDescriptor;
use wordlift_sync::paths::SyncPaths;
use wordlift_sync::snapshot::SiteSnapshot;
use wordlift_sync::store::{DurableStore, PostId, UserId};
use wordlift_sync::sync::{LifecycleEvent, SyncEngine, SyncReport};
use wordlift_sync::timeline::{Timeline, TimelineAttrs, shortcode_html};

#[derive(Parser)]
#[command(name = "wl-sync", version, about = "Sync site content to a linked-data triple-store")]
struct Cli {
    /// Config file (defaults to the XDG config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the local content store.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log updates instead of sending them.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the content store.
    Init {
        /// Account name on the triple-store service.
        #[arg(long)]
        user_id: String,

        /// Dataset receiving the triples.
        #[arg(long)]
        dataset_id: String,

        /// Application key for the update API.
        #[arg(long, default_value = "")]
        application_key: String,

        /// Public URL of the site, used for permalinks.
        #[arg(long)]
        site_url: Option<String>,

        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },

    /// Load users, posts and meta from a JSON snapshot.
    Import {
        /// Path to the snapshot file.
        #[arg(long)]
        file: PathBuf,
    },

    /// Sync a saved post, resolving its entity annotations.
    SavePost {
        post_id: PostId,

        /// JSON array of entity annotations (`id`, `label`, `type`, `description`).
        #[arg(long)]
        entities: Option<PathBuf>,

        /// Treat the save as an autosave (nothing is sent).
        #[arg(long)]
        autosave: bool,
    },

    /// Sync a saved entity.
    SaveEntity { entity_id: PostId },

    /// Sync a newly registered user.
    RegisterUser { user_id: UserId },

    /// Sync an updated user profile.
    UpdateProfile { user_id: UserId },

    /// Remove a deleted user from the triple-store.
    DeleteUser { user_id: UserId },

    /// Print the timeline JSON for a post.
    Timeline {
        post_id: PostId,

        /// Print the shortcode container markup instead.
        #[arg(long)]
        html: bool,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let paths = SyncPaths::resolve_with(cli.config.clone(), cli.data_dir)?;
    let config_file = cli.config.unwrap_or_else(|| paths.config_file());

    match cli.command {
        Commands::Init {
            user_id,
            dataset_id,
            application_key,
            site_url,
            force,
        } => {
            if config_file.exists() && !force {
                miette::bail!(
                    "{} already exists; pass --force to overwrite it",
                    config_file.display()
                );
            }
            let mut config = SyncConfig::new(&user_id, &dataset_id);
            config.application_key = application_key;
            if let Some(site_url) = site_url {
                config.site_url = site_url;
            }
            config.validate()?;
            paths.ensure_dirs()?;
            config.save(&config_file)?;
            DurableStore::open(&paths.store_dir())?;
            println!("Initialized wl-sync");
            println!("  config:  {}", config_file.display());
            println!("  store:   {}", paths.store_dir().display());
            println!("  dataset: {}", config.dataset_base_uri());
        }
        command => {
            let config = SyncConfig::load(&config_file)?;
            let store = Arc::new(DurableStore::open(&paths.store_dir())?);
            run(command, config, store, cli.dry_run)?;
        }
    }

    Ok(())
}

fn run(command: Commands, config: SyncConfig, store: Arc<DurableStore>, dry_run: bool) -> Result<()> {
    match command {
        Commands::Init { .. } => {}

        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            let summary = SiteSnapshot::from_json(&content)?.apply(&*store)?;
            println!("Imported {summary} from {}", file.display());
        }

        Commands::Timeline { post_id, html } => {
            if html {
                println!("{}", shortcode_html(post_id, &TimelineAttrs::default()));
            } else {
                let engine = build_engine(config, store, dry_run);
                let timeline = Timeline::new(engine.store(), engine.links());
                println!("{}", timeline.ajax_response(Some(post_id))?);
            }
        }

        Commands::SavePost {
            post_id,
            entities,
            autosave,
        } => {
            let annotations: Vec<EntityDescriptor> = match entities {
                Some(path) => {
                    let content = std::fs::read_to_string(&path).into_diagnostic()?;
                    serde_json::from_str(&content).into_diagnostic()?
                }
                None => Vec::new(),
            };
            let engine = build_engine(config, store, dry_run);
            report(engine.handle(LifecycleEvent::PostSaved {
                post_id,
                annotations,
                autosave,
            }))?;
        }

        Commands::SaveEntity { entity_id } => {
            let engine = build_engine(config, store, dry_run);
            report(engine.handle(LifecycleEvent::EntitySaved(entity_id)))?;
        }

        Commands::RegisterUser { user_id } => {
            let engine = build_engine(config, store, dry_run);
            report(engine.handle(LifecycleEvent::UserRegistered(user_id)))?;
        }

        Commands::UpdateProfile { user_id } => {
            let engine = build_engine(config, store, dry_run);
            report(engine.handle(LifecycleEvent::ProfileUpdated(user_id)))?;
        }

        Commands::DeleteUser { user_id } => {
            let engine = build_engine(config, store, dry_run);
            report(engine.handle(LifecycleEvent::UserDeleted(user_id)))?;
        }
    }
    Ok(())
}

fn build_engine(config: SyncConfig, store: Arc<DurableStore>, dry_run: bool) -> SyncEngine {
    let endpoint: Arc<dyn SparqlEndpoint> = if dry_run {
        Arc::new(DryRunEndpoint::new())
    } else {
        let client = RedlinkClient::new(&config);
        tracing::debug!(endpoint = client.endpoint_redacted(), "using remote endpoint");
        Arc::new(client)
    };
    SyncEngine::new(config, store, endpoint)
}

/// Print the outcome; a local failure becomes a non-zero exit.
fn report(outcome: SyncReport) -> Result<()> {
    match outcome {
        SyncReport::Pushed => println!("pushed"),
        SyncReport::Skipped(reason) => println!("skipped: {reason}"),
        SyncReport::Rejected => println!("rejected by triple-store (see log)"),
        SyncReport::Failed(message) => miette::bail!("sync failed: {message}"),
    }
    Ok(())
}
