//! catalog-cache CLI - sync a remote company catalog into SQLite and query it locally

mod commands;

use catalog_cache::config::{self, CatalogConfig};
use catalog_cache::facet::{FacetType, RiskLevel};
use catalog_cache::workspace::Owner;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "catalog-cache")]
#[command(version)]
#[command(about = "Client-side catalog cache - incremental sync, local search and workspace overlays")]
#[command(long_about = r#"
catalog-cache keeps a local SQLite copy of the remote company catalog:
  • Incremental cursor/ETag sync with resumable passes
  • Full-text search with facet counts
  • Company detail with evidence and drift alerts
  • Bookmarks, notes, comparisons and search history

Example usage:
  catalog-cache init --api-base-url https://api.example.com
  catalog-cache sync
  catalog-cache search "acme" --industry software --min-score 0.8
  catalog-cache show <company-id>
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// User ID for workspace commands (overrides the config)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Human)]
    format: OutputMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    #[value(name = "text")]
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

/// Print a command result as a JSON envelope
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({ "ok": true, "command": command, "data": data });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SortArg {
    Relevance,
    Score,
    Name,
    Updated,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OrderArg {
    Asc,
    Desc,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,

        /// Remote catalog base URL
        #[arg(long)]
        api_base_url: Option<String>,

        /// Audience scope (public, partner, enterprise)
        #[arg(long)]
        audience_scope: Option<String>,
    },

    /// Sync the remote catalog into the local cache
    Sync {
        /// Ignore stored cursors and ETags and refetch everything
        #[arg(long)]
        force: bool,

        /// Also refresh evidence for recently synced companies
        #[arg(long)]
        evidence: bool,

        /// Only sync companies in these regions
        #[arg(long = "region")]
        regions: Vec<String>,

        /// Only sync companies in these industries
        #[arg(long = "industry")]
        industries: Vec<String>,
    },

    /// Show sync state per resource and local row counts
    Status {
        /// Also check the remote API health endpoint
        #[arg(long)]
        remote: bool,
    },

    /// Search cached companies
    Search {
        /// Free text matched against names, domains and aliases
        query: Option<String>,

        #[arg(long = "region")]
        regions: Vec<String>,

        #[arg(long = "industry")]
        industries: Vec<String>,

        #[arg(long)]
        min_score: Option<f64>,

        #[arg(long)]
        max_score: Option<f64>,

        #[arg(long)]
        min_employees: Option<i64>,

        #[arg(long)]
        max_employees: Option<i64>,

        /// Risk level (low, medium, high); repeatable
        #[arg(long = "risk")]
        risk_levels: Vec<RiskLevel>,

        /// Hide companies failing the determinism check
        #[arg(long)]
        trusted: bool,

        #[arg(long, value_enum, default_value_t = SortArg::Relevance)]
        sort: SortArg,

        #[arg(long, value_enum, default_value_t = OrderArg::Desc)]
        order: OrderArg,

        #[arg(short, long, default_value = "20")]
        limit: u32,

        #[arg(long, default_value = "0")]
        offset: u32,

        /// Print facet counts below the results
        #[arg(long)]
        facets: bool,

        /// Do not record this search in history
        #[arg(long)]
        no_history: bool,
    },

    /// Show everything cached about one company
    Show {
        company_id: String,
    },

    /// Show materialized facet buckets
    Facets {
        /// Only this facet (region, industry, score_range, employee_count, risk_level)
        facet: Option<FacetType>,
    },

    /// List or acknowledge drift alerts
    Drift {
        #[command(subcommand)]
        action: Option<DriftAction>,

        /// Only alerts not yet marked seen
        #[arg(long)]
        unseen: bool,

        /// Only alerts for this company
        #[arg(long)]
        company: Option<String>,

        #[arg(short, long, default_value = "50")]
        limit: u32,
    },

    /// Manage bookmarks
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },

    /// Manage notes on companies
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Manage saved comparisons
    Compare {
        #[command(subcommand)]
        action: CompareAction,
    },

    /// Show recent searches
    History {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
}

#[derive(Subcommand)]
pub enum DriftAction {
    /// Mark an alert as seen
    Seen { alert_id: String },
}

#[derive(Subcommand)]
pub enum BookmarkAction {
    /// Bookmark a company (re-bookmarking replaces tags)
    Add {
        company_id: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Remove {
        company_id: String,
    },
    List,
}

#[derive(Subcommand)]
pub enum NoteAction {
    Add {
        company_id: String,
        content: String,
    },
    List {
        company_id: String,
    },
    Delete {
        note_id: String,
    },
}

#[derive(Subcommand)]
pub enum CompareAction {
    /// Save a comparison of two or more companies
    Create {
        name: String,
        #[arg(required = true, num_args = 2..)]
        company_ids: Vec<String>,
    },
    List,
}

/// Resolved settings shared by every command
pub struct Context {
    pub config: CatalogConfig,
    pub database: PathBuf,
    pub config_path: PathBuf,
    pub mode: OutputMode,
    pub user: Option<String>,
}

impl Context {
    pub fn owner(&self) -> anyhow::Result<Owner> {
        let from_config = self.config.owner();
        match (&self.user, from_config) {
            (Some(user), Some(owner)) if owner.user_id == *user => Ok(owner),
            (Some(user), _) => Ok(Owner::user(user.clone())),
            (None, Some(owner)) => Ok(owner),
            (None, None) => anyhow::bail!("no user set (pass --user or set user_id in the config)"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut catalog_config = config::load_config(Some(&config_path))?.unwrap_or_default();
    catalog_config.apply_process_env();
    catalog_config.validate()?;

    let base = std::env::current_dir()?;
    let database = cli
        .database
        .clone()
        .unwrap_or_else(|| catalog_config.database_path(&base));

    let ctx = Context {
        config: catalog_config,
        database,
        config_path,
        mode: cli.format,
        user: cli.user.clone(),
    };

    match cli.command {
        Commands::Init { force, api_base_url, audience_scope } => {
            commands::run_init(&ctx, force, api_base_url, audience_scope)
        }
        Commands::Sync { force, evidence, regions, industries } => {
            commands::run_sync(&ctx, force, evidence, regions, industries).await
        }
        Commands::Status { remote } => commands::run_status(&ctx, remote).await,
        Commands::Search {
            query,
            regions,
            industries,
            min_score,
            max_score,
            min_employees,
            max_employees,
            risk_levels,
            trusted,
            sort,
            order,
            limit,
            offset,
            facets,
            no_history,
        } => {
            let options = catalog_cache::SearchOptions {
                query,
                regions,
                industries,
                score_min: min_score,
                score_max: max_score,
                employee_min: min_employees,
                employee_max: max_employees,
                risk_levels,
                trusted_only: trusted,
                sort: commands::sort_field(sort),
                order: commands::sort_order(order),
                limit: Some(limit),
                offset: Some(offset),
            };
            commands::run_search(&ctx, &options, facets, !no_history)
        }
        Commands::Show { company_id } => commands::run_show(&ctx, &company_id),
        Commands::Facets { facet } => commands::run_facets(&ctx, facet),
        Commands::Drift { action, unseen, company, limit } => {
            commands::run_drift(&ctx, action, unseen, company, limit)
        }
        Commands::Bookmark { action } => commands::run_bookmark(&ctx, action),
        Commands::Note { action } => commands::run_note(&ctx, action),
        Commands::Compare { action } => commands::run_compare(&ctx, action),
        Commands::History { limit } => commands::run_history(&ctx, limit),
    }
}
