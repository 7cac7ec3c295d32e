use crate::{
    emit_success, BookmarkAction, CompareAction, Context, DriftAction, NoteAction, OrderArg, SortArg,
};
use catalog_cache::api::{CatalogFilters, HttpCatalogApi};
use catalog_cache::config::{self, CatalogConfig};
use catalog_cache::facet::FacetType;
use catalog_cache::output::is_quiet;
use catalog_cache::query::{SortField, SortOrder};
use catalog_cache::storage::{self, DriftFilter, SqliteStore};
use catalog_cache::ui::{
    self, company_table, dim, facet_table, header, info, muted, score, section, stats_table, success,
    summary_row, trust_marker, warn, Icons, ProgressManager, Spinner,
};
use catalog_cache::{QueryEngine, SearchOptions, SyncEngine, SyncOptions};
use owo_colors::OwoColorize;
use std::sync::Arc;

pub fn sort_field(arg: SortArg) -> SortField {
    match arg {
        SortArg::Relevance => SortField::Relevance,
        SortArg::Score => SortField::Score,
        SortArg::Name => SortField::Name,
        SortArg::Updated => SortField::Updated,
    }
}

pub fn sort_order(arg: OrderArg) -> SortOrder {
    match arg {
        OrderArg::Asc => SortOrder::Asc,
        OrderArg::Desc => SortOrder::Desc,
    }
}

fn open_store(ctx: &Context) -> anyhow::Result<SqliteStore> {
    config::ensure_db_dir(&ctx.database)?;
    Ok(SqliteStore::open(&ctx.database)?)
}

fn sync_engine(ctx: &Context, store: SqliteStore) -> anyhow::Result<SyncEngine> {
    let api = HttpCatalogApi::new(&ctx.config.to_client_config())?;
    Ok(SyncEngine::new(storage::shared(store), Arc::new(api)).with_page_size(ctx.config.page_size()))
}

pub fn run_init(
    ctx: &Context,
    force: bool,
    api_base_url: Option<String>,
    audience_scope: Option<String>,
) -> anyhow::Result<()> {
    let mut new_config = CatalogConfig {
        database: Some(ctx.database.display().to_string()),
        ..ctx.config.clone()
    };
    if api_base_url.is_some() {
        new_config.api_base_url = api_base_url;
    }
    if audience_scope.is_some() {
        new_config.audience_scope = audience_scope;
    }
    new_config.validate()?;

    config::write_config(&ctx.config_path, &new_config, force)?;
    let store = open_store(ctx)?;
    let migrations = store.migration_status()?;

    if ctx.mode.is_human() {
        success(&format!("Wrote {}", ctx.config_path.display()));
        summary_row("Database", &ctx.database.display().to_string());
        summary_row("Migrations", &migrations.len().to_string());
    }
    emit_success(
        ctx.mode,
        "init",
        serde_json::json!({
            "config": ctx.config_path.display().to_string(),
            "database": ctx.database.display().to_string(),
            "migrations": migrations,
        }),
    )
}

pub async fn run_sync(
    ctx: &Context,
    force: bool,
    evidence: bool,
    regions: Vec<String>,
    industries: Vec<String>,
) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let engine = sync_engine(ctx, store)?;
    let options = SyncOptions {
        force_full_sync: force,
        sync_evidence: evidence,
        filters: CatalogFilters {
            regions,
            industries,
            ..CatalogFilters::default()
        },
    };

    let show_progress = ctx.mode.is_human() && !is_quiet();
    let (manager, engine) = if show_progress {
        header("Syncing catalog");
        let (manager, tx) = ProgressManager::new();
        (Some(manager), engine.with_progress(tx))
    } else {
        (None, engine)
    };

    let summary = match engine.sync_universal_catalog(&options).await {
        Ok(summary) => summary,
        Err(err) => {
            if let Some(manager) = manager {
                manager.finish();
            }
            return Err(err.into());
        }
    };

    if let Some(manager) = manager {
        manager.finish_with_summary(&summary);
    }
    if ctx.mode.is_human() {
        for failure in &summary.failed {
            warn(&format!("{} pass failed: {}", failure.resource, failure.message));
        }
    }
    emit_success(ctx.mode, "sync", serde_json::to_value(&summary)?)
}

const STATUS_RUN_LIMIT: u32 = 5;

pub async fn run_status(ctx: &Context, remote: bool) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let stats = store.stats()?;
    let runs = store.list_scoring_runs(STATUS_RUN_LIMIT)?;
    let service_stats = store.list_service_stats()?;
    let engine = sync_engine(ctx, store)?;
    let resources = engine.sync_status()?;
    let health = if remote {
        let spinner = ctx
            .mode
            .is_human()
            .then(|| Spinner::new(&format!("{} Checking remote API", Icons::HOURGLASS)));
        let health = engine.health().await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        Some(health?)
    } else {
        None
    };

    if ctx.mode.is_human() {
        section("Sync state");
        for status in &resources {
            let state = &status.state;
            let style = ui::theme().sync_status(state.sync_status, status.is_stale);
            let label = state.sync_status.to_string().style(style).to_string();
            let last = state
                .last_sync_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  {:<10} {:<8} {} {}{}",
                state.resource_type.to_string(),
                label,
                dim(&format!("last {}", last)),
                dim(&format!("records {}", state.records_synced)),
                if status.is_stale { format!(" {}", muted("(stale)")) } else { String::new() }
            );
            if let Some(message) = &state.error_message {
                println!("    {} {}", Icons::CROSS, message);
            }
        }

        section("Local cache");
        info("Database", &ctx.database.display().to_string());
        let rows = [
            ("Companies", stats.companies.to_string()),
            ("Active", stats.active_companies.to_string()),
            ("Aliases", stats.aliases.to_string()),
            ("Evidence", stats.evidence.to_string()),
            ("Drift alerts", stats.drift_alerts.to_string()),
            ("Bookmarks", stats.bookmarks.to_string()),
            ("Notes", stats.notes.to_string()),
            ("Facet buckets", stats.facet_buckets.to_string()),
        ];
        let rows: Vec<(&str, &str)> = rows.iter().map(|(label, value)| (*label, value.as_str())).collect();
        println!("{}", stats_table(&rows));

        if !runs.is_empty() {
            section("Scoring runs");
            for run in &runs {
                println!(
                    "  {:<12} {:<10} {} {}",
                    run.run_id,
                    run.status.to_string(),
                    dim(&format!("started {}", run.started_at)),
                    dim(&format!("scored {}", run.companies_scored))
                );
            }
        }

        if !service_stats.is_empty() {
            section("Service stats");
            let values: Vec<String> = service_stats
                .iter()
                .map(|stat| match &stat.unit {
                    Some(unit) => format!("{} {}", stat.stat_value, unit),
                    None => stat.stat_value.to_string(),
                })
                .collect();
            let rows: Vec<(&str, &str)> = service_stats
                .iter()
                .zip(&values)
                .map(|(stat, value)| (stat.stat_name.as_str(), value.as_str()))
                .collect();
            println!("{}", stats_table(&rows));
        }

        if let Some(health) = &health {
            let version = health.version.as_deref().unwrap_or("-");
            if health.is_healthy() {
                success(&format!("Remote API healthy (version {})", version));
            } else {
                warn(&format!("Remote API reports '{}'", health.status));
            }
        }
    }
    emit_success(
        ctx.mode,
        "status",
        serde_json::json!({
            "resources": resources,
            "stats": stats,
            "scoring_runs": runs,
            "service_stats": service_stats,
            "health": health,
        }),
    )
}

pub fn run_search(ctx: &Context, options: &SearchOptions, show_facets: bool, record: bool) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let engine = QueryEngine::new(&store);

    // History is recorded only when an owner is known
    let owner = ctx.owner().ok().filter(|_| record);
    let results = match &owner {
        Some(owner) => engine.search_and_record(owner, options)?,
        None => engine.search_companies(options)?,
    };

    if ctx.mode.is_human() {
        if results.companies.is_empty() {
            println!("{} No companies matched.", Icons::SEARCH);
        } else {
            println!("{}", company_table(&results.companies));
            println!(
                "{}",
                dim(&format!(
                    "{}-{} of {}",
                    results.offset + 1,
                    results.offset as usize + results.companies.len(),
                    results.total
                ))
            );
        }
        if show_facets {
            for (facet, counts) in &results.facets {
                section(facet.as_str());
                println!("{}", facet_table(counts));
            }
        }
    }
    emit_success(ctx.mode, "search", serde_json::to_value(&results)?)
}

pub fn run_show(ctx: &Context, company_id: &str) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let engine = QueryEngine::new(&store);
    let owner = ctx.owner().ok();
    let Some(detail) = engine.company_detail(company_id, owner.as_ref().map(|o| o.user_id.as_str()))? else {
        anyhow::bail!("company {} is not in the local cache", company_id);
    };

    if ctx.mode.is_human() {
        let company = &detail.company;
        header(&company.name);
        summary_row("ID", &company.global_company_id);
        summary_row("Domain", company.domain.as_deref().unwrap_or("-"));
        summary_row("Region", company.region.as_deref().unwrap_or("-"));
        summary_row("Industry", company.industry.as_deref().unwrap_or("-"));
        summary_row(
            "Score",
            &format!("{} {}", score(company.final_score), trust_marker(detail.determinism_verified)),
        );
        for (name, value) in company.scores().iter().skip(1) {
            summary_row(&format!("  {}", name), &format!("{:.3}", value));
        }
        if company.is_tombstoned() {
            warn("This company has been removed from the catalog");
        }
        if let Some(bookmarked) = detail.is_bookmarked {
            summary_row("Bookmarked", if bookmarked { "yes" } else { "no" });
        }

        if !detail.aliases.is_empty() {
            section("Aliases");
            for alias in &detail.aliases {
                println!("  {} {}", alias.alias, dim(&format!("({})", alias.alias_type)));
            }
        }
        if !detail.evidence.is_empty() {
            section("Evidence");
            for item in &detail.evidence {
                println!("  {} {} {}", Icons::FILE, item.title, dim(&item.created_at));
                println!("    {}", dim(&item.preview));
            }
        }
        if !detail.drift_alerts.is_empty() {
            section("Drift");
            for alert in &detail.drift_alerts {
                println!(
                    "  {} {} {:.3} -> {:.3} ({:+.1}%) {}",
                    Icons::TRIANGLE,
                    alert.metric,
                    alert.old_value,
                    alert.new_value,
                    alert.drift_percentage,
                    dim(&alert.detected_at)
                );
            }
        }
        if !detail.notes.is_empty() {
            section("Notes");
            for note in &detail.notes {
                println!("  {} {} {}", Icons::MOD, note.content, dim(&note.created_at));
            }
        }
    }
    emit_success(ctx.mode, "show", serde_json::to_value(&detail)?)
}

pub fn run_facets(ctx: &Context, facet: Option<FacetType>) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let buckets = QueryEngine::new(&store).materialized_facets(facet)?;

    if ctx.mode.is_human() {
        if buckets.is_empty() {
            println!("{} No facets materialized yet (run `catalog-cache sync`).", Icons::INFO);
        }
        let mut current: Option<FacetType> = None;
        for bucket in &buckets {
            if current != Some(bucket.facet_type) {
                section(bucket.facet_type.as_str());
                current = Some(bucket.facet_type);
            }
            summary_row(&format!("{:<12}", bucket.bucket_value), &bucket.count.to_string());
        }
    }
    emit_success(ctx.mode, "facets", serde_json::to_value(&buckets)?)
}

pub fn run_drift(
    ctx: &Context,
    action: Option<DriftAction>,
    unseen: bool,
    company: Option<String>,
    limit: u32,
) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let engine = QueryEngine::new(&store);

    if let Some(DriftAction::Seen { alert_id }) = action {
        if !engine.mark_drift_seen(&alert_id)? {
            anyhow::bail!("drift alert {} is not in the local cache", alert_id);
        }
        if ctx.mode.is_human() {
            success(&format!("Marked {} as seen", alert_id));
        }
        return emit_success(ctx.mode, "drift.seen", serde_json::json!({ "alert_id": alert_id }));
    }

    let alerts = engine.list_drift_alerts(&DriftFilter {
        unseen_only: unseen,
        company_id: company,
        limit: Some(limit),
    })?;

    if ctx.mode.is_human() {
        if alerts.is_empty() {
            println!("{} No drift alerts.", Icons::CHECK);
        }
        for alert in &alerts {
            let marker = if alert.seen_at.is_some() { " " } else { "*" };
            println!(
                "{} {} {} {} {:+.1}% {}",
                marker,
                alert.alert_id,
                alert.global_company_id,
                alert.metric,
                alert.drift_percentage,
                dim(&alert.detected_at)
            );
        }
    }
    emit_success(ctx.mode, "drift", serde_json::to_value(&alerts)?)
}

pub fn run_bookmark(ctx: &Context, action: BookmarkAction) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let engine = QueryEngine::new(&store);
    let owner = ctx.owner()?;

    match action {
        BookmarkAction::Add { company_id, tags } => {
            let bookmark = engine.add_bookmark(&owner, &company_id, tags)?;
            if ctx.mode.is_human() {
                success(&format!("Bookmarked {}", company_id));
            }
            emit_success(ctx.mode, "bookmark.add", serde_json::to_value(&bookmark)?)
        }
        BookmarkAction::Remove { company_id } => {
            let removed = engine.remove_bookmark(&owner.user_id, &company_id)?;
            if ctx.mode.is_human() {
                if removed {
                    success(&format!("Removed bookmark for {}", company_id));
                } else {
                    warn(&format!("{} was not bookmarked", company_id));
                }
            }
            emit_success(ctx.mode, "bookmark.remove", serde_json::json!({ "removed": removed }))
        }
        BookmarkAction::List => {
            let bookmarks = engine.list_bookmarks(&owner.user_id)?;
            let companies = engine.bookmarked_companies(&owner.user_id)?;
            if ctx.mode.is_human() {
                if companies.is_empty() {
                    println!("{} No bookmarked companies in the cache.", Icons::INFO);
                } else {
                    println!("{}", company_table(&companies));
                }
            }
            emit_success(
                ctx.mode,
                "bookmark.list",
                serde_json::json!({ "bookmarks": bookmarks, "companies": companies }),
            )
        }
    }
}

pub fn run_note(ctx: &Context, action: NoteAction) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let engine = QueryEngine::new(&store);
    let owner = ctx.owner()?;

    match action {
        NoteAction::Add { company_id, content } => {
            let note = engine.add_note(&owner, &company_id, &content)?;
            if ctx.mode.is_human() {
                success(&format!("Added note {}", note.note_id));
            }
            emit_success(ctx.mode, "note.add", serde_json::to_value(&note)?)
        }
        NoteAction::List { company_id } => {
            let notes = engine.notes(&owner.user_id, &company_id)?;
            if ctx.mode.is_human() {
                for note in &notes {
                    println!("{} {}", dim(&note.note_id), note.content);
                }
            }
            emit_success(ctx.mode, "note.list", serde_json::to_value(&notes)?)
        }
        NoteAction::Delete { note_id } => {
            if !engine.delete_note(&owner.user_id, &note_id)? {
                anyhow::bail!("note {} not found", note_id);
            }
            if ctx.mode.is_human() {
                success(&format!("Deleted note {}", note_id));
            }
            emit_success(ctx.mode, "note.delete", serde_json::json!({ "note_id": note_id }))
        }
    }
}

pub fn run_compare(ctx: &Context, action: CompareAction) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let engine = QueryEngine::new(&store);
    let owner = ctx.owner()?;

    match action {
        CompareAction::Create { name, company_ids } => {
            let comparison = engine.create_comparison(&owner, &name, &company_ids)?;
            if ctx.mode.is_human() {
                success(&format!(
                    "Saved comparison '{}' ({} companies)",
                    comparison.name,
                    comparison.company_ids.len()
                ));
            }
            emit_success(ctx.mode, "compare.create", serde_json::to_value(&comparison)?)
        }
        CompareAction::List => {
            let comparisons = engine.list_comparisons(&owner.user_id)?;
            if ctx.mode.is_human() {
                for comparison in &comparisons {
                    println!(
                        "{} {} {}",
                        comparison.name,
                        dim(&comparison.company_ids.join(", ")),
                        dim(&comparison.created_at)
                    );
                }
            }
            emit_success(ctx.mode, "compare.list", serde_json::to_value(&comparisons)?)
        }
    }
}

pub fn run_history(ctx: &Context, limit: u32) -> anyhow::Result<()> {
    let store = open_store(ctx)?;
    let owner = ctx.owner()?;
    let history = QueryEngine::new(&store).search_history(&owner.user_id, limit)?;

    if ctx.mode.is_human() {
        for entry in &history {
            let query = if entry.query.is_empty() { "(all)" } else { entry.query.as_str() };
            println!(
                "{} {} {}",
                dim(&entry.executed_at),
                query,
                dim(&format!("{} results", entry.result_count))
            );
        }
    }
    emit_success(ctx.mode, "history", serde_json::to_value(&history)?)
}
