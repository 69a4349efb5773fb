//! Developer CLI for a jtx Board database.
//!
//! # Responsibility
//! - Quick-add, list, inspect and delete entries without the mobile host.
//! - Probe the review prompt gate against a database file.

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use jtx_core::repo::settings_repo::SqliteSettingsRepository;
use jtx_core::service::review::ReviewGate;
use jtx_core::viewmodel::{DateFormatter, DetailState, DetailViewModel, QuickAddViewModel};
use jtx_core::{
    init_logging_from_config, now_epoch_ms, CoreConfig, EntityStore, ICalObject, ListQuery,
    Module, ReviewError, ReviewInfo, ReviewOutcome, ReviewPlatform, ReviewScheduler,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jtx")]
#[command(about = "Inspect and edit a jtx Board journal/note/task database")]
struct Cli {
    /// Database file (defaults to JTX_DB_PATH or the temp directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quick-add an entry from free text ("Buy milk #errand https://...")
    Add {
        text: Vec<String>,

        /// journal, note or todo
        #[arg(short, long, default_value = "journal")]
        module: String,

        /// Target collection id
        #[arg(short, long)]
        collection: Option<i64>,
    },
    /// List entries, newest first
    List {
        /// Substring of summary or description; "%" lists everything
        filter: Option<String>,

        #[arg(short, long)]
        module: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(short, long)]
        limit: Option<u32>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one entry with its detail flags
    Show {
        id: i64,

        #[arg(long)]
        json: bool,
    },
    /// Delete an entry and everything attached to it
    Delete { id: i64 },
    /// Set task progress (0-100)
    Progress { id: i64, percent: i32 },
    /// List all category names
    Categories,
    /// Evaluate the in-app review gate
    Review {
        /// Run the review flow when due (prints instead of prompting)
        #[arg(long)]
        launch: bool,

        /// Evaluate at this epoch-ms instant instead of now
        #[arg(long)]
        now: Option<i64>,
    },
}

/// Review "platform" that reports to stdout.
struct ConsoleReviewPlatform;

impl ReviewPlatform for ConsoleReviewPlatform {
    fn request_review_flow(&mut self) -> Result<ReviewInfo, ReviewError> {
        Ok(ReviewInfo {
            token: "console".to_string(),
        })
    }

    fn launch_review_flow(&mut self, _info: &ReviewInfo) -> Result<(), ReviewError> {
        println!("(review prompt would be shown here)");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CoreConfig::from_env().context("loading configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    init_logging_from_config(&config).map_err(anyhow::Error::msg)?;

    let store = EntityStore::open(&config.db_path)
        .with_context(|| format!("opening `{}`", config.db_path.display()))?;

    match cli.command {
        Commands::Add {
            text,
            module,
            collection,
        } => add(&store, &config, &text.join(" "), &module, collection).await,
        Commands::List {
            filter,
            module,
            category,
            limit,
            json,
        } => {
            let query = ListQuery {
                filter,
                module: module.as_deref().map(parse_module).transpose()?,
                category,
                include_deleted: false,
                limit,
            };
            list(&store, query, json).await
        }
        Commands::Show { id, json } => show(&store, id, json).await,
        Commands::Delete { id } => {
            store.delete(id).await?;
            println!("deleted {id}");
            Ok(())
        }
        Commands::Progress { id, percent } => {
            if !(0..=100).contains(&percent) {
                bail!("percent must be between 0 and 100, got {percent}");
            }
            let object = store.update_progress(id, percent, now_epoch_ms()).await?;
            println!(
                "{id}: {}% {}",
                percent,
                object.status.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        Commands::Categories => {
            for name in store.categories().await? {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Review { launch, now } => {
            review(&store, &config, launch, now.unwrap_or_else(now_epoch_ms)).await
        }
    }
}

async fn add(
    store: &EntityStore,
    config: &CoreConfig,
    text: &str,
    module: &str,
    collection: Option<i64>,
) -> Result<()> {
    let module = parse_module(module)?;
    let mut view_model =
        QuickAddViewModel::load(store, Some(module), collection, config.todo_defaults).await?;
    if view_model.current_module() != module {
        println!(
            "collection does not accept {}; saving as {}",
            module.as_str().to_lowercase(),
            view_model.current_module().as_str().to_lowercase()
        );
    }
    view_model.set_text(text);
    match view_model.save_into(store, now_epoch_ms()).await? {
        Some(id) => {
            println!("saved {id}");
            Ok(())
        }
        None if view_model.no_text_error() => bail!("nothing to save: text is empty"),
        None => bail!("no writable collection available"),
    }
}

async fn list(store: &EntityStore, query: ListQuery, json: bool) -> Result<()> {
    let objects = store.list(query).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&objects)?);
        return Ok(());
    }
    let formatter = local_formatter();
    for object in &objects {
        print_row(object, &formatter);
    }
    if objects.is_empty() {
        println!("no entries");
    }
    Ok(())
}

async fn show(store: &EntityStore, id: i64, json: bool) -> Result<()> {
    let view_model = DetailViewModel::new(store.clone(), id, local_formatter(), now_epoch_ms()).await?;
    let state = view_model.state().get();
    let Some(entity) = state.entity.as_ref() else {
        bail!("entry {id} not found");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(entity)?);
        return Ok(());
    }
    print_detail(&state);
    Ok(())
}

async fn review(store: &EntityStore, config: &CoreConfig, launch: bool, now_ms: i64) -> Result<()> {
    let policy = config.review;
    let formatter = local_formatter();

    if !launch {
        let gate = store
            .write("review_gate", move |conn| {
                Ok(ReviewScheduler::new(SqliteSettingsRepository::new(conn), policy).evaluate(now_ms))
            })
            .await??;
        match gate {
            ReviewGate::FirstScheduled { next_request_on } => {
                println!("first review scheduled for {}", formatter.date_time(next_request_on));
            }
            ReviewGate::NotYet { next_request_on } => {
                println!("review not due until {}", formatter.date_time(next_request_on));
            }
            ReviewGate::Due => println!("review is due"),
        }
        return Ok(());
    }

    let outcome = store
        .write("review_launch", move |conn| {
            Ok(ReviewScheduler::new(SqliteSettingsRepository::new(conn), policy)
                .launch(&mut ConsoleReviewPlatform, now_ms))
        })
        .await??;
    match outcome {
        ReviewOutcome::FirstScheduled { next_request_on } => {
            println!("first review scheduled for {}", formatter.date_time(next_request_on));
        }
        ReviewOutcome::NotYet { next_request_on } => {
            println!("review not due until {}", formatter.date_time(next_request_on));
        }
        ReviewOutcome::Launched { next_request_on } => {
            println!("review shown; next one after {}", formatter.date_time(next_request_on));
        }
        ReviewOutcome::RequestFailed => println!("review flow could not be requested"),
    }
    Ok(())
}

fn parse_module(value: &str) -> Result<Module> {
    Module::parse(value).with_context(|| format!("unknown module `{value}`"))
}

fn local_formatter() -> DateFormatter {
    DateFormatter::with_offset(*Local::now().offset())
}

fn print_row(object: &ICalObject, formatter: &DateFormatter) {
    let progress = object
        .percent
        .map(|percent| format!(" {percent}%"))
        .unwrap_or_default();
    println!(
        "{:>5}  {:<7}  {}  {}{}",
        object.id,
        object.module.as_str().to_lowercase(),
        formatter.date_time(object.last_modified),
        object.summary.as_deref().unwrap_or("(no summary)"),
        progress
    );
}

fn print_detail(state: &DetailState) {
    let Some(entity) = state.entity.as_ref() else {
        return;
    };
    let object = &entity.property;
    println!("#{} {}", object.id, object.module.as_str().to_lowercase());
    println!("summary:  {}", object.summary.as_deref().unwrap_or(""));
    if let Some(description) = object.description.as_deref() {
        println!("description:\n{description}");
    }
    if state.date_visible {
        println!("date:     {}", state.dtstart_formatted);
    }
    if state.url_visible {
        println!("url:      {}", object.url.as_deref().unwrap_or(""));
    }
    if state.progress_visible {
        println!("progress: {}%", object.percent.unwrap_or(0));
    }
    if state.priority_visible {
        println!("priority: {}", object.priority.unwrap_or(0));
    }
    if state.contact_visible {
        println!("contact:  {}", object.contact.as_deref().unwrap_or(""));
    }
    if !entity.categories.is_empty() {
        let names: Vec<&str> = entity.categories.iter().map(|c| c.text.as_str()).collect();
        println!("categories: {}", names.join(", "));
    }
    if state.attendees_visible {
        for attendee in &entity.attendees {
            println!("attendee: {}", attendee.caladdress);
        }
    }
    if state.organizer_visible {
        if let Some(organizer) = entity.organizer.as_ref() {
            println!("organizer: {}", organizer.caladdress);
        }
    }
    if state.comments_visible {
        for comment in &entity.comments {
            println!("comment:  {}", comment.text);
        }
    }
    if state.relatedto_visible {
        for note in &state.related_notes {
            println!("note:     #{} {}", note.id, note.summary.as_deref().unwrap_or(""));
        }
    }
    if state.subtasks_visible {
        for todo in &state.related_todos {
            println!(
                "subtask:  #{} {} {}%",
                todo.id,
                todo.summary.as_deref().unwrap_or(""),
                todo.percent.unwrap_or(0)
            );
        }
    }
    println!("created:  {}", state.created_formatted);
    println!("modified: {}", state.last_modified_formatted);
}
