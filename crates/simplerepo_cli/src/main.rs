//! `simplerepo` command line demo.
//!
//! Manages a small `notes` table through the generic repository.

mod note;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use note::{Note, MIGRATIONS, NOTES_FTS};
use serde::Serialize;
use serde_json::{json, Value};
use simplerepo_core::model::into_attributes;
use simplerepo_core::{
    init_logging, open_db, LogOptions, SearchFilter, SimpleRepository, SqliteRepository,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "simplerepo")]
#[command(about = "Notes demo for the simplerepo repository layer")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "SIMPLEREPO_DB", default_value = "simplerepo.db")]
    db: PathBuf,
    /// Absolute directory for rolling log files (logging disabled when unset)
    #[arg(long, env = "SIMPLEREPO_LOG_DIR")]
    log_dir: Option<PathBuf>,
    /// Log level: trace|debug|info|warn|error
    #[arg(long, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a note, or update the one with the given uuid
    Add {
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long)]
        uuid: Option<String>,
    },
    /// Show one note by id or uuid
    Show {
        /// Numeric id, or a uuid
        key: String,
    },
    /// List notes, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 15)]
        per_page: u32,
    },
    /// Full-text search over title and body
    Search {
        text: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 15)]
        per_page: u32,
    },
    /// Delete notes by id
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        init_logging(&LogOptions::new(log_dir).with_level(&cli.log_level))
            .context("failed to initialize logging")?;
    }

    let conn = open_db(&cli.db, MIGRATIONS)
        .with_context(|| format!("failed to open `{}`", cli.db.display()))?;
    NOTES_FTS.install(&conn).context("failed to install search index")?;
    let notes = SqliteRepository::<Note>::try_new(&conn)?;

    match cli.command {
        Commands::Add { title, body, uuid } => {
            let attributes = into_attributes(json!({ "title": title, "body": body, "uuid": uuid }))
                .context("note attributes must be an object")?;
            let note = match uuid {
                Some(_) => notes.update_or_insert_by_uuid(attributes)?,
                None => notes.create(&attributes)?,
            };
            info!("event=cli_add module=cli status=ok");
            print_json(&note)?;
        }
        Commands::Show { key } => {
            let note = match key.parse::<i64>() {
                Ok(id) => notes.find(id, &[])?,
                Err(_) => notes.find_by_uuid(&key, &[])?,
            };
            match note {
                Some(note) => print_json(&note)?,
                None => anyhow::bail!("no note matches `{key}`"),
            }
        }
        Commands::List { page, per_page } => {
            let mut filter = SearchFilter::<Note>::new();
            filter
                .set_query(notes.new_query(&[])?)
                .set_per_page(per_page)
                .set_query_defaults(None)?;
            print_json(&notes.paginate(per_page, page, &[], Some(&filter))?)?;
        }
        Commands::Search {
            text,
            page,
            per_page,
        } => {
            let mut filter = SearchFilter::<Note>::new();
            filter.set_query(notes.new_query(&[])?).set_per_page(per_page);
            print_json(&notes.search_paginate(&text, page, Some(&filter))?)?;
        }
        Commands::Delete { ids } => {
            let deleted = notes.delete(ids.iter().map(|id| Value::from(*id)))?;
            print_json(&json!({ "deleted": deleted }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
