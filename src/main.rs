//! # askdocs CLI
//!
//! The `askdocs` binary drives the ingestion and query pipeline from the
//! command line and hosts the HTTP API for interactive front ends.
//!
//! ## Usage
//!
//! ```bash
//! askdocs <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdocs init` | Create the database schema (no-op for the in-memory store) |
//! | `askdocs ingest <file>` | Ingest a file into the store |
//! | `askdocs list` | List stored documents |
//! | `askdocs show <id>` | Show one document's metadata |
//! | `askdocs chunks <id>` | Show a document's chunks |
//! | `askdocs delete <id>` | Delete a document and its chunks |
//! | `askdocs ask "<query>"` | Ask a question over all documents (`--document` scopes it) |
//! | `askdocs serve` | Start the HTTP server |
//!
//! Configuration comes from environment variables (see [`askdocs::config`]);
//! a `.env` file in the working directory is loaded first. Without database
//! credentials the commands run against a process-local in-memory store, so
//! `ingest` followed by a separate `list` invocation will not see the data;
//! use `serve` (one process) or configure Postgres for anything durable.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use askdocs::config::Config;
use askdocs::query::QueryService;
use askdocs::{db, embedding, ingest, migrate, server, store};

/// askdocs — document ingestion and retrieval-augmented question answering.
#[derive(Parser)]
#[command(
    name = "askdocs",
    about = "Upload documents, store their chunks, and ask questions over them",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the documents, document_chunks, and queries tables.
    /// Idempotent — running it multiple times is safe. With no database
    /// configured this is a no-op: the in-memory store needs no schema.
    Init,

    /// Ingest a file into the document store.
    Ingest {
        /// Path of the file to ingest.
        file: PathBuf,
    },

    /// List stored documents, newest first.
    List,

    /// Show one document's metadata record.
    Show {
        /// Document identifier.
        id: i64,
    },

    /// Show a document's chunks in index order.
    Chunks {
        /// Document identifier.
        id: i64,
    },

    /// Delete a document and all of its chunks.
    Delete {
        /// Document identifier.
        id: i64,
    },

    /// Ask a question over stored documents.
    Ask {
        /// The question.
        query: String,

        /// Scope the question to one document instead of all of them.
        #[arg(long)]
        document: Option<i64>,
    },

    /// Start the HTTP server for interactive front ends.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askdocs=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Init => {
            if !config.db.is_configured() {
                println!("no database configured; the in-memory store needs no initialization");
                return Ok(());
            }
            let pool = db::connect(&config.db).await?;
            migrate::run_migrations(&pool).await?;
            println!("database initialized");
        }

        Commands::Ingest { file } => {
            let store = store::create_store(&config).await?;
            let embedder = if config.llm.is_configured() {
                embedding::local_provider()
            } else {
                None
            };
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();
            let file_type = mime_guess::from_path(&file)
                .first_or_octet_stream()
                .to_string();
            let file_size = std::fs::metadata(&file)?.len() as i64;

            let id = ingest::ingest_file(
                store.as_ref(),
                embedder.as_deref(),
                &file,
                &filename,
                &file_type,
                file_size,
            )
            .await?;
            println!("ingested {} as document {}", filename, id);
        }

        Commands::List => {
            let store = store::create_store(&config).await?;
            let documents = store.list_documents().await?;
            if documents.is_empty() {
                println!("no documents stored");
            }
            for doc in documents {
                println!(
                    "{}  {}  {}  {} bytes  {}",
                    doc.id,
                    doc.upload_date.format("%Y-%m-%d %H:%M:%S"),
                    doc.filename,
                    doc.file_size,
                    doc.file_type
                );
            }
        }

        Commands::Show { id } => {
            let store = store::create_store(&config).await?;
            match store.get_document(id).await? {
                Some(doc) => {
                    println!("id:          {}", doc.id);
                    println!("filename:    {}", doc.filename);
                    println!("file type:   {}", doc.file_type);
                    println!("file size:   {} bytes", doc.file_size);
                    println!("uploaded:    {}", doc.upload_date.format("%Y-%m-%d %H:%M:%S"));
                    println!("metadata:    {}", doc.metadata);
                }
                None => println!("document {} not found", id),
            }
        }

        Commands::Chunks { id } => {
            let store = store::create_store(&config).await?;
            let chunks = store.get_chunks(id).await?;
            if chunks.is_empty() {
                println!("no chunks for document {}", id);
            }
            for chunk in chunks {
                let preview: String = chunk.text.chars().take(120).collect();
                println!("[{}] {}", chunk.chunk_index, preview);
            }
        }

        Commands::Delete { id } => {
            let store = store::create_store(&config).await?;
            store.delete_document(id).await?;
            println!("deleted document {}", id);
        }

        Commands::Ask { query, document } => {
            let store = store::create_store(&config).await?;
            let service = QueryService::from_config(&config);
            let answer = match document {
                Some(id) => service.ask_document(store.as_ref(), id, &query).await?,
                None => service.ask_all(store.as_ref(), &query).await?,
            };
            println!("{}", answer);
        }

        Commands::Serve => {
            let store = store::create_store(&config).await?;
            let service = Arc::new(QueryService::from_config(&config));
            let embedder = if config.llm.is_configured() {
                embedding::local_provider()
            } else {
                None
            };
            server::run_server(&config, store, service, embedder).await?;
        }
    }

    Ok(())
}
