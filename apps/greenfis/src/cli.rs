//! # CLI Module
//!
//! Command-line interface for GreenFis.
//!
//! Each subcommand has a `cmd_*` function that does the work and returns a
//! `Result`, so the commands can be driven from tests without a process.

use crate::api::{AppState, build_router};
use crate::config::{self, ServeOverrides, ServerConfig};
use clap::{Parser, Subcommand};
use greenfis_core::{NewUser, Role, Snapshot, Store, StoreError, Timestamp, UserProfile};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// =============================================================================
// ARGUMENTS
// =============================================================================

/// GreenFis store backend.
#[derive(Debug, Parser)]
#[command(name = "greenfis", version, about, long_about = None)]
pub struct Cli {
    /// Database file (env: GREENFIS_DB, default: greenfis.redb).
    #[arg(long, short = 'D', global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new, empty database.
    Init {
        /// Replace an existing database file.
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API.
    Serve {
        /// Address to bind (env: GREENFIS_HOST, default: 127.0.0.1).
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to bind (env: GREENFIS_PORT, default: 8080).
        #[arg(long, short)]
        port: Option<u16>,

        /// Bearer key required on /api (env: GREENFIS_API_KEY).
        #[arg(long)]
        api_key: Option<String>,

        /// Requests per second, 0 to disable (env: GREENFIS_RATE_LIMIT, default: 100).
        #[arg(long)]
        rate_limit: Option<u32>,

        /// Allowed browser origin; repeatable (env: GREENFIS_CORS_ORIGINS, comma separated).
        #[arg(long = "cors-origin")]
        cors_origins: Vec<String>,
    },

    /// Print row counts.
    Status {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Create a staff account, e.g. the first administrator.
    CreateUser {
        #[arg(long)]
        username: String,

        #[arg(long)]
        full_name: String,

        #[arg(long, value_parser = parse_role, default_value = "admin")]
        role: Role,

        /// Password (env: GREENFIS_PASSWORD).
        #[arg(long)]
        password: Option<String>,
    },

    /// Write every row to a JSON snapshot.
    Export {
        /// Output file.
        output: PathBuf,
    },

    /// Load a JSON snapshot into an empty database.
    Import {
        /// Input file.
        input: PathBuf,
    },
}

/// Parse a role name as accepted by the API.
pub fn parse_role(raw: &str) -> Result<Role, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "admin" => Ok(Role::Admin),
        "manager" => Ok(Role::Manager),
        "cashier" => Ok(Role::Cashier),
        "stocker" => Ok(Role::Stocker),
        other => Err(format!(
            "unknown role {other:?} (expected admin, manager, cashier or stocker)"
        )),
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database already exists at {} (use --force to replace it)", .0.display())]
    AlreadyExists(PathBuf),

    #[error("no database at {} (run `greenfis init` first)", .0.display())]
    Missing(PathBuf),

    #[error("{0}")]
    InvalidArgument(String),
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let db_path = config::database_path(cli.database);
    match cli.command {
        Command::Init { force } => cmd_init(&db_path, force),
        Command::Serve {
            host,
            port,
            api_key,
            rate_limit,
            cors_origins,
        } => {
            let config = config::resolve(ServeOverrides {
                host,
                port,
                api_key,
                rate_limit,
                cors_origins,
            })?;
            cmd_serve(&db_path, config).await
        }
        Command::Status { json } => cmd_status(&db_path, json),
        Command::CreateUser {
            username,
            full_name,
            role,
            password,
        } => {
            let password = password
                .or_else(|| std::env::var("GREENFIS_PASSWORD").ok())
                .ok_or_else(|| {
                    CliError::InvalidArgument(
                        "a password is required (--password or GREENFIS_PASSWORD)".to_string(),
                    )
                })?;
            let profile = cmd_create_user(
                &db_path,
                NewUser {
                    username,
                    full_name,
                    role,
                    password,
                },
            )?;
            println!(
                "Created {:?} account {:?} with id {}",
                profile.role, profile.username, profile.id
            );
            Ok(())
        }
        Command::Export { output } => {
            let rows = cmd_export(&db_path, &output)?;
            println!("Exported {rows} rows to {}", output.display());
            Ok(())
        }
        Command::Import { input } => {
            let rows = cmd_import(&db_path, &input)?;
            println!("Imported {rows} rows from {}", input.display());
            Ok(())
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Open an existing database.
pub fn open_store(db_path: &Path) -> Result<Store, CliError> {
    if !db_path.exists() {
        return Err(CliError::Missing(db_path.to_path_buf()));
    }
    Ok(Store::open(db_path)?)
}

/// Create a fresh database file.
pub fn cmd_init(db_path: &Path, force: bool) -> Result<(), CliError> {
    if db_path.exists() {
        if !force {
            return Err(CliError::AlreadyExists(db_path.to_path_buf()));
        }
        fs::remove_file(db_path)?;
        warn!(path = %db_path.display(), "replaced existing database");
    }
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Store::create(db_path)?;
    info!(path = %db_path.display(), "database initialised");
    println!("Initialised GreenFis database at {}", db_path.display());
    Ok(())
}

/// Row counts per table.
pub fn status_counts(db_path: &Path) -> Result<BTreeMap<String, u64>, CliError> {
    Ok(open_store(db_path)?.counts()?)
}

/// Print row counts.
pub fn cmd_status(db_path: &Path, json: bool) -> Result<(), CliError> {
    let counts = status_counts(db_path)?;
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &counts)?;
        writeln!(out)?;
    } else {
        writeln!(out, "Database: {}", db_path.display())?;
        for (table, rows) in &counts {
            writeln!(out, "  {table:<18} {rows:>8}")?;
        }
    }
    Ok(())
}

/// Create a staff account from the command line.
pub fn cmd_create_user(db_path: &Path, input: NewUser) -> Result<UserProfile, CliError> {
    let store = open_store(db_path)?;
    let now = Timestamp(chrono::Utc::now().timestamp());
    let user = store.create_user(input, now)?;
    info!(user_id = user.id, role = ?user.role, "user created from CLI");
    Ok(user.into())
}

/// Write a JSON snapshot; returns the number of rows written.
pub fn cmd_export(db_path: &Path, output: &Path) -> Result<usize, CliError> {
    let snapshot = open_store(db_path)?.export_snapshot()?;
    let mut writer = BufWriter::new(fs::File::create(output)?);
    serde_json::to_writer_pretty(&mut writer, &snapshot)?;
    writer.flush()?;
    info!(path = %output.display(), rows = snapshot.row_count(), "snapshot exported");
    Ok(snapshot.row_count())
}

/// Load a JSON snapshot, creating the database if needed; returns the number
/// of rows imported.
pub fn cmd_import(db_path: &Path, input: &Path) -> Result<usize, CliError> {
    let reader = BufReader::new(fs::File::open(input)?);
    let snapshot: Snapshot = serde_json::from_reader(reader)?;
    let store = Store::create(db_path)?;
    store.import_snapshot(&snapshot)?;
    info!(path = %input.display(), rows = snapshot.row_count(), "snapshot imported");
    Ok(snapshot.row_count())
}

/// Serve the HTTP API until Ctrl-C.
pub async fn cmd_serve(db_path: &Path, config: ServerConfig) -> Result<(), CliError> {
    let store = Store::create(db_path)?;
    let addr = config.addr();
    if config.api_key.is_none() {
        warn!("no API key configured; /api is open to anyone who can reach {addr}");
    }
    let app = build_router(AppState::from_config(store, &config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        database = %db_path.display(),
        rate_limit = config.rate_limit.map(|n| n.get()),
        cors_origins = config.cors_origins.len(),
        "GreenFis listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(parse_role("Admin"), Ok(Role::Admin));
        assert_eq!(parse_role(" stocker "), Ok(Role::Stocker));
        assert!(parse_role("owner").is_err());
    }

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::try_parse_from([
            "greenfis",
            "--database",
            "shop.redb",
            "serve",
            "--port",
            "9000",
            "--cors-origin",
            "http://localhost:5173",
            "--cors-origin",
            "http://localhost:3000",
        ])
        .expect("parse");
        assert_eq!(cli.database, Some(PathBuf::from("shop.redb")));
        match cli.command {
            Command::Serve {
                port, cors_origins, ..
            } => {
                assert_eq!(port, Some(9000));
                assert_eq!(cors_origins.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn create_user_defaults_to_admin() {
        let cli = Cli::try_parse_from([
            "greenfis",
            "create-user",
            "--username",
            "root",
            "--full-name",
            "Store Owner",
        ])
        .expect("parse");
        match cli.command {
            Command::CreateUser { role, password, .. } => {
                assert_eq!(role, Role::Admin);
                assert_eq!(password, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
