//! `roster` command-line entry point.
//!
//! # Responsibility
//! - Map command-line options onto `roster_core` use-cases.
//! - Print one JSON document per result on stdout; errors go to stderr.

use clap::{Parser, Subcommand};
use log::info;
use roster_core::db::{open_db, open_db_in_memory};
use roster_core::{
    core_version, default_log_level, init_logging, parse_log_level, SqliteUserSession, User,
    UserService,
};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Register and look up 9-digit PID users in a SQLite store.
#[derive(Debug, Parser)]
#[command(name = "roster", version)]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "ROSTER_DB", default_value = "roster.sqlite3", global = true)]
    db: PathBuf,
    /// One of trace|debug|info|warn|error. Defaults per build mode.
    #[arg(long, env = "ROSTER_LOG_LEVEL", global = true, value_parser = log_level_arg)]
    log_level: Option<&'static str>,
    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "ROSTER_LOG_DIR", global = true)]
    log_dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a new user.
    Register {
        #[arg(long, allow_negative_numbers = true)]
        pid: i64,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Fetch one user by PID.
    Get {
        #[arg(long, allow_negative_numbers = true)]
        pid: i64,
    },
    /// List registered users ordered by PID.
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Register and fetch a sample user in a throwaway in-memory store.
    Demo,
    /// Print the core library version.
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    match run(cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

// Rejected at parse time so a bad level fails even when file logging is off.
fn log_level_arg(value: &str) -> Result<&'static str, String> {
    parse_log_level(value).map_err(|err| err.to_string())
}

fn run(cli: Cli, out: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(cli.log_level.unwrap_or(default_log_level()), log_dir)?;
    }
    info!("event=cli_start module=cli status=ok");

    match cli.command {
        Command::Register {
            pid,
            first_name,
            last_name,
        } => {
            let user = User::new(pid, first_name, last_name)?;
            let mut conn = open_db(&cli.db)?;
            let mut service = UserService::new(SqliteUserSession::try_new(&mut conn)?);
            let registered = service.register(&user)?;
            write_json(out, &registered)
        }
        Command::Get { pid } => {
            let mut conn = open_db(&cli.db)?;
            let service = UserService::new(SqliteUserSession::try_new(&mut conn)?);
            let user = service.get_by_raw_pid(pid)?;
            write_json(out, &user)
        }
        Command::List { limit, offset } => {
            let mut conn = open_db(&cli.db)?;
            let session = SqliteUserSession::try_new(&mut conn)?;
            let users = session
                .list_users(limit, offset)?
                .iter()
                .map(|entity| entity.to_model())
                .collect::<Result<Vec<_>, _>>()?;
            write_json(out, &users)
        }
        Command::Demo => run_demo(out),
        Command::Version => {
            writeln!(out, "{}", core_version())?;
            Ok(())
        }
    }
}

fn run_demo(out: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let mut conn = open_db_in_memory()?;
    let mut service = UserService::new(SqliteUserSession::try_new(&mut conn)?);
    let user = User::new(123_456_789, "Kris", "Jordan")?;
    service.register(&user)?;
    let fetched = service.get(user.pid())?;
    write_json(out, &fetched)
}

fn write_json<T: serde::Serialize>(
    out: &mut dyn Write,
    value: &T,
) -> Result<(), Box<dyn Error>> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
