//! Command line interface.
//!
//! Without a subcommand the binary serves HTTP; the other subcommands are
//! one-shot maintenance jobs sharing the same configuration and database.

mod export_db;
mod export_xlsx;
mod issue_token;
mod seed_demo;
mod tables;

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use sqlx::PgPool;

use crate::core::config::Config;

#[derive(Debug, Parser)]
#[command(name = "school-core", version, about = "Online school administration backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Dump every table into a readable JSON file
    ExportDb {
        #[arg(long, default_value = "db_dump.json")]
        output: PathBuf,
    },

    /// Export the rows of one model to an .xlsx spreadsheet
    ExportXlsx(ExportXlsxArgs),

    /// Create demo users, a category, courses and enrollments
    SeedDemo {
        /// Username of the demo teacher
        #[arg(long, default_value = "teacher")]
        teacher: String,

        /// Username of the demo student
        #[arg(long, default_value = "student")]
        student: String,

        /// Number of courses to create
        #[arg(long, default_value_t = 3)]
        count: usize,
    },

    /// Print an access token for an active user
    IssueToken {
        username: String,

        /// Token lifetime; defaults to JWT_TTL_SECS
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("columns").required(true).args(["fields", "all"])))]
pub struct ExportXlsxArgs {
    /// Model name, e.g. course or enrollment
    pub model: String,

    /// Comma-separated columns, e.g. title,price,start_date
    #[arg(long)]
    pub fields: Option<String>,

    /// Export every column of the model
    #[arg(long)]
    pub all: bool,

    /// Output path (default: <model>.xlsx)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Run a maintenance subcommand
pub async fn run(command: Command, config: &Config, pool: PgPool) -> anyhow::Result<()> {
    match command {
        Command::Serve => anyhow::bail!("serve is handled by the server entry point"),
        Command::ExportDb { output } => export_db::run(&pool, &output).await,
        Command::ExportXlsx(args) => export_xlsx::run(&pool, args).await,
        Command::SeedDemo {
            teacher,
            student,
            count,
        } => seed_demo::run(pool, &teacher, &student, count).await,
        Command::IssueToken { username, ttl_secs } => {
            issue_token::run(config, pool, &username, ttl_secs).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["school-core"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_seed_demo_defaults() {
        let cli = Cli::try_parse_from(["school-core", "seed-demo"]).unwrap();
        match cli.command {
            Some(Command::SeedDemo {
                teacher,
                student,
                count,
            }) => {
                assert_eq!(teacher, "teacher");
                assert_eq!(student, "student");
                assert_eq!(count, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_export_xlsx_needs_exactly_one_column_selection() {
        assert!(Cli::try_parse_from(["school-core", "export-xlsx", "course"]).is_err());
        assert!(Cli::try_parse_from([
            "school-core",
            "export-xlsx",
            "course",
            "--all",
            "--fields",
            "title"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["school-core", "export-xlsx", "course", "--all"]).is_ok());
        assert!(
            Cli::try_parse_from(["school-core", "export-xlsx", "course", "--fields", "title,price"])
                .is_ok()
        );
    }

    #[test]
    fn test_export_db_default_output() {
        let cli = Cli::try_parse_from(["school-core", "export-db"]).unwrap();
        match cli.command {
            Some(Command::ExportDb { output }) => assert_eq!(output, PathBuf::from("db_dump.json")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
