//! Group-home CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the schema and the session table
//! gh-cli migrate
//!
//! # Insert system roles, departments and the demo admin
//! gh-cli seed
//!
//! # Create a staff member
//! gh-cli user create -e hanako@example.jp -n "山田 花子" -r staff
//!
//! # Export residents from a running server
//! gh-cli export residents --out residents.json
//! ```
//!
//! Database commands read `GROUPHOME_DATABASE_URL` (or `DATABASE_URL`) and
//! the rest of the server configuration from the environment or `.env`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

use commands::export::Entity;

#[derive(Parser)]
#[command(name = "gh-cli")]
#[command(author, version, about = "Group-home admin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert system roles, departments and the demo admin
    Seed {
        /// Department to create (repeatable); defaults to a standard set
        #[arg(short, long = "department")]
        departments: Vec<String>,
    },
    /// Manage staff members
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Export one entity from a running server as snake_case JSON
    Export {
        entity: Entity,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:3001")]
        server: String,

        /// Month (`YYYY-MM`), required for usage records
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new staff member
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role name (`admin`, `staff`, `payroll` or a custom role)
        #[arg(short, long, default_value = "staff")]
        role: String,

        /// Hire date (`YYYY-MM-DD`)
        #[arg(long)]
        hire_date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { departments } => commands::seed::run(&departments).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                role,
                hire_date,
            } => {
                commands::user::create(&email, &name, &role, hire_date).await?;
            }
        },
        Commands::Export {
            entity,
            out,
            server,
            month,
        } => {
            commands::export::run(entity, &out, &server, month.as_deref()).await?;
        }
    }
    Ok(())
}
