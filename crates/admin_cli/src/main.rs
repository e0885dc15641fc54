use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{AggregateReport, Engine};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "tally_admin")]
#[command(about = "Admin utilities for Tally (open accounts, verify and reconcile totals)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./tally.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Create the aggregate row of a user, with both totals at zero.
    Open(UserArgs),
    /// Print the stored totals.
    Show(UserArgs),
    /// Compare the stored totals with the ledger. Exits with 1 on drift.
    Verify(UserArgs),
    /// Recompute the totals from the ledger and store them.
    Reconcile(UserArgs),
}

#[derive(Args, Debug)]
struct UserArgs {
    #[arg(long)]
    user: String,
}

fn print_report(report: &AggregateReport) {
    println!(
        "{}: {} entries, stored balance {} budget {}, ledger balance {} budget {}",
        report.user_id,
        report.entries,
        report.stored.total_balance,
        report.stored.total_budget,
        report.derived.total_balance,
        report.derived.total_budget,
    );
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    let Command::Account(Account { command }) = cli.command;
    match command {
        AccountCommand::Open(args) => {
            let aggregate = engine.open_account(&args.user).await?;
            println!("opened account: {}", aggregate.user_id);
        }
        AccountCommand::Show(args) => {
            let aggregate = engine.aggregate(&args.user).await?;
            println!(
                "{}: balance {} budget {} (updated {})",
                aggregate.user_id,
                aggregate.total_balance,
                aggregate.total_budget,
                aggregate.updated_at
            );
        }
        AccountCommand::Verify(args) => {
            let report = engine.verify_aggregate(&args.user).await?;
            print_report(&report);
            if !report.is_consistent() {
                let drift = report.drift();
                eprintln!(
                    "drift: balance {} budget {}",
                    drift.total_balance, drift.total_budget
                );
                std::process::exit(1);
            }
        }
        AccountCommand::Reconcile(args) => {
            let report = engine.recompute_aggregate(&args.user).await?;
            print_report(&report);
            if report.is_consistent() {
                println!("already consistent");
            } else {
                println!("totals rewritten from the ledger");
            }
        }
    }

    Ok(())
}
