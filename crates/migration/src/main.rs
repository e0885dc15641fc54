use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "Usage: cargo run -p migration -- [up [N]|down [N]|fresh|status|pending]";

/// Runner commands. `up`/`down` take an optional number of steps.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Up(Option<u32>),
    Down(Option<u32>),
    Fresh,
    Status,
    /// Exit with status 1 when the ledger schema is behind.
    Pending,
}

fn parse_command(mut args: impl Iterator<Item = String>) -> Option<Command> {
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let steps = match args.next() {
        Some(raw) => Some(raw.parse::<u32>().ok()?),
        None => None,
    };

    match (cmd.as_str(), steps) {
        ("up", steps) => Some(Command::Up(steps)),
        ("down", steps) => Some(Command::Down(steps)),
        ("fresh", None) => Some(Command::Fresh),
        ("status", None) => Some(Command::Status),
        ("pending", None) => Some(Command::Pending),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(command) = parse_command(std::env::args().skip(1)) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./tally.db?mode=rwc".to_string());

    let db = Database::connect(&db_url).await?;

    match command {
        Command::Up(steps) => migration::Migrator::up(&db, steps).await?,
        Command::Down(steps) => migration::Migrator::down(&db, steps).await?,
        Command::Fresh => migration::Migrator::fresh(&db).await?,
        Command::Status => migration::Migrator::status(&db).await?,
        Command::Pending => {
            let pending = migration::Migrator::get_pending_migrations(&db).await?;
            for pending_migration in &pending {
                println!("pending: {}", pending_migration.name());
            }
            if !pending.is_empty() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Command> {
        parse_command(args.iter().map(|a| ToString::to_string(a)))
    }

    #[test]
    fn defaults_to_up() {
        assert_eq!(parse(&[]), Some(Command::Up(None)));
    }

    #[test]
    fn steps_only_for_up_and_down() {
        assert_eq!(parse(&["down", "1"]), Some(Command::Down(Some(1))));
        assert_eq!(parse(&["up", "2"]), Some(Command::Up(Some(2))));
        assert_eq!(parse(&["fresh", "1"]), None);
        assert_eq!(parse(&["down", "x"]), None);
        assert_eq!(parse(&["sideways"]), None);
    }
}
