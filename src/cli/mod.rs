pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "marketplace")]
#[command(about = "Marketplace admin CLI - migrations, development tokens and SMS checks")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply database migrations to DATABASE_URL")]
    Migrate,

    #[command(about = "Mint a development JWT with the configured secret")]
    Token(commands::token::TokenArgs),

    #[command(name = "sms-test", about = "Send a test SMS through a country's configured provider")]
    SmsTest(commands::sms::SmsTestArgs),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::SmsTest(args) => commands::sms::handle(args, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_command_with_global_json_flag() {
        let cli = Cli::try_parse_from([
            "marketplace",
            "token",
            "--user-id",
            "7f0c1a52-1d4b-4c59-9a38-0e4b0f4f3c11",
            "--role",
            "country_admin",
            "--country",
            "lk",
            "--json",
        ])
        .unwrap();

        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Token(args) => {
                assert_eq!(args.role, "country_admin");
                assert_eq!(args.country.as_deref(), Some("lk"));
            }
            _ => panic!("expected token command"),
        }
    }

    #[test]
    fn sms_test_requires_destination() {
        assert!(Cli::try_parse_from(["marketplace", "sms-test", "--country", "LK"]).is_err());
    }
}
