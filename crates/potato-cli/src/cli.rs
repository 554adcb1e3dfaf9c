use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "potato",
    about = "Hot potato custody ledger: create, pass, and trace potatoes",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Chain store file (overrides `data_path` from the config file)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a potato held by its creator
    Create(CreateArgs),
    /// Pass a potato from its holder to someone else
    Transfer(TransferArgs),
    /// List potatoes an actor created or currently holds
    Query(QueryArgs),
    /// Show one potato and its custody chain
    Show(ShowArgs),
    /// List every stored potato
    List(ListArgs),
    /// Audit the stored chains for invariant violations
    Verify(VerifyArgs),
    /// Start the HTTP server
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    pub creator: String,
    #[arg(long)]
    pub score: Option<u64>,
}

#[derive(Args)]
pub struct TransferArgs {
    pub potato: String,
    #[arg(long = "from")]
    pub sender: String,
    #[arg(long = "to")]
    pub receiver: String,
}

#[derive(Args)]
pub struct QueryArgs {
    pub actor: String,
}

#[derive(Args)]
pub struct ShowArgs {
    pub potato: String,
}

#[derive(Args)]
pub struct ListArgs {}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (overrides `bind_addr` from the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_create() {
        let cli = Cli::try_parse_from(["potato", "create", "alice"]).unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.creator, "alice");
            assert_eq!(args.score, None);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_create_with_score() {
        let cli = Cli::try_parse_from(["potato", "create", "alice", "--score", "42"]).unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.score, Some(42));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_transfer() {
        let cli = Cli::try_parse_from([
            "potato", "transfer", "abc", "--from", "alice", "--to", "bob",
        ])
        .unwrap();
        if let Command::Transfer(args) = cli.command {
            assert_eq!(args.potato, "abc");
            assert_eq!(args.sender, "alice");
            assert_eq!(args.receiver, "bob");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn transfer_requires_both_parties() {
        assert!(Cli::try_parse_from(["potato", "transfer", "abc", "--from", "alice"]).is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "potato",
            "list",
            "--data",
            "/tmp/p.json",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.data, Some(PathBuf::from("/tmp/p.json")));
    }

    #[test]
    fn parse_serve_bind() {
        let cli = Cli::try_parse_from(["potato", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind.map(|a| a.port()), Some(9000));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_serve_rejects_bad_address() {
        assert!(Cli::try_parse_from(["potato", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_verify() {
        let cli = Cli::try_parse_from(["potato", "verify"]).unwrap();
        assert!(matches!(cli.command, Command::Verify(_)));
        assert_eq!(cli.format, OutputFormat::Text);
    }
}
