use anyhow::Context;
use colored::Colorize;
use potato_custody::{AuditReport, CustodyError, OwnershipService, Rejection};
use potato_server::{DynOwnershipService, PotatoServer, ServerConfig};
use potato_store::JsonFileChainStore;
use potato_types::{Potato, PotatoId};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Create(args) => cmd_create(&open_service(&config)?, args, format),
        Command::Transfer(args) => cmd_transfer(&open_service(&config)?, args, format),
        Command::Query(args) => cmd_query(&open_service(&config)?, args, format),
        Command::Show(args) => cmd_show(&open_service(&config)?, args, format),
        Command::List(_) => cmd_list(&open_service(&config)?, format),
        Command::Verify(_) => cmd_verify(&open_service(&config)?, format),
        Command::Serve(args) => cmd_serve(config, args),
    }
}

/// Config file first, then command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    Ok(config)
}

fn open_service(config: &ServerConfig) -> anyhow::Result<DynOwnershipService> {
    let resolver = config.resolver.build()?;
    tracing::debug!(data = %config.data_path.display(), "opening chain store");
    Ok(OwnershipService::new(
        Box::new(JsonFileChainStore::new(&config.data_path)),
        resolver,
    ))
}

/// A malformed id cannot name a stored potato.
fn parse_potato_id(raw: &str) -> Result<PotatoId, CustodyError> {
    raw.parse().map_err(|_| {
        CustodyError::Rejected(Rejection::NotFound {
            potato_id: raw.to_string(),
        })
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_potato(potato: &Potato) {
    println!(
        "Potato {}  ({})",
        potato.id().to_string().yellow().bold(),
        potato.state().to_string().cyan()
    );
    println!("  Creator: {}", potato.creator().as_str().bold());
    println!("  Holder:  {}", potato.current_holder().as_str().green());
    println!("  Created: {}", potato.created_at().to_rfc3339());
    if let Some(score) = potato.score() {
        println!("  Score:   {score}");
    }
    let chain: Vec<&str> = potato.chain().iter().map(|a| a.as_str()).collect();
    println!("  Chain:   {}", chain.join(" → "));
}

fn print_summary(potato: &Potato) {
    println!(
        "{}  {} → {}  ({} handoffs)",
        potato.id().short_id().yellow(),
        potato.creator().as_str(),
        potato.current_holder().as_str().green(),
        potato.handoff_count()
    );
}

fn cmd_create(
    service: &DynOwnershipService,
    args: CreateArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let potato = service.create_with_score(&args.creator, args.score)?;
    match format {
        OutputFormat::Json => print_json(&potato),
        OutputFormat::Text => {
            println!("{} Potato created", "✓".green().bold());
            print_potato(&potato);
            Ok(())
        }
    }
}

fn cmd_transfer(
    service: &DynOwnershipService,
    args: TransferArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let id = parse_potato_id(&args.potato)?;
    let potato = service
        .transfer(&id, &args.sender, &args.receiver)
        .with_context(|| format!("transfer of {} refused", args.potato))?;
    match format {
        OutputFormat::Json => print_json(&potato),
        OutputFormat::Text => {
            println!(
                "{} Passed from {} to {}",
                "✓".green().bold(),
                args.sender.bold(),
                potato.current_holder().as_str().green().bold()
            );
            print_potato(&potato);
            Ok(())
        }
    }
}

fn cmd_query(
    service: &DynOwnershipService,
    args: QueryArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let potatoes = service.query_by_actor(&args.actor)?;
    match format {
        OutputFormat::Json => print_json(&potatoes),
        OutputFormat::Text => {
            println!(
                "Created by {} ({}):",
                args.actor.bold(),
                potatoes.created.len()
            );
            for potato in &potatoes.created {
                print!("  ");
                print_summary(potato);
            }
            println!("Held by {} ({}):", args.actor.bold(), potatoes.held.len());
            for potato in &potatoes.held {
                print!("  ");
                print_summary(potato);
            }
            Ok(())
        }
    }
}

fn cmd_show(
    service: &DynOwnershipService,
    args: ShowArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let id = parse_potato_id(&args.potato)?;
    let potato = service.get(&id)?.ok_or_else(|| {
        CustodyError::Rejected(Rejection::NotFound {
            potato_id: args.potato.clone(),
        })
    })?;
    match format {
        OutputFormat::Json => print_json(&potato),
        OutputFormat::Text => {
            print_potato(&potato);
            Ok(())
        }
    }
}

fn cmd_list(service: &DynOwnershipService, format: OutputFormat) -> anyhow::Result<()> {
    let potatoes = service.list()?;
    match format {
        OutputFormat::Json => print_json(&potatoes),
        OutputFormat::Text => {
            if potatoes.is_empty() {
                println!("No potatoes.");
            }
            for potato in &potatoes {
                print_summary(potato);
            }
            Ok(())
        }
    }
}

fn cmd_verify(service: &DynOwnershipService, format: OutputFormat) -> anyhow::Result<()> {
    let report = service.audit()?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }
    if !report.is_valid() {
        anyhow::bail!("{} custody violation(s) found", report.violations.len());
    }
    Ok(())
}

fn print_report(report: &AuditReport) {
    if report.is_valid() {
        println!("{} Custody chains verified", "✓".green().bold());
    } else {
        println!("{} Custody chains have violations", "✗".red().bold());
    }
    println!("  Potatoes: {}", report.potato_count.to_string().bold());
    println!("  Handoffs: {}", report.handoff_count.to_string().bold());
    for violation in &report.violations {
        let at = violation
            .position
            .map(|p| format!(" @{p}"))
            .unwrap_or_default();
        println!(
            "  {} {}{}: {}",
            "✗".red(),
            violation.potato_id.short_id().yellow(),
            at,
            violation.description
        );
    }
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let server = PotatoServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}
