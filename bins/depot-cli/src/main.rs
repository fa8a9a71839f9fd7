//! Depot CLI: drive a persisted custody chain from the command line.

mod scenario;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use depot_core::Address;
use depot_custody::{Chain, CustodyConfig, Snapshot};

#[derive(Parser)]
#[command(name = "depot-cli")]
#[command(version, about = "Depot custody chain CLI")]
struct Cli {
    /// Chain snapshot file. Defaults to ~/.depot/chain.json.
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log format: "text" or "json".
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh chain snapshot.
    Init(InitArgs),
    /// Replay a scenario file against the chain and save the result.
    Run(RunArgs),
    /// Show wallets, forwarders, balances and events.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct InitArgs {
    /// TOML configuration file. `DEPOT__*` environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replace an existing snapshot.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct RunArgs {
    /// Scenario file: a JSON list of {caller, call} steps.
    scenario: PathBuf,

    /// Stop at the first reverted call.
    #[arg(long)]
    fail_fast: bool,

    /// Replay without saving the resulting chain.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// Show a single account instead of the whole chain.
    #[arg(short, long)]
    account: Option<Address>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let state = resolve_state_path(cli.state)?;
    match cli.command {
        Commands::Init(args) => cmd_init(&state, args),
        Commands::Run(args) => cmd_run(&state, args),
        Commands::Inspect(args) => cmd_inspect(&state, args),
    }
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    // Stdout carries command output; logs go to stderr.
    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn resolve_state_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".depot").join("chain.json"))
}

fn load_chain(path: &Path) -> Result<Chain> {
    let snapshot = Snapshot::load(path)
        .with_context(|| format!("Failed to load chain from {} (run `init` first?)", path.display()))?;
    Ok(Chain::from_snapshot(snapshot))
}

fn save_chain(chain: &Chain, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    chain
        .snapshot()
        .save(path)
        .with_context(|| format!("Failed to save chain to {}", path.display()))
}

fn cmd_init(path: &Path, args: InitArgs) -> Result<()> {
    if path.exists() && !args.force {
        bail!(
            "Chain already exists at {}. Pass --force to replace it.",
            path.display()
        );
    }
    let config = CustodyConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let chain = Chain::new(config);
    save_chain(&chain, path)?;

    info!(path = %path.display(), "chain initialized");
    println!("Chain initialized at {}", path.display());
    println!("  forward policy: {:?}", chain.config().forward_policy);
    println!("  max batch:      {}", chain.config().max_batch);
    println!("  max call depth: {}", chain.config().max_call_depth);
    Ok(())
}

fn cmd_run(path: &Path, args: RunArgs) -> Result<()> {
    let mut chain = load_chain(path)?;
    let json = fs::read_to_string(&args.scenario)
        .with_context(|| format!("Failed to read scenario {}", args.scenario.display()))?;
    let steps = scenario::parse(&json)?;

    let reports = scenario::run(&mut chain, &steps, args.fail_fast)?;
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }

    let reverted = reports.iter().filter(|r| r.is_reverted()).count();
    info!(steps = reports.len(), reverted, "scenario replayed");

    if !args.dry_run {
        save_chain(&chain, path)?;
    }
    Ok(())
}

fn cmd_inspect(path: &Path, args: InspectArgs) -> Result<()> {
    let chain = load_chain(path)?;
    match args.account {
        Some(account) => print_account(&chain, &account),
        None => print_chain(&chain),
    }
    Ok(())
}

fn print_account(chain: &Chain, account: &Address) {
    let state = chain.state();
    println!("Account:  {account}");
    if let Some(wallet) = state.wallet(account) {
        println!("Kind:     wallet (owner {})", wallet.owner());
        println!("Forwarders: {}", wallet.forwarders().len());
    } else if let Some(forwarder) = state.forwarder(account) {
        println!("Kind:     forwarder (parent {})", forwarder.parent());
    } else if state.tokens().contains(account) {
        println!("Kind:     token");
    } else {
        println!("Kind:     plain account");
    }
    println!("Balance:  {}", chain.balance(account));

    for (token, ledger) in state.tokens().tokens() {
        if let Some((_, amount)) = ledger.holders().find(|(holder, _)| *holder == account) {
            println!("Token {token}: {amount}");
        }
    }

    let events: Vec<_> = chain.log().by_emitter(account).collect();
    if !events.is_empty() {
        println!("Events:");
        for event in events {
            println!("  {event}");
        }
    }
}

fn print_chain(chain: &Chain) {
    let state = chain.state();

    println!("Wallets:");
    for wallet in state.wallets() {
        println!(
            "  {}  owner {}  forwarders {}  balance {}",
            wallet.address(),
            wallet.owner(),
            wallet.forwarders().len(),
            chain.balance(&wallet.address())
        );
    }

    println!("Forwarders:");
    for forwarder in state.forwarders() {
        println!(
            "  {}  parent {}  balance {}",
            forwarder.address(),
            forwarder.parent(),
            chain.balance(&forwarder.address())
        );
    }

    println!("Tokens:");
    for (token, ledger) in state.tokens().tokens() {
        let paused = if ledger.paused { "  (paused)" } else { "" };
        println!(
            "  {token}  issuer {}  supply {}{paused}",
            ledger.issuer,
            ledger.total_supply()
        );
    }

    println!("Balances:");
    for (account, balance) in state.ledger().accounts() {
        println!("  {account}  {balance}");
    }

    println!("Events: {}", chain.log().len());
    for entry in chain.log().entries() {
        println!("  {}  {}", entry.emitter, entry.event);
    }
}
