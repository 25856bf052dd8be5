//! Delegated-authority CLI — `dauth` command.
//!
//! Drives a ledger persisted as a single JSON file: fund accounts, move the
//! logical clock, submit signed batches, and inspect controllers, permission
//! registries and plugin state.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::Engine as _;
use clap::{Parser, Subcommand};
use log::debug;
use serde::Deserialize;

use delegated_authority::storage::{load_ledger, save_ledger, ReceiptStore};
use delegated_authority::{
    Address, AppId, AssetId, BatchBuilder, ControllerView, KeyPair, Ledger, LedgerState,
    Operation, ProgramKind, Quota, RecoveryPhase, RecoveryState, Schedule, SpendingLimitConfig,
    NATIVE_ASSET,
};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn dauth_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("DAUTH_HOME") {
        return Ok(PathBuf::from(home));
    }
    let home = std::env::var("HOME").context("neither DAUTH_HOME nor HOME is set")?;
    Ok(PathBuf::from(home).join(".dauth"))
}

fn default_state_path() -> Result<PathBuf> {
    Ok(dauth_home()?.join("ledger.json"))
}

fn receipt_dir(state_path: &Path) -> PathBuf {
    state_path
        .parent()
        .map(|p| p.join("receipts"))
        .unwrap_or_else(|| PathBuf::from("receipts"))
}

// ── Formatting helpers ────────────────────────────────────────────────────────

fn micros_to_datetime(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_expiry(expiry: u64, now: u64) -> String {
    if expiry == u64::MAX {
        "never".to_string()
    } else if expiry <= now {
        format!("{expiry} (expired)")
    } else {
        expiry.to_string()
    }
}

/// Accept either a base58 address or the name of a development key.
fn resolve_account(s: &str) -> Address {
    Address::parse(s).unwrap_or_else(|_| KeyPair::dev(s).address())
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Delegated-authority CLI — run signed batches against a local ledger.
#[derive(Parser, Debug)]
#[command(
    name = "dauth",
    about = "Delegated-authority ledger CLI",
    version,
    long_about = "dauth — delegated-authority ledger CLI\n\nFund accounts, deploy controllers and plugins, submit signed batches,\nand inspect permission registries on a local ledger file."
)]
struct Cli {
    /// Ledger file (default: $DAUTH_HOME/ledger.json or ~/.dauth/ledger.json)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty ledger file
    Init {
        /// Overwrite an existing ledger
        #[arg(long)]
        force: bool,
    },

    /// Print the address of a development key
    Address {
        /// Key name
        name: String,
    },

    /// Credit an account outside any batch
    Fund {
        /// Address or development key name
        account: String,

        /// Amount to credit
        #[arg(long)]
        amount: u64,

        /// Asset id (default: native asset)
        #[arg(long, default_value_t = NATIVE_ASSET)]
        asset: AssetId,
    },

    /// Inspect or move the logical clock
    Clock {
        #[command(subcommand)]
        subcommand: ClockCommands,
    },

    /// Sign and submit a batch described by a JSON file
    Submit {
        /// JSON array of {"signer": "<key name>", "operation": {...}}
        file: PathBuf,
    },

    /// Inspect ledger state
    Show {
        #[command(subcommand)]
        subcommand: ShowCommands,
    },

    /// Committed batch receipts
    Receipts {
        #[command(subcommand)]
        subcommand: ReceiptCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ClockCommands {
    /// Print the current clock value
    Show,
    /// Move the clock forward
    Advance { delta: u64 },
    /// Set the clock to an absolute value (never backwards)
    Set { value: u64 },
}

#[derive(Subcommand, Debug)]
enum ShowCommands {
    /// Balances and authority of an account
    Account {
        /// Address or development key name
        account: String,
    },
    /// Admin, controlled account and authority state of a controller
    Controller { app: u64 },
    /// Permission registry of a controller
    Permissions { app: u64 },
    /// A spender's quota on a spending-limit plugin
    Quota {
        app: u64,

        /// Address or development key name
        #[arg(long)]
        spender: String,

        #[arg(long, default_value_t = NATIVE_ASSET)]
        asset: AssetId,
    },
    /// State of a recovery plugin
    Recovery { app: u64 },
    /// State of a scheduled-payment plugin
    Schedule { app: u64 },
}

#[derive(Subcommand, Debug)]
enum ReceiptCommands {
    /// List receipts in commit order
    List {
        /// Show only the most recent N receipts
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// One entry of a batch file.
#[derive(Debug, Deserialize)]
struct BatchEntry {
    /// Development key that signs the operation.
    signer: String,
    operation: Operation,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let state_path = match cli.state {
        Some(path) => path,
        None => default_state_path()?,
    };
    let verbose = cli.verbose;

    match cli.command {
        Commands::Init { force } => cmd_init(&state_path, force),
        Commands::Address { name } => cmd_address(&name),
        Commands::Fund {
            account,
            amount,
            asset,
        } => cmd_fund(&state_path, &account, asset, amount),
        Commands::Clock { subcommand } => match subcommand {
            ClockCommands::Show => cmd_clock_show(&state_path),
            ClockCommands::Advance { delta } => cmd_clock_advance(&state_path, delta),
            ClockCommands::Set { value } => cmd_clock_set(&state_path, value),
        },
        Commands::Submit { file } => cmd_submit(&state_path, &file, verbose),
        Commands::Show { subcommand } => match subcommand {
            ShowCommands::Account { account } => cmd_show_account(&state_path, &account),
            ShowCommands::Controller { app } => cmd_show_controller(&state_path, AppId(app)),
            ShowCommands::Permissions { app } => cmd_show_permissions(&state_path, AppId(app)),
            ShowCommands::Quota {
                app,
                spender,
                asset,
            } => cmd_show_quota(&state_path, AppId(app), &spender, asset),
            ShowCommands::Recovery { app } => cmd_show_recovery(&state_path, AppId(app)),
            ShowCommands::Schedule { app } => cmd_show_schedule(&state_path, AppId(app)),
        },
        Commands::Receipts { subcommand } => match subcommand {
            ReceiptCommands::List { limit } => cmd_receipts_list(&state_path, limit),
        },
    }
}

// ── Ledger file helpers ───────────────────────────────────────────────────────

fn open_ledger(path: &Path) -> Result<Ledger> {
    let state = load_ledger(path).with_context(|| {
        format!(
            "failed to open ledger {} (run `dauth init` first)",
            path.display()
        )
    })?;
    Ok(Ledger::from_state(state))
}

fn persist(path: &Path, ledger: &Ledger) -> Result<()> {
    save_ledger(ledger.state(), path)
        .with_context(|| format!("failed to write ledger {}", path.display()))
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "ledger already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    save_ledger(&LedgerState::default(), path)
        .with_context(|| format!("failed to create ledger {}", path.display()))?;
    println!("Initialized empty ledger at {}", path.display());
    Ok(())
}

fn cmd_address(name: &str) -> Result<()> {
    let key = KeyPair::dev(name);
    let address = key.address();
    println!("{address}");
    debug!(
        "public key (base64): {}",
        base64::engine::general_purpose::STANDARD.encode(address.as_bytes())
    );
    Ok(())
}

fn cmd_fund(path: &Path, account: &str, asset: AssetId, amount: u64) -> Result<()> {
    let mut ledger = open_ledger(path)?;
    let address = resolve_account(account);
    ledger.mint(&address, asset, amount)?;
    persist(path, &ledger)?;
    println!(
        "Funded {address} with {amount} of asset {asset} (balance {})",
        ledger.balance(&address, asset)
    );
    Ok(())
}

fn cmd_clock_show(path: &Path) -> Result<()> {
    let ledger = open_ledger(path)?;
    println!("{}", ledger.clock());
    Ok(())
}

fn cmd_clock_advance(path: &Path, delta: u64) -> Result<()> {
    let mut ledger = open_ledger(path)?;
    let now = ledger.advance_clock(delta);
    persist(path, &ledger)?;
    println!("Clock: {now}");
    Ok(())
}

fn cmd_clock_set(path: &Path, value: u64) -> Result<()> {
    let mut ledger = open_ledger(path)?;
    ledger.set_clock(value)?;
    persist(path, &ledger)?;
    println!("Clock: {value}");
    Ok(())
}

fn cmd_submit(path: &Path, file: &Path, verbose: bool) -> Result<()> {
    let mut ledger = open_ledger(path)?;

    let raw = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let entries: Vec<BatchEntry> = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse batch file {}", file.display()))?;
    if entries.is_empty() {
        bail!("batch file {} contains no operations", file.display());
    }

    let keys: Vec<KeyPair> = entries.iter().map(|e| KeyPair::dev(&e.signer)).collect();
    let mut builder = BatchBuilder::new();
    for (entry, key) in entries.into_iter().zip(&keys) {
        debug!("signing operation from {} with key '{}'", entry.operation.sender, entry.signer);
        builder = builder.push(entry.operation, key);
    }
    let batch = builder.build(&ledger)?;

    if verbose {
        for (i, signed) in batch.iter().enumerate() {
            println!(
                "  [{i}] signer {} nonce {} sig {}",
                signed.signer, signed.operation.nonce, signed.signature
            );
        }
    }

    let receipt = ledger.submit(&batch).map_err(|e| anyhow!("batch rejected: {e}"))?;
    persist(path, &ledger)?;
    ReceiptStore::new(receipt_dir(path))?.save(&receipt)?;

    println!("Committed {}", receipt.id);
    println!("  Clock:      {}", receipt.clock);
    println!(
        "  Committed:  {}",
        delegated_authority::time::micros_to_rfc3339(receipt.committed_at)
    );
    println!("  Operations: {}", receipt.operations);
    println!("  Inner ops:  {}", receipt.inner_operations);
    for app in &receipt.created_apps {
        println!("  Created:    {app} ({})", ledger.app(*app)?.kind);
    }
    Ok(())
}

fn cmd_show_account(path: &Path, account: &str) -> Result<()> {
    let ledger = open_ledger(path)?;
    let address = resolve_account(account);
    let state = ledger.state().account(&address);

    println!("Account: {address}");
    let auth = ledger.auth_addr(&address);
    if auth.is_zero() {
        println!("  Authority: self");
    } else {
        println!("  Authority: {auth}");
    }
    println!("  Nonce:     {}", state.nonce);
    if state.balances.is_empty() {
        println!("  Balances:  none");
    } else {
        println!("  Balances:");
        for (asset, amount) in &state.balances {
            println!("    asset {asset:<6} {amount}");
        }
    }
    Ok(())
}

fn cmd_show_controller(path: &Path, app: AppId) -> Result<()> {
    let ledger = open_ledger(path)?;
    let view = ControllerView::load(&ledger, app)?;

    println!("Controller: {app} ({})", app.address());
    println!("  Admin:      {}", view.admin());
    println!("  Controlled: {}", view.controlled());
    println!("  Authority:  {}", ledger.effective_signer(&view.controlled()));
    println!("  At rest:    {}", if view.is_at_rest() { "yes" } else { "no" });
    println!("  Permissions: {}", view.permissions().len());
    Ok(())
}

fn cmd_show_permissions(path: &Path, app: AppId) -> Result<()> {
    let ledger = open_ledger(path)?;
    let view = ControllerView::load(&ledger, app)?;
    let now = ledger.clock();

    if view.permissions().is_empty() {
        println!("No permissions granted on {app}.");
        return Ok(());
    }
    println!("{:<12} {:<46} EXPIRY", "DELEGATE", "CALLER");
    for entry in view.permissions() {
        println!(
            "{:<12} {:<46} {}",
            entry.delegate.to_string(),
            entry.scope.to_string(),
            format_expiry(entry.expiry, now)
        );
    }
    Ok(())
}

fn cmd_show_quota(path: &Path, app: AppId, spender: &str, asset: AssetId) -> Result<()> {
    let ledger = open_ledger(path)?;
    if ledger.app(app)?.kind != ProgramKind::SpendingLimit {
        bail!("{app} is not a spending-limit plugin");
    }
    let config = SpendingLimitConfig::load(&ledger, app)?;
    let spender = resolve_account(spender);
    let quota = Quota::load(&ledger, app, &spender, asset)?
        .ok_or_else(|| anyhow!("no limit for {spender} on asset {asset}"))?;
    let now = ledger.clock();

    println!("Quota: {spender} on asset {asset}");
    println!("  Limit:        {}", quota.limit);
    println!("  Window size:  {}", config.window_size);
    println!("  Window start: {}", quota.window_start);
    println!("  Spent:        {}", quota.spent);
    println!("  Remaining:    {}", quota.remaining(now, config.window_size));
    Ok(())
}

fn cmd_show_recovery(path: &Path, app: AppId) -> Result<()> {
    let ledger = open_ledger(path)?;
    let state = RecoveryState::load(&ledger, app)?;

    println!("Recovery: {app}");
    println!("  Controller:   {}", state.controller);
    println!("  Agent:        {}", state.recovery_agent);
    println!("  Grace window: {}", state.grace_window);
    match state.phase() {
        RecoveryPhase::Idle => println!("  Phase:        idle"),
        RecoveryPhase::Pending { since } => {
            println!("  Phase:        pending since {since}");
            if let Some(at) = state.finalizable_at() {
                println!("  Finalizable:  {at}");
            }
        }
    }
    Ok(())
}

fn cmd_show_schedule(path: &Path, app: AppId) -> Result<()> {
    let ledger = open_ledger(path)?;
    let schedule = Schedule::load(&ledger, app)?;

    println!("Schedule: {app}");
    println!("  Controller: {}", schedule.controller);
    println!("  Receiver:   {}", schedule.receiver);
    println!("  Payment:    {} of asset {}", schedule.amount, schedule.asset);
    println!("  Interval:   {}", schedule.interval);
    match schedule.last_paid_at {
        Some(t) => println!("  Last paid:  {t}"),
        None => println!("  Last paid:  never"),
    }
    println!("  Next due:   {}", schedule.next_due());
    Ok(())
}

fn cmd_receipts_list(path: &Path, limit: Option<usize>) -> Result<()> {
    let store = ReceiptStore::new(receipt_dir(path))?;
    let receipts = store.load_all()?;
    if receipts.is_empty() {
        println!("No receipts.");
        return Ok(());
    }

    let skip = limit.map_or(0, |n| receipts.len().saturating_sub(n));
    for receipt in receipts.iter().skip(skip) {
        println!(
            "{}  clock={} ops={} inner={}  {}",
            receipt.id,
            receipt.clock,
            receipt.operations,
            receipt.inner_operations,
            micros_to_datetime(receipt.committed_at)
        );
    }
    Ok(())
}
