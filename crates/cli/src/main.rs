//! Earth Click command-line client.
//!
//! Headless front end for the on-chain clicker: register, accumulate clicks
//! in an interactive session, submit them for the fixed fee, read the
//! leaderboards. Can also run the same-origin RPC proxy.

use std::io::Write;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use click_gateway::chain::{self, SUBMIT_FEE};
use click_gateway::{retry_read, ContractGateway};
use click_session::{RegistrationState, SessionError, SubmitOutcome, COUNTRIES};
use rpc_proxy::{ProxyConfig, RpcProxy};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod context;

use context::AppContext;

/// Read retries: fixed short interval, bounded attempts.
const READ_ATTEMPTS: u32 = 3;
const READ_INTERVAL: Duration = Duration::from_secs(2);

/// Earth Click on-chain clicker client
#[derive(Parser, Debug)]
#[command(name = "earth-click")]
#[command(about = "Click, submit points on-chain, climb the country leaderboards", long_about = None)]
struct Args {
    /// JSON-RPC endpoint (direct, or a proxy's /api/rpc path)
    #[arg(long, default_value = chain::DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Contract address override
    #[arg(long)]
    contract: Option<Address>,

    /// Wallet address used as transaction sender (node-managed account)
    #[arg(long)]
    from: Option<Address>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a username and country for the wallet address
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        country: String,
    },
    /// Interactive click session
    Play,
    /// Authoritative record and balance for the wallet address
    Status,
    /// Leaderboards read from the contract
    Leaderboard {
        #[command(subcommand)]
        board: Board,
    },
    /// List the supported countries
    Countries,
    /// Run the same-origin RPC proxy
    Proxy {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1:3000")]
        listen: String,
        /// Upstream JSON-RPC endpoint
        #[arg(long)]
        upstream: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum Board {
    /// Country totals, best first
    Countries {
        #[arg(long, default_value_t = 100)]
        limit: u64,
    },
    /// Top players in one country
    Players {
        country: String,
        #[arg(long, default_value_t = 100)]
        limit: u64,
    },
    /// Every country with player counts
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Args {
        rpc_url,
        contract,
        from,
        command,
        ..
    } = args;

    match command {
        Command::Register { username, country } => {
            let ctx = connect(rpc_url, contract, from)?;
            run_register(ctx, &username, &country).await
        }
        Command::Play => {
            let ctx = connect(rpc_url, contract, from)?;
            run_play(ctx).await
        }
        Command::Status => {
            let ctx = connect(rpc_url, contract, from)?;
            run_status(ctx).await
        }
        Command::Leaderboard { board } => {
            let ctx = AppContext::connect(rpc_url, contract, Address::ZERO)?;
            run_leaderboard(ctx, board).await
        }
        Command::Countries => {
            for (index, country) in COUNTRIES.iter().enumerate() {
                println!("{:>3}. {}", index + 1, country);
            }
            Ok(())
        }
        Command::Proxy { listen, upstream } => run_proxy(listen, upstream).await,
    }
}

/// Context for commands that act as the wallet; `--from` is required.
fn connect(rpc_url: String, contract: Option<Address>, from: Option<Address>) -> Result<AppContext> {
    let Some(from) = from else {
        bail!("this command needs a wallet address: pass --from <address>");
    };
    AppContext::connect(rpc_url, contract, from)
}

async fn run_register(mut ctx: AppContext, username: &str, country: &str) -> Result<()> {
    refresh(&mut ctx).await?;
    if ctx.session.registration() == RegistrationState::Registered {
        let record = ctx.session.record().map(|r| r.username.clone()).unwrap_or_default();
        println!("Already registered as {:?}.", record);
        ctx.disconnect();
        return Ok(());
    }

    match ctx.session.register(&ctx.gateway, username, country).await {
        Ok(RegistrationState::Registered) => {
            println!("Registered as {:?} ({}).", username.trim(), country);
        }
        Ok(_) => {
            println!("Registration submitted; not visible on-chain yet. Check `status` shortly.");
        }
        Err(e) if e.is_precondition() => bail!("{}", e),
        Err(e) => bail!("registration failed: {}", e),
    }
    ctx.disconnect();
    Ok(())
}

async fn run_play(mut ctx: AppContext) -> Result<()> {
    refresh(&mut ctx).await?;
    if ctx.session.registration() != RegistrationState::Registered {
        println!("This address is not registered yet; run `earth-click register` first.");
        ctx.disconnect();
        return Ok(());
    }

    let record = ctx.session.record().cloned().unwrap_or_default();
    println!("Playing as {:?} ({})", record.username, record.country);
    println!("Total on-chain points: {}", record.total_points);
    println!("Submit fee: {} {}", chain::format_native(SUBMIT_FEE), chain::NATIVE_SYMBOL);
    println!("[enter] click   [s] submit   [r] resume   [i] status   [q] quit");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" | "c" | "click" => {
                ctx.session.register_click();
                println!("+1  (pending: {})", ctx.session.pending_points());
            }
            "s" | "submit" => handle_submit(&mut ctx).await,
            "r" | "resume" => match ctx.session.resume_pending(&ctx.gateway).await {
                Ok(outcome) => print_outcome(outcome),
                Err(e) => println!("{}", e),
            },
            "i" | "status" => {
                let total = ctx
                    .session
                    .record()
                    .map(|r| r.total_points.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "clicks: {}  pending: {}  confirmed total: {}  submission: {:?}",
                    ctx.session.click_count(),
                    ctx.session.pending_points(),
                    total,
                    ctx.session.submission()
                );
            }
            "q" | "quit" | "exit" => break,
            other => println!("unknown command: {:?}", other),
        }
    }

    if ctx.session.pending_points() > 0 {
        println!(
            "Leaving {} unsubmitted clicks behind; they exist only in this session.",
            ctx.session.pending_points()
        );
    }
    ctx.disconnect();
    Ok(())
}

async fn handle_submit(ctx: &mut AppContext) {
    // Preconditions check against the last balance snapshot; refresh it
    // first so "insufficient balance" reflects reality.
    if let Err(e) = ctx.session.refresh(&ctx.gateway).await {
        tracing::warn!("refresh before submit failed: {}", e);
    }
    match ctx.session.submit_pending(&ctx.gateway).await {
        Ok(outcome) => print_outcome(outcome),
        Err(e) if e.is_precondition() => println!("{}", e),
        Err(e) => println!("submit failed: {} (your pending clicks are kept)", e),
    }
}

fn print_outcome(outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Confirmed { tx, total_points } => {
            println!("Confirmed in {}. On-chain total is now {}.", tx, total_points);
        }
        SubmitOutcome::StillPending { tx } => {
            println!(
                "Still pending after {:?}; check {} and `resume` later.",
                click_session::CONFIRMATION_TIMEOUT,
                chain::explorer_tx_url(&tx.to_string())
            );
        }
    }
}

async fn run_status(mut ctx: AppContext) -> Result<()> {
    refresh(&mut ctx).await?;
    let Some(record) = ctx.session.record() else {
        bail!("no record returned");
    };
    if !record.is_registered() {
        println!("{} is not registered.", ctx.session.address());
    } else {
        println!("Username:       {}", record.username);
        println!("Country:        {}", record.country);
        println!("Total points:   {}", record.total_points);
        println!("Last submit:    {}", format_timestamp(record.last_submit_timestamp));
    }
    if let Some(balance) = ctx.session.balance() {
        println!(
            "Balance:        {} {}",
            chain::format_native(balance),
            chain::NATIVE_SYMBOL
        );
    }
    ctx.disconnect();
    Ok(())
}

async fn run_leaderboard(ctx: AppContext, board: Board) -> Result<()> {
    match board {
        Board::Countries { limit } => {
            let rows = retry_read(READ_ATTEMPTS, READ_INTERVAL, || {
                ctx.gateway.country_leaderboard(limit)
            })
            .await?;
            if rows.is_empty() {
                println!("No countries yet.");
            }
            for (index, row) in rows.iter().enumerate() {
                println!("{:>3}. {:<35} {}", index + 1, row.name, row.total_points);
            }
        }
        Board::Players { country, limit } => {
            let rows = retry_read(READ_ATTEMPTS, READ_INTERVAL, || {
                ctx.gateway.top_players_in_country(&country, limit)
            })
            .await?;
            if rows.is_empty() {
                println!("No players in {} yet.", country);
            }
            for (index, row) in rows.iter().enumerate() {
                let name = if row.username.is_empty() { "anonymous" } else { &row.username };
                println!(
                    "{:>3}. {:<25} {:<44} {}",
                    index + 1,
                    name,
                    row.address,
                    row.points
                );
            }
        }
        Board::All => {
            let rows = retry_read(READ_ATTEMPTS, READ_INTERVAL, || ctx.gateway.all_countries()).await?;
            for row in &rows {
                println!(
                    "{:<35} {:>12} points  {:>6} players",
                    row.name, row.total_points, row.player_count
                );
            }
        }
    }
    ctx.disconnect();
    Ok(())
}

async fn run_proxy(listen: String, upstream: Option<String>) -> Result<()> {
    let config = ProxyConfig {
        listen_addr: listen,
        upstream_url: upstream.unwrap_or_else(|| chain::DEFAULT_RPC_URL.to_string()),
    };
    let proxy = RpcProxy::new(config)?;

    tokio::select! {
        result = proxy.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down proxy");
            Ok(())
        }
    }
}

/// Best-effort snapshot refresh with bounded retries; read failures keep
/// whatever was shown before.
async fn refresh(ctx: &mut AppContext) -> Result<()> {
    let session = &mut ctx.session;
    let gateway = &ctx.gateway;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match session.refresh(gateway).await {
            Ok(()) => return Ok(()),
            Err(SessionError::Gateway(e)) if e.is_retryable() && attempt < READ_ATTEMPTS => {
                tracing::debug!("refresh failed (attempt {}): {}", attempt, e);
                tokio::time::sleep(READ_INTERVAL).await;
            }
            Err(e) => bail!("cannot reach the contract: {}", e),
        }
    }
}

fn format_timestamp(value: alloy_primitives::U256) -> String {
    let seconds = match i64::try_from(value) {
        Ok(0) | Err(_) => return "never".to_string(),
        Ok(seconds) => seconds,
    };
    chrono::DateTime::from_timestamp(seconds, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn wallet_commands_require_from() {
        let err = connect(chain::DEFAULT_RPC_URL.to_string(), None, None).unwrap_err();
        assert!(err.to_string().contains("--from"));
    }

    #[test]
    fn zero_timestamp_reads_as_never() {
        assert_eq!(format_timestamp(U256::ZERO), "never");
        assert!(format_timestamp(U256::from(1_700_000_000u64)).starts_with("2023-"));
    }
}
