//! Gorbagana Slots CLI
//!
//! Drives the spin engine from the terminal against the local fallback or the
//! in-process slots program.

use clap::{Parser, Subcommand};
use gorbagana_slots::{
    authority::program::BetLimits,
    common::config::{generate_sample_config, ConfigLoader},
    config::AuthorityMode,
    errors::SlotsResult,
    games::VRFGameEngine,
    Lamports, ProgramAuthority, SlotsConfig, SlotsProgram, SpinMachine, SpinReport, SymbolTable,
    WalletStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const PLAYER: &str = "local-player";
const TREASURY: &str = "house-treasury";

/// Gorbagana Slots CLI
#[derive(Parser)]
#[command(name = "gorbagana-slots")]
#[command(about = "Slot machine spin engine with authority reconciliation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a number of spins
    Spin {
        /// Bet per spin in SOL (must be an allowed denomination)
        #[arg(short, long)]
        bet: Option<f64>,

        /// Number of spins
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Outcome source: local or program
        #[arg(short, long)]
        mode: Option<AuthorityMode>,

        /// Starting wallet balance in SOL
        #[arg(long, default_value = "1.0")]
        balance: f64,

        /// RNG seed for reproducible animation and local rolls
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print each result as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Print the pay table for a bet
    Paytable {
        /// Bet in SOL
        #[arg(short, long)]
        bet: Option<f64>,
    },

    /// Write a default configuration file
    SampleConfig {
        /// Output path
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> SlotsResult<()> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    if config.monitoring.enable_logging {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| config.monitoring.log_level.as_filter().into()),
            )
            .init();
    }

    match cli.command {
        Commands::Spin {
            bet,
            count,
            mode,
            balance,
            seed,
            json,
        } => run_spins(config, SpinArgs { bet, count, mode, balance, seed, json }).await,
        Commands::Paytable { bet } => {
            print_pay_table(&config, bet);
            Ok(())
        }
        Commands::SampleConfig { path } => {
            generate_sample_config(&path.to_string_lossy())?;
            println!("Wrote sample configuration to {}", path.display());
            Ok(())
        }
    }
}

struct SpinArgs {
    bet: Option<f64>,
    count: u32,
    mode: Option<AuthorityMode>,
    balance: f64,
    seed: Option<u64>,
    json: bool,
}

async fn run_spins(mut config: SlotsConfig, args: SpinArgs) -> SlotsResult<()> {
    let SpinArgs {
        bet,
        count,
        mode,
        balance,
        seed,
        json,
    } = args;
    if let Some(mode) = mode {
        config.authority.mode = mode;
    }
    let bet = bet.map(Lamports::from_sol).unwrap_or_else(|| config.default_bet());
    let table = Arc::new(SymbolTable::standard());

    let mut builder = SpinMachine::builder(config.clone())
        .symbol_table(table.clone())
        .wallet(WalletStatus::connected(Lamports::from_sol(balance)));
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }

    let program = match config.authority.mode {
        AuthorityMode::Program => {
            let program = Arc::new(SlotsProgram::new(
                Arc::new(VRFGameEngine::new_random()),
                table.clone(),
                BetLimits {
                    min_bet: config.min_bet(),
                    max_bet: config.max_bet(),
                },
                config.authority.house_edge,
            ));
            program.fund(PLAYER, Lamports::from_sol(balance));
            program.initialize(PLAYER, PLAYER, TREASURY);
            info!("Program VRF key: {}", program.vrf_public_key());

            let authority = ProgramAuthority::new(program.clone(), PLAYER).with_latency(config.program_latency());
            builder = builder.authority(Arc::new(authority));
            Some(program)
        }
        AuthorityMode::LocalFallback => None,
    };

    let machine = builder.build()?;
    let mut wallet_balance = Lamports::from_sol(balance);

    for _ in 0..count {
        let handle = match machine.start_spin(bet) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot spin: {}", e);
                println!("{}", e);
                break;
            }
        };

        let number = handle.spin_number();
        let report = match handle.wait().await {
            Ok(report) => report,
            Err(e) => {
                warn!("Spin task ended abnormally: {}", e);
                break;
            }
        };

        if json {
            let line = match &report {
                SpinReport::Settled(result) => serde_json::json!({ "spin": number, "result": result }),
                SpinReport::Failed(failure) => serde_json::json!({ "spin": number, "error": failure.to_string() }),
            };
            println!("{}", line);
        }

        let settled_payout = match report {
            SpinReport::Settled(result) if json => Some(result.payout),
            SpinReport::Failed(_) if json => None,
            SpinReport::Settled(result) => {
                println!(
                    "#{:<3} {}  payout {}{}",
                    number,
                    result.grid,
                    result.payout,
                    if result.is_win() { "  WIN" } else { "" }
                );
                Some(result.payout)
            }
            SpinReport::Failed(failure) => {
                println!("#{:<3} failed: {}", number, failure);
                None
            }
        };

        // Balance after the spin: the program's ledger, or a local tally
        wallet_balance = match (&program, settled_payout) {
            (Some(program), _) => program.balance(PLAYER),
            (None, Some(payout)) => wallet_balance
                .checked_sub(bet)
                .unwrap_or(Lamports::ZERO)
                .saturating_add(payout),
            (None, None) => wallet_balance,
        };
        machine.update_wallet(WalletStatus::connected(wallet_balance));
    }

    let metrics = machine.metrics().snapshot();
    println!();
    println!("Balance:  {}", wallet_balance);
    println!(
        "Spins:    {} settled / {} started, {} wins",
        metrics.spins_settled, metrics.spins_started, metrics.wins
    );
    println!("Wagered:  {}", metrics.lamports_wagered);
    println!("Paid:     {}", metrics.lamports_paid);
    println!("RTP:      {:.2}%", metrics.return_to_player() * 100.0);
    println!("Frames:   {}", metrics.animation_frames);
    if let Some(program) = &program {
        if let Some(state) = program.state(PLAYER) {
            println!(
                "Program:  {} spins, {} paid out, house edge {}%",
                state.total_spins, state.total_payout, state.house_edge
            );
        }
    }

    Ok(())
}

fn print_pay_table(config: &SlotsConfig, bet: Option<f64>) {
    let bet = bet.map(Lamports::from_sol).unwrap_or_else(|| config.default_bet());
    println!("Pay table (3 match required, middle row only) at {}", bet);
    for entry in SymbolTable::standard().pay_table(bet) {
        println!("  {:<12} {:>6}  {}", entry.name, entry.multiplier.to_string(), entry.payout);
    }
}
