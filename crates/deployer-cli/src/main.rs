//! Command-line entry point for the deployment orchestrator.
//!
//! `deployer run` executes a step program against the configured chain,
//! resuming any interrupted prior run from its checkpoint. `deployer
//! inspect-proxy` reads the standardized proxy slots of an arbitrary
//! address, and `deployer registry` prints the recorded deployment state.

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use clap::{Parser, Subcommand};
use deployer_chain::implementations::alloy::AlloyChainClient;
use deployer_chain::ChainClient;
use deployer_config::program::load_program;
use deployer_config::Config;
use deployer_core::{ArtifactStore, CheckpointStore, ProxySlotInspector, StepSequencer};
use deployer_registry::{AddressRegistry, TransactionLedger};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Command-line arguments for the deployment orchestrator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to the orchestrator configuration file.
	#[arg(short, long)]
	config: PathBuf,

	/// Log level when RUST_LOG is not set (trace, debug, info, warn, error).
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Execute a step program, skipping steps recorded by earlier runs.
	Run {
		/// Path to the step program TOML file.
		#[arg(short, long)]
		program: PathBuf,
	},
	/// Read the standardized proxy slots of an address.
	InspectProxy {
		/// Address to inspect.
		address: Address,
	},
	/// Print the recorded deployment registry.
	Registry,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
	fmt().with_env_filter(env_filter).with_target(true).init();

	let config = Config::from_file(&args.config)?;

	match args.command {
		Command::Run { program } => run(config, &program).await,
		Command::InspectProxy { address } => inspect_proxy(config, address).await,
		Command::Registry => print_registry(config),
	}
}

async fn run(config: Config, program_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
	let program = load_program(program_path)?;
	tracing::info!(
		program = %program.name,
		steps = program.steps.len(),
		"loaded step program"
	);

	let client: Arc<dyn ChainClient> = Arc::new(chain_client(&config)?);
	let registry = AddressRegistry::open(
		&config.state.registry_file,
		&config.state.address_list_file,
	)?;
	let mut sequencer = StepSequencer::new(
		client,
		ArtifactStore::new(&config.artifacts.root),
		registry,
		TransactionLedger::new(&config.state.ledger_file),
		CheckpointStore::new(&config.state.checkpoint_file),
	);

	// Ctrl-C stops the run at the next step boundary rather than
	// mid-transaction.
	let cancel = sequencer.cancel_flag();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::warn!("interrupt received; stopping after the current step");
			cancel.store(true, Ordering::Relaxed);
		}
	});

	match sequencer.run(&program).await {
		Ok(report) => {
			tracing::info!(
				program = %report.program,
				executed = report.executed,
				skipped = report.skipped,
				total = report.total,
				"run complete"
			);
			Ok(())
		},
		Err(err) => {
			tracing::error!(%err, "run failed");
			std::process::exit(1);
		},
	}
}

async fn inspect_proxy(
	config: Config,
	address: Address,
) -> Result<(), Box<dyn std::error::Error>> {
	let client: Arc<dyn ChainClient> = Arc::new(chain_client(&config)?);
	let inspector = ProxySlotInspector::new(client);
	let slots = inspector.inspect(address).await?;
	if !slots.is_proxy() {
		tracing::warn!(%address, "no standardized proxy slots are set");
	}
	println!("{}", serde_json::to_string_pretty(&slots)?);
	Ok(())
}

fn print_registry(config: Config) -> Result<(), Box<dyn std::error::Error>> {
	let registry = AddressRegistry::open(
		&config.state.registry_file,
		&config.state.address_list_file,
	)?;
	if registry.is_empty() {
		println!("registry is empty");
		return Ok(());
	}
	for (alias, record) in registry.iter() {
		println!(
			"{alias}: {} ({} {})",
			record.address, record.contract_file, record.contract_name
		);
	}
	Ok(())
}

fn chain_client(config: &Config) -> Result<AlloyChainClient, Box<dyn std::error::Error>> {
	let signer: PrivateKeySigner = config.signer.private_key.parse()?;
	tracing::info!(signer = %signer.address(), rpc = %config.chain.rpc_url, "connecting");
	Ok(AlloyChainClient::new(
		config.chain.rpc_url.clone(),
		signer,
		config.chain.confirmation_timeout(),
	))
}
