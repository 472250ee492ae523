//! Bookstore CLI
//!
//! Runs the standard query plan against the configured `books` collection.
//!
//! ## Usage
//!
//! ```bash
//! bookstore seed --reset
//! bookstore run
//! bookstore run --backend memory
//! bookstore plan
//! ```
//!
//! Settings come from `bookstore.toml`, `BOOKSTORE_*` environment variables
//! and the flags below, later sources winning.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use bookstore_conf::{BackendKind, OverrideSource, Settings};
use bookstore_runner::report::{ConsolePrinter, render_plan};
use bookstore_runner::seed::seed_collection;
use bookstore_runner::{backend, run_session, standard_plan};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const LOG_TARGETS: [&str; 4] = [
	"bookstore",
	"bookstore_conf",
	"bookstore_nosql",
	"bookstore_runner",
];

#[derive(Parser)]
#[command(name = "bookstore")]
#[command(about = "Run CRUD, query, aggregation and index examples against a books collection", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Config file (defaults to ./bookstore.toml when present)
	#[arg(long, global = true, value_name = "PATH")]
	config: Option<PathBuf>,

	/// MongoDB connection string
	#[arg(long, global = true, value_name = "URI")]
	uri: Option<String>,

	/// Database name
	#[arg(long, global = true)]
	database: Option<String>,

	/// Collection name
	#[arg(long, global = true)]
	collection: Option<String>,

	/// Document store: mongodb or memory
	#[arg(long, global = true, value_name = "KIND")]
	backend: Option<BackendKind>,

	/// Only log warnings and errors
	#[arg(short, long, global = true, conflicts_with = "verbosity")]
	quiet: bool,

	/// Verbosity level (can be repeated)
	#[arg(short, long, global = true, action = ArgAction::Count)]
	verbosity: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// Execute the standard plan and print every result
	Run,

	/// Insert the ten sample books
	Seed {
		/// Drop the collection first
		#[arg(long)]
		reset: bool,
	},

	/// List the steps of the standard plan without connecting
	Plan,
}

impl Cli {
	fn overrides(&self) -> OverrideSource {
		OverrideSource::new()
			.set_opt("mongodb_uri", self.uri.clone())
			.set_opt("database", self.database.clone())
			.set_opt("collection", self.collection.clone())
			.set_opt("backend", self.backend.map(|b| b.to_string()))
	}

	fn settings(&self) -> anyhow::Result<Settings> {
		Settings::load(self.config.as_deref(), self.overrides()).context("failed to load settings")
	}
}

/// Filter used when `RUST_LOG` is not set
fn default_directives(quiet: bool, verbosity: u8) -> String {
	let (ours, driver) = match (quiet, verbosity) {
		(true, _) => ("warn", "warn"),
		(false, 0) => ("info", "warn"),
		(false, 1) => ("debug", "info"),
		(false, _) => ("trace", "debug"),
	};

	let mut directives: Vec<String> = LOG_TARGETS
		.iter()
		.map(|target| format!("{}={}", target, ours))
		.collect();
	directives.push(format!("mongodb={}", driver));
	directives.join(",")
}

fn init_tracing(quiet: bool, verbosity: u8) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directives(quiet, verbosity)));
	let subscriber = FmtSubscriber::builder()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.finish();
	let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run_plan(cli: &Cli) -> anyhow::Result<ExitCode> {
	let settings = cli.settings()?;
	tracing::debug!(
		backend = %settings.backend,
		database = %settings.database,
		collection = %settings.collection,
		"resolved settings"
	);

	let mut printer = ConsolePrinter::new();
	let plan = standard_plan();
	match run_session(
		backend::connect(&settings),
		&settings.collection,
		&plan,
		&mut printer,
	)
	.await
	{
		Ok(completed) => {
			tracing::debug!(completed, "plan finished");
			Ok(ExitCode::SUCCESS)
		}
		// already reported by the printer
		Err(_) => Ok(ExitCode::FAILURE),
	}
}

async fn run_seed(cli: &Cli, reset: bool) -> anyhow::Result<ExitCode> {
	let settings = Settings {
		seed_memory: false,
		..cli.settings()?
	};

	let store = backend::connect(&settings)
		.await
		.with_context(|| format!("could not connect to {} backend", settings.backend))?;
	let seeded = seed_collection(store.as_ref(), &settings.collection, reset).await;
	if let Err(e) = store.close().await {
		tracing::warn!(error = %e, "failed to close connection");
	}

	let inserted = seeded.with_context(|| format!("failed to seed {}", settings.collection))?;
	println!(
		"Inserted {} book(s) into {}.{}",
		inserted, settings.database, settings.collection
	);
	Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	init_tracing(cli.quiet, cli.verbosity);

	let result = match &cli.command {
		Commands::Run => run_plan(&cli).await,
		Commands::Seed { reset } => run_seed(&cli, *reset).await,
		Commands::Plan => {
			print!("{}", render_plan(&standard_plan()));
			Ok(ExitCode::SUCCESS)
		}
	};

	match result {
		Ok(code) => code,
		Err(e) => {
			eprintln!("Error: {:#}", e);
			ExitCode::FAILURE
		}
	}
}
