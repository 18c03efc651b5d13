use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser, Subcommand};

#[derive(Parser)]
#[command(about, long_about = None)]
#[command(group(ArgGroup::new("mode").args(["concurrency", "ramp"])))]
pub struct Cli {
	/// Fixed in-flight request bound
	#[arg(short, long, value_name = "N")]
	pub concurrency: Option<usize>,

	/// Staged concurrency list, e.g. 50,100,200
	#[arg(short, long, value_name = "STAGES")]
	pub ramp: Option<String>,

	/// Total request count (fixed concurrency mode)
	#[arg(short, long, value_name = "N")]
	pub total: Option<usize>,

	/// Requests per stage (ramp mode)
	#[arg(long, value_name = "N")]
	pub per_stage: Option<usize>,

	/// Per-request timeout in seconds
	#[arg(long, value_name = "SECS")]
	pub timeout: Option<f64>,

	/// Startup jitter ceiling in seconds
	#[arg(long, value_name = "SECS")]
	pub jitter: Option<f64>,

	/// Random seed for reproducible jitter
	#[arg(long, value_name = "N")]
	pub seed: Option<u64>,

	/// Save all outcomes as a JSON file
	#[arg(long, value_name = "FILE")]
	pub save: Option<PathBuf>,

	/// Set a custom config
	#[arg(short = 'f', long, value_name = "FILE")]
	pub config: Option<String>,

	/// Show current version
	#[arg(short = 'v', visible_short_alias = 'V', long, action = ArgAction::SetTrue)]
	pub version: bool,

	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize a new default configuration file
	Init {
		/// Specify the configuration file format (yaml or toml)
		#[arg(short, long, value_enum, default_value = "yaml")]
		format: ConfigFormat,
	},
}

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum ConfigFormat {
	Yaml,
	Toml,
}
