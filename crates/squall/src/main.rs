use std::{path::PathBuf, sync::Arc, time::Instant};

use clap::Parser as _;
use rand::{SeedableRng as _, rngs::StdRng};
use squall_core::{PhaseRunner, info, summarize};
use squall_socks::SocksClient;
use tracing::Level;

use crate::{
	cli::{Cli, Commands, ConfigFormat},
	conf::{persistent::PersistentConfig, runtime::RunPlan},
};

mod cli;
mod conf;
mod log;
mod report;

// squall -c 50 -t 500
// squall -r 50,100,200,400 --per-stage 400
#[tokio::main]
async fn main() -> eyre::Result<()> {
	log::init_log(Level::INFO)?;
	let cli = match Cli::try_parse() {
		Ok(v) => v,
		Err(err) => {
			println!("{:#}", err);
			return Ok(());
		}
	};

	if cli.version {
		const VER: &str = match option_env!("SQUALL_OVERRIDE_VERSION") {
			Some(v) => v,
			None => env!("CARGO_PKG_VERSION"),
		};
		println!("squall {VER}");
		return Ok(());
	}

	if let Some(Commands::Init { format }) = &cli.command {
		let (file, format) = match format {
			ConfigFormat::Yaml => ("config.yaml", "yaml"),
			ConfigFormat::Toml => ("config.toml", "toml"),
		};
		PersistentConfig::default().export_to_file(&PathBuf::from(file), format)?;
		info!(target: "[MAIN]", "Wrote default configuration to {file}");
		return Ok(());
	}

	let persist = PersistentConfig::load(cli.config.clone(), None)?;
	// Last fatal error boundary; everything past here only records failures.
	let plan = RunPlan::from_parts(&persist, &cli)?;

	info!(
		target: "[MAIN]",
		"Squall starting, proxy {} target {}:{}",
		plan.request.proxy_addr, plan.request.target_host, plan.request.target_port
	);
	report::print_header();

	let rng = match plan.seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_os_rng(),
	};
	let mut runner = PhaseRunner::new(plan.jitter, rng);
	let client = Arc::new(SocksClient::new(plan.request.clone()));

	let started = Instant::now();
	let mut outcomes = Vec::new();
	for phase in &plan.phases {
		info!(
			target: "[PHASE]",
			"{} concurrency={} total={}",
			phase.label, phase.concurrency, phase.total
		);
		let client = client.clone();
		let batch = runner
			.run(phase, move |label| {
				let client = client.clone();
				async move { client.fetch(label).await }
			})
			.await;
		outcomes.extend(batch);
	}
	let elapsed = started.elapsed().as_secs_f64();

	let summary = summarize(&outcomes);
	println!("\n=== Summary ===");
	println!("{}", report::render(&summary));
	println!(
		"Elapsed: {elapsed:.2}s  Approx QPS: {:.1}",
		outcomes.len() as f64 / elapsed
	);

	if let Some(path) = &plan.save {
		report::save_outcomes(path, &outcomes)?;
		info!(target: "[MAIN]", "Saved JSON results -> {}", path.display());
	}

	Ok(())
}
