use std::{path::PathBuf, sync::Arc, time::Duration};

use eyre::{bail, ensure, eyre};
use squall_core::types::{Phase, RequestConfig};

use crate::{cli::Cli, conf::persistent::PersistentConfig};

/// A validated run: the shared request description plus the ordered phase
/// list, one phase for fixed concurrency, one per stage in ramp mode.
#[derive(Debug)]
pub struct RunPlan {
	pub request: Arc<RequestConfig>,
	pub phases:  Vec<Phase>,
	pub jitter:  Duration,
	pub seed:    Option<u64>,
	pub save:    Option<PathBuf>,
}

impl RunPlan {
	/// Folds file config and command line into a plan. This is the only fatal
	/// error path of a run, and it happens before any network activity.
	pub fn from_parts(persist: &PersistentConfig, cli: &Cli) -> eyre::Result<Self> {
		let timeout = match cli.timeout {
			Some(secs) => {
				ensure!(secs > 0.0, "--timeout must be positive");
				Duration::from_secs_f64(secs)
			}
			None => persist.run.timeout,
		};
		ensure!(!timeout.is_zero(), "request timeout must be positive");

		let jitter = match cli.jitter {
			Some(secs) => {
				ensure!(secs >= 0.0, "--jitter must not be negative");
				Duration::from_secs_f64(secs)
			}
			None => persist.run.jitter,
		};

		let phases = match (cli.concurrency, &cli.ramp) {
			(Some(_), Some(_)) => bail!("--concurrency and --ramp are mutually exclusive"),
			(None, None) => bail!("one of --concurrency or --ramp is required"),
			(Some(concurrency), None) => {
				ensure!(concurrency > 0, "--concurrency must be positive");
				let total = cli
					.total
					.ok_or_else(|| eyre!("--total is required in fixed concurrency mode"))?;
				ensure!(total > 0, "--total must be positive");
				vec![Phase::new("phase1", concurrency, total)]
			}
			(None, Some(ramp)) => {
				let stages = parse_stages(ramp)?;
				let per_stage = cli
					.per_stage
					.ok_or_else(|| eyre!("--per-stage is required in ramp mode"))?;
				ensure!(per_stage > 0, "--per-stage must be positive");
				stages
					.into_iter()
					.enumerate()
					.map(|(i, concurrency)| {
						Phase::new(format!("phase{}", i + 1), concurrency, per_stage)
					})
					.collect()
			}
		};

		let request = RequestConfig::new(
			persist.endpoint.proxy_addr,
			persist.endpoint.target_host.clone(),
			persist.endpoint.target_port,
			timeout,
		);

		Ok(Self {
			request: Arc::new(request),
			phases,
			jitter,
			seed: cli.seed,
			save: cli.save.clone(),
		})
	}
}

fn parse_stages(list: &str) -> eyre::Result<Vec<usize>> {
	let mut stages = Vec::new();
	for part in list.split(',') {
		let part = part.trim();
		if part.is_empty() {
			continue;
		}
		let concurrency: usize = part
			.parse()
			.map_err(|_| eyre!("invalid ramp stage {part:?}"))?;
		ensure!(concurrency > 0, "ramp stages must be positive");
		stages.push(concurrency);
	}
	ensure!(!stages.is_empty(), "ramp stage list is empty");
	Ok(stages)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cli() -> Cli {
		Cli {
			concurrency: None,
			ramp: None,
			total: None,
			per_stage: None,
			timeout: None,
			jitter: None,
			seed: None,
			save: None,
			config: None,
			version: false,
			command: None,
		}
	}

	fn persist() -> PersistentConfig {
		PersistentConfig::default()
	}

	#[test]
	fn test_fixed_mode() {
		let mut cli = cli();
		cli.concurrency = Some(50);
		cli.total = Some(500);
		let plan = RunPlan::from_parts(&persist(), &cli).unwrap();
		assert_eq!(plan.phases, vec![Phase::new("phase1", 50, 500)]);
		assert_eq!(plan.request.timeout, Duration::from_secs(5));
	}

	#[test]
	fn test_fixed_mode_requires_total() {
		let mut cli = cli();
		cli.concurrency = Some(50);
		let err = RunPlan::from_parts(&persist(), &cli).unwrap_err();
		assert!(err.to_string().contains("--total"));
	}

	#[test]
	fn test_ramp_mode_stage_labels() {
		let mut cli = cli();
		cli.ramp = Some("50, 100,200,".to_string());
		cli.per_stage = Some(400);
		let plan = RunPlan::from_parts(&persist(), &cli).unwrap();
		assert_eq!(
			plan.phases,
			vec![
				Phase::new("phase1", 50, 400),
				Phase::new("phase2", 100, 400),
				Phase::new("phase3", 200, 400),
			]
		);
	}

	#[test]
	fn test_ramp_mode_requires_per_stage() {
		let mut cli = cli();
		cli.ramp = Some("50,100".to_string());
		let err = RunPlan::from_parts(&persist(), &cli).unwrap_err();
		assert!(err.to_string().contains("--per-stage"));
	}

	#[test]
	fn test_mode_is_required_and_exclusive() {
		let err = RunPlan::from_parts(&persist(), &cli()).unwrap_err();
		assert!(err.to_string().contains("required"));

		let mut both = cli();
		both.concurrency = Some(1);
		both.ramp = Some("2".to_string());
		both.total = Some(1);
		both.per_stage = Some(1);
		let err = RunPlan::from_parts(&persist(), &both).unwrap_err();
		assert!(err.to_string().contains("mutually exclusive"));
	}

	#[test]
	fn test_invalid_stage_lists() {
		for ramp in ["", " , ,", "50,abc", "0,10"] {
			let mut cli = cli();
			cli.ramp = Some(ramp.to_string());
			cli.per_stage = Some(10);
			assert!(
				RunPlan::from_parts(&persist(), &cli).is_err(),
				"accepted invalid ramp {ramp:?}"
			);
		}
	}

	#[test]
	fn test_timeout_must_be_positive() {
		let mut cli = cli();
		cli.concurrency = Some(1);
		cli.total = Some(1);
		cli.timeout = Some(0.0);
		assert!(RunPlan::from_parts(&persist(), &cli).is_err());
	}

	#[test]
	fn test_cli_overrides_file_defaults() {
		let mut cli = cli();
		cli.concurrency = Some(1);
		cli.total = Some(1);
		cli.timeout = Some(0.5);
		cli.jitter = Some(0.25);
		let plan = RunPlan::from_parts(&persist(), &cli).unwrap();
		assert_eq!(plan.request.timeout, Duration::from_secs_f64(0.5));
		assert_eq!(plan.jitter, Duration::from_secs_f64(0.25));
	}
}
