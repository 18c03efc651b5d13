use std::{future::Future, sync::Arc, time::Duration};

use rand::{Rng, rngs::StdRng};
use tokio::{sync::Semaphore, task::JoinSet};

use crate::types::{Outcome, Phase};

/// Executes one phase at a time: exactly `total` probe transactions with at
/// most `concurrency` in flight, returning once every one of them has
/// completed. Failures never short-circuit a phase.
///
/// The runner is generic over the transaction future so it stays decoupled
/// from any particular protocol client.
pub struct PhaseRunner {
	jitter: Duration,
	rng:    StdRng,
}

impl PhaseRunner {
	/// `jitter` is the startup delay ceiling; `rng` is run-scoped so draws
	/// stay reproducible under a fixed seed.
	pub fn new(jitter: Duration, rng: StdRng) -> Self {
		Self { jitter, rng }
	}

	pub async fn run<F, Fut>(&mut self, phase: &Phase, transact: F) -> Vec<Outcome>
	where
		F: Fn(String) -> Fut,
		Fut: Future<Output = Outcome> + Send + 'static,
	{
		let gate = Arc::new(Semaphore::new(phase.concurrency));
		let mut tasks: JoinSet<Outcome> = JoinSet::new();
		for _ in 0..phase.total {
			// Drawn in submission order, before the task races anything.
			let delay = self.draw_jitter();
			let gate = gate.clone();
			let fut = transact(phase.label.clone());
			tasks.spawn(async move {
				// The gate is never closed while tasks hold it.
				let _permit = gate
					.acquire_owned()
					.await
					.expect("concurrency gate closed mid-phase");
				if !delay.is_zero() {
					tokio::time::sleep(delay).await;
				}
				fut.await
			});
		}

		let mut outcomes = Vec::with_capacity(phase.total);
		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok(outcome) => outcomes.push(outcome),
				// A panicked probe still counts against the phase total.
				Err(err) => {
					crate::warn!(target: "[PHASE]", "probe task failed: {err}");
					outcomes.push(Outcome::failure(
						format!("probe task failed: {err}"),
						0.0,
						phase.label.clone(),
					));
				}
			}
		}
		crate::info!(
			target: "[PHASE]",
			"{} finished, {} outcomes collected",
			phase.label,
			outcomes.len()
		);
		outcomes
	}

	pub(crate) fn draw_jitter(&mut self) -> Duration {
		if self.jitter.is_zero() {
			return Duration::ZERO;
		}
		Duration::from_secs_f64(self.rng.random_range(0.0..self.jitter.as_secs_f64()))
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use rand::SeedableRng;

	use super::*;

	fn runner() -> PhaseRunner {
		PhaseRunner::new(Duration::ZERO, StdRng::seed_from_u64(0))
	}

	fn ok_outcome(phase: String) -> Outcome {
		Outcome {
			ok: true,
			error: None,
			connect_ms: 1.0,
			first_byte_ms: 2.0,
			total_ms: 3.0,
			status: Some(200),
			phase,
		}
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn test_gate_bounds_in_flight() {
		let active = Arc::new(AtomicUsize::new(0));
		let peak = Arc::new(AtomicUsize::new(0));
		let phase = Phase::new("phase1", 4, 64);

		let outcomes = runner()
			.run(&phase, |label| {
				let active = active.clone();
				let peak = peak.clone();
				async move {
					let now = active.fetch_add(1, Ordering::SeqCst) + 1;
					peak.fetch_max(now, Ordering::SeqCst);
					tokio::time::sleep(Duration::from_millis(5)).await;
					active.fetch_sub(1, Ordering::SeqCst);
					ok_outcome(label)
				}
			})
			.await;

		assert_eq!(outcomes.len(), 64);
		assert!(
			peak.load(Ordering::SeqCst) <= 4,
			"peak in-flight {} exceeded the gate",
			peak.load(Ordering::SeqCst)
		);
	}

	#[tokio::test]
	async fn test_every_request_yields_an_outcome() {
		let phase = Phase::new("warm", 3, 10);
		let counter = Arc::new(AtomicUsize::new(0));

		let outcomes = runner()
			.run(&phase, |label| {
				let counter = counter.clone();
				async move {
					// Odd invocations report failure; the count must not care.
					if counter.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
						Outcome::failure("synthetic failure".to_string(), 1.0, label)
					} else {
						ok_outcome(label)
					}
				}
			})
			.await;

		assert_eq!(outcomes.len(), 10);
		assert!(outcomes.iter().all(|o| o.phase == "warm"));
		assert_eq!(outcomes.iter().filter(|o| o.ok).count(), 5);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn test_panicked_probe_counts_as_failure() {
		let phase = Phase::new("phase1", 2, 4);
		let counter = Arc::new(AtomicUsize::new(0));

		let outcomes = runner()
			.run(&phase, |label| {
				let counter = counter.clone();
				async move {
					if counter.fetch_add(1, Ordering::SeqCst) == 0 {
						panic!("boom");
					}
					ok_outcome(label)
				}
			})
			.await;

		assert_eq!(outcomes.len(), 4);
		assert_eq!(outcomes.iter().filter(|o| !o.ok).count(), 1);
		let failed = outcomes.iter().find(|o| !o.ok).unwrap();
		assert!(failed.error.as_deref().unwrap().contains("probe task failed"));
	}

	#[test]
	fn test_jitter_draws_reproducible_under_seed() {
		let jitter = Duration::from_millis(250);
		let mut a = PhaseRunner::new(jitter, StdRng::seed_from_u64(42));
		let mut b = PhaseRunner::new(jitter, StdRng::seed_from_u64(42));
		for _ in 0..32 {
			let draw = a.draw_jitter();
			assert_eq!(draw, b.draw_jitter());
			assert!(draw < jitter);
		}
	}

	#[test]
	fn test_zero_jitter_never_delays() {
		let mut r = runner();
		for _ in 0..8 {
			assert_eq!(r.draw_jitter(), Duration::ZERO);
		}
	}
}
