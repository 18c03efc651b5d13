use std::{collections::HashMap, hash::Hash};

use crate::types::Outcome;

/// Nearest-rank percentile values over one duration series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Percentiles {
	pub p50: f64,
	pub p90: f64,
	pub p95: f64,
	pub p99: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSummary {
	pub label:        String,
	pub succeeded:    usize,
	pub total:        usize,
	pub success_rate: f64,
}

/// Deterministic digest of a full outcome list, independent of completion
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
	pub total:        usize,
	pub succeeded:    usize,
	pub failed:       usize,
	pub success_rate: f64,

	/// Over succeeded outcomes only
	pub connect:    Percentiles,
	pub first_byte: Percentiles,
	pub total_time: Percentiles,

	/// Ranked by count descending, ties in first-seen order
	pub status_counts: Vec<(u16, usize)>,
	pub error_counts:  Vec<(String, usize)>,

	/// First-seen phase order; rendered only when more than one phase ran
	pub phases: Vec<PhaseSummary>,
}

/// Nearest-rank selection: `round(p/100 * (n-1))` into the ascending sort.
/// 0.0 on empty input.
pub fn percentile(sorted: &[f64], p: u8) -> f64 {
	if sorted.is_empty() {
		return 0.0;
	}
	let rank = (f64::from(p) / 100.0 * (sorted.len() - 1) as f64).round() as usize;
	sorted[rank]
}

pub fn percentiles(values: &[f64]) -> Percentiles {
	let mut sorted = values.to_vec();
	sorted.sort_by(|a, b| a.total_cmp(b));
	Percentiles {
		p50: percentile(&sorted, 50),
		p90: percentile(&sorted, 90),
		p95: percentile(&sorted, 95),
		p99: percentile(&sorted, 99),
	}
}

fn rate(succeeded: usize, total: usize) -> f64 {
	if total == 0 {
		0.0
	} else {
		succeeded as f64 / total as f64 * 100.0
	}
}

/// Counts occurrences and ranks them by count descending; ties keep the order
/// the keys were first seen in.
fn ranked_counts<K, I>(keys: I) -> Vec<(K, usize)>
where
	K: Eq + Hash,
	I: Iterator<Item = K>,
{
	let mut counts: HashMap<K, (usize, usize)> = HashMap::new();
	for key in keys {
		let seen = counts.len();
		let entry = counts.entry(key).or_insert((0, seen));
		entry.0 += 1;
	}
	let mut ranked: Vec<(K, (usize, usize))> = counts.into_iter().collect();
	ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
	ranked.into_iter().map(|(key, (count, _))| (key, count)).collect()
}

pub fn summarize(outcomes: &[Outcome]) -> Summary {
	let succeeded: Vec<&Outcome> = outcomes.iter().filter(|o| o.ok).collect();
	let failed = outcomes.len() - succeeded.len();

	let connect: Vec<f64> = succeeded.iter().map(|o| o.connect_ms).collect();
	let first_byte: Vec<f64> = succeeded.iter().map(|o| o.first_byte_ms).collect();
	let total_time: Vec<f64> = succeeded.iter().map(|o| o.total_ms).collect();

	let status_counts = ranked_counts(succeeded.iter().filter_map(|o| o.status));
	let error_counts = ranked_counts(
		outcomes
			.iter()
			.filter(|o| !o.ok)
			.filter_map(|o| o.error.clone()),
	);

	let mut phase_order: Vec<String> = Vec::new();
	let mut by_phase: HashMap<String, (usize, usize)> = HashMap::new();
	for outcome in outcomes {
		if !by_phase.contains_key(&outcome.phase) {
			phase_order.push(outcome.phase.clone());
		}
		let entry = by_phase.entry(outcome.phase.clone()).or_insert((0, 0));
		entry.1 += 1;
		if outcome.ok {
			entry.0 += 1;
		}
	}
	let phases = phase_order
		.into_iter()
		.map(|label| {
			let (ok, total) = by_phase[&label];
			PhaseSummary {
				label,
				succeeded: ok,
				total,
				success_rate: rate(ok, total),
			}
		})
		.collect();

	Summary {
		total: outcomes.len(),
		succeeded: succeeded.len(),
		failed,
		success_rate: rate(succeeded.len(), outcomes.len()),
		connect: percentiles(&connect),
		first_byte: percentiles(&first_byte),
		total_time: percentiles(&total_time),
		status_counts,
		error_counts,
		phases,
	}
}
