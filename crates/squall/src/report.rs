use std::{fmt::Display, fs, path::Path};

use squall_core::{
	stats::{Percentiles, Summary},
	types::Outcome,
};

/// Histogram lines show at most this many entries.
const TOP_N: usize = 5;

pub fn print_header() {
	let bar = "=".repeat(70);
	println!("{bar}");
	println!(" SOCKS5 High Concurrency Probe (observe proxy warm-up scaling) ");
	println!("{bar}");
}

/// Renders the human-readable summary block.
pub fn render(summary: &Summary) -> String {
	let mut lines = Vec::new();
	lines.push(format!(
		"Total={} OK={} Fail={} SuccessRate={:.2}%",
		summary.total, summary.succeeded, summary.failed, summary.success_rate
	));
	if summary.succeeded > 0 {
		lines.push(fmt_percentiles("Connect(ms)", &summary.connect));
		lines.push(fmt_percentiles("FirstByte(ms)", &summary.first_byte));
		lines.push(fmt_percentiles("Total(ms)", &summary.total_time));
	}
	lines.push(format!("HTTP Codes: {}", fmt_histogram(&summary.status_counts)));
	if summary.failed > 0 {
		lines.push(format!("Errors: {}", fmt_histogram(&summary.error_counts)));
	}
	if summary.phases.len() > 1 {
		lines.push("Per-Phase Success:".to_string());
		for phase in &summary.phases {
			lines.push(format!(
				"  {}: {}/{} = {:.1}%",
				phase.label, phase.succeeded, phase.total, phase.success_rate
			));
		}
	}
	lines.join("\n")
}

fn fmt_percentiles(name: &str, p: &Percentiles) -> String {
	format!(
		"{name} p50={:.1} p90={:.1} p95={:.1} p99={:.1}",
		p.p50, p.p90, p.p95, p.p99
	)
}

fn fmt_histogram<K: Display>(ranked: &[(K, usize)]) -> String {
	if ranked.is_empty() {
		return "-".to_string();
	}
	ranked
		.iter()
		.take(TOP_N)
		.map(|(key, count)| format!("{key}:{count}"))
		.collect::<Vec<_>>()
		.join(", ")
}

/// Writes the full outcome list as one pretty-printed JSON array.
pub fn save_outcomes(path: &Path, outcomes: &[Outcome]) -> eyre::Result<()> {
	let json = serde_json::to_string_pretty(outcomes)?;
	fs::write(path, json)?;
	Ok(())
}
