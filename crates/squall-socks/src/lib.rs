use snafu::{Backtrace, Snafu};

pub mod client;

pub use client::SocksClient;

/// Failure classes for a single proxied fetch. Every variant is caught at the
/// transaction boundary and becomes a failed outcome; the display strings are
/// the literal descriptions keyed in the failure histogram.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
	#[snafu(display("proxy connect failed: {source}"))]
	ConnectFailure {
		source:    std::io::Error,
		backtrace: Backtrace,
	},

	/// Any SOCKS5 response byte mismatch, nonzero reply code, or unsupported
	/// address type
	#[snafu(display("socks5 protocol violation: {detail}"))]
	ProtocolViolation {
		detail:    String,
		backtrace: Backtrace,
	},

	#[snafu(display("timed out during {stage}"))]
	ReadTimeout {
		stage:     &'static str,
		backtrace: Backtrace,
	},

	#[snafu(display("connection closed before any response byte"))]
	EmptyResponse { backtrace: Backtrace },

	#[snafu(display("stream error during {stage}: {source}"))]
	Io {
		stage:     &'static str,
		source:    std::io::Error,
		backtrace: Backtrace,
	},
}
