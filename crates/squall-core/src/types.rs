use std::{net::SocketAddr, time::Duration};

use serde::{Deserialize, Serialize};

const USER_AGENT: &str = concat!("squall/", env!("CARGO_PKG_VERSION"));

/// Immutable description of one proxied fetch, shared read-only by every
/// in-flight probe of a run.
#[derive(Debug, Clone)]
pub struct RequestConfig {
	/// SOCKS5 proxy endpoint. eg. `127.0.0.1:1080`
	pub proxy_addr: SocketAddr,

	/// Host relayed to the proxy as the CONNECT domain
	pub target_host: String,

	pub target_port: u16,

	/// Bound on every blocking network step, measured independently per step
	pub timeout: Duration,

	/// Prebuilt HTTP request sent over the tunneled stream
	pub http_request: Vec<u8>,
}

impl RequestConfig {
	pub fn new(
		proxy_addr: SocketAddr,
		target_host: impl Into<String>,
		target_port: u16,
		timeout: Duration,
	) -> Self {
		let target_host = target_host.into();
		let http_request = format!(
			"GET / HTTP/1.1\r\n\
			 Host: {target_host}\r\n\
			 User-Agent: {USER_AGENT}\r\n\
			 Accept: */*\r\n\
			 Connection: close\r\n\
			 \r\n"
		)
		.into_bytes();
		Self {
			proxy_addr,
			target_host,
			target_port,
			timeout,
			http_request,
		}
	}
}

/// One stage of a run: a concurrency gate width and a request count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
	pub label:       String,
	pub concurrency: usize,
	pub total:       usize,
}

impl Phase {
	pub fn new(label: impl Into<String>, concurrency: usize, total: usize) -> Self {
		Self {
			label: label.into(),
			concurrency,
			total,
		}
	}
}

/// Record of a single finished probe attempt. Never mutated after creation;
/// the field names are the persisted JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
	pub ok: bool,

	/// Present only on failure
	pub error: Option<String>,

	/// Proxy connect plus SOCKS5 handshake, 0 when the stage was not reached
	pub connect_ms: f64,

	/// First response byte, measured from transaction start, 0 when unreached
	pub first_byte_ms: f64,

	pub total_ms: f64,

	/// Parsed HTTP status code, present only on success with a parsable line
	pub status: Option<u16>,

	pub phase: String,
}

impl Outcome {
	pub fn failure(error: String, total_ms: f64, phase: String) -> Self {
		Self {
			ok: false,
			error: Some(error),
			connect_ms: 0.0,
			first_byte_ms: 0.0,
			total_ms,
			status: None,
			phase,
		}
	}
}
