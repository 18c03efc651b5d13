use std::{io, sync::Arc, time::Instant};

use snafu::{ResultExt, ensure};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpStream,
	time::timeout,
};

use squall_core::types::{Outcome, RequestConfig};

use crate::{
	ConnectFailureSnafu, EmptyResponseSnafu, Error, IoSnafu, ProtocolViolationSnafu,
	ReadTimeoutSnafu,
};

const SOCKS_VERSION: u8 = 0x05;
const CMD_CONNECT: u8 = 0x01;
const METHOD_NO_AUTH: u8 = 0x00;

const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Only the status line is needed, never the full body.
const RESPONSE_CAP: usize = 64 * 1024;
const READ_CHUNK: usize = 4096;

fn elapsed_ms(since: Instant) -> f64 {
	since.elapsed().as_secs_f64() * 1000.0
}

#[derive(Default)]
struct Timings {
	connect_ms:    f64,
	first_byte_ms: f64,
}

/// Drives one full proxied transaction per [`SocksClient::fetch`] call:
/// no-auth SOCKS5 CONNECT handshake, tunneled HTTP GET, and timing capture at
/// each boundary. Failures never escape past `fetch`.
pub struct SocksClient {
	cfg: Arc<RequestConfig>,
}

impl SocksClient {
	pub fn new(cfg: Arc<RequestConfig>) -> Self {
		Self { cfg }
	}

	/// Performs exactly one transaction and returns its outcome, labeled with
	/// `phase`. Unreached timing stages stay at zero.
	pub async fn fetch(&self, phase: String) -> Outcome {
		let start = Instant::now();
		let mut timings = Timings::default();
		match self.transact(start, &mut timings).await {
			Ok(status) => Outcome {
				ok: true,
				error: None,
				connect_ms: timings.connect_ms,
				first_byte_ms: timings.first_byte_ms,
				total_ms: elapsed_ms(start),
				status,
				phase,
			},
			Err(err) => {
				tracing::debug!(target: "[FETCH]", phase = %phase, "probe failed: {err}");
				Outcome {
					ok: false,
					error: Some(err.to_string()),
					connect_ms: timings.connect_ms,
					first_byte_ms: timings.first_byte_ms,
					total_ms: elapsed_ms(start),
					status: None,
					phase,
				}
			}
		}
	}

	async fn transact(&self, start: Instant, timings: &mut Timings) -> Result<Option<u16>, Error> {
		let cfg = &self.cfg;

		let conn_begin = Instant::now();
		let mut stream = match timeout(cfg.timeout, TcpStream::connect(cfg.proxy_addr)).await {
			Ok(res) => res.context(ConnectFailureSnafu)?,
			Err(_) => {
				return Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))
					.context(ConnectFailureSnafu);
			}
		};

		// Greeting: VER, NMETHODS=1, METHOD=no-auth
		self.write(&mut stream, &[SOCKS_VERSION, 0x01, METHOD_NO_AUTH], "socks5 greeting")
			.await?;
		let mut ack = [0u8; 2];
		self.read_exact(&mut stream, &mut ack, "socks5 greeting ack").await?;
		ensure!(
			ack == [SOCKS_VERSION, METHOD_NO_AUTH],
			ProtocolViolationSnafu {
				detail: format!("greeting ack {:02x?}", ack),
			}
		);

		// CONNECT: VER CMD RSV ATYP=domain LEN domain PORT(2, BE)
		let host = cfg.target_host.as_bytes();
		ensure!(
			host.len() <= u8::MAX as usize,
			ProtocolViolationSnafu {
				detail: format!("target domain too long ({} bytes)", host.len()),
			}
		);
		let mut request = Vec::with_capacity(4 + 1 + host.len() + 2);
		request.extend_from_slice(&[SOCKS_VERSION, CMD_CONNECT, 0x00, ATYP_DOMAIN, host.len() as u8]);
		request.extend_from_slice(host);
		request.extend_from_slice(&cfg.target_port.to_be_bytes());
		self.write(&mut stream, &request, "connect request").await?;

		// Reply: VER REP RSV ATYP
		let mut head = [0u8; 4];
		self.read_exact(&mut stream, &mut head, "connect reply").await?;
		ensure!(
			head[1] == 0x00,
			ProtocolViolationSnafu {
				detail: format!("connect reply code {:#04x}", head[1]),
			}
		);

		// Trailing bound address, its length keyed off the reply ATYP.
		match head[3] {
			ATYP_IPV4 => self.discard(&mut stream, 4 + 2, "bound address").await?,
			ATYP_IPV6 => self.discard(&mut stream, 16 + 2, "bound address").await?,
			ATYP_DOMAIN => {
				let mut len = [0u8; 1];
				self.read_exact(&mut stream, &mut len, "bound address length").await?;
				self.discard(&mut stream, len[0] as usize + 2, "bound address").await?;
			}
			other => {
				return ProtocolViolationSnafu {
					detail: format!("bound address type {other:#04x}"),
				}
				.fail();
			}
		}
		timings.connect_ms = elapsed_ms(conn_begin);

		self.write(&mut stream, &cfg.http_request, "http request").await?;

		let mut first = [0u8; 1];
		let n = match timeout(cfg.timeout, stream.read(&mut first)).await {
			Ok(res) => res.context(IoSnafu { stage: "first byte" })?,
			Err(_) => return ReadTimeoutSnafu { stage: "first byte" }.fail(),
		};
		ensure!(n == 1, EmptyResponseSnafu);
		timings.first_byte_ms = elapsed_ms(start);

		let mut body = Vec::with_capacity(READ_CHUNK);
		body.push(first[0]);
		let mut chunk = [0u8; READ_CHUNK];
		loop {
			let n = match timeout(cfg.timeout, stream.read(&mut chunk)).await {
				Ok(res) => res.context(IoSnafu { stage: "response body" })?,
				Err(_) => return ReadTimeoutSnafu { stage: "response body" }.fail(),
			};
			if n == 0 {
				break;
			}
			body.extend_from_slice(&chunk[..n]);
			if body.len() > RESPONSE_CAP {
				break;
			}
		}

		// Best-effort teardown, never the transaction's verdict.
		let _ = stream.shutdown().await;

		Ok(parse_status_line(&body))
	}

	async fn write(
		&self,
		stream: &mut TcpStream,
		buf: &[u8],
		stage: &'static str,
	) -> Result<(), Error> {
		match timeout(self.cfg.timeout, stream.write_all(buf)).await {
			Ok(res) => res.context(IoSnafu { stage }),
			Err(_) => ReadTimeoutSnafu { stage }.fail(),
		}
	}

	async fn read_exact(
		&self,
		stream: &mut TcpStream,
		buf: &mut [u8],
		stage: &'static str,
	) -> Result<(), Error> {
		match timeout(self.cfg.timeout, stream.read_exact(buf)).await {
			Ok(res) => res.map(|_| ()).context(IoSnafu { stage }),
			Err(_) => ReadTimeoutSnafu { stage }.fail(),
		}
	}

	async fn discard(
		&self,
		stream: &mut TcpStream,
		count: usize,
		stage: &'static str,
	) -> Result<(), Error> {
		let mut sink = vec![0u8; count];
		self.read_exact(stream, &mut sink, stage).await
	}
}

/// Extracts the numeric status code from the first line of `body`, if it looks
/// like an HTTP status line. Failure here is never fatal to the outcome.
fn parse_status_line(body: &[u8]) -> Option<u16> {
	let head = body.split(|&b| b == b'\n').next()?;
	let head = std::str::from_utf8(head).ok()?;
	if !head.starts_with("HTTP/") {
		return None;
	}
	head.split_whitespace().nth(1)?.parse().ok()
}
