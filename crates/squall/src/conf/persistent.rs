use std::{net::SocketAddr, path::PathBuf, time::Duration};

use educe::Educe;
use figment::{
	Figment,
	providers::{Env, Format, Toml, Yaml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Educe)]
#[educe(Default)]
#[serde(default)]
pub struct PersistentConfig {
	pub endpoint: EndpointOpt,
	pub run:      RunOpt,
}

/// The proxy under test and the fixed fetch target behind it.
#[derive(Debug, Deserialize, Serialize, Educe)]
#[educe(Default)]
#[serde(default)]
pub struct EndpointOpt {
	#[educe(Default(expression = "127.0.0.1:1080".parse().unwrap()))]
	pub proxy_addr: SocketAddr,

	#[educe(Default = "www.example.com")]
	pub target_host: String,

	#[educe(Default = 80)]
	pub target_port: u16,
}

/// Run-shape defaults; command line flags override these.
#[derive(Debug, Deserialize, Serialize, Educe)]
#[educe(Default)]
#[serde(default)]
pub struct RunOpt {
	#[serde(with = "humantime_serde")]
	#[educe(Default(expression = Duration::from_secs(5)))]
	pub timeout: Duration,

	#[serde(with = "humantime_serde")]
	#[educe(Default(expression = Duration::ZERO))]
	pub jitter: Duration,
}

impl PersistentConfig {
	pub fn export_to_file(&self, file_path: &PathBuf, format: &str) -> eyre::Result<()> {
		use std::fs;
		use std::io::Write;

		match format.to_lowercase().as_str() {
			"yaml" => {
				let yaml_content = serde_yaml::to_string(&self)?;
				let mut file = fs::File::create(file_path)?;
				file.write_all(yaml_content.as_bytes())?;
			}
			"toml" => {
				let toml_content = toml::to_string_pretty(&self)?;
				let mut file = fs::File::create(file_path)?;
				file.write_all(toml_content.as_bytes())?;
			}
			_ => return Err(eyre::eyre!("Unsupported file format: {}", format)),
		}

		Ok(())
	}

	pub fn load(config_path: Option<String>, config_dir: Option<PathBuf>) -> eyre::Result<Self> {
		// Start with empty figment (will use default values via serde)
		let mut figment = Figment::new();

		// Load from default configuration location
		if let Some(config_dir) = config_dir {
			let config_file = config_dir.join("config.toml");
			if config_file.exists() {
				figment = figment.merge(Toml::file(config_file));
			}

			let config_file = config_dir.join("config.yaml");
			if config_file.exists() {
				figment = figment.merge(Yaml::file(config_file));
			}
		} else {
			// Try to load from default locations
			let config_toml = std::path::Path::new("config.toml");
			if config_toml.exists() {
				figment = figment.merge(Toml::file(config_toml));
			}

			let config_yaml = std::path::Path::new("config.yaml");
			if config_yaml.exists() {
				figment = figment.merge(Yaml::file(config_yaml));
			}
		}

		// If specific config path is provided, use that
		if let Some(config_path) = config_path {
			if config_path.ends_with(".yaml") || config_path.ends_with(".yml") {
				figment = figment.merge(Yaml::file(config_path));
			} else {
				// Assume it's TOML format
				figment = figment.merge(Toml::file(config_path));
			}
		}

		// Environment variables can override config files
		figment = figment.merge(Env::prefixed("SQUALL_"));

		// Extract the configuration
		let config: PersistentConfig = figment.extract()?;

		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = PersistentConfig::default();
		assert_eq!(config.endpoint.proxy_addr, "127.0.0.1:1080".parse().unwrap());
		assert_eq!(config.endpoint.target_host, "www.example.com");
		assert_eq!(config.endpoint.target_port, 80);
		assert_eq!(config.run.timeout, Duration::from_secs(5));
		assert_eq!(config.run.jitter, Duration::ZERO);
	}

	#[test]
	fn test_yaml_round_trip() {
		let config = PersistentConfig::default();
		let yaml = serde_yaml::to_string(&config).unwrap();
		let parsed: PersistentConfig = serde_yaml::from_str(&yaml).unwrap();
		assert_eq!(parsed.endpoint.proxy_addr, config.endpoint.proxy_addr);
		assert_eq!(parsed.run.timeout, config.run.timeout);
	}
}
