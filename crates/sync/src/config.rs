//! Client configuration.
//!
//! Read from `config.toml` in the stockroom config directory
//! (`$STOCKROOM_CONFIG_DIR`, or the platform config dir plus `stockroom`), then
//! overridden by `STOCKROOM_BACKEND_URL` and `STOCKROOM_TOKEN`.
//!
//! ```toml
//! [api]
//! base_url = "https://shop.example.com"
//! request_timeout_secs = 15
//!
//! [api.snapshot_retry]
//! max_attempts = 2
//!
//! [stream]
//! handshake_timeout_secs = 10
//! version_policy = "monotonic"
//!
//! [stream.reconnect]
//! max_attempts = 5
//! initial_backoff_ms = 500
//! max_backoff_ms = 30000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stockroom_model::EntityKind;
use thiserror::Error;
use url::Url;

use crate::reconcile::VersionPolicy;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "STOCKROOM_CONFIG_DIR";
/// Environment variable overriding [`ApiConfig::base_url`].
pub const BACKEND_URL_ENV: &str = "STOCKROOM_BACKEND_URL";
/// Environment variable overriding [`ApiConfig::token`].
pub const TOKEN_ENV: &str = "STOCKROOM_TOKEN";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A URL could not be parsed.
	#[error("invalid URL {value:?}: {reason}")]
	InvalidUrl {
		/// The offending value.
		value: String,
		/// Parser message.
		reason: String,
	},

	/// The API base URL is not http or https.
	#[error("unsupported URL scheme: {0} (expected 'http' or 'https')")]
	UnsupportedScheme(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
	/// Consecutive retries before giving up. Zero disables retrying.
	pub max_attempts: u32,
	/// Delay before the first retry.
	pub initial_backoff_ms: u64,
	/// Upper bound on any single delay.
	pub max_backoff_ms: u64,
}

impl RetryPolicy {
	/// A policy that never retries.
	pub const NONE: Self = Self {
		max_attempts: 0,
		initial_backoff_ms: 0,
		max_backoff_ms: 0,
	};

	/// Creates a policy.
	pub const fn new(max_attempts: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
		Self {
			max_attempts,
			initial_backoff_ms,
			max_backoff_ms,
		}
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(5, 500, 30_000)
	}
}

/// How to reach the dashboard API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
	/// Origin of the API; bulk reads live under `{base_url}/api/`.
	pub base_url: Url,
	/// Bearer token for authenticated requests.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token: Option<String>,
	/// Per-request timeout in seconds.
	pub request_timeout_secs: u64,
	/// Retry policy for bulk reads that fail with a network error.
	pub snapshot_retry: RetryPolicy,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			base_url: Url::parse("http://localhost:8000").expect("static URL parses"),
			token: None,
			request_timeout_secs: 15,
			snapshot_retry: RetryPolicy::NONE,
		}
	}
}

impl ApiConfig {
	/// Create a configuration for the API at `base_url`.
	pub fn new(base_url: &str) -> Result<Self> {
		let base_url = parse_base_url(base_url)?;
		Ok(Self {
			base_url,
			..Self::default()
		})
	}

	/// Set the bearer token.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	/// Set the request timeout.
	pub fn timeout(mut self, secs: u64) -> Self {
		self.request_timeout_secs = secs;
		self
	}

	/// Set the bulk read retry policy.
	pub fn snapshot_retry(mut self, policy: RetryPolicy) -> Self {
		self.snapshot_retry = policy;
		self
	}

	/// Per-request timeout.
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	/// Root of the REST API, always ending in `/api/`.
	pub fn api_root(&self) -> Url {
		let mut url = self.base_url.clone();
		let prefix = url.path().trim_end_matches('/').to_string();
		url.set_path(&format!("{prefix}/api/"));
		url.set_query(None);
		url
	}

	/// Push channel address for `kind`, on the same origin as the API.
	///
	/// Returns `None` for kinds the server does not stream.
	pub fn channel_url(&self, kind: EntityKind) -> Result<Option<Url>> {
		let Some(path) = kind.push_path() else {
			return Ok(None);
		};
		let mut url = self.base_url.clone();
		let scheme = match url.scheme() {
			"http" => "ws",
			"https" => "wss",
			other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
		};
		url.set_scheme(scheme)
			.map_err(|()| ConfigError::UnsupportedScheme(scheme.to_string()))?;
		let prefix = url.path().trim_end_matches('/').to_string();
		url.set_path(&format!("{prefix}{path}"));
		url.set_query(None);
		Ok(Some(url))
	}
}

/// Push channel tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
	/// Seconds to wait for the handshake before counting the attempt as failed.
	pub handshake_timeout_secs: u64,
	/// Reconnect policy after the channel drops.
	pub reconnect: RetryPolicy,
	/// Decoded patches buffered between the listener and the session.
	pub buffer: usize,
	/// Conflict policy for versioned patches.
	pub version_policy: VersionPolicy,
}

impl Default for StreamConfig {
	fn default() -> Self {
		Self {
			handshake_timeout_secs: 10,
			reconnect: RetryPolicy::default(),
			buffer: 256,
			version_policy: VersionPolicy::default(),
		}
	}
}

impl StreamConfig {
	/// Handshake timeout.
	pub fn handshake_timeout(&self) -> Duration {
		Duration::from_secs(self.handshake_timeout_secs)
	}
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
	/// API settings.
	pub api: ApiConfig,
	/// Push channel settings.
	pub stream: StreamConfig,
}

impl ClientConfig {
	/// Parse a TOML string into a [`ClientConfig`].
	pub fn parse(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		if !matches!(config.api.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme(config.api.base_url.scheme().to_string()));
		}
		Ok(config)
	}

	/// Load configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		Self::parse(&content)
	}

	/// Load `config.toml` from [`config_dir`] if present, then apply environment overrides.
	pub fn load_default() -> Result<Self> {
		let mut config = match config_dir().map(|dir| dir.join("config.toml")) {
			Some(path) if path.exists() => Self::load(&path)?,
			_ => Self::default(),
		};
		config.apply_overrides(|key| std::env::var(key).ok())?;
		Ok(config)
	}

	/// Apply overrides looked up through `var`, typically the process environment.
	pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
		if let Some(url) = var(BACKEND_URL_ENV).filter(|v| !v.is_empty()) {
			self.api.base_url = parse_base_url(&url)?;
		}
		if let Some(token) = var(TOKEN_ENV).filter(|v| !v.is_empty()) {
			self.api.token = Some(token);
		}
		Ok(())
	}
}

/// Directory holding `config.toml` and the saved token.
pub fn config_dir() -> Option<PathBuf> {
	if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
		return Some(PathBuf::from(dir));
	}
	dirs::config_dir().map(|d| d.join("stockroom"))
}

fn parse_base_url(raw: &str) -> Result<Url> {
	let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
		value: raw.to_string(),
		reason: e.to_string(),
	})?;
	match url.scheme() {
		"http" | "https" => Ok(url),
		other => Err(ConfigError::UnsupportedScheme(other.to_string())),
	}
}

#[cfg(test)]
mod tests;
