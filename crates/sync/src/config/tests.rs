use std::collections::HashMap;

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_defaults() {
	let config = ClientConfig::default();
	assert_eq!(config.api.base_url.as_str(), "http://localhost:8000/");
	assert_eq!(config.api.request_timeout(), Duration::from_secs(15));
	assert_eq!(config.api.snapshot_retry, RetryPolicy::NONE);
	assert_eq!(config.stream.handshake_timeout(), Duration::from_secs(10));
	assert_eq!(config.stream.reconnect, RetryPolicy::new(5, 500, 30_000));
	assert_eq!(config.stream.version_policy, VersionPolicy::Monotonic);
}

#[test]
fn test_parse_partial_file_keeps_defaults() {
	let config = ClientConfig::parse(
		r#"
		[api]
		base_url = "https://shop.example.com"

		[stream]
		version_policy = "arrival_order"

		[stream.reconnect]
		max_attempts = 2
		"#,
	)
	.unwrap();

	assert_eq!(config.api.base_url.as_str(), "https://shop.example.com/");
	assert_eq!(config.api.request_timeout_secs, 15);
	assert_eq!(config.stream.version_policy, VersionPolicy::ArrivalOrder);
	assert_eq!(config.stream.reconnect.max_attempts, 2);
	assert_eq!(config.stream.reconnect.initial_backoff_ms, 500);
}

#[test]
fn test_parse_rejects_unknown_keys_and_schemes() {
	assert!(matches!(ClientConfig::parse("[api]\nbase_ur = \"http://x\""), Err(ConfigError::Toml(_))));
	assert!(matches!(
		ClientConfig::parse("[api]\nbase_url = \"ftp://x\""),
		Err(ConfigError::UnsupportedScheme(scheme)) if scheme == "ftp"
	));
}

#[test]
fn test_load_reads_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("config.toml");
	std::fs::write(&path, "[api]\nrequest_timeout_secs = 3\n").unwrap();

	let config = ClientConfig::load(&path).unwrap();
	assert_eq!(config.api.request_timeout_secs, 3);

	let missing = ClientConfig::load(dir.path().join("absent.toml"));
	assert!(matches!(missing, Err(ConfigError::Io { .. })));
}

#[test]
fn test_environment_overrides() {
	let vars: HashMap<&str, &str> =
		HashMap::from([(BACKEND_URL_ENV, "https://api.example.com/store"), (TOKEN_ENV, "jwt-123")]);
	let mut config = ClientConfig::default();
	config
		.apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
		.unwrap();

	assert_eq!(config.api.base_url.as_str(), "https://api.example.com/store");
	assert_eq!(config.api.token.as_deref(), Some("jwt-123"));
}

#[test]
fn test_api_root_and_channel_url_share_origin() {
	let api = ApiConfig::new("https://api.example.com/store/").unwrap();
	assert_eq!(api.api_root().as_str(), "https://api.example.com/store/api/");
	assert_eq!(
		api.channel_url(EntityKind::Delivery).unwrap().unwrap().as_str(),
		"wss://api.example.com/store/ws/delivery"
	);
	assert_eq!(api.channel_url(EntityKind::Inventory).unwrap(), None);

	let local = ApiConfig::new("http://localhost:8000").unwrap();
	assert_eq!(local.channel_url(EntityKind::Delivery).unwrap().unwrap().as_str(), "ws://localhost:8000/ws/delivery");
}

#[test]
fn test_api_config_builder() {
	let api = ApiConfig::new("http://localhost:9000")
		.unwrap()
		.token("abc")
		.timeout(60)
		.snapshot_retry(RetryPolicy::new(3, 100, 1_000));

	assert_eq!(api.token.as_deref(), Some("abc"));
	assert_eq!(api.request_timeout_secs, 60);
	assert_eq!(api.snapshot_retry.max_attempts, 3);
	assert!(matches!(ApiConfig::new("not a url"), Err(ConfigError::InvalidUrl { .. })));
}
