//! REST client for the dashboard API.
//!
//! Every request carries the bearer token when one is set. Failures are folded
//! into the crate's error taxonomy:
//!
//! | cause                                   | error                 |
//! |-----------------------------------------|-----------------------|
//! | unreachable, timed out, 502/503/504     | [`Error::Network`]    |
//! | 401, 403                                | [`Error::Auth`]       |
//! | any other non-success status            | [`Error::Rejected`]   |
//! | body does not match the expected shape  | [`Error::Decode`]     |

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use stockroom_model::{
	AccessToken, Credentials, DashboardStats, Delivery, ForecastPoint, InventoryItem, NewDelivery, NewInventoryItem,
	Record, Registration, StockAdjusted, StockAdjustment, UserProfile,
};
use url::Url;

use crate::config::ApiConfig;
use crate::snapshot::SnapshotSource;
use crate::{Error, Result};

/// Client for the dashboard REST API.
#[derive(Clone)]
pub struct ApiClient {
	http: reqwest::Client,
	api_root: Url,
	token: Option<String>,
}

impl fmt::Debug for ApiClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ApiClient")
			.field("api_root", &self.api_root.as_str())
			.field("authenticated", &self.token.is_some())
			.finish()
	}
}

impl ApiClient {
	/// Creates a client from `config`.
	pub fn new(config: &ApiConfig) -> Self {
		let http = reqwest::Client::builder()
			.timeout(config.request_timeout())
			.build()
			.unwrap_or_else(|err| {
				tracing::warn!(error = %err, "HTTP client setup failed; requests will have no timeout");
				reqwest::Client::new()
			});
		Self {
			http,
			api_root: config.api_root(),
			token: config.token.clone(),
		}
	}

	/// Replaces the bearer token.
	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	/// Current bearer token.
	pub fn token(&self) -> Option<&str> {
		self.token.as_deref()
	}

	/// Exchanges credentials for a token.
	pub async fn login(&self, credentials: &Credentials) -> Result<AccessToken> {
		let request = self.request(Method::POST, &["auth", "login"]).json(credentials);
		self.send(request).await
	}

	/// Creates an account and returns its token.
	pub async fn register(&self, registration: &Registration) -> Result<AccessToken> {
		let request = self.request(Method::POST, &["auth", "register"]).json(registration);
		self.send(request).await
	}

	/// Profile of the token's owner.
	pub async fn me(&self) -> Result<UserProfile> {
		self.send(self.request(Method::GET, &["auth", "me"])).await
	}

	/// Bulk read of every record of `R`'s kind.
	pub async fn list<R: Record>(&self) -> Result<Vec<R>> {
		let records: Vec<R> = self.send(self.request(Method::GET, &[R::KIND.collection_path()])).await?;
		tracing::debug!(entity_kind = %R::KIND, count = records.len(), "Fetched snapshot");
		Ok(records)
	}

	/// Creates an inventory item.
	pub async fn create_inventory_item(&self, item: &NewInventoryItem) -> Result<InventoryItem> {
		self.send(self.request(Method::POST, &["inventory"]).json(item)).await
	}

	/// Fetches one inventory item by SKU.
	pub async fn inventory_item(&self, sku: &str) -> Result<InventoryItem> {
		self.send(self.request(Method::GET, &["inventory", sku])).await
	}

	/// Purchases or restocks `sku`.
	pub async fn adjust_stock(&self, sku: &str, adjustment: &StockAdjustment) -> Result<StockAdjusted> {
		self.send(self.request(Method::PUT, &["inventory", sku]).json(adjustment)).await
	}

	/// Schedules a delivery.
	pub async fn create_delivery(&self, delivery: &NewDelivery) -> Result<Delivery> {
		self.send(self.request(Method::POST, &["delivery"]).json(delivery)).await
	}

	/// Demand forecast for `sku`.
	pub async fn forecast(&self, sku: &str) -> Result<Vec<ForecastPoint>> {
		self.send(self.request(Method::GET, &["forecast", sku])).await
	}

	/// Dashboard counters.
	pub async fn stats(&self) -> Result<DashboardStats> {
		self.send(self.request(Method::GET, &["stats"])).await
	}

	/// Snapshot source reading `R`'s collection through this client.
	pub fn snapshot_source<R: Record>(&self) -> HttpSnapshotSource<R> {
		HttpSnapshotSource {
			client: self.clone(),
			_record: PhantomData,
		}
	}

	fn endpoint(&self, segments: &[&str]) -> Url {
		endpoint(&self.api_root, segments)
	}

	fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
		let request = self.http.request(method, self.endpoint(segments));
		match &self.token {
			Some(token) => request.bearer_auth(token),
			None => request,
		}
	}

	async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
		let response = request.send().await.map_err(transport_error)?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			let err = status_error(status, &body);
			tracing::debug!(status = status.as_u16(), error = %err, "API request failed");
			return Err(err);
		}
		let body = response.bytes().await.map_err(transport_error)?;
		Ok(serde_json::from_slice(&body)?)
	}
}

/// [`SnapshotSource`] backed by `GET {base}/api/{collection}`.
pub struct HttpSnapshotSource<R> {
	client: ApiClient,
	_record: PhantomData<fn() -> R>,
}

impl<R> fmt::Debug for HttpSnapshotSource<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HttpSnapshotSource").field("client", &self.client).finish()
	}
}

#[async_trait]
impl<R: Record> SnapshotSource<R> for HttpSnapshotSource<R> {
	async fn fetch(&self) -> Result<Vec<R>> {
		self.client.list::<R>().await
	}
}

fn endpoint(root: &Url, segments: &[&str]) -> Url {
	let mut url = root.clone();
	if let Ok(mut path) = url.path_segments_mut() {
		path.pop_if_empty().extend(segments);
	}
	url
}

fn transport_error(err: reqwest::Error) -> Error {
	if err.is_decode() {
		Error::Decode(err.to_string())
	} else {
		Error::Network(err.to_string())
	}
}

#[derive(Deserialize)]
struct ErrorBody {
	detail: serde_json::Value,
}

fn status_error(status: StatusCode, body: &str) -> Error {
	let detail = serde_json::from_str::<ErrorBody>(body)
		.ok()
		.map(|body| match body.detail {
			serde_json::Value::String(text) => text,
			other => other.to_string(),
		})
		.or_else(|| Some(body.trim().to_string()))
		.filter(|detail| !detail.is_empty())
		.unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

	let code = status.as_u16();
	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth { status: code, detail },
		StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
			Error::Network(format!("{code}: {detail}"))
		}
		_ => Error::Rejected { status: code, detail },
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn root(base: &str) -> Url {
		ApiConfig::new(base).unwrap().api_root()
	}

	#[test]
	fn test_endpoints_extend_api_root() {
		assert_eq!(endpoint(&root("http://localhost:8000"), &["inventory"]).as_str(), "http://localhost:8000/api/inventory");
		assert_eq!(
			endpoint(&root("https://shop.example.com/dash/"), &["auth", "me"]).as_str(),
			"https://shop.example.com/dash/api/auth/me"
		);
	}

	#[test]
	fn test_path_values_are_percent_encoded() {
		let url = endpoint(&root("http://localhost:8000"), &["inventory", "SKU 1/A"]);
		assert_eq!(url.as_str(), "http://localhost:8000/api/inventory/SKU%201%2FA");
	}

	#[test]
	fn test_unauthorized_maps_to_auth_with_detail() {
		let err = status_error(StatusCode::UNAUTHORIZED, r#"{"detail":"Token has expired"}"#);
		assert_eq!(
			err,
			Error::Auth {
				status: 401,
				detail: "Token has expired".into()
			}
		);
	}

	#[test]
	fn test_forbidden_maps_to_auth() {
		let err = status_error(StatusCode::FORBIDDEN, r#"{"detail":"Not authorized"}"#);
		assert!(matches!(err, Error::Auth { status: 403, .. }));
	}

	#[test]
	fn test_business_rule_maps_to_rejected() {
		let err = status_error(StatusCode::BAD_REQUEST, r#"{"detail":"Insufficient inventory"}"#);
		assert_eq!(
			err,
			Error::Rejected {
				status: 400,
				detail: "Insufficient inventory".into()
			}
		);
	}

	#[test]
	fn test_structured_detail_is_kept_as_json() {
		let err = status_error(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":[{"loc":["body","quantity"]}]}"#);
		let Error::Rejected { status, detail } = err else {
			panic!("expected rejection");
		};
		assert_eq!(status, 422);
		assert!(detail.contains("quantity"), "{detail}");
	}

	#[test]
	fn test_gateway_errors_are_transient() {
		let err = status_error(StatusCode::BAD_GATEWAY, "upstream down");
		assert!(err.is_transient());
		assert_eq!(err, Error::Network("502: upstream down".into()));
	}

	#[test]
	fn test_empty_body_falls_back_to_reason() {
		let err = status_error(StatusCode::NOT_FOUND, "");
		assert_eq!(
			err,
			Error::Rejected {
				status: 404,
				detail: "Not Found".into()
			}
		);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn test_configured_timeout_bounds_requests() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let server = tokio::spawn(async move {
			let (_socket, _) = listener.accept().await.unwrap();
			std::future::pending::<()>().await;
		});

		let config = ApiConfig::new(&format!("http://{addr}")).unwrap().timeout(1);
		let res = tokio::time::timeout(std::time::Duration::from_secs(10), ApiClient::new(&config).stats())
			.await
			.expect("request outlived its timeout");

		assert!(matches!(res, Err(Error::Network(_))), "{res:?}");
		server.abort();
	}

	#[test]
	fn test_debug_hides_token() {
		let client = ApiClient::new(&ApiConfig::default()).with_token("secret-token");
		assert!(!format!("{client:?}").contains("secret-token"));
		assert_eq!(client.token(), Some("secret-token"));
	}
}
