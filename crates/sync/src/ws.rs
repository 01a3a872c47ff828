//! WebSocket push transport.

use std::fmt;

use async_trait::async_trait;
use futures::StreamExt;
use stockroom_model::EntityKind;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::config::{self, ApiConfig};
use crate::listener::{PushConnection, PushTransport};
use crate::{Error, Result};

/// Push transport over a WebSocket endpoint.
#[derive(Clone)]
pub struct WsTransport {
	url: Url,
	token: Option<String>,
}

impl fmt::Debug for WsTransport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WsTransport")
			.field("url", &self.url.as_str())
			.field("token", &self.token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

impl WsTransport {
	/// Creates a transport for `url`, sending `token` as a bearer credential when set.
	pub fn new(url: Url, token: Option<String>) -> Self {
		Self { url, token }
	}

	/// Transport for the push channel of `kind`, or `None` if the kind is not streamed.
	pub fn for_kind(api: &ApiConfig, kind: EntityKind) -> config::Result<Option<Self>> {
		Ok(api.channel_url(kind)?.map(|url| Self::new(url, api.token.clone())))
	}

	/// Channel address.
	pub fn url(&self) -> &Url {
		&self.url
	}
}

#[async_trait]
impl PushTransport for WsTransport {
	async fn connect(&self) -> Result<Box<dyn PushConnection>> {
		let mut request = self
			.url
			.as_str()
			.into_client_request()
			.map_err(|e| Error::Network(e.to_string()))?;
		if let Some(token) = &self.token {
			let value = HeaderValue::from_str(&format!("Bearer {token}"))
				.map_err(|_| Error::Auth {
					status: 0,
					detail: "token is not a valid header value".into(),
				})?;
			request.headers_mut().insert(header::AUTHORIZATION, value);
		}

		let (stream, response) = tokio_tungstenite::connect_async(request).await.map_err(handshake_error)?;
		tracing::info!(url = %self.url, status = response.status().as_u16(), "Push channel connected");
		Ok(Box::new(WsConnection { stream, closed: false }))
	}
}

fn handshake_error(err: tungstenite::Error) -> Error {
	match err {
		tungstenite::Error::Http(response) => {
			let status = response.status().as_u16();
			let detail = response
				.body()
				.as_deref()
				.map(|body| String::from_utf8_lossy(body).into_owned())
				.filter(|body| !body.is_empty())
				.unwrap_or_else(|| response.status().canonical_reason().unwrap_or("handshake rejected").to_string());
			if matches!(status, 401 | 403) {
				Error::Auth { status, detail }
			} else {
				Error::Network(format!("handshake rejected ({status}): {detail}"))
			}
		}
		other => Error::Network(other.to_string()),
	}
}

struct WsConnection {
	stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
	closed: bool,
}

#[async_trait]
impl PushConnection for WsConnection {
	async fn recv(&mut self) -> Option<Result<Vec<u8>>> {
		if self.closed {
			return None;
		}
		while let Some(frame) = self.stream.next().await {
			match frame {
				Ok(Message::Text(text)) => return Some(Ok(text.as_str().as_bytes().to_vec())),
				Ok(Message::Binary(bytes)) => return Some(Ok(bytes.to_vec())),
				Ok(Message::Close(frame)) => {
					tracing::debug!(?frame, "Push channel closed by server");
					self.closed = true;
					return None;
				}
				Ok(_) => {}
				Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
					self.closed = true;
					return None;
				}
				Err(err) => return Some(Err(Error::Channel(err.to_string()))),
			}
		}
		self.closed = true;
		None
	}

	async fn close(&mut self) {
		if self.closed {
			return;
		}
		self.closed = true;
		if let Err(err) = self.stream.close(None).await {
			tracing::debug!(error = %err, "Error closing push channel");
		}
	}
}
