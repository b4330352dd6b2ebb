// SPDX-License-Identifier: GPL-3.0

use super::provider::{Eip1193Provider, INTERNAL_ERROR, ProviderError, ProviderEvent};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use url::Url;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct JsonRpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<ProviderError>,
}

/// An EIP-1193 provider backed by a plain JSON-RPC endpoint, e.g. a development node.
///
/// Emits no notifications.
pub struct HttpProvider {
	client: reqwest::Client,
	url: Url,
	next_id: AtomicU64,
}

impl HttpProvider {
	/// # Arguments
	/// * `url` - The JSON-RPC endpoint.
	pub fn new(url: Url) -> Result<Self, ProviderError> {
		let client = reqwest::Client::builder()
			.user_agent(APP_USER_AGENT)
			.build()
			.map_err(transport_error)?;
		Ok(Self { client, url, next_id: AtomicU64::new(1) })
	}

	pub fn url(&self) -> &Url {
		&self.url
	}
}

fn transport_error(e: reqwest::Error) -> ProviderError {
	ProviderError::new(INTERNAL_ERROR, e.to_string())
}

#[async_trait]
impl Eip1193Provider for HttpProvider {
	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let params = match params {
			Value::Null => json!([]),
			params => params,
		};
		log::debug!("{method} -> {}", self.url);
		let response: JsonRpcResponse = self
			.client
			.post(self.url.clone())
			.json(&json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
			.send()
			.await
			.map_err(transport_error)?
			.error_for_status()
			.map_err(transport_error)?
			.json()
			.await
			.map_err(transport_error)?;
		match (response.error, response.result) {
			(Some(error), _) => Err(error),
			(None, result) => Ok(result.unwrap_or(Value::Null)),
		}
	}

	fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
		None
	}
}
