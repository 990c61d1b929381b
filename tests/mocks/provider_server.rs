//! Local stand-ins for the Kado and Transak HTTP APIs
//!
//! Each server binds 127.0.0.1:0 and records every request it receives.

#![allow(dead_code)]

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::fixtures::{USDC_ADDRESS, ZK_ADDRESS};

pub const TRANSAK_SECRET: &str = "transak-secret";
pub const TRANSAK_ACCESS_TOKEN: &str = "access-token-1";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
	pub method: String,
	pub path: String,
	pub query: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct Recorder {
	requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn record(State(recorder): State<Recorder>, request: Request, next: Next) -> Response {
	let query = Query::<HashMap<String, String>>::try_from_uri(request.uri())
		.map(|Query(query)| query)
		.unwrap_or_default();
	recorder.requests.lock().unwrap().push(RecordedRequest {
		method: request.method().to_string(),
		path: request.uri().path().to_string(),
		query,
	});
	next.run(request).await
}

pub struct ProviderServer {
	pub base_url: String,
	recorder: Recorder,
	handle: JoinHandle<()>,
}

impl ProviderServer {
	async fn spawn(routes: Router) -> Self {
		let recorder = Recorder::default();
		let app = routes.layer(middleware::from_fn_with_state(recorder.clone(), record));

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
			.await
			.expect("bind test port");
		let addr = listener.local_addr().unwrap();
		let handle = tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});

		Self {
			base_url: format!("http://{}:{}", addr.ip(), addr.port()),
			recorder,
			handle,
		}
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.recorder.requests.lock().unwrap().clone()
	}

	pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
		self.requests()
			.into_iter()
			.filter(|r| r.path == path)
			.collect()
	}

	pub async fn kado() -> Self {
		let routes = Router::new()
			.route("/v2/public/config", get(kado_config))
			.route("/v1/ramp/blockchains", get(kado_blockchains))
			.route("/v2/ramp/quote", get(kado_quote))
			.route("/v2/public/orders/:id", get(kado_order));
		Self::spawn(routes).await
	}

	pub async fn transak() -> Self {
		let routes = Router::new()
			.route("/v2/countries", get(transak_countries))
			.route("/v2/currencies/crypto-currencies", get(transak_cryptos))
			.route("/v1/pricing/public/quotes", get(transak_quote))
			.route("/partners/api/v2/refresh-token", post(transak_refresh_token))
			.route("/v2/order/:id", get(transak_order));
		Self::spawn(routes).await
	}
}

impl Drop for ProviderServer {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

type Reply = (StatusCode, Json<Value>);

async fn kado_config() -> Reply {
	(
		StatusCode::OK,
		Json(json!({
			"success": true,
			"message": "",
			"data": {
				"countries": [
					{ "code": "us", "disabled": false },
					{ "code": "DE" },
					{ "code": "KP", "disabled": true }
				]
			}
		})),
	)
}

async fn kado_blockchains() -> Reply {
	(
		StatusCode::OK,
		Json(json!({
			"success": true,
			"data": {
				"blockchains": [
					{
						"officialId": "324",
						"associatedAssets": [
							{
								"symbol": "USDC",
								"address": USDC_ADDRESS,
								"rampProducts": ["buy", "sell"],
								"kycLevels": ["L1"]
							},
							{
								"symbol": "ZK",
								"address": ZK_ADDRESS,
								"rampProducts": ["sell"],
								"kycLevels": ["L2"]
							},
							{
								"symbol": "PEPE",
								"address": "0x00000000000000000000000000000000deadbeef",
								"rampProducts": ["buy"],
								"kycLevels": ["L0"]
							}
						]
					},
					{
						"officialId": "137",
						"associatedAssets": [
							{
								"symbol": "USDC",
								"address": "0x3c499c542cef5e3811e1192ce70d8cc03d5c3359",
								"rampProducts": ["buy"],
								"kycLevels": ["L1"]
							}
						]
					}
				]
			}
		})),
	)
}

async fn kado_quote(Query(query): Query<HashMap<String, String>>) -> Reply {
	if query.get("asset").map(String::as_str) != Some("USDC") {
		return (
			StatusCode::OK,
			Json(json!({ "success": false, "message": "Asset not supported" })),
		);
	}

	let priced = |fee: f64, units: f64| {
		json!({
			"totalFee": { "amount": fee },
			"minValue": { "amount": 10.0 },
			"maxValue": { "amount": 1000.0 },
			"receive": { "unitCount": units }
		})
	};
	(
		StatusCode::OK,
		Json(json!({
			"success": true,
			"data": {
				"request": { "fiatMethod": "credit_card", "amount": 100.0 },
				"quote": priced(3.5, 96.5),
				"quotes": {
					"debit_card": priced(4.0, 96.0),
					"wire": priced(2.0, 98.0),
					"crypto_voucher": priced(0.0, 100.0)
				}
			}
		})),
	)
}

async fn kado_order(Path(id): Path<String>) -> Reply {
	let order = match id.as_str() {
		"ord-settled" => json!({
			"paymentStatus": "success",
			"transferStatus": "settled",
			"humanStatusField": "Settled"
		}),
		"ord-processing" => json!({
			"paymentStatus": "success",
			"transferStatus": "pending",
			"humanStatusField": "Sending"
		}),
		"ord-failed" => json!({
			"paymentStatus": "failed",
			"transferStatus": "uninitiated",
			"humanStatusField": "Card declined"
		}),
		_ => {
			return (
				StatusCode::NOT_FOUND,
				Json(json!({ "success": false, "message": "Order not found" })),
			)
		},
	};
	(StatusCode::OK, Json(json!({ "success": true, "data": order })))
}

async fn transak_countries() -> Reply {
	(
		StatusCode::OK,
		Json(json!({
			"response": [
				{ "alpha2": "US", "isAllowed": true, "isLightKycAllowed": true },
				{ "alpha2": "gb", "isAllowed": true, "isLightKycAllowed": false },
				{ "alpha2": "KP", "isAllowed": false }
			]
		})),
	)
}

async fn transak_cryptos() -> Reply {
	(
		StatusCode::OK,
		Json(json!({
			"response": [
				{
					"coinId": "usd-coin",
					"symbol": "USDC",
					"address": USDC_ADDRESS,
					"isAllowed": true,
					"network": { "chainId": "324" }
				},
				{
					"coinId": "zksync",
					"symbol": "ZK",
					"address": ZK_ADDRESS,
					"isAllowed": false,
					"network": { "chainId": "324" }
				},
				{
					"coinId": "matic-network",
					"symbol": "POL",
					"address": "0x0000000000000000000000000000000000001010",
					"isAllowed": true,
					"network": { "chainId": "137" }
				}
			]
		})),
	)
}

async fn transak_quote(Query(query): Query<HashMap<String, String>>) -> Reply {
	let (crypto_amount, total_fee) = match query.get("paymentMethod").map(String::as_str) {
		Some("credit_debit_card") => (97.0, 3.0),
		Some("apple_pay") => (96.0, 4.0),
		_ => {
			return (
				StatusCode::BAD_REQUEST,
				Json(json!({ "error": { "message": "Payment method not available" } })),
			)
		},
	};
	(
		StatusCode::OK,
		Json(json!({
			"response": { "cryptoAmount": crypto_amount, "totalFee": total_fee }
		})),
	)
}

async fn transak_refresh_token(headers: HeaderMap) -> Reply {
	let secret = headers.get("api-secret").and_then(|v| v.to_str().ok());
	if secret != Some(TRANSAK_SECRET) {
		return (
			StatusCode::UNAUTHORIZED,
			Json(json!({ "error": { "message": "Invalid secret" } })),
		);
	}
	(
		StatusCode::OK,
		Json(json!({
			"data": {
				"accessToken": TRANSAK_ACCESS_TOKEN,
				"expiresAt": chrono::Utc::now().timestamp() + 3600
			}
		})),
	)
}

async fn transak_order(Path(id): Path<String>, headers: HeaderMap) -> Reply {
	let token = headers.get("access-token").and_then(|v| v.to_str().ok());
	if token != Some(TRANSAK_ACCESS_TOKEN) {
		return (
			StatusCode::UNAUTHORIZED,
			Json(json!({ "error": { "message": "Invalid access token" } })),
		);
	}
	if id != "tx-1" {
		return (
			StatusCode::NOT_FOUND,
			Json(json!({ "error": { "message": "Order not found" } })),
		);
	}
	(
		StatusCode::OK,
		Json(json!({
			"data": {
				"status": "COMPLETED",
				"isBuyOrSell": "BUY",
				"fiatCurrency": "USD",
				"fiatAmount": 100.0,
				"amountPaid": 100.0,
				"cryptoCurrency": "USDC",
				"cryptoAmount": 97.0,
				"conversionPrice": 1.0,
				"totalFeeInFiat": 3.0,
				"network": "zksync",
				"completedAt": "2024-05-01T10:15:00Z",
				"statusHistories": [
					{ "message": "Order created", "createdAt": "2024-05-01T10:00:00Z" },
					{ "message": "Order completed", "createdAt": "2024-05-01T10:15:00Z" }
				]
			}
		})),
	)
}
