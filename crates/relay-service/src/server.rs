//! HTTP server for the relay API.
//!
//! Routes live under `/api`:
//! - `POST /api/transactions` tracks a hash submitted elsewhere
//! - `GET /api/transactions/{hash}` reports its tracking status
//! - `POST /api/intents` dispatches a contract call

use axum::{
	extract::{DefaultBodyLimit, Path, State},
	http::StatusCode,
	response::Json,
	routing::{get, post},
	Router,
};
use relay_config::ApiConfig;
use relay_core::RelayEngine;
use relay_types::{
	APIError, RegisterTransactionRequest, SponsorshipDecision, SubmitIntentRequest,
	TransactionStatusResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<RelayEngine>,
}

/// Builds the API router.
pub fn router(engine: Arc<RelayEngine>, api_config: &ApiConfig) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/transactions", post(handle_register_transaction))
				.route("/transactions/{hash}", get(handle_get_transaction))
				.route("/intents", post(handle_submit_intent)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				)))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(AppState { engine })
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<RelayEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Relay API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

async fn handle_register_transaction(
	State(state): State<AppState>,
	Json(request): Json<RegisterTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionStatusResponse>), APIError> {
	match crate::apis::transaction::register_transaction(request, &state.engine).await {
		Ok(response) => Ok((StatusCode::CREATED, Json(response))),
		Err(e) => {
			tracing::warn!("Transaction registration failed: {}", e);
			Err(e)
		},
	}
}

async fn handle_get_transaction(
	Path(hash): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<TransactionStatusResponse>, APIError> {
	crate::apis::transaction::get_transaction(&hash, &state.engine)
		.await
		.map(Json)
}

async fn handle_submit_intent(
	State(state): State<AppState>,
	Json(request): Json<SubmitIntentRequest>,
) -> Result<(StatusCode, Json<SponsorshipDecision>), APIError> {
	match crate::apis::intent::submit_intent(request, &state.engine).await {
		Ok(decision) if decision.succeeded => Ok((StatusCode::OK, Json(decision))),
		Ok(decision) => {
			tracing::warn!(
				"Intent failed: {}",
				decision.error_message.as_deref().unwrap_or("unknown")
			);
			Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(decision)))
		},
		Err(e) => {
			tracing::warn!("Intent submission failed: {}", e);
			Err(e)
		},
	}
}
