//! HTTP API for the marketplace service.
//!
//! Thin request/response plumbing over the domain services. The caller
//! identity arrives pre-resolved in the `x-user-id` header (authentication
//! itself happens upstream); the error taxonomy maps onto HTTP status codes.

use crate::service::MarketState;
use axum::{
	extract::{FromRequestParts, Path, Query, State},
	http::{request::Parts, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
	Json, Router,
};
use market_catalog::NewProduct;
use market_notification::ListOptions;
use market_types::{MarketError, RefundStatus, UserId};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Starts the HTTP server on the given port.
pub async fn start_http_server(state: MarketState, port: u16) -> anyhow::Result<()> {
	let app = router(state);

	let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
	info!("API server listening on port {}", port);

	axum::serve(listener, app)
		.with_graceful_shutdown(crate::shutdown_signal())
		.await?;
	Ok(())
}

pub fn router(state: MarketState) -> Router {
	Router::new()
		.route("/health", get(health))
		// Orders
		.route("/orders", post(create_order).get(list_orders))
		.route("/orders/my", get(my_orders))
		.route("/orders/sales", get(my_sales))
		.route("/orders/{id}", get(get_order))
		.route("/orders/{id}/report-payment", post(report_payment))
		.route("/orders/{id}/verify-payment", post(verify_payment))
		.route("/orders/{id}/confirm", post(confirm_payment))
		.route("/orders/{id}/complete", post(complete_order))
		.route("/orders/{id}/cancel", post(cancel_order))
		.route("/orders/{id}/delivery", get(get_delivery_content))
		// Refunds
		.route("/refunds", post(request_refund).get(list_refunds))
		.route("/refunds/my", get(my_refunds))
		.route("/refunds/{id}", get(get_refund))
		.route("/refunds/{id}/process", post(process_refund))
		.route("/refunds/{id}/complete", post(complete_refund))
		// Products
		.route("/products", post(create_product).get(list_products))
		.route("/products/my", get(my_products))
		.route("/products/{id}", get(get_product))
		.route("/products/{id}/submit", post(submit_product))
		.route("/products/{id}/approve", post(approve_product))
		.route("/products/{id}/reject", post(reject_product))
		.route("/products/{id}/off-shelf", post(off_shelf_product))
		// Reviews
		.route("/reviews", post(create_review))
		.route("/products/{id}/reviews", get(product_reviews))
		.route("/products/{id}/rating", get(product_rating))
		.route("/sellers/{id}/rating", get(seller_rating))
		// Notifications
		.route("/notifications", get(list_notifications))
		.route("/notifications/unread-count", get(unread_count))
		.route("/notifications/read-all", post(mark_all_read))
		.route("/notifications/{id}/read", post(mark_read))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Pre-resolved caller identity from the `x-user-id` header.
struct Caller(UserId);

impl<S> FromRequestParts<S> for Caller
where
	S: Send + Sync,
{
	type Rejection = (StatusCode, Json<serde_json::Value>);

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.headers
			.get("x-user-id")
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.parse().ok())
			.map(Caller)
			.ok_or((
				StatusCode::UNAUTHORIZED,
				Json(json!({ "error": "Missing or invalid x-user-id header" })),
			))
	}
}

/// Maps domain errors onto HTTP statuses.
struct ApiError(MarketError);

impl From<MarketError> for ApiError {
	fn from(err: MarketError) -> Self {
		Self(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = match &self.0 {
			MarketError::NotFound(_) => StatusCode::NOT_FOUND,
			MarketError::Forbidden(_) => StatusCode::FORBIDDEN,
			MarketError::InvalidState(_) | MarketError::Validation(_) => StatusCode::BAD_REQUEST,
			MarketError::Storage(_) | MarketError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
		};
		(status, Json(json!({ "error": self.0.to_string() }))).into_response()
	}
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn health() -> Json<serde_json::Value> {
	Json(json!({ "status": "ok" }))
}

// --- Orders ---

#[derive(Deserialize)]
struct CreateOrderRequest {
	product_id: u64,
}

async fn create_order(
	State(state): State<MarketState>,
	caller: Caller,
	Json(body): Json<CreateOrderRequest>,
) -> ApiResult<market_types::Order> {
	Ok(Json(state.orders.create(caller.0, body.product_id).await?))
}

async fn list_orders(State(state): State<MarketState>) -> ApiResult<Vec<market_types::Order>> {
	Ok(Json(state.orders.find_all().await?))
}

async fn my_orders(
	State(state): State<MarketState>,
	caller: Caller,
) -> ApiResult<Vec<market_types::Order>> {
	Ok(Json(state.orders.find_by_buyer(caller.0).await?))
}

async fn my_sales(
	State(state): State<MarketState>,
	caller: Caller,
) -> ApiResult<Vec<market_types::Order>> {
	Ok(Json(state.orders.find_by_seller(caller.0).await?))
}

async fn get_order(
	State(state): State<MarketState>,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Order> {
	Ok(Json(state.orders.find_one(id).await?))
}

#[derive(Deserialize, Default)]
struct ReportPaymentRequest {
	transaction_hash: Option<String>,
	payment_network: Option<String>,
}

async fn report_payment(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
	body: Option<Json<ReportPaymentRequest>>,
) -> ApiResult<market_types::Order> {
	let body = body.map(|Json(b)| b).unwrap_or_default();
	Ok(Json(
		state
			.orders
			.report_payment(id, caller.0, body.transaction_hash, body.payment_network)
			.await?,
	))
}

async fn verify_payment(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Order> {
	Ok(Json(state.orders.verify_payment(id, caller.0).await?))
}

async fn confirm_payment(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Order> {
	Ok(Json(state.orders.confirm_payment(id, caller.0).await?))
}

async fn complete_order(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Order> {
	Ok(Json(state.orders.complete_order(id, caller.0).await?))
}

async fn cancel_order(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Order> {
	Ok(Json(state.orders.cancel_order(id, caller.0).await?))
}

async fn get_delivery_content(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
) -> ApiResult<market_types::DeliveryContent> {
	Ok(Json(state.orders.get_delivery_content(id, caller.0).await?))
}

// --- Refunds ---

#[derive(Deserialize)]
struct CreateRefundRequest {
	order_id: u64,
	reason: String,
}

async fn request_refund(
	State(state): State<MarketState>,
	caller: Caller,
	Json(body): Json<CreateRefundRequest>,
) -> ApiResult<market_types::Refund> {
	Ok(Json(
		state
			.refunds
			.request_refund(caller.0, body.order_id, body.reason)
			.await?,
	))
}

#[derive(Deserialize, Default)]
struct RefundFilter {
	status: Option<RefundStatus>,
}

async fn list_refunds(
	State(state): State<MarketState>,
	Query(filter): Query<RefundFilter>,
) -> ApiResult<Vec<market_types::Refund>> {
	Ok(Json(state.refunds.find_all(filter.status).await?))
}

async fn my_refunds(
	State(state): State<MarketState>,
	caller: Caller,
) -> ApiResult<Vec<market_types::Refund>> {
	Ok(Json(state.refunds.find_by_user(caller.0).await?))
}

async fn get_refund(
	State(state): State<MarketState>,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Refund> {
	Ok(Json(state.refunds.find_one(id).await?))
}

#[derive(Deserialize)]
struct ProcessRefundRequest {
	approved: bool,
	admin_note: Option<String>,
	refund_transaction_hash: Option<String>,
}

async fn process_refund(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
	Json(body): Json<ProcessRefundRequest>,
) -> ApiResult<market_types::Refund> {
	Ok(Json(
		state
			.refunds
			.process_refund(
				id,
				caller.0,
				body.approved,
				body.admin_note,
				body.refund_transaction_hash,
			)
			.await?,
	))
}

#[derive(Deserialize)]
struct CompleteRefundRequest {
	transaction_hash: String,
}

async fn complete_refund(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
	Json(body): Json<CompleteRefundRequest>,
) -> ApiResult<market_types::Refund> {
	Ok(Json(
		state
			.refunds
			.complete_refund(id, caller.0, body.transaction_hash)
			.await?,
	))
}

// --- Products ---

async fn create_product(
	State(state): State<MarketState>,
	caller: Caller,
	Json(body): Json<NewProduct>,
) -> ApiResult<market_types::Product> {
	Ok(Json(state.catalog.create(caller.0, body).await?))
}

async fn list_products(State(state): State<MarketState>) -> ApiResult<Vec<market_types::Product>> {
	Ok(Json(state.catalog.find_approved().await?))
}

async fn my_products(
	State(state): State<MarketState>,
	caller: Caller,
) -> ApiResult<Vec<market_types::Product>> {
	Ok(Json(state.catalog.find_by_seller(caller.0).await?))
}

async fn get_product(
	State(state): State<MarketState>,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Product> {
	Ok(Json(state.catalog.find_one(id).await?))
}

async fn submit_product(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Product> {
	Ok(Json(state.catalog.submit_for_review(id, caller.0).await?))
}

async fn approve_product(
	State(state): State<MarketState>,
	_caller: Caller,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Product> {
	Ok(Json(state.catalog.approve(id).await?))
}

#[derive(Deserialize)]
struct RejectProductRequest {
	reason: String,
}

async fn reject_product(
	State(state): State<MarketState>,
	_caller: Caller,
	Path(id): Path<u64>,
	Json(body): Json<RejectProductRequest>,
) -> ApiResult<market_types::Product> {
	Ok(Json(state.catalog.reject(id, body.reason).await?))
}

async fn off_shelf_product(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Product> {
	Ok(Json(state.catalog.take_off_shelf(id, caller.0).await?))
}

// --- Reviews ---

#[derive(Deserialize)]
struct CreateReviewRequest {
	order_id: u64,
	rating: u8,
	comment: Option<String>,
}

async fn create_review(
	State(state): State<MarketState>,
	caller: Caller,
	Json(body): Json<CreateReviewRequest>,
) -> ApiResult<market_types::Review> {
	Ok(Json(
		state
			.reviews
			.create(caller.0, body.order_id, body.rating, body.comment)
			.await?,
	))
}

async fn product_reviews(
	State(state): State<MarketState>,
	Path(id): Path<u64>,
) -> ApiResult<Vec<market_types::Review>> {
	Ok(Json(state.reviews.find_by_product(id).await?))
}

async fn product_rating(
	State(state): State<MarketState>,
	Path(id): Path<u64>,
) -> ApiResult<market_types::RatingSummary> {
	Ok(Json(state.reviews.product_rating(id).await?))
}

async fn seller_rating(
	State(state): State<MarketState>,
	Path(id): Path<u64>,
) -> ApiResult<market_types::RatingSummary> {
	Ok(Json(state.reviews.seller_rating(id).await?))
}

// --- Notifications ---

#[derive(Deserialize, Default)]
struct NotificationQuery {
	unread_only: Option<bool>,
	page: Option<u64>,
	limit: Option<u64>,
}

async fn list_notifications(
	State(state): State<MarketState>,
	caller: Caller,
	Query(query): Query<NotificationQuery>,
) -> ApiResult<market_types::NotificationPage> {
	let options = ListOptions {
		unread_only: query.unread_only.unwrap_or(false),
		page: query.page,
		limit: query.limit,
	};
	Ok(Json(state.notifications.find_by_user(caller.0, options).await?))
}

async fn unread_count(
	State(state): State<MarketState>,
	caller: Caller,
) -> ApiResult<serde_json::Value> {
	let count = state.notifications.unread_count(caller.0).await?;
	Ok(Json(json!({ "count": count })))
}

async fn mark_read(
	State(state): State<MarketState>,
	caller: Caller,
	Path(id): Path<u64>,
) -> ApiResult<market_types::Notification> {
	Ok(Json(state.notifications.mark_as_read(id, caller.0).await?))
}

async fn mark_all_read(
	State(state): State<MarketState>,
	caller: Caller,
) -> ApiResult<serde_json::Value> {
	state.notifications.mark_all_as_read(caller.0).await?;
	Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_statuses_follow_the_taxonomy() {
		let cases = [
			(MarketError::not_found("x"), StatusCode::NOT_FOUND),
			(MarketError::forbidden("x"), StatusCode::FORBIDDEN),
			(MarketError::invalid_state("x"), StatusCode::BAD_REQUEST),
			(MarketError::Validation("x".into()), StatusCode::BAD_REQUEST),
			(
				MarketError::Storage("x".into()),
				StatusCode::INTERNAL_SERVER_ERROR,
			),
		];
		for (err, expected) in cases {
			let response = ApiError(err).into_response();
			assert_eq!(response.status(), expected);
		}
	}
}
