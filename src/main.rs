//! Storefront core service - voucher, checkout and review API

use anyhow::Result;
use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post}, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

use storefront_core::domain::order::{Order, OrderItem, OrderStatus, PaymentMethod, ShippingDetails};
use storefront_core::domain::pricing::{PricingBreakdown, BASE_SHIPPING_FEE};
use storefront_core::domain::review::Review;
use storefront_core::domain::voucher::{Voucher, VoucherType};
use storefront_core::notify::{LogNotifier, NatsNotifier, Notifier};
use storefront_core::services::checkout::{CheckoutRequest, CheckoutService};
use storefront_core::services::rewards::RewardService;
use storefront_core::services::vouchers::VoucherCatalog;
use storefront_core::store::{BlobStore, JsonFileStore, MemoryStore};
use storefront_core::{StorefrontError, VoucherError};

#[derive(Clone)]
struct AppState {
    catalog: Arc<VoucherCatalog>,
    checkout: Arc<CheckoutService>,
    rewards: Arc<RewardService>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let store: Arc<dyn BlobStore> = match std::env::var("DATA_DIR") {
        Ok(dir) => Arc::new(JsonFileStore::new(dir)?),
        Err(_) => Arc::new(MemoryStore::new()),
    };
    let notifier: Arc<dyn Notifier> = match std::env::var("NATS_URL") {
        Ok(url) => Arc::new(NatsNotifier::new(async_nats::connect(&url).await?)),
        Err(_) => Arc::new(LogNotifier),
    };
    let catalog = Arc::new(VoucherCatalog::new(store.clone())?);
    let checkout = Arc::new(CheckoutService::new(catalog.clone(), store.clone(), notifier.clone()));
    let rewards = Arc::new(RewardService::new(catalog.clone(), store, notifier));
    let state = AppState { catalog, checkout, rewards };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-core"})) }))
        .route("/api/v1/vouchers", get(list_vouchers).post(create_voucher))
        .route("/api/v1/vouchers/apply", post(apply_voucher))
        .route("/api/v1/checkout", post(place_order))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/status", post(set_order_status))
        .route("/api/v1/reviews", post(submit_review))
        .route("/api/v1/products/:id/reviews", get(list_product_reviews))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("Storefront core listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

type ApiError = (StatusCode, Json<serde_json::Value>);

/// One stable tag per error kind; clients switch on the tag, not the text.
fn api_error(err: StorefrontError) -> ApiError {
    let (status, kind) = match &err {
        StorefrontError::Voucher(VoucherError::NotFound) => (StatusCode::NOT_FOUND, "voucher_not_found"),
        StorefrontError::Voucher(VoucherError::Disabled) => (StatusCode::UNPROCESSABLE_ENTITY, "voucher_disabled"),
        StorefrontError::Voucher(VoucherError::Expired(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "voucher_expired"),
        StorefrontError::Voucher(VoucherError::UsageLimitReached) => (StatusCode::UNPROCESSABLE_ENTITY, "voucher_usage_exceeded"),
        StorefrontError::Voucher(VoucherError::BelowMinimum { .. }) => (StatusCode::UNPROCESSABLE_ENTITY, "order_below_minimum"),
        StorefrontError::OrderNotFound => (StatusCode::NOT_FOUND, "order_not_found"),
        StorefrontError::InvalidStatusTransition { .. } => (StatusCode::CONFLICT, "invalid_status_transition"),
        StorefrontError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
    };
    (status, Json(serde_json::json!({"error": kind, "message": err.to_string()})))
}

fn bad_request(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "invalid_request", "message": e.to_string()})))
}

async fn list_vouchers(State(s): State<AppState>) -> Result<Json<Vec<Voucher>>, ApiError> {
    s.catalog.list().map(Json).map_err(api_error)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateVoucherRequest {
    #[validate(length(min = 3, max = 30))]
    code: String,
    #[serde(rename = "type")]
    voucher_type: VoucherType,
    #[validate(range(min = 1))]
    value: i64,
    #[validate(range(min = 0))]
    min_order_value: i64,
    #[validate(range(min = 1))]
    max_discount: i64,
    description: String,
    expiry: NaiveDate,
    #[validate(range(min = 1))]
    usage_limit: u32,
}

async fn create_voucher(State(s): State<AppState>, Json(r): Json<CreateVoucherRequest>) -> Result<(StatusCode, Json<Voucher>), ApiError> {
    r.validate().map_err(bad_request)?;
    let voucher = Voucher {
        id: r.code.clone(), code: r.code, voucher_type: r.voucher_type, value: r.value,
        min_order_value: r.min_order_value, max_discount: r.max_discount, description: r.description,
        expiry: r.expiry, is_active: true, usage_limit: r.usage_limit, usage_count: 0, user_id: None,
    };
    s.catalog.save(&voucher).map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(voucher)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyVoucherRequest {
    code: String,
    subtotal: i64,
    shipping_fee: Option<i64>,
}

async fn apply_voucher(State(s): State<AppState>, Json(r): Json<ApplyVoucherRequest>) -> Result<Json<PricingBreakdown>, ApiError> {
    let shipping_fee = r.shipping_fee.unwrap_or(BASE_SHIPPING_FEE);
    s.checkout.preview(&r.code, r.subtotal, shipping_fee).map(Json).map_err(api_error)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderRequest {
    #[validate(length(min = 1))]
    user_id: String,
    #[validate(length(min = 1))]
    items: Vec<OrderItem>,
    voucher_code: Option<String>,
    shipping_details: ShippingDetails,
    #[serde(default)]
    payment_method: PaymentMethod,
}

async fn place_order(State(s): State<AppState>, Json(r): Json<PlaceOrderRequest>) -> Result<(StatusCode, Json<Order>), ApiError> {
    r.validate().map_err(bad_request)?;
    let order = s.checkout.place_order(CheckoutRequest {
        user_id: r.user_id, items: r.items, voucher_code: r.voucher_code,
        shipping_details: r.shipping_details, payment_method: r.payment_method,
    }).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(s): State<AppState>) -> Result<Json<Vec<Order>>, ApiError> {
    s.checkout.list_orders().map(Json).map_err(api_error)
}

async fn get_order(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Order>, ApiError> {
    s.checkout.get_order(&id).map(Json).map_err(api_error)
}

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    status: OrderStatus,
}

async fn set_order_status(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<SetStatusRequest>) -> Result<Json<Order>, ApiError> {
    s.checkout.set_status(&id, r.status).map(Json).map_err(api_error)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    #[validate(length(min = 1))]
    user_id: String,
    #[validate(length(min = 1))]
    product_id: String,
    #[validate(range(min = 1, max = 5))]
    rating: u8,
    #[serde(default)]
    comment: String,
}

async fn list_product_reviews(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Vec<Review>>, ApiError> {
    s.rewards.reviews_for_product(&id).map(Json).map_err(api_error)
}

async fn submit_review(State(s): State<AppState>, Json(r): Json<ReviewRequest>) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    r.validate().map_err(bad_request)?;
    let review = Review::new(r.user_id, r.product_id, r.rating, r.comment);
    let reward = s.rewards.submit_review(review.clone()).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({"review": review, "reward": reward}))))
}
