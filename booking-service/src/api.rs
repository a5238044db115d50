use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use bigdecimal::BigDecimal;
use shared::*;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::bookings::BookingManager;
use crate::currency::CurrencyNormalizer;
use crate::error::{AppError, AppResult};
use crate::ledger::AvailabilityLedger;
use crate::models::NewProduct;
use crate::products::ProductCatalog;
use crate::projection::{AvailabilityView, BookingView, ProductView};
use crate::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub normalizer: CurrencyNormalizer,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/new", post(create_product))
        .route("/products/:id", get(get_product))
        .route("/availability", get(search_availability))
        .route("/availability/add", post(add_availability))
        .route("/bookings", post(create_booking))
        .route("/bookings/all", get(list_bookings))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/confirm", post(confirm_booking))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

fn capability(headers: &HeaderMap) -> Capability {
    Capability::from_header(
        headers
            .get(Capability::HEADER)
            .and_then(|value| value.to_str().ok()),
    )
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AppError::Validation(format!("Invalid request body: {}", rejection.body_text())))
}

fn amount(value: f64, field: &str) -> AppResult<BigDecimal> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!("{} must be a non-negative number", field)));
    }
    BigDecimal::from_str(&value.to_string())
        .map_err(|_| AppError::Validation(format!("{} is not a valid amount", field)))
}

pub async fn list_products(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<ProductView>>> {
    let capability = capability(&headers);
    let products = ProductCatalog::new(state.pool).list().await?;

    Ok(Json(
        products
            .iter()
            .map(|product| ProductView::project(product, capability))
            .collect(),
    ))
}

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProductRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ProductView>)> {
    let request = body(payload)?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    if request.capacity < 0 {
        return Err(AppError::Validation("capacity must not be negative".to_string()));
    }
    let price = amount(request.price, "price")?;
    let currency = normalize_currency_code(&request.currency)?;

    let product = ProductCatalog::new(state.pool)
        .create(NewProduct::new(name, request.capacity, price, currency))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductView::project(&product, Capability::Pricing)),
    ))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<ProductView>> {
    let product = ProductCatalog::new(state.pool).get(product_id).await?;
    Ok(Json(ProductView::project(&product, capability(&headers))))
}

/// The date selector is read from a JSON body when one is sent, otherwise
/// from the query string.
pub async fn search_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateSelector>,
    raw: Bytes,
) -> AppResult<Json<Vec<AvailabilityView>>> {
    let selector = if raw.iter().all(u8::is_ascii_whitespace) {
        query
    } else {
        serde_json::from_slice::<DateSelector>(&raw)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?
    };
    let range = selector.resolve()?;

    let capability = capability(&headers);
    let listings = AvailabilityLedger::new(state.pool).search(range).await?;

    Ok(Json(
        listings
            .iter()
            .map(|listing| AvailabilityView::project_listing(listing, capability))
            .collect(),
    ))
}

pub async fn add_availability(
    State(state): State<AppState>,
    payload: Result<Json<NewAvailabilityRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Vec<AvailabilityView>>)> {
    let request = body(payload)?;
    let range = request.dates.resolve()?;
    let price = amount(request.price, "price")?;
    let currency = normalize_currency_code(&request.currency)?;

    let created = AvailabilityLedger::new(state.pool)
        .create_range(request.product_id, range, price, currency)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(
            created
                .iter()
                .map(|slot| AvailabilityView::project(slot, Capability::Pricing))
                .collect(),
        ),
    ))
}

pub async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<NewBookingRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<BookingView>)> {
    let request = body(payload)?;
    if request.units <= 0 {
        return Err(AppError::Validation("units must be greater than zero".to_string()));
    }

    let booking = BookingManager::new(state.pool, state.normalizer)
        .create_booking(request.availability_id, request.units)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingView::project(&booking, &[], Capability::Pricing)),
    ))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<BookingView>>> {
    let capability = capability(&headers);
    let bookings = BookingManager::new(state.pool, state.normalizer).list().await?;

    Ok(Json(
        bookings
            .iter()
            .map(|record| BookingView::project_with_units(record, capability))
            .collect(),
    ))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<BookingView>> {
    let record = BookingManager::new(state.pool, state.normalizer)
        .get(booking_id)
        .await?;
    Ok(Json(BookingView::project_with_units(&record, capability(&headers))))
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingView>> {
    let record = BookingManager::new(state.pool, state.normalizer)
        .confirm_booking(booking_id)
        .await?;
    Ok(Json(BookingView::project_with_units(&record, Capability::Pricing)))
}

pub async fn health_check() -> &'static str {
    "OK"
}
