use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use cine_domain::reservation::{Customer, Reservation};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CustomerPayload {
    name: String,
    email: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/customers", get(list_customers).post(create_customer))
        .route(
            "/v1/customers/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/v1/customers/{id}/reservations", get(customer_reservations))
}

async fn list_customers(State(state): State<AppState>) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(state.customers.list().await?))
}

async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerPayload>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = state
        .customers
        .create(&payload.name, &payload.email)
        .await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, ApiError> {
    let customer = state
        .customers
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("customer not found"))?;
    Ok(Json(customer))
}

async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerPayload>,
) -> Result<Json<Customer>, ApiError> {
    let customer = state
        .customers
        .update(id, &payload.name, &payload.email)
        .await?
        .ok_or_else(|| ApiError::not_found("customer not found"))?;
    Ok(Json(customer))
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .customers
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("customer not found"))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn customer_reservations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    Ok(Json(state.reservations.list_for_customer(id).await?))
}
