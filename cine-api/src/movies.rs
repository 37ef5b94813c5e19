use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use cine_domain::catalog::Movie;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/movies", get(list_movies))
        .route("/v1/movies/{id}", get(get_movie))
}

async fn list_movies(State(state): State<AppState>) -> Result<Json<Vec<Movie>>, ApiError> {
    Ok(Json(state.catalog.list_movies().await?))
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Movie>, ApiError> {
    let movie = state
        .catalog
        .get_movie(id)
        .await?
        .ok_or_else(|| ApiError::not_found("movie not found"))?;

    Ok(Json(movie))
}
