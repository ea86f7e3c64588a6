use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{MovieSummary, RecommendationResponse};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub top_n: Option<usize>,
}

/// Handler for `GET /api/v1/users/:username/recommendations`
pub async fn recommend(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let top_n = query.top_n.unwrap_or(state.default_top_n);

    let (recommendation, movies) = state
        .recommender
        .recommend_movies(&username, top_n)
        .await?;

    Ok(Json(RecommendationResponse {
        username,
        source: recommendation.source,
        movies: movies.iter().map(MovieSummary::from).collect(),
    }))
}
