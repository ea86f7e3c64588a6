use std::cmp::Ordering;
use std::collections::HashSet;

use super::scorer::ScoredMovie;
use crate::models::{Movie, MovieId};

/// NaN scores rank below every real likelihood
fn sort_key(likelihood: f32) -> f32 {
    if likelihood.is_nan() {
        f32::NEG_INFINITY
    } else {
        likelihood
    }
}

/// Total order used for ranking: likelihood descending, then id ascending
fn by_likelihood(a: &ScoredMovie, b: &ScoredMovie) -> Ordering {
    sort_key(b.likelihood)
        .total_cmp(&sort_key(a.likelihood))
        .then_with(|| a.movie_id.cmp(&b.movie_id))
}

/// Top `top_n` movie ids by likelihood
///
/// Rated movies are dropped again here even though the assembler already
/// excludes them. Returns fewer than `top_n` ids when fewer remain.
pub fn rank(mut scored: Vec<ScoredMovie>, rated: &HashSet<MovieId>, top_n: usize) -> Vec<MovieId> {
    let before = scored.len();
    scored.retain(|s| !rated.contains(&s.movie_id));
    if scored.len() != before {
        tracing::warn!(
            dropped = before - scored.len(),
            "Rated movies reached the ranker"
        );
    }

    scored.sort_by(by_likelihood);
    scored.into_iter().take(top_n).map(|s| s.movie_id).collect()
}

/// First `limit` unrated movies in catalog order, for users without enough history
pub fn cold_start(catalog: &[Movie], rated: &HashSet<MovieId>, limit: usize) -> Vec<MovieId> {
    catalog
        .iter()
        .filter(|m| !rated.contains(&m.id))
        .take(limit)
        .map(|m| m.id)
        .collect()
}

/// Unrated movies by average rating, for users with nothing left to score
///
/// Movies without an average sort last; ties go to the lower id.
pub fn popular(catalog: &[Movie], rated: &HashSet<MovieId>, limit: usize) -> Vec<MovieId> {
    let mut movies: Vec<&Movie> = catalog.iter().filter(|m| !rated.contains(&m.id)).collect();
    movies.sort_by(|a, b| match (a.avg_rating, b.avg_rating) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
    movies.into_iter().take(limit).map(|m| m.id).collect()
}
