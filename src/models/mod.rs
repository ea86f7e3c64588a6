use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt::Display};

/// Catalog identifier of a movie (the MovieLens-style `movie_id`, not the table key)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct MovieId(pub i64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user; also fed to the classifier as a feature
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog movie with the attributes the recommender reads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub keywords: Vec<String>,
    /// Runtime in minutes
    pub runtime: Option<i32>,
    pub adult: bool,
    pub avg_rating: Option<f64>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
}

impl Movie {
    /// Creates a movie with only the identifier and title set
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id: MovieId(id),
            title: title.into(),
            genres: Vec::new(),
            directors: Vec::new(),
            keywords: Vec::new(),
            runtime: None,
            adult: false,
            avg_rating: None,
            poster_url: None,
            overview: None,
        }
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_directors<I, S>(mut self, directors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directors = directors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_runtime(mut self, minutes: i32) -> Self {
        self.runtime = Some(minutes);
        self
    }

    pub fn with_adult(mut self, adult: bool) -> Self {
        self.adult = adult;
        self
    }

    pub fn with_avg_rating(mut self, avg_rating: f64) -> Self {
        self.avg_rating = Some(avg_rating);
        self
    }
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// A single rating from a user's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Rating {
    pub movie_id: MovieId,
    pub rating: f64,
    pub rated_at: DateTime<Utc>,
}

/// Everything a user has rated so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingHistory {
    pub ratings: Vec<Rating>,
}

impl RatingHistory {
    pub fn new(ratings: Vec<Rating>) -> Self {
        Self { ratings }
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Identifiers of every rated movie
    pub fn rated_ids(&self) -> HashSet<MovieId> {
        self.ratings.iter().map(|r| r.movie_id).collect()
    }

    /// Short token that changes whenever a rating is added or removed
    ///
    /// Combines the rating count with the most recent rating timestamp.
    pub fn fingerprint(&self) -> String {
        let latest = self
            .ratings
            .iter()
            .map(|r| r.rated_at.timestamp_millis())
            .max()
            .unwrap_or(0);
        format!("{}-{}", self.ratings.len(), latest)
    }
}

/// Which path of the pipeline produced a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Scored by the classifier
    Personalized,
    /// User has too few ratings; first catalog entries returned
    ColdStart,
    /// Nothing scorable; highest average rating returned
    Popular,
}

/// Ordered list of recommended movie identifiers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub movie_ids: Vec<MovieId>,
    pub source: RecommendationSource,
}

/// Movie fields returned to API clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    pub poster_url: Option<String>,
    pub avg_rating: Option<f64>,
}

impl From<&Movie> for MovieSummary {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            poster_url: movie.poster_url.clone(),
            avg_rating: movie.avg_rating,
        }
    }
}

/// Response body of the recommendations endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub username: String,
    pub source: RecommendationSource,
    pub movies: Vec<MovieSummary>,
}
