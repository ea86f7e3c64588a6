use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::db::MovieStore;
use crate::models::{Movie, MovieId, Rating, User, UserId};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    ratings: HashMap<UserId, Vec<Rating>>,
    movies: Vec<Movie>,
}

/// Store kept entirely in memory, used for tests and local demos
///
/// Movies keep the order they were added in, which stands in for the
/// database insertion order.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_movie(&self, movie: Movie) {
        self.inner.write().await.movies.push(movie);
    }

    /// Registers a user and returns its id
    pub async fn add_user(&self, username: impl Into<String>) -> UserId {
        let mut inner = self.inner.write().await;
        let id = UserId(inner.users.len() as i64 + 1);
        inner.users.push(User {
            id,
            username: username.into(),
        });
        id
    }

    pub async fn add_rating(&self, user_id: UserId, movie_id: MovieId, rating: f64, rated_at: DateTime<Utc>) {
        self.inner
            .write()
            .await
            .ratings
            .entry(user_id)
            .or_default()
            .push(Rating {
                movie_id,
                rating,
                rated_at,
            });
    }
}

#[async_trait::async_trait]
impl MovieStore for InMemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn rating_history(&self, user_id: UserId) -> Result<Vec<Rating>, sqlx::Error> {
        let inner = self.inner.read().await;
        Ok(inner.ratings.get(&user_id).cloned().unwrap_or_default())
    }

    async fn catalog(&self) -> Result<Vec<Movie>, sqlx::Error> {
        Ok(self.inner.read().await.movies.clone())
    }

    async fn movies_by_ids(&self, ids: &[MovieId]) -> Result<Vec<Movie>, sqlx::Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }
}
