use crate::models::{Movie, MovieId, Rating, User, UserId};

/// Read-only access to users, ratings and the movie catalog
///
/// The recommender never writes through this trait; implementations may be
/// shared by any number of in-flight requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieStore: Send + Sync {
    /// Looks up a user by username
    async fn find_user(&self, username: &str) -> Result<Option<User>, sqlx::Error>;

    /// Every rating the user has given
    async fn rating_history(&self, user_id: UserId) -> Result<Vec<Rating>, sqlx::Error>;

    /// The full catalog in insertion order
    async fn catalog(&self) -> Result<Vec<Movie>, sqlx::Error>;

    /// Movies with the given ids, in no particular order
    async fn movies_by_ids(&self, ids: &[MovieId]) -> Result<Vec<Movie>, sqlx::Error>;
}
