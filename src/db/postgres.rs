use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::db::MovieStore;
use crate::models::{Movie, MovieId, Rating, User, UserId};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Movie rows with their genre, director and keyword names aggregated
const MOVIE_SELECT: &str = r#"
    SELECT
        m.movie_id AS id,
        m.title,
        COALESCE(ARRAY(
            SELECT g.name FROM movie_genres mg JOIN genres g ON g.id = mg.genre_id
            WHERE mg.movie_pk = m.pk ORDER BY g.name
        ), '{}') AS genres,
        COALESCE(ARRAY(
            SELECT d.name FROM movie_directors md JOIN directors d ON d.id = md.director_id
            WHERE md.movie_pk = m.pk ORDER BY d.name
        ), '{}') AS directors,
        COALESCE(ARRAY(
            SELECT k.name FROM movie_keywords mk JOIN keywords k ON k.id = mk.keyword_id
            WHERE mk.movie_pk = m.pk ORDER BY k.name
        ), '{}') AS keywords,
        m.runtime,
        m.adult,
        m.avg_rating,
        m.poster_url,
        m.overview
    FROM movies m
"#;

/// Postgres-backed catalog and rating store
#[derive(Clone)]
pub struct PgMovieStore {
    pool: PgPool,
}

impl PgMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MovieStore for PgMovieStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    async fn rating_history(&self, user_id: UserId) -> Result<Vec<Rating>, sqlx::Error> {
        sqlx::query_as::<_, Rating>(
            r#"
            SELECT m.movie_id, r.rating, r.rated_at
            FROM ratings r
            JOIN movies m ON m.pk = r.movie_pk
            WHERE r.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn catalog(&self) -> Result<Vec<Movie>, sqlx::Error> {
        let query = format!("{} ORDER BY m.pk", MOVIE_SELECT);
        sqlx::query_as::<_, Movie>(&query).fetch_all(&self.pool).await
    }

    async fn movies_by_ids(&self, ids: &[MovieId]) -> Result<Vec<Movie>, sqlx::Error> {
        let raw: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let query = format!("{} WHERE m.movie_id = ANY($1)", MOVIE_SELECT);
        sqlx::query_as::<_, Movie>(&query)
            .bind(raw)
            .fetch_all(&self.pool)
            .await
    }
}
