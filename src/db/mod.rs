pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, PgMovieStore};
pub use self::redis::create_redis_client;
pub use self::redis::{Cache, CacheKey, CacheWriterHandle};
pub use store::MovieStore;

#[cfg(test)]
pub use store::MockMovieStore;
