//! Personalized movie recommendations.
//!
//! `recommend` runs one request end to end: resolve the user, fetch their
//! rating history, then either return a cold-start slice of the catalog or
//! assemble candidate features, score them with the frozen classifier and
//! rank. When nothing is scorable the most popular unrated movies are
//! returned instead.

pub mod artifacts;
pub mod assembler;
pub mod classifier;
pub mod embedding;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod ranker;
pub mod scorer;
pub mod vectorizer;

pub use artifacts::{ArtifactManifest, ArtifactSet, Embeddings};
pub use assembler::{AssembledCandidates, CandidateAssembler, FeatureMatrix};
pub use classifier::{Classifier, GbdtClassifier};
pub use embedding::EmbeddingTable;
pub use encoder::{EncodedFeatures, FeatureEncoder};
pub use error::RecommendError;
pub use layout::{FeatureLayout, FeatureSlot, FeatureVariant};
pub use scorer::{ScoredMovie, Scorer};
pub use vectorizer::TfidfVectorizer;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cached;
use crate::config::Config;
use crate::db::{Cache, CacheKey, MovieStore};
use crate::models::{Movie, MovieId, RatingHistory, Recommendation, RecommendationSource, UserId};

/// Tuning knobs of the pipeline
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    /// Users with fewer ratings than this get the cold-start slice
    pub cold_start_threshold: usize,
    /// Upper bound on the cold-start slice
    pub cold_start_size: usize,
    /// Requests above this are clamped
    pub max_top_n: usize,
    pub store_timeout: Duration,
    pub scoring_timeout: Duration,
    pub cache_ttl_secs: u64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            cold_start_threshold: 5,
            cold_start_size: 10,
            max_top_n: 100,
            store_timeout: Duration::from_secs(5),
            scoring_timeout: Duration::from_secs(10),
            cache_ttl_secs: 900,
        }
    }
}

impl From<&Config> for RecommenderConfig {
    fn from(config: &Config) -> Self {
        Self {
            cold_start_threshold: config.cold_start_threshold,
            cold_start_size: config.cold_start_size,
            max_top_n: config.max_top_n,
            store_timeout: Duration::from_millis(config.store_timeout_ms),
            scoring_timeout: Duration::from_millis(config.scoring_timeout_ms),
            cache_ttl_secs: config.cache_ttl_secs,
        }
    }
}

/// Recommendation pipeline over a store and a frozen artifact bundle
pub struct Recommender {
    store: Arc<dyn MovieStore>,
    artifacts: Arc<ArtifactSet>,
    config: RecommenderConfig,
    cache: Option<Cache>,
}

impl Recommender {
    pub fn new(store: Arc<dyn MovieStore>, artifacts: Arc<ArtifactSet>, config: RecommenderConfig) -> Self {
        Self {
            store,
            artifacts,
            config,
            cache: None,
        }
    }

    /// Serves repeated requests from Redis while the rating history is unchanged
    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Up to `top_n` movie ids for `username`, best first
    pub async fn recommend(&self, username: &str, top_n: usize) -> Result<Recommendation, RecommendError> {
        if top_n == 0 {
            return Err(RecommendError::InvalidInput("top_n must be at least 1".to_string()));
        }
        let top_n = top_n.min(self.config.max_top_n);
        let start = Instant::now();

        let user = self
            .with_store_timeout("looking up user", self.store.find_user(username))
            .await?
            .ok_or_else(|| RecommendError::UserNotFound(username.to_string()))?;

        let history = RatingHistory::new(
            self.with_store_timeout("fetching rating history", self.store.rating_history(user.id))
                .await?,
        );

        let cache_key = CacheKey::Recommendations {
            artifact_version: self.artifacts.version().to_string(),
            username: username.to_string(),
            top_n,
            history: history.fingerprint(),
        };

        let recommendation: Recommendation = cached!(
            self.cache.as_ref(),
            cache_key,
            self.config.cache_ttl_secs,
            self.compute(user.id, &history, top_n)
        )?;

        tracing::info!(
            user = %username,
            ratings = history.len(),
            source = ?recommendation.source,
            returned = recommendation.movie_ids.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Recommendations computed"
        );

        Ok(recommendation)
    }

    /// Like [`Recommender::recommend`] but resolves ids to movies, in ranked order
    pub async fn recommend_movies(
        &self,
        username: &str,
        top_n: usize,
    ) -> Result<(Recommendation, Vec<Movie>), RecommendError> {
        let recommendation = self.recommend(username, top_n).await?;

        let mut by_id: HashMap<MovieId, Movie> = self
            .with_store_timeout(
                "resolving movies",
                self.store.movies_by_ids(&recommendation.movie_ids),
            )
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let movies = recommendation
            .movie_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        Ok((recommendation, movies))
    }

    async fn compute(
        &self,
        user_id: UserId,
        history: &RatingHistory,
        top_n: usize,
    ) -> Result<Recommendation, RecommendError> {
        let rated = history.rated_ids();
        let catalog = Arc::new(
            self.with_store_timeout("fetching catalog", self.store.catalog())
                .await?,
        );

        if history.len() < self.config.cold_start_threshold {
            tracing::debug!(
                user_id = %user_id,
                ratings = history.len(),
                threshold = self.config.cold_start_threshold,
                "Cold start, skipping scoring"
            );
            let limit = top_n.min(self.config.cold_start_size);
            return Ok(Recommendation {
                movie_ids: ranker::cold_start(&catalog, &rated, limit),
                source: RecommendationSource::ColdStart,
            });
        }

        match self.personalize(user_id, Arc::clone(&catalog), rated.clone(), top_n).await {
            Ok(movie_ids) => Ok(Recommendation {
                movie_ids,
                source: RecommendationSource::Personalized,
            }),
            Err(RecommendError::EmptyCandidateSet) => {
                tracing::info!(user_id = %user_id, "No scorable candidates, using popular movies");
                Ok(Recommendation {
                    movie_ids: ranker::popular(&catalog, &rated, top_n),
                    source: RecommendationSource::Popular,
                })
            }
            Err(e) => {
                if e.is_artifact_fault() {
                    tracing::error!(error = %e, "Artifacts out of sync with feature assembly");
                }
                Err(e)
            }
        }
    }

    /// Assembles, scores and ranks on the blocking pool under the scoring timeout
    async fn personalize(
        &self,
        user_id: UserId,
        catalog: Arc<Vec<Movie>>,
        rated: HashSet<MovieId>,
        top_n: usize,
    ) -> Result<Vec<MovieId>, RecommendError> {
        let artifacts = Arc::clone(&self.artifacts);
        // A blocking task cannot be aborted, so once the timeout below fires
        // the task notices the same deadline between rows and stops itself.
        let deadline = Instant::now() + self.config.scoring_timeout;

        let task = tokio::task::spawn_blocking(move || -> Result<Vec<MovieId>, RecommendError> {
            let assembled = CandidateAssembler::new(&artifacts).assemble(user_id, &catalog, &rated)?;
            let scored = Scorer::new(artifacts.classifier()).score_until(&assembled.matrix, deadline)?;
            Ok(ranker::rank(scored, &rated, top_n))
        });

        match tokio::time::timeout(self.config.scoring_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(RecommendError::ScoringTask(e.to_string())),
            Err(_) => Err(RecommendError::Timeout("scoring candidates")),
        }
    }

    async fn with_store_timeout<T, F>(&self, what: &'static str, fut: F) -> Result<T, RecommendError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result.map_err(RecommendError::from),
            Err(_) => Err(RecommendError::Timeout(what)),
        }
    }
}
