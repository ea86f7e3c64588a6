#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use movieconnect_api::db::InMemoryStore;
use movieconnect_api::models::{Movie, MovieId, UserId};
use movieconnect_api::services::recommender::{
    ArtifactSet, Classifier, EmbeddingTable, Embeddings, FeatureVariant, GbdtClassifier,
    Recommender, RecommenderConfig, TfidfVectorizer,
};

pub const DIM: usize = 50;

/// Columns: movie_id, runtime, adult, user_id, action, comedy, 50 director, 50 keyword
pub const WIDTH: usize = 4 + 2 + 2 * DIM;

const COMEDY_COLUMN: usize = 5;

pub fn vectorizer() -> TfidfVectorizer {
    let vocabulary = HashMap::from([("action".to_string(), 0), ("comedy".to_string(), 1)]);
    TfidfVectorizer::new(vocabulary, vec![1.0, 1.0]).unwrap()
}

pub fn embeddings() -> Embeddings {
    let mut directors = EmbeddingTable::new(DIM);
    directors.insert("Nolan", vec![0.5; DIM]).unwrap();
    directors.insert("Smith", vec![-0.5; DIM]).unwrap();

    let mut keywords = EmbeddingTable::new(DIM);
    keywords.insert("heist", vec![1.0; DIM]).unwrap();

    Embeddings {
        directors,
        keywords,
    }
}

/// One stump: comedies score above 0.5, everything else below
pub fn comedy_classifier() -> GbdtClassifier {
    let json = format!(
        r#"{{
            "learner": {{
                "learner_model_param": {{ "base_score": "5E-1", "num_feature": "{width}" }},
                "objective": {{ "name": "binary:logistic" }},
                "gradient_booster": {{
                    "name": "gbtree",
                    "model": {{ "trees": [ {{
                        "left_children": [1, -1, -1],
                        "right_children": [2, -1, -1],
                        "split_indices": [{column}, 0, 0],
                        "split_conditions": [0.5, -1.0, 1.0],
                        "default_left": [0, 0, 0]
                    }} ] }}
                }}
            }}
        }}"#,
        width = WIDTH,
        column = COMEDY_COLUMN
    );
    GbdtClassifier::from_json(&json, "classifier.json").unwrap()
}

/// Wraps a classifier and counts how many rows it scored
pub struct CountingClassifier<C> {
    inner: C,
    calls: AtomicUsize,
}

impl<C: Classifier> CountingClassifier<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<C: Classifier> Classifier for CountingClassifier<C> {
    fn num_features(&self) -> usize {
        self.inner.num_features()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.inner.feature_names()
    }

    fn predict_proba(&self, row: &[f32]) -> f32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.predict_proba(row)
    }
}

/// Same likelihood for every movie so only the tie-break decides the order
pub struct ConstantClassifier(pub f32);

impl Classifier for ConstantClassifier {
    fn num_features(&self) -> usize {
        WIDTH
    }

    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn predict_proba(&self, _row: &[f32]) -> f32 {
        self.0
    }
}

pub fn artifacts(classifier: Arc<dyn Classifier>) -> Arc<ArtifactSet> {
    Arc::new(
        ArtifactSet::new(
            "test-v1",
            FeatureVariant::TfidfEmbeddings,
            vectorizer(),
            Some(embeddings()),
            DIM,
            classifier,
        )
        .unwrap(),
    )
}

pub fn recommender(
    store: Arc<InMemoryStore>,
    classifier: Arc<dyn Classifier>,
    config: RecommenderConfig,
) -> Recommender {
    Recommender::new(store, artifacts(classifier), config)
}

/// The two-movie catalog: M1 is an action film, M2 a comedy
pub async fn two_movie_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    store
        .add_movie(
            Movie::new(1, "M1")
                .with_genres(["Action"])
                .with_directors(["Nolan"])
                .with_runtime(120),
        )
        .await;
    store
        .add_movie(
            Movie::new(2, "M2")
                .with_genres(["Comedy"])
                .with_directors(["Smith"])
                .with_runtime(90),
        )
        .await;
    Arc::new(store)
}

/// Twelve movies, inserted out of id order, alternating action and comedy
pub async fn catalog_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    for id in [7, 3, 11, 1, 9, 5, 12, 2, 8, 4, 10, 6] {
        let genre = if id % 2 == 0 { "Comedy" } else { "Action" };
        store
            .add_movie(
                Movie::new(id, format!("Movie {}", id))
                    .with_genres([genre])
                    .with_keywords(["heist"])
                    .with_runtime(90 + id as i32)
                    .with_avg_rating(id as f64 / 4.0),
            )
            .await;
    }
    Arc::new(store)
}

pub async fn add_user_with_ratings(store: &InMemoryStore, username: &str, movie_ids: &[i64]) -> UserId {
    let user = store.add_user(username).await;
    for (i, &id) in movie_ids.iter().enumerate() {
        let rated_at = Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap();
        store.add_rating(user, MovieId(id), 4.0, rated_at).await;
    }
    user
}
