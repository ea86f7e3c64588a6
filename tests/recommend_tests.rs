mod common;

use std::sync::Arc;

use common::{
    add_user_with_ratings, artifacts, catalog_store, comedy_classifier, recommender,
    two_movie_store, ConstantClassifier, CountingClassifier, DIM, WIDTH,
};
use movieconnect_api::db::InMemoryStore;
use movieconnect_api::models::{Movie, MovieId, RecommendationSource};
use movieconnect_api::services::recommender::{
    Classifier, FeatureMatrix, RecommendError, RecommenderConfig, Scorer,
};

fn ids(raw: &[i64]) -> Vec<MovieId> {
    raw.iter().copied().map(MovieId).collect()
}

#[tokio::test]
async fn test_rated_movie_is_never_recommended() {
    let store = two_movie_store().await;
    add_user_with_ratings(&store, "u", &[1]).await;

    // Default threshold: one rating is a cold start
    let cold = recommender(
        store.clone(),
        Arc::new(comedy_classifier()),
        RecommenderConfig::default(),
    );
    assert_eq!(cold.recommend("u", 1).await.unwrap().movie_ids, ids(&[2]));

    // Threshold lowered so the classifier path runs
    let config = RecommenderConfig {
        cold_start_threshold: 1,
        ..RecommenderConfig::default()
    };
    let scored = recommender(store, Arc::new(comedy_classifier()), config);
    let result = scored.recommend("u", 1).await.unwrap();
    assert_eq!(result.source, RecommendationSource::Personalized);
    assert_eq!(result.movie_ids, ids(&[2]));
}

#[tokio::test]
async fn test_cold_start_returns_catalog_prefix_without_scoring() {
    let store = catalog_store().await;
    add_user_with_ratings(&store, "newcomer", &[]).await;
    let classifier = Arc::new(CountingClassifier::new(comedy_classifier()));

    let recommender = recommender(store, classifier.clone(), RecommenderConfig::default());
    let result = recommender.recommend("newcomer", 3).await.unwrap();

    assert_eq!(result.source, RecommendationSource::ColdStart);
    assert_eq!(result.movie_ids, ids(&[7, 3, 11]));
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_cold_start_is_stable_and_skips_rated() {
    let store = catalog_store().await;
    add_user_with_ratings(&store, "casual", &[3, 1]).await;
    let classifier = Arc::new(CountingClassifier::new(comedy_classifier()));

    let recommender = recommender(store, classifier.clone(), RecommenderConfig::default());
    let first = recommender.recommend("casual", 4).await.unwrap();
    let second = recommender.recommend("casual", 4).await.unwrap();

    assert_eq!(first.movie_ids, ids(&[7, 11, 9, 5]));
    assert_eq!(first, second);
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_personalized_ranking() {
    let store = catalog_store().await;
    add_user_with_ratings(&store, "fan", &[2, 4, 6, 8, 10]).await;
    let classifier = Arc::new(CountingClassifier::new(comedy_classifier()));

    let recommender = recommender(store, classifier.clone(), RecommenderConfig::default());
    let result = recommender.recommend("fan", 3).await.unwrap();

    assert_eq!(result.source, RecommendationSource::Personalized);
    // The only unrated comedy first, then equal-scored action films by id
    assert_eq!(result.movie_ids, ids(&[12, 1, 3]));
    assert_eq!(classifier.calls(), 7);
}

#[tokio::test]
async fn test_result_size_is_min_of_n_and_candidates() {
    let store = catalog_store().await;
    let rated = [2, 4, 6, 8, 10];
    add_user_with_ratings(&store, "fan", &rated).await;
    let recommender = recommender(store, Arc::new(comedy_classifier()), RecommenderConfig::default());

    for n in [1, 3, 7, 20] {
        let result = recommender.recommend("fan", n).await.unwrap();
        assert_eq!(result.movie_ids.len(), n.min(12 - rated.len()));
        assert!(result.movie_ids.iter().all(|id| !rated.contains(&id.0)));
    }
}

#[tokio::test]
async fn test_ties_are_deterministic() {
    let store = catalog_store().await;
    add_user_with_ratings(&store, "fan", &[1, 2, 3, 4, 5]).await;
    let recommender = recommender(store, Arc::new(ConstantClassifier(0.5)), RecommenderConfig::default());

    let first = recommender.recommend("fan", 5).await.unwrap();
    let second = recommender.recommend("fan", 5).await.unwrap();

    assert_eq!(first.movie_ids, ids(&[6, 7, 8, 9, 10]));
    assert_eq!(first, second);
}

/// Broken for movie 1, confident about everything else
struct NanForFirstMovie;

impl Classifier for NanForFirstMovie {
    fn num_features(&self) -> usize {
        WIDTH
    }

    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn predict_proba(&self, row: &[f32]) -> f32 {
        if row[0] == 1.0 {
            f32::NAN
        } else {
            0.9
        }
    }
}

#[tokio::test]
async fn test_nan_score_never_reaches_the_top() {
    let store = catalog_store().await;
    add_user_with_ratings(&store, "fan", &[2, 4, 6, 8, 10]).await;
    let recommender = recommender(store, Arc::new(NanForFirstMovie), RecommenderConfig::default());

    let top = recommender.recommend("fan", 3).await.unwrap();
    assert_eq!(top.movie_ids, ids(&[3, 5, 7]));

    let all = recommender.recommend("fan", 20).await.unwrap();
    assert_eq!(all.movie_ids.last(), Some(&MovieId(1)));
}

#[tokio::test]
async fn test_everything_rated_returns_empty_popular_list() {
    let store = two_movie_store().await;
    add_user_with_ratings(&store, "completionist", &[1, 2]).await;
    let config = RecommenderConfig {
        cold_start_threshold: 1,
        ..RecommenderConfig::default()
    };
    let recommender = recommender(store, Arc::new(comedy_classifier()), config);

    let result = recommender.recommend("completionist", 5).await.unwrap();
    assert_eq!(result.source, RecommendationSource::Popular);
    assert!(result.movie_ids.is_empty());
}

#[tokio::test]
async fn test_movies_without_runtime_fall_back_to_popular() {
    let store = InMemoryStore::new();
    for id in 1..=5 {
        store
            .add_movie(Movie::new(id, format!("Rated {}", id)).with_runtime(100))
            .await;
    }
    store.add_movie(Movie::new(6, "No runtime, no rating")).await;
    store
        .add_movie(Movie::new(7, "No runtime, well liked").with_avg_rating(4.5))
        .await;
    store
        .add_movie(Movie::new(8, "No runtime, disliked").with_avg_rating(1.0))
        .await;
    let store = Arc::new(store);
    add_user_with_ratings(&store, "fan", &[1, 2, 3, 4, 5]).await;

    let classifier = Arc::new(CountingClassifier::new(comedy_classifier()));
    let recommender = recommender(store, classifier.clone(), RecommenderConfig::default());
    let result = recommender.recommend("fan", 10).await.unwrap();

    assert_eq!(result.source, RecommendationSource::Popular);
    assert_eq!(result.movie_ids, ids(&[7, 8, 6]));
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_incomplete_movies_are_skipped() {
    let store = catalog_store().await;
    store.add_movie(Movie::new(14, "Comedy without runtime").with_genres(["Comedy"])).await;
    add_user_with_ratings(&store, "fan", &[2, 4, 6, 8, 10]).await;
    let recommender = recommender(store, Arc::new(comedy_classifier()), RecommenderConfig::default());

    let result = recommender.recommend("fan", 20).await.unwrap();
    assert_eq!(result.source, RecommendationSource::Personalized);
    assert_eq!(result.movie_ids.len(), 7);
    assert!(!result.movie_ids.contains(&MovieId(14)));
}

#[tokio::test]
async fn test_recommend_movies_resolves_in_ranked_order() {
    let store = catalog_store().await;
    add_user_with_ratings(&store, "fan", &[2, 4, 6, 8, 10]).await;
    let recommender = recommender(store, Arc::new(comedy_classifier()), RecommenderConfig::default());

    let (recommendation, movies) = recommender.recommend_movies("fan", 3).await.unwrap();
    let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();

    assert_eq!(recommendation.movie_ids, ids(&[12, 1, 3]));
    assert_eq!(titles, vec!["Movie 12", "Movie 1", "Movie 3"]);
}

#[tokio::test]
async fn test_unknown_user() {
    let store = catalog_store().await;
    let recommender = recommender(store, Arc::new(comedy_classifier()), RecommenderConfig::default());

    let result = recommender.recommend("ghost", 3).await;
    assert!(matches!(result, Err(RecommendError::UserNotFound(_))));
}

#[test]
fn test_empty_director_list_encodes_to_zero_vector() {
    let artifacts = artifacts(Arc::new(comedy_classifier()));
    let encoded = artifacts
        .encoder()
        .encode(&["Action".to_string()], &[], &["heist".to_string()]);

    assert_eq!(encoded.directors, Some(vec![0.0; DIM]));
    assert_eq!(encoded.keywords, Some(vec![1.0; DIM]));
}

#[test]
fn test_scorer_rejects_wrong_column_count() {
    let scorer = Scorer::new(Arc::new(comedy_classifier()));

    for columns in [WIDTH - 1, WIDTH + 1] {
        let mut matrix = FeatureMatrix::new(columns);
        matrix.push_row(MovieId(1), &vec![0.0; columns]).unwrap();

        let result = scorer.score(&matrix);
        assert!(matches!(
            result,
            Err(RecommendError::FeatureShapeMismatch { expected, actual })
                if expected == WIDTH && actual == columns
        ));
    }
}
