use std::sync::Arc;
use std::time::Instant;

use super::assembler::FeatureMatrix;
use super::classifier::Classifier;
use super::error::RecommendError;
use crate::models::MovieId;

/// Predicted likelihood that the user likes a movie
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMovie {
    pub movie_id: MovieId,
    pub likelihood: f32,
}

/// Runs the classifier over an assembled matrix
#[derive(Clone)]
pub struct Scorer {
    classifier: Arc<dyn Classifier>,
}

impl Scorer {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// One likelihood per row, in row order
    ///
    /// The matrix width must equal the classifier's input width exactly;
    /// rows are never truncated or padded.
    pub fn score(&self, matrix: &FeatureMatrix) -> Result<Vec<ScoredMovie>, RecommendError> {
        self.score_rows(matrix, None)
    }

    /// Like [`Scorer::score`] but gives up with `Timeout` once `deadline` passes
    pub fn score_until(
        &self,
        matrix: &FeatureMatrix,
        deadline: Instant,
    ) -> Result<Vec<ScoredMovie>, RecommendError> {
        self.score_rows(matrix, Some(deadline))
    }

    fn score_rows(
        &self,
        matrix: &FeatureMatrix,
        deadline: Option<Instant>,
    ) -> Result<Vec<ScoredMovie>, RecommendError> {
        let expected = self.classifier.num_features();
        if matrix.columns() != expected {
            return Err(RecommendError::FeatureShapeMismatch {
                expected,
                actual: matrix.columns(),
            });
        }

        let mut scored = Vec::with_capacity(matrix.len());
        for (movie_id, row) in matrix.rows() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(RecommendError::Timeout("scoring candidates"));
            }
            scored.push(ScoredMovie {
                movie_id,
                likelihood: self.classifier.predict_proba(row),
            });
        }
        Ok(scored)
    }
}
