use std::collections::HashSet;

use super::artifacts::ArtifactSet;
use super::error::RecommendError;
use super::layout::FeatureSlot;
use crate::models::{Movie, MovieId, UserId};

/// Row-major feature matrix with the movie each row belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: usize,
    values: Vec<f32>,
    movie_ids: Vec<MovieId>,
}

impl FeatureMatrix {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            values: Vec::new(),
            movie_ids: Vec::new(),
        }
    }

    /// Appends a row; its length must equal the matrix width
    pub fn push_row(&mut self, movie_id: MovieId, row: &[f32]) -> Result<(), RecommendError> {
        if row.len() != self.columns {
            return Err(RecommendError::FeatureShapeMismatch {
                expected: self.columns,
                actual: row.len(),
            });
        }
        self.values.extend_from_slice(row);
        self.movie_ids.push(movie_id);
        Ok(())
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.movie_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movie_ids.is_empty()
    }

    pub fn movie_ids(&self) -> &[MovieId] {
        &self.movie_ids
    }

    pub fn rows(&self) -> impl Iterator<Item = (MovieId, &[f32])> {
        // chunks_exact on a zero-width matrix would panic
        let width = self.columns.max(1);
        self.movie_ids
            .iter()
            .copied()
            .zip(self.values.chunks_exact(width))
    }
}

/// Candidate rows plus the movies that had to be skipped
#[derive(Debug, Clone)]
pub struct AssembledCandidates {
    pub matrix: FeatureMatrix,
    pub skipped: Vec<MovieId>,
}

/// Builds one feature row per unrated catalog movie in layout order
pub struct CandidateAssembler<'a> {
    artifacts: &'a ArtifactSet,
}

impl<'a> CandidateAssembler<'a> {
    pub fn new(artifacts: &'a ArtifactSet) -> Self {
        Self { artifacts }
    }

    /// Fails with `EmptyCandidateSet` when nothing is left to score, either
    /// because every movie is rated or every unrated one is incomplete
    pub fn assemble(
        &self,
        user_id: UserId,
        catalog: &[Movie],
        rated: &HashSet<MovieId>,
    ) -> Result<AssembledCandidates, RecommendError> {
        let layout = self.artifacts.layout();
        let mut matrix = FeatureMatrix::new(layout.width());
        let mut skipped = Vec::new();
        let mut row = Vec::with_capacity(layout.width());

        for movie in catalog.iter().filter(|m| !rated.contains(&m.id)) {
            row.clear();
            match self.fill_row(&mut row, user_id, movie) {
                Ok(()) => matrix.push_row(movie.id, &row)?,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(movie_id = %movie.id, error = %e, "Skipping candidate");
                    skipped.push(movie.id);
                }
                Err(e) => return Err(e),
            }
        }

        if matrix.is_empty() {
            return Err(RecommendError::EmptyCandidateSet);
        }

        tracing::debug!(
            user_id = %user_id,
            candidates = matrix.len(),
            skipped = skipped.len(),
            "Candidates assembled"
        );

        Ok(AssembledCandidates { matrix, skipped })
    }

    fn fill_row(&self, row: &mut Vec<f32>, user_id: UserId, movie: &Movie) -> Result<(), RecommendError> {
        let runtime = movie.runtime.ok_or(RecommendError::IncompleteMovieData {
            movie_id: movie.id,
            field: "runtime",
        })?;

        let encoded = self
            .artifacts
            .encoder()
            .encode(&movie.genres, &movie.directors, &movie.keywords);

        for slot in self.artifacts.layout().slots() {
            let value = match slot {
                FeatureSlot::MovieId => movie.id.0 as f32,
                FeatureSlot::Runtime => runtime as f32,
                FeatureSlot::Adult => {
                    if movie.adult {
                        1.0
                    } else {
                        0.0
                    }
                }
                FeatureSlot::UserId => user_id.0 as f32,
                FeatureSlot::Genre { index, .. } => encoded.genres[*index],
                FeatureSlot::Director(i) => block_value(&encoded.directors, *i, slot)?,
                FeatureSlot::Keyword(i) => block_value(&encoded.keywords, *i, slot)?,
            };
            row.push(value);
        }
        Ok(())
    }
}

fn block_value(block: &Option<Vec<f32>>, index: usize, slot: &FeatureSlot) -> Result<f32, RecommendError> {
    block
        .as_ref()
        .and_then(|values| values.get(index).copied())
        .ok_or_else(|| RecommendError::ArtifactMismatch(format!("no value for slot {}", slot)))
}
