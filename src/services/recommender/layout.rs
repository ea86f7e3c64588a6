//! Feature layout descriptor.
//!
//! The classifier is order-sensitive: a row with the right width but the
//! wrong column order scores garbage without failing. The layout is built
//! once when artifacts load and every row is filled by walking its slots.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Which feature blocks a deployed classifier was trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureVariant {
    /// Base columns plus the genre TF-IDF block
    TfidfOnly,
    /// Base columns, genre TF-IDF, director and keyword embeddings
    TfidfEmbeddings,
}

impl FeatureVariant {
    pub fn uses_embeddings(&self) -> bool {
        matches!(self, FeatureVariant::TfidfEmbeddings)
    }
}

/// One named column of the feature matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSlot {
    MovieId,
    Runtime,
    Adult,
    UserId,
    /// Column `index` of the genre TF-IDF block
    Genre { index: usize, term: String },
    /// Zero-based component of the director mean embedding
    Director(usize),
    /// Zero-based component of the keyword mean embedding
    Keyword(usize),
}

impl Display for FeatureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Names match the column labels the classifier was trained with
        match self {
            FeatureSlot::MovieId => write!(f, "movie_id"),
            FeatureSlot::Runtime => write!(f, "runtime"),
            FeatureSlot::Adult => write!(f, "adult"),
            FeatureSlot::UserId => write!(f, "user_id"),
            FeatureSlot::Genre { term, .. } => write!(f, "{}", term),
            FeatureSlot::Director(i) => write!(f, "{}director", i + 1),
            FeatureSlot::Keyword(i) => write!(f, "{}keyword", i + 1),
        }
    }
}

/// Ordered list of feature slots for one classifier version
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayout {
    version: String,
    variant: FeatureVariant,
    slots: Vec<FeatureSlot>,
}

impl FeatureLayout {
    /// The column order used by the training notebooks:
    /// `movie_id, runtime, adult, user_id, genres…, 1director…, 1keyword…`
    pub fn standard(
        version: impl Into<String>,
        variant: FeatureVariant,
        genre_terms: &[String],
        embedding_dim: usize,
    ) -> Self {
        let mut slots = vec![
            FeatureSlot::MovieId,
            FeatureSlot::Runtime,
            FeatureSlot::Adult,
            FeatureSlot::UserId,
        ];

        slots.extend(
            genre_terms
                .iter()
                .enumerate()
                .map(|(index, term)| FeatureSlot::Genre {
                    index,
                    term: term.clone(),
                }),
        );

        if variant.uses_embeddings() {
            slots.extend((0..embedding_dim).map(FeatureSlot::Director));
            slots.extend((0..embedding_dim).map(FeatureSlot::Keyword));
        }

        Self {
            version: version.into(),
            variant,
            slots,
        }
    }

    /// A layout with an explicit slot order, for classifiers trained on a
    /// different column arrangement
    pub fn from_slots(
        version: impl Into<String>,
        variant: FeatureVariant,
        slots: Vec<FeatureSlot>,
    ) -> Self {
        Self {
            version: version.into(),
            variant,
            slots,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn variant(&self) -> FeatureVariant {
        self.variant
    }

    pub fn slots(&self) -> &[FeatureSlot] {
        &self.slots
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(ToString::to_string).collect()
    }
}
