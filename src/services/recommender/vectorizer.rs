//! Fitted TF-IDF vectorizer for genre strings.
//!
//! The artifact is a JSON export of a fitted scikit-learn `TfidfVectorizer`:
//! its vocabulary (term to column), the idf weights and the normalization
//! options. Fitting happens offline; this type only transforms.

use serde::Deserialize;
use std::collections::HashMap;

use super::error::RecommendError;

/// Row normalization applied after idf weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

fn default_lowercase() -> bool {
    true
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Vectorizer fields as they appear in the artifact, before validation
#[derive(Deserialize)]
struct RawTfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
    #[serde(default = "default_norm")]
    norm: Option<Norm>,
    #[serde(default)]
    sublinear_tf: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawTfidfVectorizer")]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    lowercase: bool,
    norm: Option<Norm>,
    sublinear_tf: bool,
}

impl TryFrom<RawTfidfVectorizer> for TfidfVectorizer {
    type Error = String;

    fn try_from(raw: RawTfidfVectorizer) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl TfidfVectorizer {
    /// Builds a vectorizer from a vocabulary and matching idf weights
    ///
    /// Uses the scikit-learn defaults: lowercase input, L2 norm, raw term counts.
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> Result<Self, RecommendError> {
        Self::from_raw(RawTfidfVectorizer {
            vocabulary,
            idf,
            lowercase: true,
            norm: Some(Norm::L2),
            sublinear_tf: false,
        })
        .map_err(|reason| RecommendError::format("<in-memory>", reason))
    }

    /// Parses the JSON artifact
    pub fn from_json(source: &str, path: &str) -> Result<Self, RecommendError> {
        let raw: RawTfidfVectorizer =
            serde_json::from_str(source).map_err(|e| RecommendError::format(path, e))?;
        Self::from_raw(raw).map_err(|reason| RecommendError::format(path, reason))
    }

    /// Every term needs its own column below `idf.len()`
    fn from_raw(raw: RawTfidfVectorizer) -> Result<Self, String> {
        if raw.idf.len() != raw.vocabulary.len() {
            return Err(format!(
                "vocabulary has {} terms but idf has {} weights",
                raw.vocabulary.len(),
                raw.idf.len()
            ));
        }

        let mut seen = vec![false; raw.idf.len()];
        for (term, &index) in &raw.vocabulary {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(format!(
                        "term {:?} has invalid or duplicate column {}",
                        term, index
                    ))
                }
            }
        }

        Ok(Self {
            vocabulary: raw.vocabulary,
            idf: raw.idf,
            lowercase: raw.lowercase,
            norm: raw.norm,
            sublinear_tf: raw.sublinear_tf,
        })
    }

    /// Number of output columns
    pub fn width(&self) -> usize {
        self.idf.len()
    }

    /// Vocabulary terms ordered by output column
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.width()];
        for (term, &index) in &self.vocabulary {
            names[index] = term.clone();
        }
        names
    }

    /// Transforms one document into a dense row of `width()` values
    pub fn transform(&self, document: &str) -> Vec<f32> {
        let mut counts = vec![0.0f64; self.width()];

        let text = if self.lowercase {
            document.to_lowercase()
        } else {
            document.to_string()
        };

        for token in tokenize(&text) {
            if let Some(&index) = self.vocabulary.get(token) {
                counts[index] += 1.0;
            }
        }

        let mut weights: Vec<f64> = counts
            .iter()
            .zip(&self.idf)
            .map(|(&tf, &idf)| {
                let tf = if self.sublinear_tf && tf > 0.0 {
                    1.0 + tf.ln()
                } else {
                    tf
                };
                tf * idf
            })
            .collect();

        let norm = match self.norm {
            Some(Norm::L2) => weights.iter().map(|w| w * w).sum::<f64>().sqrt(),
            Some(Norm::L1) => weights.iter().map(|w| w.abs()).sum::<f64>(),
            None => 1.0,
        };
        if norm > 0.0 {
            for w in &mut weights {
                *w /= norm;
            }
        }

        weights.into_iter().map(|w| w as f32).collect()
    }
}

/// Splits text into runs of at least two word characters
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
}
