//! Pre-trained artifact bundle.
//!
//! Loaded once at process start from a versioned directory and shared
//! read-only between requests. Any disagreement between the pieces and the
//! feature layout is reported here, never per request.

use serde::Deserialize;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::classifier::{Classifier, GbdtClassifier};
use super::embedding::EmbeddingTable;
use super::encoder::FeatureEncoder;
use super::error::RecommendError;
use super::layout::{FeatureLayout, FeatureVariant};
use super::vectorizer::TfidfVectorizer;

pub const MANIFEST_FILE: &str = "manifest.json";

fn default_embedding_dim() -> usize {
    50
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactManifest {
    pub version: String,
    pub variant: FeatureVariant,
    pub vectorizer: String,
    pub classifier: String,
    #[serde(default)]
    pub director_embeddings: Option<String>,
    #[serde(default)]
    pub keyword_embeddings: Option<String>,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

/// Director and keyword tables used by the embedding variant
#[derive(Debug, Clone)]
pub struct Embeddings {
    pub directors: EmbeddingTable,
    pub keywords: EmbeddingTable,
}

/// Frozen vectorizer, embeddings and classifier plus the layout they agree on
pub struct ArtifactSet {
    layout: FeatureLayout,
    vectorizer: TfidfVectorizer,
    embeddings: Option<Embeddings>,
    classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for ArtifactSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactSet")
            .field("version", &self.layout.version())
            .field("variant", &self.layout.variant())
            .field("width", &self.layout.width())
            .finish()
    }
}

impl ArtifactSet {
    /// Assembles and validates a bundle from already-loaded pieces
    pub fn new(
        version: impl Into<String>,
        variant: FeatureVariant,
        vectorizer: TfidfVectorizer,
        embeddings: Option<Embeddings>,
        embedding_dim: usize,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, RecommendError> {
        let layout = FeatureLayout::standard(
            version,
            variant,
            &vectorizer.feature_names(),
            embedding_dim,
        );
        Self::with_layout(layout, vectorizer, embeddings, classifier)
    }

    /// Like [`ArtifactSet::new`] but with an explicit column order
    pub fn with_layout(
        layout: FeatureLayout,
        vectorizer: TfidfVectorizer,
        embeddings: Option<Embeddings>,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, RecommendError> {
        let embeddings = match (layout.variant().uses_embeddings(), embeddings) {
            (true, None) => {
                return Err(RecommendError::ArtifactMismatch(format!(
                    "variant {:?} needs director and keyword embeddings",
                    layout.variant()
                )))
            }
            (true, Some(e)) => Some(e),
            (false, _) => None,
        };

        let set = Self {
            layout,
            vectorizer,
            embeddings,
            classifier,
        };
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<(), RecommendError> {
        use super::layout::FeatureSlot;

        let width = self.layout.width();
        if self.classifier.num_features() != width {
            return Err(RecommendError::ArtifactMismatch(format!(
                "classifier expects {} features, layout {} has {}",
                self.classifier.num_features(),
                self.layout.version(),
                width
            )));
        }

        let genre_slots = self
            .layout
            .slots()
            .iter()
            .filter(|s| matches!(s, FeatureSlot::Genre { .. }))
            .count();
        if genre_slots != self.vectorizer.width() {
            return Err(RecommendError::ArtifactMismatch(format!(
                "vectorizer produces {} columns, layout has {} genre slots",
                self.vectorizer.width(),
                genre_slots
            )));
        }

        for slot in self.layout.slots() {
            let out_of_range = match slot {
                FeatureSlot::Genre { index, .. } => *index >= self.vectorizer.width(),
                FeatureSlot::Director(i) => self
                    .embeddings
                    .as_ref()
                    .map_or(true, |e| *i >= e.directors.dim()),
                FeatureSlot::Keyword(i) => self
                    .embeddings
                    .as_ref()
                    .map_or(true, |e| *i >= e.keywords.dim()),
                _ => false,
            };
            if out_of_range {
                return Err(RecommendError::ArtifactMismatch(format!(
                    "slot {} is outside the loaded artifacts",
                    slot
                )));
            }
        }

        if let Some(embeddings) = &self.embeddings {
            if embeddings.directors.dim() != embeddings.keywords.dim() {
                return Err(RecommendError::ArtifactMismatch(format!(
                    "director embeddings have dimension {}, keyword embeddings {}",
                    embeddings.directors.dim(),
                    embeddings.keywords.dim()
                )));
            }
        }

        if let Some(trained) = self.classifier.feature_names() {
            let expected = self.layout.names();
            if trained != expected.as_slice() {
                let first_diff = trained
                    .iter()
                    .zip(&expected)
                    .position(|(a, b)| a != b)
                    .unwrap_or(trained.len().min(expected.len()));
                return Err(RecommendError::ArtifactMismatch(format!(
                    "classifier column {} is {:?}, layout has {:?}",
                    first_diff,
                    trained.get(first_diff),
                    expected.get(first_diff)
                )));
            }
        }

        Ok(())
    }

    /// Loads `manifest.json` and the files it names from `dir`
    ///
    /// Fails with `ArtifactMismatch` when the manifest version differs from
    /// `expected_version` or the pieces disagree on the feature layout.
    pub fn load(dir: impl AsRef<Path>, expected_version: &str) -> Result<Self, RecommendError> {
        let dir = dir.as_ref();
        let start = std::time::Instant::now();

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest: ArtifactManifest = serde_json::from_str(&read_file(&manifest_path)?)
            .map_err(|e| RecommendError::format(manifest_path.display().to_string(), e))?;

        if manifest.version != expected_version {
            return Err(RecommendError::ArtifactMismatch(format!(
                "expected artifact version {}, found {}",
                expected_version, manifest.version
            )));
        }

        let vectorizer_path = dir.join(&manifest.vectorizer);
        let vectorizer = TfidfVectorizer::from_json(
            &read_file(&vectorizer_path)?,
            &vectorizer_path.display().to_string(),
        )?;

        let classifier_path = dir.join(&manifest.classifier);
        let classifier = GbdtClassifier::from_json(
            &read_file(&classifier_path)?,
            &classifier_path.display().to_string(),
        )?;

        let embeddings = if manifest.variant.uses_embeddings() {
            let directors = load_embeddings(dir, manifest.director_embeddings.as_deref(), "director_embeddings")?;
            let keywords = load_embeddings(dir, manifest.keyword_embeddings.as_deref(), "keyword_embeddings")?;

            for (name, table) in [("director", &directors), ("keyword", &keywords)] {
                if table.dim() != manifest.embedding_dim {
                    return Err(RecommendError::ArtifactMismatch(format!(
                        "{} embeddings have dimension {}, manifest declares {}",
                        name,
                        table.dim(),
                        manifest.embedding_dim
                    )));
                }
            }
            Some(Embeddings {
                directors,
                keywords,
            })
        } else {
            None
        };

        let set = Self::new(
            manifest.version.clone(),
            manifest.variant,
            vectorizer,
            embeddings,
            manifest.embedding_dim,
            Arc::new(classifier),
        )?;

        tracing::info!(
            version = %manifest.version,
            variant = ?manifest.variant,
            features = set.layout.width(),
            load_ms = start.elapsed().as_millis() as u64,
            "Recommendation artifacts loaded"
        );

        Ok(set)
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn version(&self) -> &str {
        self.layout.version()
    }

    pub fn classifier(&self) -> Arc<dyn Classifier> {
        Arc::clone(&self.classifier)
    }

    pub fn encoder(&self) -> FeatureEncoder<'_> {
        FeatureEncoder::new(
            &self.vectorizer,
            self.embeddings.as_ref().map(|e| &e.directors),
            self.embeddings.as_ref().map(|e| &e.keywords),
        )
    }
}

fn read_file(path: &Path) -> Result<String, RecommendError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RecommendError::ArtifactMissing(path.to_path_buf()),
        _ => RecommendError::format(path.display().to_string(), e),
    })
}

fn load_embeddings(
    dir: &Path,
    file: Option<&str>,
    key: &str,
) -> Result<EmbeddingTable, RecommendError> {
    let file = file.ok_or_else(|| {
        RecommendError::ArtifactMismatch(format!("manifest is missing {}", key))
    })?;
    let path: PathBuf = dir.join(file);
    let handle = fs::File::open(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RecommendError::ArtifactMissing(path.clone()),
        _ => RecommendError::format(path.display().to_string(), e),
    })?;
    EmbeddingTable::from_word2vec_text(BufReader::new(handle), &path.display().to_string())
}
