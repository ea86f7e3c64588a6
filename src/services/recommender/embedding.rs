use std::collections::HashMap;
use std::io::BufRead;

use super::error::RecommendError;

/// Frozen token → vector table for director or keyword names
///
/// Loaded from the word2vec text format: an optional `count dim` header line,
/// then one `token v1 … vdim` line per entry.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingTable {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: HashMap::new(),
        }
    }

    /// Adds one entry, rejecting vectors of the wrong dimension
    pub fn insert(&mut self, token: impl Into<String>, vector: Vec<f32>) -> Result<(), RecommendError> {
        let token = token.into();
        if vector.len() != self.dim {
            return Err(RecommendError::ArtifactMismatch(format!(
                "embedding for {:?} has {} components, table dimension is {}",
                token,
                vector.len(),
                self.dim
            )));
        }
        self.vectors.insert(token, vector);
        Ok(())
    }

    pub fn from_word2vec_text(reader: impl BufRead, path: &str) -> Result<Self, RecommendError> {
        let mut table: Option<EmbeddingTable> = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| RecommendError::format(path, e))?;
            let mut fields = line.split_whitespace();
            let Some(token) = fields.next() else {
                continue;
            };
            let values: Vec<&str> = fields.collect();

            // Header: "<count> <dim>"
            if line_no == 0 && values.len() == 1 {
                if let (Ok(_), Ok(dim)) = (token.parse::<usize>(), values[0].parse::<usize>()) {
                    table = Some(EmbeddingTable::new(dim));
                    continue;
                }
            }

            let vector = values
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| {
                    RecommendError::format(path, format!("line {}: {}", line_no + 1, e))
                })?;

            let table = table.get_or_insert_with(|| EmbeddingTable::new(vector.len()));
            table.insert(token, vector).map_err(|e| {
                RecommendError::format(path, format!("line {}: {}", line_no + 1, e))
            })?;
        }

        table.ok_or_else(|| RecommendError::format(path, "no embeddings found"))
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.vectors.get(token).map(Vec::as_slice)
    }

    /// Elementwise mean of the vectors of every known token
    ///
    /// Names are split on whitespace into tokens. When no token is known the
    /// result is the zero vector, so movies with unknown names still score.
    pub fn mean_of<'a, I>(&self, names: I) -> Vec<f32>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sum = vec![0.0f32; self.dim];
        let mut found = 0usize;

        for token in names.into_iter().flat_map(str::split_whitespace) {
            if let Some(vector) = self.vectors.get(token) {
                for (acc, v) in sum.iter_mut().zip(vector) {
                    *acc += v;
                }
                found += 1;
            }
        }

        if found > 0 {
            let n = found as f32;
            for acc in &mut sum {
                *acc /= n;
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EmbeddingTable {
        let mut table = EmbeddingTable::new(3);
        table.insert("Nolan", vec![1.0, 2.0, 3.0]).unwrap();
        table.insert("Christopher", vec![3.0, 2.0, 1.0]).unwrap();
        table
    }

    #[test]
    fn test_mean_of_full_name_tokens() {
        let mean = table().mean_of(["Christopher Nolan"]);
        assert_eq!(mean, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_mean_skips_unknown_tokens() {
        let mean = table().mean_of(["Nolan", "Spielberg"]);
        assert_eq!(mean, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_names_give_zero_vector() {
        let mean = table().mean_of(std::iter::empty());
        assert_eq!(mean, vec![0.0; 3]);
    }

    #[test]
    fn test_all_unknown_give_zero_vector() {
        let mean = table().mean_of(["Greta Gerwig"]);
        assert_eq!(mean, vec![0.0; 3]);
    }

    #[test]
    fn test_insert_rejects_wrong_dimension() {
        let mut table = EmbeddingTable::new(3);
        let result = table.insert("Nolan", vec![1.0]);
        assert!(matches!(result, Err(RecommendError::ArtifactMismatch(_))));
    }

    #[test]
    fn test_load_with_header() {
        let text = "2 3\nNolan 1 2 3\nSmith 0.5 0.5 0.5\n";
        let table = EmbeddingTable::from_word2vec_text(text.as_bytes(), "director.txt").unwrap();
        assert_eq!(table.dim(), 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Smith"), Some(&[0.5f32, 0.5, 0.5][..]));
    }

    #[test]
    fn test_load_without_header() {
        let text = "Nolan 1 2\nSmith 3 4\n\n";
        let table = EmbeddingTable::from_word2vec_text(text.as_bytes(), "director.txt").unwrap();
        assert_eq!(table.dim(), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_load_rejects_ragged_rows() {
        let text = "Nolan 1 2 3\nSmith 3 4\n";
        let result = EmbeddingTable::from_word2vec_text(text.as_bytes(), "director.txt");
        assert!(matches!(result, Err(RecommendError::ArtifactFormat { .. })));
    }

    #[test]
    fn test_load_rejects_bad_numbers() {
        let text = "Nolan 1 x 3\n";
        let result = EmbeddingTable::from_word2vec_text(text.as_bytes(), "director.txt");
        assert!(matches!(result, Err(RecommendError::ArtifactFormat { .. })));
    }
}
