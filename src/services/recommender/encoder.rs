use super::embedding::EmbeddingTable;
use super::vectorizer::TfidfVectorizer;

/// Numeric blocks derived from a movie's genre, director and keyword names
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    pub genres: Vec<f32>,
    /// Present only when the deployed variant uses embeddings
    pub directors: Option<Vec<f32>>,
    pub keywords: Option<Vec<f32>>,
}

/// Turns raw names into feature blocks using the frozen artifacts
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder<'a> {
    vectorizer: &'a TfidfVectorizer,
    directors: Option<&'a EmbeddingTable>,
    keywords: Option<&'a EmbeddingTable>,
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(
        vectorizer: &'a TfidfVectorizer,
        directors: Option<&'a EmbeddingTable>,
        keywords: Option<&'a EmbeddingTable>,
    ) -> Self {
        Self {
            vectorizer,
            directors,
            keywords,
        }
    }

    /// Genre names are joined with `", "` the way the training data was built
    pub fn encode_genres(&self, genres: &[String]) -> Vec<f32> {
        self.vectorizer.transform(&genres.join(", "))
    }

    pub fn encode(&self, genres: &[String], directors: &[String], keywords: &[String]) -> EncodedFeatures {
        EncodedFeatures {
            genres: self.encode_genres(genres),
            directors: self
                .directors
                .map(|table| table.mean_of(directors.iter().map(String::as_str))),
            keywords: self
                .keywords
                .map(|table| table.mean_of(keywords.iter().map(String::as_str))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vectorizer() -> TfidfVectorizer {
        let vocabulary = HashMap::from([("action".to_string(), 0), ("comedy".to_string(), 1)]);
        TfidfVectorizer::new(vocabulary, vec![1.0, 1.0]).unwrap()
    }

    fn directors() -> EmbeddingTable {
        let mut table = EmbeddingTable::new(50);
        table.insert("Nolan", vec![0.5; 50]).unwrap();
        table
    }

    fn keywords() -> EmbeddingTable {
        let mut table = EmbeddingTable::new(50);
        table.insert("heist", vec![1.0; 50]).unwrap();
        table.insert("dream", vec![3.0; 50]).unwrap();
        table
    }

    #[test]
    fn test_empty_director_list_is_zero_vector() {
        let vectorizer = vectorizer();
        let directors = directors();
        let keywords = keywords();
        let encoder = FeatureEncoder::new(&vectorizer, Some(&directors), Some(&keywords));

        let encoded = encoder.encode(&["Action".to_string()], &[], &[]);
        assert_eq!(encoded.directors, Some(vec![0.0; 50]));
        assert_eq!(encoded.keywords, Some(vec![0.0; 50]));
    }

    #[test]
    fn test_encode_all_blocks() {
        let vectorizer = vectorizer();
        let directors = directors();
        let keywords = keywords();
        let encoder = FeatureEncoder::new(&vectorizer, Some(&directors), Some(&keywords));

        let encoded = encoder.encode(
            &["Action".to_string()],
            &["Christopher Nolan".to_string()],
            &["heist".to_string(), "dream".to_string(), "zombie".to_string()],
        );
        assert_eq!(encoded.genres, vec![1.0, 0.0]);
        assert_eq!(encoded.directors, Some(vec![0.5; 50]));
        assert_eq!(encoded.keywords, Some(vec![2.0; 50]));
    }

    #[test]
    fn test_tfidf_only_skips_embeddings() {
        let vectorizer = vectorizer();
        let encoder = FeatureEncoder::new(&vectorizer, None, None);

        let encoded = encoder.encode(&["Comedy".to_string()], &["Nolan".to_string()], &[]);
        assert_eq!(encoded.genres, vec![0.0, 1.0]);
        assert_eq!(encoded.directors, None);
        assert_eq!(encoded.keywords, None);
    }
}
