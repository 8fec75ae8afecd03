//! Embedding generation for both search modalities
//!
//! Architecture:
//! - EmbeddingProvider trait for abstraction over encoder backends
//! - FastEmbedProvider for local encoding: all-MiniLM-L6-v2 (384-dim text)
//!   and CLIP ViT-B/32 (512-dim image)
//! - All vectors leave this module L2-normalized; the index layer relies on
//!   inner product being equivalent to cosine similarity

mod provider;

pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};

/// Scale a vector to unit Euclidean length in place.
///
/// A zero vector is left untouched; every downstream consumer treats it as
/// "similar to nothing" rather than dividing by zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize_already_unit() {
        let mut v = vec![1.0, 0.0];
        l2_normalize(&mut v);
        assert!((v[0] - 1.0).abs() < 1e-6);
        assert_eq!(v[1], 0.0);
    }
}
