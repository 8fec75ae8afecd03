/// Embedding provider trait and FastEmbed implementation
use crate::embedding::l2_normalize;
use fastembed::{
    EmbeddingModel, ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, InitOptions,
    TextEmbedding,
};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for dual-modality embedding providers
///
/// Both encoders are treated as slow, fallible, and side-effect-free.
/// Implementations must return unit-norm vectors; the index layer scores
/// with a plain inner product.
pub trait EmbeddingProvider: Send + Sync {
    /// Encode a text string into a unit-norm vector
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Encode an image file into a unit-norm vector
    fn embed_image(&self, path: &Path) -> Result<Vec<f32>, EmbeddingError>;

    /// Text embedding dimension
    fn text_dimension(&self) -> usize;

    /// Image embedding dimension
    fn image_dimension(&self) -> usize;
}

/// FastEmbed provider for local encoding of both modalities
///
/// **Important**: Models are downloaded on-demand to `~/.cache/huggingface/`
/// on first use. all-MiniLM-L6-v2 is ~90MB; CLIP ViT-B/32 is ~340MB.
pub struct FastEmbedProvider {
    text_model: TextEmbedding,
    image_model: ImageEmbedding,
    text_dimension: usize,
    image_dimension: usize,
}

impl FastEmbedProvider {
    /// Create a provider from model names
    pub fn new(text_model_name: &str, image_model_name: &str) -> Result<Self, EmbeddingError> {
        let (text_kind, text_dimension) = match text_model_name {
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
            "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
            "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
            _ => {
                return Err(EmbeddingError::InitializationError(format!(
                    "Unsupported text model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
                    text_model_name
                )));
            }
        };

        let (image_kind, image_dimension) = match image_model_name {
            "clip-vit-b-32" | "Qdrant/clip-ViT-B-32-vision" => {
                (ImageEmbeddingModel::ClipVitB32, 512)
            }
            "resnet50" => (ImageEmbeddingModel::Resnet50, 2048),
            _ => {
                return Err(EmbeddingError::InitializationError(format!(
                    "Unsupported image model: {}. Supported: clip-vit-b-32, resnet50",
                    image_model_name
                )));
            }
        };

        tracing::info!(
            "Initializing encoders: {} ({}D text), {} ({}D image)",
            text_model_name,
            text_dimension,
            image_model_name,
            image_dimension
        );

        let text_model = TextEmbedding::try_new(
            InitOptions::new(text_kind).with_show_download_progress(true),
        )
        .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        let image_model = ImageEmbedding::try_new(
            ImageInitOptions::new(image_kind).with_show_download_progress(true),
        )
        .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            text_model,
            image_model,
            text_dimension,
            image_dimension,
        })
    }

    /// Create provider with the default model pair
    pub fn with_default_models() -> Result<Self, EmbeddingError> {
        Self::new("all-MiniLM-L6-v2", "clip-vit-b-32")
    }

    fn check_dimension(vector: &[f32], expected: usize) -> Result<(), EmbeddingError> {
        if vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let embeddings = self
            .text_model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        let mut embedding = embeddings.into_iter().next().ok_or_else(|| {
            EmbeddingError::GenerationError("No embedding generated".to_string())
        })?;

        Self::check_dimension(&embedding, self.text_dimension)?;
        l2_normalize(&mut embedding);

        Ok(embedding)
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>, EmbeddingError> {
        if !path.exists() {
            return Err(EmbeddingError::InvalidInput(format!(
                "Image file not found: {}",
                path.display()
            )));
        }

        let embeddings = self
            .image_model
            .embed(vec![path], None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        let mut embedding = embeddings.into_iter().next().ok_or_else(|| {
            EmbeddingError::GenerationError("No embedding generated".to_string())
        })?;

        Self::check_dimension(&embedding, self.image_dimension)?;
        l2_normalize(&mut embedding);

        Ok(embedding)
    }

    fn text_dimension(&self) -> usize {
        self.text_dimension
    }

    fn image_dimension(&self) -> usize {
        self.image_dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_text_model_rejected() {
        let result = FastEmbedProvider::new("word2vec", "clip-vit-b-32");
        assert!(matches!(
            result,
            Err(EmbeddingError::InitializationError(_))
        ));
    }

    #[test]
    #[ignore] // Requires model downloads (~430MB) - run with: cargo test -- --ignored
    fn test_text_embedding_unit_norm() {
        let provider = FastEmbedProvider::with_default_models().unwrap();

        let embedding = provider.embed_text("red leather handbag").unwrap();
        assert_eq!(embedding.len(), 384);

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[test]
    #[ignore] // Requires model downloads (~430MB) - run with: cargo test -- --ignored
    fn test_empty_text_rejected() {
        let provider = FastEmbedProvider::with_default_models().unwrap();
        assert!(provider.embed_text("").is_err());
    }

    #[test]
    #[ignore] // Requires model downloads (~430MB) - run with: cargo test -- --ignored
    fn test_missing_image_rejected() {
        let provider = FastEmbedProvider::with_default_models().unwrap();
        let result = provider.embed_image(Path::new("/nonexistent/product.jpg"));
        assert!(matches!(result, Err(EmbeddingError::InvalidInput(_))));
    }
}
