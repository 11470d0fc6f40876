use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Descriptor length produced by the browser-side face model.
pub const EMBEDDING_DIM: usize = 128;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    #[error("embedding must have {expected} components, got {actual}")]
    WrongDimension { expected: usize, actual: usize },

    #[error("embedding component {index} is not a finite number")]
    NonFinite { index: usize },

    #[error("no face detected in this round")]
    NoFaceDetected,
}

/// Face descriptor with its dimension checked at construction.
///
/// Every `Embedding` in the process has exactly [`EMBEDDING_DIM`] finite
/// components, so distance computations never need to re-validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding(Box<[f32]>);

impl Embedding {
    pub fn values(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance, the metric the face model's descriptor space is trained for.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = EmbeddingError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        if values.len() != EMBEDDING_DIM {
            return Err(EmbeddingError::WrongDimension {
                expected: EMBEDDING_DIM,
                actual: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite { index });
        }
        Ok(Self(values.into_boxed_slice()))
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.0.into_vec()
    }
}

/// Averages one round of raw samples into a single descriptor.
///
/// `None` marks a sample where the detector found no face. Samples of the
/// wrong length or with non-finite components are skipped as well; the mean
/// is taken over the remaining samples only.
pub fn average_round(samples: &[Option<Vec<f32>>]) -> Result<Embedding, EmbeddingError> {
    let mut sum = vec![0.0f64; EMBEDDING_DIM];
    let mut valid = 0usize;

    for sample in samples.iter().flatten() {
        if sample.len() != EMBEDDING_DIM || sample.iter().any(|v| !v.is_finite()) {
            tracing::debug!(len = sample.len(), "skipping unusable sample");
            continue;
        }
        for (acc, v) in sum.iter_mut().zip(sample) {
            *acc += f64::from(*v);
        }
        valid += 1;
    }

    if valid == 0 {
        return Err(EmbeddingError::NoFaceDetected);
    }

    let mean: Vec<f32> = sum.into_iter().map(|s| (s / valid as f64) as f32).collect();
    Embedding::try_from(mean)
}
