//! Identification pipeline: geofence gate, round averaging, template matching.

#[cfg(test)]
pub mod capture;
pub mod embedding;
pub mod geofence;
pub mod matcher;

pub use embedding::{Embedding, EmbeddingError, average_round};
pub use geofence::{GeoPoint, GeofenceError, GeofenceVerdict};
pub use matcher::{Candidate, Confidence, RejectReason, StoredTemplate, TemplateMatcher};
