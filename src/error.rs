//! Unified error handling for the track-analytics library.
//!
//! Every fallible operation returns [`Result`]. Arithmetic failure modes
//! (zero-distance or zero-time denominators) surface as
//! [`TrackError::DegenerateSegment`] or are resolved inside the component
//! that hit them; NaN and infinity never leave the crate.

use thiserror::Error;

/// Unified error type for track-analytics operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    /// Input feature collection doesn't match the expected shape
    #[error("Invalid feature: {message}")]
    InvalidFeature { message: String },

    /// A track or course with the same derived name is already loaded
    #[error("A {kind} with the name '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    /// A time-based metric was requested on a trace without enough timestamps
    #[error("Track '{name}' has {timestamped} timestamped points, at least 2 required")]
    MissingTimeData { name: String, timestamped: usize },

    /// A ratio had a zero (or non-finite) denominator
    #[error("Degenerate segment: {quantity} is undefined")]
    DegenerateSegment { quantity: &'static str },

    /// Requested track isn't loaded
    #[error("No track named '{name}' is loaded")]
    UnknownTrack { name: String },

    /// Requested course isn't loaded
    #[error("No course named '{name}' is loaded")]
    UnknownCourse { name: String },

    /// Request or config JSON couldn't be (de)serialized
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        TrackError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for track-analytics operations.
pub type Result<T> = std::result::Result<T, TrackError>;

/// Extension trait for converting Option to TrackError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a missing time data error.
    fn ok_or_missing_time(self, name: &str, timestamped: usize) -> Result<T>;

    /// Convert Option to Result with an invalid feature error.
    fn ok_or_invalid(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing_time(self, name: &str, timestamped: usize) -> Result<T> {
        self.ok_or_else(|| TrackError::MissingTimeData {
            name: name.to_string(),
            timestamped,
        })
    }

    fn ok_or_invalid(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackError::InvalidFeature {
            message: message.to_string(),
        })
    }
}
