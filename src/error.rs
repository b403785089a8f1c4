//! Error type shared by all stages.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ShearError>;

/// Everything that can go wrong while computing shears and profiles.
#[derive(Debug, Error)]
pub enum ShearError {
    /// Right ascension or declination outside its valid domain.
    #[error("Invalid coordinate: {message}")]
    InvalidCoordinate { message: String },

    /// Negative cluster redshift.
    #[error("Invalid redshift {z}: must be non-negative")]
    InvalidRedshift { z: f64 },

    /// A source coincides with the lens, so its position angle is undefined.
    #[error("Source {index} is too close to the lens (theta = {theta:e} rad)")]
    DegenerateSeparation { index: usize, theta: f64 },

    /// Requested sky geometry is not implemented.
    #[error("Sky option {mode} not supported")]
    UnsupportedMode { mode: String },

    /// Position angle outside `[-pi, 2pi)`.
    #[error("Position angle {phi} of source {index} is not in radians within [-pi, 2pi)")]
    InvalidAngle { index: usize, phi: f64 },

    /// Paired arrays of different length.
    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// A catalog column needed by this step is absent.
    #[error("Galaxy catalog has no column `{column}`. {hint}")]
    MissingColumn { column: String, hint: &'static str },

    /// Unit string not in the recognized set.
    #[error("Unit `{unit}` not in [{valid}]")]
    UnsupportedUnit { unit: String, valid: String },

    /// A physical unit was requested without redshift and cosmology.
    #[error("Converting to {unit} needs both a cluster redshift and a cosmology")]
    MissingCosmology { unit: String },

    /// Bin edges could not be built.
    #[error("Invalid bins: {message}")]
    InvalidBins { message: String },

    /// Reading or writing a saved cluster failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Encoding or decoding a saved cluster failed.
    #[error("Serialization failed: {message}")]
    Serialization { message: String },
}

impl ShearError {
    pub(crate) fn invalid_coordinate(message: impl Into<String>) -> Self {
        Self::InvalidCoordinate {
            message: message.into(),
        }
    }

    pub(crate) fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_bins(message: impl Into<String>) -> Self {
        Self::InvalidBins {
            message: message.into(),
        }
    }
}
