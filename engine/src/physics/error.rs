//! Physics error types
//!
//! Shape construction and world lifecycle failures. Each error is fatal only
//! to the operation that produced it: an invalid shape aborts one object's
//! creation, never the world.

/// Geometry or mass passed to shape/body construction was unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidShapeError {
    /// No vertex coordinates were supplied.
    EmptyGeometry,
    /// Coordinate buffer length is not a multiple of 3.
    RaggedCoordinates(usize),
    /// A coordinate (by flat index) is NaN or infinite.
    NonFinite(usize),
    /// The points do not span a volume (coincident, collinear or coplanar).
    DegenerateHull,
    /// A primitive dimension (radius, half extent, margin) is not positive and finite.
    InvalidDimensions,
    /// Mass is negative or non-finite.
    InvalidMass(f32),
}

impl std::fmt::Display for InvalidShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidShapeError::EmptyGeometry => write!(f, "geometry has no vertices"),
            InvalidShapeError::RaggedCoordinates(len) => {
                write!(f, "coordinate buffer of length {len} is not a multiple of 3")
            }
            InvalidShapeError::NonFinite(index) => {
                write!(f, "coordinate {index} is not finite")
            }
            InvalidShapeError::DegenerateHull => write!(f, "points do not enclose a volume"),
            InvalidShapeError::InvalidDimensions => {
                write!(f, "shape dimensions must be positive and finite")
            }
            InvalidShapeError::InvalidMass(mass) => write!(f, "invalid body mass: {mass}"),
        }
    }
}

impl std::error::Error for InvalidShapeError {}

/// A second physics world was initialized while one is still alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldReentryError;

impl std::fmt::Display for WorldReentryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "a physics world is already active on this thread; tear it down first"
        )
    }
}

impl std::error::Error for WorldReentryError {}
