//! Block faces and connection kinds.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the six axis-aligned faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// +X.
    East,
    /// −X.
    West,
    /// +Y.
    Up,
    /// −Y.
    Down,
    /// +Z.
    South,
    /// −Z.
    North,
}

impl Direction {
    /// All six directions.
    pub const ALL: [Self; 6] = [
        Self::East,
        Self::West,
        Self::Up,
        Self::Down,
        Self::South,
        Self::North,
    ];

    /// The facing direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::East => Self::West,
            Self::West => Self::East,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::South => Self::North,
            Self::North => Self::South,
        }
    }

    /// Whether this direction points along a positive axis.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::East | Self::Up | Self::South)
    }

    /// Unit vector of this direction.
    #[must_use]
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Self::East => Vector3::x(),
            Self::West => -Vector3::x(),
            Self::Up => Vector3::y(),
            Self::Down => -Vector3::y(),
            Self::South => Vector3::z(),
            Self::North => -Vector3::z(),
        }
    }

    /// Unit vector of the positive axis this direction lies on.
    #[must_use]
    pub fn axis(self) -> Vector3<f64> {
        if self.is_positive() {
            self.unit()
        } else {
            self.opposite().unit()
        }
    }
}

/// How a block side couples mechanically to its neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionType {
    /// No mechanical coupling.
    #[default]
    None,
    /// Rigid coupling: anchors coincide and rotations match.
    Linear,
    /// Anchors coincide, rotation free.
    LinearBearing,
    /// Rotations match (shafts, gears), translation free.
    Rotational,
    /// Planar position coupling, rotation free.
    Xy,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_ne!(dir.is_positive(), dir.opposite().is_positive());
        }
    }

    #[test]
    fn test_axis_is_positive() {
        for dir in Direction::ALL {
            let axis = dir.axis();
            assert!(axis.iter().all(|c| *c >= 0.0));
            assert!((axis.norm() - 1.0).abs() < 1e-12);
            assert!((dir.unit() + dir.opposite().unit()).norm() < 1e-12);
        }
    }
}
