// SPDX-License-Identifier: GPL-3.0-only

//! EXIF-style orientation from sensor mirroring and device rotation

/// Relative device rotation in degrees (clockwise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// No rotation
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise
    Rotate270,
}

impl Rotation {
    /// Create a rotation from an integer degree value (normalised to 0-360)
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::None,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Compute the EXIF-style orientation in degrees for a captured still
///
/// For mirrored (front-facing) sensors the rotation direction is inverted so
/// the persisted image displays upright.
pub fn exif_orientation_degrees(rotation: Rotation, mirrored: bool) -> u32 {
    if mirrored {
        (360 - rotation.degrees()) % 360
    } else {
        rotation.degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmirrored_orientation_equals_rotation() {
        assert_eq!(exif_orientation_degrees(Rotation::None, false), 0);
        assert_eq!(exif_orientation_degrees(Rotation::Rotate90, false), 90);
        assert_eq!(exif_orientation_degrees(Rotation::Rotate180, false), 180);
        assert_eq!(exif_orientation_degrees(Rotation::Rotate270, false), 270);
    }

    #[test]
    fn mirrored_orientation_inverts_rotation() {
        assert_eq!(exif_orientation_degrees(Rotation::None, true), 0);
        assert_eq!(exif_orientation_degrees(Rotation::Rotate90, true), 270);
        assert_eq!(exif_orientation_degrees(Rotation::Rotate180, true), 180);
        assert_eq!(exif_orientation_degrees(Rotation::Rotate270, true), 90);
    }

    #[test]
    fn degrees_normalised() {
        assert_eq!(Rotation::from_degrees(450).degrees(), 90);
        assert_eq!(Rotation::from_degrees(-90).degrees(), 270);
        assert_eq!(Rotation::from_degrees(45).degrees(), 0);
    }
}
