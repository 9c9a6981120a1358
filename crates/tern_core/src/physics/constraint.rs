//! Constraint kinds, frames and settings.

use std::fmt;
use std::str::FromStr;

use tern_math::{Quat, Vec3};

/// The five constraint builders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    Fixed,
    Generic,
    Hinge,
    Socket,
    Spring,
}

impl ConstraintType {
    pub const ALL: [ConstraintType; 5] = [
        ConstraintType::Fixed,
        ConstraintType::Generic,
        ConstraintType::Hinge,
        ConstraintType::Socket,
        ConstraintType::Spring,
    ];

    /// Name as written in scene files.
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintType::Fixed => "FIXED",
            ConstraintType::Generic => "GENERIC",
            ConstraintType::Hinge => "HINGE",
            ConstraintType::Socket => "SOCKET",
            ConstraintType::Spring => "SPRING",
        }
    }

    /// Springs connect two bodies; every other kind may pin one body to the world.
    pub fn requires_body_b(self) -> bool {
        self == ConstraintType::Spring
    }

    /// Whether generic limit settings apply (springs are generic constraints too).
    pub fn accepts_limits(self) -> bool {
        matches!(self, ConstraintType::Generic | ConstraintType::Spring)
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a constraint type name is not one of the five known kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownConstraintType(pub String);

impl fmt::Display for UnknownConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported constraint type '{}'", self.0)
    }
}

impl std::error::Error for UnknownConstraintType {}

impl FromStr for ConstraintType {
    type Err = UnknownConstraintType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownConstraintType(s.to_string()))
    }
}

/// Constraint frames relative to each body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConstraintFrames {
    /// Derive the frames from the current node poses.
    Auto,
    Explicit {
        rotation_a: Quat,
        translation_a: Vec3,
        rotation_b: Quat,
        translation_b: Vec3,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpringAxis {
    AngularX,
    AngularY,
    AngularZ,
    LinearX,
    LinearY,
    LinearZ,
}

/// Optional per-constraint parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConstraintSetting {
    AngularLowerLimit(Vec3),
    AngularUpperLimit(Vec3),
    LinearLowerLimit(Vec3),
    LinearUpperLimit(Vec3),
    /// Angles in radians
    HingeLimits {
        min_angle: f32,
        max_angle: f32,
        bounciness: Option<f32>,
    },
    SpringDamping(SpringAxis, f32),
    SpringStrength(SpringAxis, f32),
    BreakingImpulse(f32),
}

impl ConstraintSetting {
    /// Whether this setting makes sense on a constraint of `kind`.
    pub fn applies_to(&self, kind: ConstraintType) -> bool {
        match self {
            ConstraintSetting::AngularLowerLimit(_)
            | ConstraintSetting::AngularUpperLimit(_)
            | ConstraintSetting::LinearLowerLimit(_)
            | ConstraintSetting::LinearUpperLimit(_) => kind.accepts_limits(),
            ConstraintSetting::HingeLimits { .. } => kind == ConstraintType::Hinge,
            ConstraintSetting::SpringDamping(..) | ConstraintSetting::SpringStrength(..) => {
                kind == ConstraintType::Spring
            }
            ConstraintSetting::BreakingImpulse(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_constraint_type() {
        assert_eq!("HINGE".parse::<ConstraintType>(), Ok(ConstraintType::Hinge));
        assert_eq!("SPRING".parse::<ConstraintType>(), Ok(ConstraintType::Spring));
        assert_eq!(
            "ROPE".parse::<ConstraintType>(),
            Err(UnknownConstraintType("ROPE".to_string()))
        );
        for kind in ConstraintType::ALL {
            assert_eq!(kind.to_string().parse::<ConstraintType>(), Ok(kind));
        }
    }

    #[test]
    fn test_settings_per_kind() {
        let hinge = ConstraintSetting::HingeLimits {
            min_angle: 0.0,
            max_angle: 1.0,
            bounciness: None,
        };
        assert!(hinge.applies_to(ConstraintType::Hinge));
        assert!(!hinge.applies_to(ConstraintType::Generic));

        let limit = ConstraintSetting::LinearLowerLimit(Vec3::ZERO);
        assert!(limit.applies_to(ConstraintType::Spring));
        assert!(!limit.applies_to(ConstraintType::Socket));

        assert!(ConstraintSetting::BreakingImpulse(5.0).applies_to(ConstraintType::Fixed));
    }
}
