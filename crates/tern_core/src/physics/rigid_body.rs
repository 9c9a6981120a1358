//! Rigid body descriptions read from properties.

use std::fmt;
use std::str::FromStr;

use tern_math::Vec3;
use thiserror::Error;

use crate::properties::Properties;

/// Errors raised by invalid rigid body definitions.
#[derive(Error, Debug, PartialEq)]
pub enum RigidBodyError {
    #[error("namespace '{0}' is not a rigid body")]
    WrongNamespace(String),

    #[error("rigid body '{0}' has no type")]
    MissingType(String),

    #[error("rigid body '{id}' has unsupported type '{value}'")]
    UnknownShape { id: String, value: String },

    #[error("rigid body '{id}' has an invalid value for '{name}'")]
    InvalidValue { id: String, name: &'static str },
}

/// Result type for rigid body definitions.
pub type RigidBodyResult<T> = Result<T, RigidBodyError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Box,
    Sphere,
    Capsule,
    Mesh,
    Heightfield,
}

impl FromStr for ShapeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOX" => Ok(ShapeType::Box),
            "SPHERE" => Ok(ShapeType::Sphere),
            "CAPSULE" => Ok(ShapeType::Capsule),
            "MESH" => Ok(ShapeType::Mesh),
            "HEIGHTFIELD" => Ok(ShapeType::Heightfield),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeType::Box => "BOX",
            ShapeType::Sphere => "SPHERE",
            ShapeType::Capsule => "CAPSULE",
            ShapeType::Mesh => "MESH",
            ShapeType::Heightfield => "HEIGHTFIELD",
        };
        f.write_str(name)
    }
}

/// Whether a namespace tag names a rigid body definition.
pub fn is_rigid_body_namespace(name: &str) -> bool {
    name.eq_ignore_ascii_case("rigidbody")
}

/// A rigid body as declared in a properties file.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidBodyDesc {
    pub id: String,
    pub shape: ShapeType,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub kinematic: bool,
    pub anisotropic_friction: Vec3,
    /// Per-body gravity override
    pub gravity: Option<Vec3>,
    pub extents: Option<Vec3>,
    pub center: Option<Vec3>,
    /// `center` is in world units instead of a fraction of the fitted shape
    pub center_absolute: bool,
    pub radius: Option<f32>,
    pub height: Option<f32>,
    /// Heightfield image path
    pub image: Option<String>,
}

impl RigidBodyDesc {
    pub fn from_properties(props: &Properties) -> RigidBodyResult<Self> {
        if !is_rigid_body_namespace(props.namespace_name()) {
            return Err(RigidBodyError::WrongNamespace(props.namespace_name().to_string()));
        }
        let id = props.id().to_string();
        let type_name = props
            .get_str("type")
            .ok_or_else(|| RigidBodyError::MissingType(id.clone()))?;
        let shape = type_name
            .parse()
            .map_err(|_| RigidBodyError::UnknownShape {
                id: id.clone(),
                value: type_name.to_string(),
            })?;

        let scalar = |name: &'static str, default: f32| -> RigidBodyResult<f32> {
            match props.get_str(name) {
                None => Ok(default),
                Some(_) => props.get_f32(name).ok_or(RigidBodyError::InvalidValue {
                    id: id.clone(),
                    name,
                }),
            }
        };
        let vector = |name: &'static str| -> RigidBodyResult<Option<Vec3>> {
            match props.get_str(name) {
                None => Ok(None),
                Some(_) => props
                    .get_vec3(name)
                    .map(Some)
                    .ok_or(RigidBodyError::InvalidValue { id: id.clone(), name }),
            }
        };
        let optional = |name: &'static str| -> RigidBodyResult<Option<f32>> {
            match props.get_str(name) {
                None => Ok(None),
                Some(_) => props
                    .get_f32(name)
                    .map(Some)
                    .ok_or(RigidBodyError::InvalidValue { id: id.clone(), name }),
            }
        };

        let mass = scalar("mass", 0.0)?;
        if mass < 0.0 {
            return Err(RigidBodyError::InvalidValue {
                id: id.clone(),
                name: "mass",
            });
        }

        let desc = Self {
            shape,
            mass,
            friction: scalar("friction", 0.5)?,
            restitution: scalar("restitution", 0.0)?,
            linear_damping: scalar("linearDamping", 0.0)?,
            angular_damping: scalar("angularDamping", 0.0)?,
            kinematic: props.get_bool("kinematic").unwrap_or(false),
            anisotropic_friction: vector("anisotropicFriction")?.unwrap_or(Vec3::ONE),
            gravity: vector("gravity")?,
            extents: vector("extents")?,
            center: vector("center")?,
            center_absolute: props.get_bool("centerAbsolute").unwrap_or(false),
            radius: optional("radius")?,
            height: optional("height")?,
            image: props.get_str("image").map(str::to_string),
            id: id.clone(),
        };
        Ok(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_properties() {
        let props = Properties::new("rigidBody", "crate")
            .with("type", "BOX")
            .with("mass", "2")
            .with("extents", "1, 2, 3")
            .with("kinematic", "true");
        let desc = RigidBodyDesc::from_properties(&props).unwrap();
        assert_eq!(desc.shape, ShapeType::Box);
        assert_eq!(desc.mass, 2.0);
        assert_eq!(desc.friction, 0.5);
        assert_eq!(desc.extents, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert!(desc.kinematic);
        assert_eq!(desc.gravity, None);
    }

    #[test]
    fn test_invalid_definitions() {
        let wrong = Properties::new("material", "m").with("type", "BOX");
        assert!(matches!(
            RigidBodyDesc::from_properties(&wrong),
            Err(RigidBodyError::WrongNamespace(_))
        ));

        let untyped = Properties::new("rigidbody", "r");
        assert_eq!(
            RigidBodyDesc::from_properties(&untyped),
            Err(RigidBodyError::MissingType("r".to_string()))
        );

        let unknown = Properties::new("rigidbody", "r").with("type", "CONE");
        assert!(matches!(
            RigidBodyDesc::from_properties(&unknown),
            Err(RigidBodyError::UnknownShape { .. })
        ));

        let bad_extents = Properties::new("rigidbody", "r")
            .with("type", "BOX")
            .with("extents", "1, 2");
        assert_eq!(
            RigidBodyDesc::from_properties(&bad_extents),
            Err(RigidBodyError::InvalidValue {
                id: "r".to_string(),
                name: "extents"
            })
        );

        let negative = Properties::new("rigidbody", "r")
            .with("type", "SPHERE")
            .with("mass", "-1");
        assert!(RigidBodyDesc::from_properties(&negative).is_err());
    }
}
