//! Keyframe animations.
//!
//! Animations are read from properties namespaces such as
//!
//! ```text
//! animation spin
//! {
//!     property = ANIMATE_ROTATE
//!     keyCount = 2
//!     keyTimes = 0, 1000
//!     keyValues = 0 0 0 1  0 1 0 0
//!     curve = LINEAR
//!
//!     clip half { begin = 0  end = 500  repeatCount = INDEFINITE }
//! }
//! ```
//!
//! and registered with an [`AnimationController`] bound to a target node.

use std::str::FromStr;

use thiserror::Error;

use crate::properties::Properties;

/// Errors raised by invalid animation data.
#[derive(Error, Debug, PartialEq)]
pub enum AnimationError {
    #[error("animation '{id}' is missing '{name}'")]
    MissingProperty { id: String, name: &'static str },

    #[error("animation '{id}' has an invalid value for '{name}'")]
    InvalidValue { id: String, name: &'static str },

    #[error("animation '{id}' declares {expected} keys but has {found} key times")]
    KeyCountMismatch {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("animation '{id}' needs {expected} key values but has {found}")]
    ValueCountMismatch {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("animation '{id}' key times are not ascending")]
    UnorderedKeyTimes { id: String },

    #[error("clip '{clip}' of animation '{id}' is outside the animation")]
    ClipOutOfRange { id: String, clip: String },

    #[error("an animation with id '{0}' already exists")]
    Duplicate(String),
}

/// Result type for animation operations.
pub type AnimationResult<T> = Result<T, AnimationError>;

/// The transform channels an animation drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimateProperty {
    Scale,
    ScaleUnit,
    ScaleX,
    ScaleY,
    ScaleZ,
    Rotate,
    Translate,
    TranslateX,
    TranslateY,
    TranslateZ,
    RotateTranslate,
    ScaleRotate,
    ScaleTranslate,
    ScaleRotateTranslate,
}

const ANIMATE_PROPERTIES: [(&str, AnimateProperty); 14] = [
    ("ANIMATE_SCALE", AnimateProperty::Scale),
    ("ANIMATE_SCALE_UNIT", AnimateProperty::ScaleUnit),
    ("ANIMATE_SCALE_X", AnimateProperty::ScaleX),
    ("ANIMATE_SCALE_Y", AnimateProperty::ScaleY),
    ("ANIMATE_SCALE_Z", AnimateProperty::ScaleZ),
    ("ANIMATE_ROTATE", AnimateProperty::Rotate),
    ("ANIMATE_TRANSLATE", AnimateProperty::Translate),
    ("ANIMATE_TRANSLATE_X", AnimateProperty::TranslateX),
    ("ANIMATE_TRANSLATE_Y", AnimateProperty::TranslateY),
    ("ANIMATE_TRANSLATE_Z", AnimateProperty::TranslateZ),
    ("ANIMATE_ROTATE_TRANSLATE", AnimateProperty::RotateTranslate),
    ("ANIMATE_SCALE_ROTATE", AnimateProperty::ScaleRotate),
    ("ANIMATE_SCALE_TRANSLATE", AnimateProperty::ScaleTranslate),
    ("ANIMATE_SCALE_ROTATE_TRANSLATE", AnimateProperty::ScaleRotateTranslate),
];

impl AnimateProperty {
    /// Number of floats per key (rotations are quaternions).
    pub fn component_count(self) -> usize {
        match self {
            AnimateProperty::ScaleUnit
            | AnimateProperty::ScaleX
            | AnimateProperty::ScaleY
            | AnimateProperty::ScaleZ
            | AnimateProperty::TranslateX
            | AnimateProperty::TranslateY
            | AnimateProperty::TranslateZ => 1,
            AnimateProperty::Scale | AnimateProperty::Translate => 3,
            AnimateProperty::Rotate => 4,
            AnimateProperty::ScaleTranslate => 6,
            AnimateProperty::RotateTranslate | AnimateProperty::ScaleRotate => 7,
            AnimateProperty::ScaleRotateTranslate => 10,
        }
    }
}

impl FromStr for AnimateProperty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ANIMATE_PROPERTIES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, p)| *p)
            .ok_or(())
    }
}

/// Interpolation between keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Curve {
    Bezier,
    Flat,
    #[default]
    Linear,
    Smooth,
    SmoothStep,
    Step,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
}

impl FromStr for Curve {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "BEZIER" => Curve::Bezier,
            "FLAT" => Curve::Flat,
            "LINEAR" => Curve::Linear,
            "SMOOTH" => Curve::Smooth,
            "SMOOTHSTEP" => Curve::SmoothStep,
            "STEP" => Curve::Step,
            "QUADRATIC_IN" => Curve::QuadraticIn,
            "QUADRATIC_OUT" => Curve::QuadraticOut,
            "QUADRATIC_IN_OUT" => Curve::QuadraticInOut,
            "CUBIC_IN" => Curve::CubicIn,
            "CUBIC_OUT" => Curve::CubicOut,
            "CUBIC_IN_OUT" => Curve::CubicInOut,
            _ => return Err(()),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RepeatCount {
    Count(f32),
    Indefinite,
}

/// A named time range of an animation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub id: String,
    /// Milliseconds
    pub begin: u64,
    /// Milliseconds
    pub end: u64,
    pub repeat_count: RepeatCount,
    pub speed: f32,
}

/// Keyframe data bound to a target node.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    pub id: String,
    /// Id of the animated node
    pub target: String,
    pub property: AnimateProperty,
    pub curve: Curve,
    /// Milliseconds, ascending
    pub key_times: Vec<u64>,
    /// `key_times.len() * property.component_count()` floats
    pub key_values: Vec<f32>,
    pub clips: Vec<AnimationClip>,
}

impl Animation {
    pub fn from_properties(
        id: impl Into<String>,
        target: impl Into<String>,
        props: &Properties,
    ) -> AnimationResult<Self> {
        let id = id.into();
        let missing = |name| AnimationError::MissingProperty {
            id: id.clone(),
            name,
        };
        let invalid = |name| AnimationError::InvalidValue {
            id: id.clone(),
            name,
        };

        let property: AnimateProperty = props
            .get_str("property")
            .ok_or_else(|| missing("property"))?
            .parse()
            .map_err(|_| invalid("property"))?;

        let key_count = props.get_str("keyCount").ok_or_else(|| missing("keyCount"))?;
        let key_count: usize = key_count.trim().parse().map_err(|_| invalid("keyCount"))?;

        props.get_str("keyTimes").ok_or_else(|| missing("keyTimes"))?;
        let key_times: Vec<u64> = props
            .get_list_f32("keyTimes")
            .ok_or_else(|| invalid("keyTimes"))?
            .into_iter()
            .map(|t| if t < 0.0 { None } else { Some(t as u64) })
            .collect::<Option<_>>()
            .ok_or_else(|| invalid("keyTimes"))?;
        if key_times.len() != key_count {
            return Err(AnimationError::KeyCountMismatch {
                id: id.clone(),
                expected: key_count,
                found: key_times.len(),
            });
        }
        if key_times.windows(2).any(|w| w[0] > w[1]) {
            return Err(AnimationError::UnorderedKeyTimes { id: id.clone() });
        }

        props.get_str("keyValues").ok_or_else(|| missing("keyValues"))?;
        let key_values = props
            .get_list_f32("keyValues")
            .ok_or_else(|| invalid("keyValues"))?;
        let expected = key_count * property.component_count();
        if key_values.len() != expected {
            return Err(AnimationError::ValueCountMismatch {
                id: id.clone(),
                expected,
                found: key_values.len(),
            });
        }

        let curve = match props.get_str("curve") {
            Some(name) => name.parse().map_err(|_| invalid("curve"))?,
            None => Curve::default(),
        };

        let duration = key_times.last().copied().unwrap_or(0);
        let mut clips = Vec::new();
        for ns in props.namespaces().filter(|ns| ns.namespace_name() == "clip") {
            clips.push(read_clip(&id, ns, duration)?);
        }

        Ok(Self {
            id,
            target: target.into(),
            property,
            curve,
            key_times,
            key_values,
            clips,
        })
    }

    /// Time of the last key, in milliseconds.
    pub fn duration(&self) -> u64 {
        self.key_times.last().copied().unwrap_or(0)
    }

    pub fn clip(&self, id: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|c| c.id == id)
    }
}

fn read_clip(animation_id: &str, props: &Properties, duration: u64) -> AnimationResult<AnimationClip> {
    let invalid = |name| AnimationError::InvalidValue {
        id: animation_id.to_string(),
        name,
    };
    let millis = |name: &'static str, default: u64| -> AnimationResult<u64> {
        match props.get_str(name) {
            None => Ok(default),
            Some(v) => v.trim().parse().map_err(|_| invalid(name)),
        }
    };

    let begin = millis("begin", 0)?;
    let end = millis("end", duration)?;
    if begin > end || end > duration {
        return Err(AnimationError::ClipOutOfRange {
            id: animation_id.to_string(),
            clip: props.id().to_string(),
        });
    }

    let repeat_count = match props.get_str("repeatCount") {
        None => RepeatCount::Count(1.0),
        Some("INDEFINITE") => RepeatCount::Indefinite,
        Some(_) => RepeatCount::Count(
            props
                .get_f32("repeatCount")
                .ok_or_else(|| invalid("repeatCount"))?,
        ),
    };

    Ok(AnimationClip {
        id: props.id().to_string(),
        begin,
        end,
        repeat_count,
        speed: props.get_f32("speed").unwrap_or(1.0),
    })
}

/// Owns every animation created during scene loads.
#[derive(Debug, Default)]
pub struct AnimationController {
    animations: Vec<Animation>,
}

impl AnimationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an animation from `props` and register it under `id`.
    pub fn create_animation(
        &mut self,
        id: &str,
        target: &str,
        props: &Properties,
    ) -> AnimationResult<&Animation> {
        if self.find(id).is_some() {
            return Err(AnimationError::Duplicate(id.to_string()));
        }
        let animation = Animation::from_properties(id, target, props)?;
        self.animations.push(animation);
        Ok(&self.animations[self.animations.len() - 1])
    }

    pub fn find(&self, id: &str) -> Option<&Animation> {
        self.animations.iter().find(|a| a.id == id)
    }

    /// Animations driving the node `target`.
    pub fn for_target<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Animation> + 'a {
        self.animations.iter().filter(move |a| a.target == target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animation> {
        self.animations.iter()
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spin() -> Properties {
        Properties::new("animation", "spin")
            .with("property", "ANIMATE_TRANSLATE_Y")
            .with("keyCount", "3")
            .with("keyTimes", "0, 500, 1000")
            .with("keyValues", "0 2 0")
    }

    #[test]
    fn test_from_properties() {
        let props = spin()
            .with("curve", "SMOOTH")
            .with_namespace(
                Properties::new("clip", "first_half")
                    .with("end", "500")
                    .with("repeatCount", "INDEFINITE"),
            );
        let animation = Animation::from_properties("spin", "box", &props).unwrap();
        assert_eq!(animation.property, AnimateProperty::TranslateY);
        assert_eq!(animation.curve, Curve::Smooth);
        assert_eq!(animation.key_times, vec![0, 500, 1000]);
        assert_eq!(animation.duration(), 1000);

        let clip = animation.clip("first_half").unwrap();
        assert_eq!((clip.begin, clip.end), (0, 500));
        assert_eq!(clip.repeat_count, RepeatCount::Indefinite);
    }

    #[test]
    fn test_rotation_values_are_quaternions() {
        let props = Properties::new("animation", "turn")
            .with("property", "ANIMATE_ROTATE")
            .with("keyCount", "2")
            .with("keyTimes", "0 1000")
            .with("keyValues", "0 0 0 1 0 1 0 0");
        assert!(Animation::from_properties("turn", "box", &props).is_ok());

        let short = props.with("keyValues", "0 0 0 1 0 1 0");
        assert_eq!(
            Animation::from_properties("turn", "box", &short),
            Err(AnimationError::ValueCountMismatch {
                id: "turn".to_string(),
                expected: 8,
                found: 7
            })
        );
    }

    #[test]
    fn test_invalid_animations() {
        let no_property = Properties::new("animation", "a").with("keyCount", "1");
        assert!(matches!(
            Animation::from_properties("a", "n", &no_property),
            Err(AnimationError::MissingProperty { name: "property", .. })
        ));

        let wrong_count = spin().with("keyCount", "2");
        assert!(matches!(
            Animation::from_properties("a", "n", &wrong_count),
            Err(AnimationError::KeyCountMismatch { expected: 2, found: 3, .. })
        ));

        let unordered = spin().with("keyTimes", "0, 1000, 500");
        assert!(matches!(
            Animation::from_properties("a", "n", &unordered),
            Err(AnimationError::UnorderedKeyTimes { .. })
        ));

        let long_clip = spin().with_namespace(Properties::new("clip", "c").with("end", "2000"));
        assert!(matches!(
            Animation::from_properties("a", "n", &long_clip),
            Err(AnimationError::ClipOutOfRange { .. })
        ));
    }

    #[test]
    fn test_controller() {
        let mut controller = AnimationController::new();
        controller.create_animation("spin", "box", &spin()).unwrap();
        assert_eq!(
            controller.create_animation("spin", "other", &spin()).unwrap_err(),
            AnimationError::Duplicate("spin".to_string())
        );
        assert_eq!(controller.len(), 1);
        assert_eq!(controller.for_target("box").count(), 1);
        assert_eq!(controller.find("spin").unwrap().target, "box");
    }
}
