//! Physics pass: gravity and constraints.
//!
//! Runs after every node, model and rigid body exists, so constraints can
//! name nodes that were stitched in from other bundles.

use tern_math::{Quat, Vec3};

use super::LoadReport;
use crate::physics::{
    ConstraintFrames, ConstraintHandle, ConstraintSetting, ConstraintType, PhysicsWorld,
    RigidBodyHandle, SpringAxis,
};
use crate::properties::Properties;
use crate::scene::Scene;

/// Which frame offsets a constraint kind reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Offsets {
    None,
    TranslationOnly,
    Full,
}

type SettingsReader = fn(&Properties, &str, &mut Vec<ConstraintSetting>, &mut LoadReport);

struct Builder {
    kind: ConstraintType,
    offsets: Offsets,
    settings: SettingsReader,
}

static BUILDERS: [Builder; 5] = [
    Builder {
        kind: ConstraintType::Fixed,
        offsets: Offsets::None,
        settings: no_settings,
    },
    Builder {
        kind: ConstraintType::Generic,
        offsets: Offsets::Full,
        settings: limit_settings,
    },
    Builder {
        kind: ConstraintType::Hinge,
        offsets: Offsets::Full,
        settings: hinge_settings,
    },
    Builder {
        kind: ConstraintType::Socket,
        offsets: Offsets::TranslationOnly,
        settings: no_settings,
    },
    Builder {
        kind: ConstraintType::Spring,
        offsets: Offsets::Full,
        settings: spring_settings,
    },
];

const LIMIT_KEYS: [(&str, fn(Vec3) -> ConstraintSetting); 4] = [
    ("angularLowerLimit", ConstraintSetting::AngularLowerLimit),
    ("angularUpperLimit", ConstraintSetting::AngularUpperLimit),
    ("linearLowerLimit", ConstraintSetting::LinearLowerLimit),
    ("linearUpperLimit", ConstraintSetting::LinearUpperLimit),
];

#[derive(Clone, Copy)]
enum SpringParam {
    Damping,
    Strength,
}

const SPRING_KEYS: [(&str, SpringAxis, SpringParam); 12] = [
    ("angularDampingX", SpringAxis::AngularX, SpringParam::Damping),
    ("angularDampingY", SpringAxis::AngularY, SpringParam::Damping),
    ("angularDampingZ", SpringAxis::AngularZ, SpringParam::Damping),
    ("angularStrengthX", SpringAxis::AngularX, SpringParam::Strength),
    ("angularStrengthY", SpringAxis::AngularY, SpringParam::Strength),
    ("angularStrengthZ", SpringAxis::AngularZ, SpringParam::Strength),
    ("linearDampingX", SpringAxis::LinearX, SpringParam::Damping),
    ("linearDampingY", SpringAxis::LinearY, SpringParam::Damping),
    ("linearDampingZ", SpringAxis::LinearZ, SpringParam::Damping),
    ("linearStrengthX", SpringAxis::LinearX, SpringParam::Strength),
    ("linearStrengthY", SpringAxis::LinearY, SpringParam::Strength),
    ("linearStrengthZ", SpringAxis::LinearZ, SpringParam::Strength),
];

/// Apply the scene's `physics` namespace (the first one, if several exist).
pub(crate) fn load_physics(
    scene_ns: &Properties,
    scene: &mut Scene,
    physics: &mut dyn PhysicsWorld,
    report: &mut LoadReport,
) {
    let Some(ns) = scene_ns.child_named("physics") else {
        return;
    };

    if let Some(gravity) = vec3(ns, "gravity", "physics", report) {
        physics.set_gravity(gravity);
    }

    for child in ns.namespaces() {
        if child.namespace_name() != "constraint" {
            skip!(
                report,
                "Unsupported namespace '{}' in physics",
                child.namespace_name()
            );
            continue;
        }
        if let Some(handle) = load_constraint(child, scene, physics, report) {
            scene.constraints.push(handle);
            report.constraints += 1;
        }
    }
}

fn load_constraint(
    ns: &Properties,
    scene: &Scene,
    physics: &mut dyn PhysicsWorld,
    report: &mut LoadReport,
) -> Option<ConstraintHandle> {
    let label = if ns.id().is_empty() { "<unnamed>" } else { ns.id() };

    let a = match rigid_body(scene, ns, "rigidBodyA", label, report) {
        Ok(Some(a)) => a,
        Ok(None) => {
            skip!(report, "Constraint '{}' has no rigidBodyA", label);
            return None;
        }
        Err(()) => return None,
    };
    let b = rigid_body(scene, ns, "rigidBodyB", label, report).ok()?;

    let type_name = ns.get_str("type").unwrap_or_default();
    let builder = type_name
        .parse::<ConstraintType>()
        .ok()
        .and_then(|kind| BUILDERS.iter().find(|b| b.kind == kind));
    let Some(builder) = builder else {
        skip!(
            report,
            "Constraint '{}' has unsupported type '{}'",
            label,
            type_name
        );
        return None;
    };
    if builder.kind.requires_body_b() && b.is_none() {
        skip!(
            report,
            "{} constraint '{}' requires rigidBodyB",
            builder.kind,
            label
        );
        return None;
    }

    let frames = read_frames(ns, builder.offsets, label, report);
    let Some(handle) = physics.create_constraint(builder.kind, a, b, &frames) else {
        skip!(report, "Failed to create {} constraint '{}'", builder.kind, label);
        return None;
    };

    let mut settings = Vec::new();
    (builder.settings)(ns, label, &mut settings, report);
    if let Some(impulse) = scalar(ns, "breakingImpulse", label, report) {
        settings.push(ConstraintSetting::BreakingImpulse(impulse));
    }
    for setting in settings {
        physics.configure_constraint(handle, setting);
    }
    Some(handle)
}

/// Rigid body of the node named by `key`.
///
/// `Ok(None)` when the key is absent, `Err` when it names a missing node or
/// a node without a rigid body.
fn rigid_body(
    scene: &Scene,
    ns: &Properties,
    key: &str,
    label: &str,
    report: &mut LoadReport,
) -> Result<Option<RigidBodyHandle>, ()> {
    let Some(node_id) = ns.get_str(key) else {
        return Ok(None);
    };
    let Some(node) = scene.find_node(node_id) else {
        skip!(
            report,
            "Constraint '{}': {} node '{}' does not exist",
            label,
            key,
            node_id
        );
        return Err(());
    };
    match node.rigid_body {
        Some(handle) => Ok(Some(handle)),
        None => {
            skip!(
                report,
                "Constraint '{}': node '{}' has no rigid body",
                label,
                node_id
            );
            Err(())
        }
    }
}

/// Any offset present switches to explicit frames; missing ones default.
fn read_frames(
    ns: &Properties,
    offsets: Offsets,
    label: &str,
    report: &mut LoadReport,
) -> ConstraintFrames {
    let keys: &[&str] = match offsets {
        Offsets::None => return ConstraintFrames::Auto,
        Offsets::TranslationOnly => &["translationOffsetA", "translationOffsetB"],
        Offsets::Full => &[
            "rotationOffsetA",
            "translationOffsetA",
            "rotationOffsetB",
            "translationOffsetB",
        ],
    };
    if !keys.iter().any(|key| ns.exists(key)) {
        return ConstraintFrames::Auto;
    }

    let mut rotation = |key: &str| {
        if offsets == Offsets::Full {
            axis_angle(ns, key, label, report).unwrap_or(Quat::IDENTITY)
        } else {
            Quat::IDENTITY
        }
    };
    let rotation_a = rotation("rotationOffsetA");
    let rotation_b = rotation("rotationOffsetB");

    ConstraintFrames::Explicit {
        rotation_a,
        translation_a: vec3(ns, "translationOffsetA", label, report).unwrap_or(Vec3::ZERO),
        rotation_b,
        translation_b: vec3(ns, "translationOffsetB", label, report).unwrap_or(Vec3::ZERO),
    }
}

fn no_settings(_: &Properties, _: &str, _: &mut Vec<ConstraintSetting>, _: &mut LoadReport) {}

fn limit_settings(
    ns: &Properties,
    label: &str,
    settings: &mut Vec<ConstraintSetting>,
    report: &mut LoadReport,
) {
    for (key, setting) in LIMIT_KEYS {
        if let Some(v) = vec3(ns, key, label, report) {
            settings.push(setting(v));
        }
    }
}

/// `limits` is `min, max, bounciness` in degrees, or `min, max` in radians.
fn hinge_settings(
    ns: &Properties,
    label: &str,
    settings: &mut Vec<ConstraintSetting>,
    report: &mut LoadReport,
) {
    if !ns.exists("limits") {
        return;
    }
    if let Some(v) = ns.get_vec3("limits") {
        settings.push(ConstraintSetting::HingeLimits {
            min_angle: v.x.to_radians(),
            max_angle: v.y.to_radians(),
            bounciness: Some(v.z),
        });
    } else if let Some(v) = ns.get_vec2("limits") {
        settings.push(ConstraintSetting::HingeLimits {
            min_angle: v.x,
            max_angle: v.y,
            bounciness: None,
        });
    } else {
        skip!(report, "Constraint '{}' has invalid limits", label);
    }
}

fn spring_settings(
    ns: &Properties,
    label: &str,
    settings: &mut Vec<ConstraintSetting>,
    report: &mut LoadReport,
) {
    limit_settings(ns, label, settings, report);
    for (key, axis, param) in SPRING_KEYS {
        if let Some(value) = scalar(ns, key, label, report) {
            settings.push(match param {
                SpringParam::Damping => ConstraintSetting::SpringDamping(axis, value),
                SpringParam::Strength => ConstraintSetting::SpringStrength(axis, value),
            });
        }
    }
}

fn vec3(ns: &Properties, key: &str, label: &str, report: &mut LoadReport) -> Option<Vec3> {
    let raw = ns.get_str(key)?;
    let value = ns.get_vec3(key);
    if value.is_none() {
        skip!(report, "Invalid {} '{}' in '{}'", key, raw, label);
    }
    value
}

fn axis_angle(ns: &Properties, key: &str, label: &str, report: &mut LoadReport) -> Option<Quat> {
    let raw = ns.get_str(key)?;
    let value = ns.get_quat_from_axis_angle(key);
    if value.is_none() {
        skip!(report, "Invalid {} '{}' in '{}'", key, raw, label);
    }
    value
}

fn scalar(ns: &Properties, key: &str, label: &str, report: &mut LoadReport) -> Option<f32> {
    let raw = ns.get_str(key)?;
    let value = ns.get_f32(key);
    if value.is_none() {
        skip!(report, "Invalid {} '{}' in '{}'", key, raw, label);
    }
    value
}
