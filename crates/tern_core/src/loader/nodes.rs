//! Node stitching and the two node property passes.

use std::collections::HashMap;

use super::capture::MeshCapture;
use super::context::{BundleCache, LoadContext, NodePropertyKind, SceneNodeProperty, RIGID_BODY_MODEL};
use super::LoadReport;
use crate::bundle::{MeshCaptureSink, NoCapture};
use crate::physics::{PhysicsWorld, RigidBodyDesc, RigidBodyRequest};
use crate::properties::Properties;
use crate::scene::{ComponentFactory, Node, Scene};

/// A node found under its raw id that has not been given its final id yet.
enum Staged {
    /// Loaded from another bundle and not in the scene
    Loaded(Node),
    /// Already in the scene under this raw id
    InScene(String),
}

impl Staged {
    /// Give the node its final id and make it part of the scene.
    fn commit(self, scene: &mut Scene, final_id: &str) -> bool {
        match self {
            Staged::Loaded(mut node) => {
                node.id = final_id.to_string();
                scene.add_node(node);
                true
            }
            Staged::InScene(raw_id) => match scene.find_node_mut(&raw_id) {
                Some(node) => {
                    node.id = final_id.to_string();
                    true
                }
                None => false,
            },
        }
    }
}

/// First id under `node` (not `node` itself) that the scene already has.
fn clashing_descendant<'n>(node: &'n Node, scene: &Scene) -> Option<&'n str> {
    node.children.iter().find_map(|child| {
        if scene.contains_node(&child.id) {
            Some(child.id.as_str())
        } else {
            clashing_descendant(child, scene)
        }
    })
}

/// Rename or insert every node named by a URL entry, in declaration order.
pub(crate) fn resolve_urls(
    urls: &[SceneNodeProperty],
    scene: &mut Scene,
    bundles: &mut BundleCache<'_>,
    capture: &mut MeshCapture,
    report: &mut LoadReport,
) {
    for prop in urls {
        if scene.contains_node(&prop.node_id) {
            skip!(
                report,
                "Node '{}' already exists; ignoring url '{}#{}'",
                prop.node_id,
                prop.file,
                prop.id
            );
            continue;
        }

        let staged = if prop.file.is_empty() {
            if !scene.contains_node(&prop.id) {
                skip!(
                    report,
                    "No node '{}' in the scene to rename to '{}'",
                    prop.id,
                    prop.node_id
                );
                continue;
            }
            Staged::InScene(prop.id.clone())
        } else {
            let bundle = match bundles.get(&prop.file) {
                Ok(bundle) => bundle,
                Err(e) => {
                    skip!(report, "Cannot load node '{}': {}", prop.node_id, e);
                    continue;
                }
            };
            let node = if capture.wants(&prop.id) {
                capture.set_aliases(HashMap::from([(prop.id.clone(), prop.node_id.clone())]));
                let node = bundle.load_node(&prop.id, capture);
                capture.set_aliases(HashMap::new());
                node
            } else {
                bundle.load_node(&prop.id, &mut NoCapture)
            };
            match node {
                Some(node) => {
                    if let Some(child) = clashing_descendant(&node, scene) {
                        skip!(
                            report,
                            "Node '{}' from '{}#{}' has a child '{}' that already exists; ignoring it",
                            prop.node_id,
                            prop.file,
                            prop.id,
                            child
                        );
                        continue;
                    }
                    Staged::Loaded(node)
                }
                None => {
                    skip!(
                        report,
                        "No node '{}' in '{}' for node '{}'",
                        prop.id,
                        prop.file,
                        prop.node_id
                    );
                    continue;
                }
            }
        };

        if staged.commit(scene, &prop.node_id) {
            log::debug!("Stitched node '{}' from '{}#{}'", prop.node_id, prop.file, prop.id);
            report.nodes_stitched += 1;
        }
    }
}

/// First pass: components and transforms. Rigid bodies wait for the second pass.
pub(crate) fn apply_node_properties(
    ctx: &LoadContext,
    scene_root: &Properties,
    scene_ns: &Properties,
    scene: &mut Scene,
    components: &dyn ComponentFactory,
    report: &mut LoadReport,
) {
    for prop in &ctx.node_properties {
        if prop.kind == NodePropertyKind::RigidBody {
            continue;
        }
        let Some(node) = scene.find_node_mut(&prop.node_id) else {
            skip!(
                report,
                "No node '{}' for {} property",
                prop.node_id,
                prop.kind.name()
            );
            continue;
        };

        let applied = match prop.kind {
            NodePropertyKind::Audio | NodePropertyKind::Material | NodePropertyKind::Particle => {
                match ctx.source(scene_root, &prop.file, &prop.id) {
                    Ok(source) => attach_component(prop.kind, node, source, components, report),
                    Err(e) => {
                        skip!(
                            report,
                            "Cannot apply {} to node '{}': {}",
                            prop.kind.name(),
                            prop.node_id,
                            e
                        );
                        false
                    }
                }
            }
            NodePropertyKind::Translate | NodePropertyKind::Rotate | NodePropertyKind::Scale => {
                apply_transform(prop.kind, node, scene_ns, report)
            }
            NodePropertyKind::Url | NodePropertyKind::RigidBody => false,
        };
        if applied {
            report.properties_applied += 1;
        }
    }
}

fn attach_component(
    kind: NodePropertyKind,
    node: &mut Node,
    source: &Properties,
    components: &dyn ComponentFactory,
    report: &mut LoadReport,
) -> bool {
    let result = match kind {
        NodePropertyKind::Audio => components
            .create_audio_source(source)
            .map(|audio| node.audio_source = Some(audio)),
        NodePropertyKind::Particle => components
            .create_particle_emitter(source)
            .map(|emitter| node.particle_emitter = Some(emitter)),
        NodePropertyKind::Material => {
            let Some(model) = node.model.as_mut() else {
                skip!(
                    report,
                    "Node '{}' has no model for material '{}'",
                    node.id,
                    source.id()
                );
                return false;
            };
            components
                .create_material(source)
                .map(|material| model.set_material(material))
        }
        _ => return false,
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            skip!(
                report,
                "Failed to create {} for node '{}': {}",
                kind.name(),
                node.id,
                e
            );
            false
        }
    }
}

/// Transform values are read from the node's own namespace in the scene file.
fn apply_transform(
    kind: NodePropertyKind,
    node: &mut Node,
    scene_ns: &Properties,
    report: &mut LoadReport,
) -> bool {
    let name = kind.name();
    let values = scene_ns.child("node", &node.id);
    let applied = match kind {
        NodePropertyKind::Translate => values
            .and_then(|v| v.get_vec3(name))
            .map(|t| node.transform.translate(t)),
        NodePropertyKind::Rotate => values
            .and_then(|v| v.get_quat_from_axis_angle(name))
            .map(|r| node.transform.rotate(r)),
        NodePropertyKind::Scale => values
            .and_then(|v| v.get_vec3(name))
            .map(|s| node.transform.scale_by(s)),
        _ => None,
    };
    if applied.is_none() {
        skip!(report, "Invalid {} value on node '{}'", name, node.id);
    }
    applied.is_some()
}

/// Second pass: rigid bodies, after every transform has been applied.
///
/// A `rigidbodymodel` entry on the node names another node whose model the
/// shape is fitted to; the node's own model is left untouched.
pub(crate) fn apply_rigid_bodies(
    ctx: &LoadContext,
    scene_root: &Properties,
    scene_ns: &Properties,
    scene: &mut Scene,
    physics: &mut dyn PhysicsWorld,
    capture: &MeshCapture,
    report: &mut LoadReport,
) {
    for prop in &ctx.node_properties {
        if prop.kind != NodePropertyKind::RigidBody {
            continue;
        }
        let Some(world_transform) = scene.world_transform(&prop.node_id) else {
            skip!(report, "No node '{}' for rigidbody property", prop.node_id);
            continue;
        };
        let source = match ctx.source(scene_root, &prop.file, &prop.id) {
            Ok(source) => source,
            Err(e) => {
                skip!(report, "Cannot create rigid body for node '{}': {}", prop.node_id, e);
                continue;
            }
        };
        let desc = match RigidBodyDesc::from_properties(source) {
            Ok(desc) => desc,
            Err(e) => {
                skip!(report, "Invalid rigid body for node '{}': {}", prop.node_id, e);
                continue;
            }
        };

        let model_id = scene_ns
            .child("node", &prop.node_id)
            .and_then(|n| n.get_str(RIGID_BODY_MODEL))
            .unwrap_or(&prop.node_id);
        let model = match scene.find_node(model_id) {
            Some(node) => node.model.as_ref(),
            None => {
                skip!(
                    report,
                    "Rigid body model node '{}' for node '{}' does not exist",
                    model_id,
                    prop.node_id
                );
                continue;
            }
        };
        let Some(model) = model else {
            skip!(
                report,
                "Node '{}' has no model to fit rigid body '{}' to",
                model_id,
                desc.id
            );
            continue;
        };

        let handle = physics.create_rigid_body(RigidBodyRequest {
            node_id: &prop.node_id,
            world_transform,
            model,
            desc: &desc,
            mesh_data: capture.get(model_id),
        });
        match handle {
            Some(handle) => {
                if let Some(node) = scene.find_node_mut(&prop.node_id) {
                    node.rigid_body = Some(handle);
                }
                report.rigid_bodies += 1;
            }
            None => skip!(
                report,
                "Failed to create rigid body '{}' for node '{}'",
                desc.id,
                prop.node_id
            ),
        }
    }
}
