//! Animation pass.

use super::context::LoadContext;
use super::LoadReport;
use crate::animation::AnimationController;
use crate::properties::Properties;
use crate::scene::Scene;

pub(crate) fn materialize_animations(
    ctx: &LoadContext,
    scene_root: &Properties,
    scene: &Scene,
    controller: &mut AnimationController,
    report: &mut LoadReport,
) {
    for animation in &ctx.animations {
        if !scene.contains_node(&animation.target_id) {
            skip!(
                report,
                "Animation '{}' targets missing node '{}'",
                animation.animation_id,
                animation.target_id
            );
            continue;
        }
        let source = match ctx.source(scene_root, &animation.file, &animation.id) {
            Ok(source) => source,
            Err(e) => {
                skip!(report, "Cannot load animation '{}': {}", animation.animation_id, e);
                continue;
            }
        };
        match controller.create_animation(&animation.animation_id, &animation.target_id, source) {
            Ok(_) => report.animations += 1,
            Err(e) => skip!(report, "Failed to create animation: {}", e),
        }
    }
}
