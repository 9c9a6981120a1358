// Load a scene description and print what came out of it.
// Run with: cargo run --bin tern_inspect -- <scene file> [--config loader.json]

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tern_core::animation::AnimationController;
use tern_core::bundle::JsonBundles;
use tern_core::physics::PhysicsRegistry;
use tern_core::properties::FileSystem;
use tern_core::{LoaderConfig, Node, Scene, SceneLoader};
use tern_math::Vec3;

struct Args {
    scene: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut scene = None;
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a file")?;
                config = Some(PathBuf::from(path));
            }
            _ if scene.is_none() => scene = Some(PathBuf::from(arg)),
            _ => bail!("Unexpected argument '{}'", arg),
        }
    }
    let Some(scene) = scene else {
        bail!("Usage: tern_inspect <scene file> [--config loader.json]");
    };
    Ok(Args { scene, config })
}

fn load_config(path: Option<&PathBuf>) -> Result<LoaderConfig> {
    let Some(path) = path else {
        return Ok(LoaderConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    LoaderConfig::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn print_node(scene: &Scene, node: &Node, depth: usize) {
    let position = scene
        .world_transform(&node.id)
        .map_or(Vec3::ZERO, |m| m.w_axis.truncate());
    let mut tags = Vec::new();
    if let Some(model) = &node.model {
        tags.push(format!("mesh={}", model.mesh.id));
        if let Some(material) = &model.material {
            tags.push(format!("material={}", material.id));
        }
    }
    if node.camera.is_some() {
        tags.push("camera".to_string());
    }
    if node.light.is_some() {
        tags.push("light".to_string());
    }
    if node.audio_source.is_some() {
        tags.push("audio".to_string());
    }
    if node.particle_emitter.is_some() {
        tags.push("particles".to_string());
    }
    if let Some(body) = node.rigid_body {
        tags.push(format!("rigidbody#{}", body.0));
    }

    println!(
        "{:indent$}{} @ ({:.2}, {:.2}, {:.2}) {}",
        "",
        node.id,
        position.x,
        position.y,
        position.z,
        tags.join(" "),
        indent = depth * 2
    );
    for child in &node.children {
        print_node(scene, child, depth + 1);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = parse_args()?;
    let config = load_config(args.config.as_ref())?;

    let mut physics = PhysicsRegistry::new();
    let mut animations = AnimationController::new();
    let mut loader =
        SceneLoader::new(&FileSystem, &JsonBundles, &mut physics, &mut animations).with_config(config);
    let scene = loader
        .load(&args.scene)
        .with_context(|| format!("Failed to load {}", args.scene.display()))?;
    let report = loader.last_report().clone();

    println!("Scene '{}' ({} nodes)", scene.id, scene.node_count());
    for node in scene.roots() {
        print_node(&scene, node, 1);
    }
    if let Some(camera) = scene.active_camera() {
        println!("Active camera: {}", camera);
    }

    println!();
    println!("Nodes stitched:     {}", report.nodes_stitched);
    println!("Properties applied: {}", report.properties_applied);
    println!("Rigid bodies:       {}", physics.rigid_bodies().len());
    println!("Constraints:        {}", physics.constraints().len());
    println!("Animations:         {}", animations.len());
    if let Some(gravity) = physics.gravity() {
        println!("Gravity:            {:?}", gravity);
    }
    println!("Warnings:           {}", report.warnings);

    Ok(())
}
