//! Node components.
//!
//! Cameras and lights come out of bundles. Materials, audio sources and
//! particle emitters are described in properties files and built through a
//! [`ComponentFactory`] while the scene loader applies node properties.

use tern_math::{Mat4, Vec2, Vec3, Vec4};
use thiserror::Error;

use crate::properties::{Properties, PropertyType};

/// Errors raised while building a component from properties.
#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("{component} is missing required property '{name}'")]
    MissingProperty {
        component: &'static str,
        name: &'static str,
    },

    #[error("{component} has an invalid value for '{name}'")]
    InvalidProperty {
        component: &'static str,
        name: String,
    },
}

/// Result type for component construction.
pub type ComponentResult<T> = Result<T, ComponentError>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective { field_of_view: f32 },
    Orthographic { zoom: Vec2 },
}

/// Camera component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    pub aspect_ratio: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Camera {
    pub fn perspective(field_of_view: f32, aspect_ratio: f32, near_plane: f32, far_plane: f32) -> Self {
        Self {
            projection: Projection::Perspective { field_of_view },
            aspect_ratio,
            near_plane,
            far_plane,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Directional,
    Point { range: f32 },
    Spot { range: f32, inner_angle: f32, outer_angle: f32 },
}

/// Light component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
}

/// A uniform value bound to a material.
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Matrix(Mat4),
    /// Auto-binding name such as `WORLD_VIEW_PROJECTION_MATRIX`
    Binding(String),
}

/// A texture sampler declared on a material.
#[derive(Clone, Debug, PartialEq)]
pub struct Sampler {
    pub uniform: String,
    pub path: String,
    pub mipmap: bool,
}

/// Shader program plus uniform values.
///
/// Values declared on the material apply first, then those of its first
/// `technique`, then those of that technique's first `pass`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Material {
    pub id: String,
    pub vertex_shader: Option<String>,
    pub fragment_shader: Option<String>,
    pub defines: Vec<String>,
    pub parameters: Vec<(String, MaterialValue)>,
    pub samplers: Vec<Sampler>,
    pub render_state: Vec<(String, String)>,
}

impl Material {
    pub fn from_properties(props: &Properties) -> ComponentResult<Self> {
        let mut material = Material {
            id: props.id().to_string(),
            ..Default::default()
        };
        material.collect(props)?;

        if let Some(technique) = props.child_named("technique") {
            material.collect(technique)?;
            if let Some(pass) = technique.child_named("pass") {
                material.collect(pass)?;
            }
        }

        if material.vertex_shader.is_none() {
            return Err(ComponentError::MissingProperty {
                component: "material",
                name: "vertexShader",
            });
        }
        if material.fragment_shader.is_none() {
            return Err(ComponentError::MissingProperty {
                component: "material",
                name: "fragmentShader",
            });
        }
        Ok(material)
    }

    /// Look up a uniform value by name.
    pub fn parameter(&self, name: &str) -> Option<&MaterialValue> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    fn collect(&mut self, props: &Properties) -> ComponentResult<()> {
        for (name, value) in props.properties() {
            match name {
                "vertexShader" => self.vertex_shader = Some(value.to_string()),
                "fragmentShader" => self.fragment_shader = Some(value.to_string()),
                "defines" => self.defines.extend(
                    value
                        .split(';')
                        .map(str::trim)
                        .filter(|d| !d.is_empty())
                        .map(str::to_string),
                ),
                _ if name.starts_with("u_") => {
                    let parsed = parse_material_value(props, name).ok_or_else(|| {
                        ComponentError::InvalidProperty {
                            component: "material",
                            name: name.to_string(),
                        }
                    })?;
                    self.set_parameter(name, parsed);
                }
                _ => {}
            }
        }

        for ns in props.namespaces() {
            match ns.namespace_name() {
                "sampler" => {
                    let path = ns.get_str("path").ok_or(ComponentError::MissingProperty {
                        component: "sampler",
                        name: "path",
                    })?;
                    self.samplers.push(Sampler {
                        uniform: ns.id().to_string(),
                        path: path.to_string(),
                        mipmap: ns.get_bool("mipmap").unwrap_or(false),
                    });
                }
                "renderState" => {
                    for (name, value) in ns.properties() {
                        self.render_state.push((name.to_string(), value.to_string()));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn set_parameter(&mut self, name: &str, value: MaterialValue) {
        match self.parameters.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.parameters.push((name.to_string(), value)),
        }
    }
}

fn parse_material_value(props: &Properties, name: &str) -> Option<MaterialValue> {
    match props.property_type(name) {
        PropertyType::Number => props.get_f32(name).map(MaterialValue::Float),
        PropertyType::Vector2 => props.get_vec2(name).map(MaterialValue::Vec2),
        PropertyType::Vector3 => props.get_vec3(name).map(MaterialValue::Vec3),
        PropertyType::Vector4 => props.get_vec4(name).map(MaterialValue::Vec4),
        PropertyType::Matrix => props.get_matrix(name).map(MaterialValue::Matrix),
        PropertyType::String => props
            .get_str(name)
            .map(|s| MaterialValue::Binding(s.to_string())),
        PropertyType::None => None,
    }
}

/// Positional sound attached to a node.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSource {
    pub path: String,
    pub looped: bool,
    pub gain: f32,
    pub pitch: f32,
    pub velocity: Vec3,
}

impl AudioSource {
    pub fn from_properties(props: &Properties) -> ComponentResult<Self> {
        let path = props.get_str("path").ok_or(ComponentError::MissingProperty {
            component: "audio source",
            name: "path",
        })?;
        Ok(Self {
            path: path.to_string(),
            looped: props.get_bool("looped").unwrap_or(false),
            gain: props.get_f32("gain").unwrap_or(1.0),
            pitch: props.get_f32("pitch").unwrap_or(1.0),
            velocity: props.get_vec3("velocity").unwrap_or(Vec3::ZERO),
        })
    }
}

/// Particle emitter settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleEmitter {
    pub id: String,
    pub sprite_path: String,
    pub blending: String,
    pub particle_count_max: u32,
    pub emission_rate: u32,
    pub ellipsoid: bool,
    pub size_start: Vec2,
    pub size_end: Vec2,
    /// Particle lifetime range in milliseconds
    pub energy: Vec2,
    pub color_start: Vec4,
    pub color_end: Vec4,
    pub position: Vec3,
    pub position_variance: Vec3,
    pub velocity: Vec3,
    pub velocity_variance: Vec3,
    pub acceleration: Vec3,
}

impl ParticleEmitter {
    pub fn from_properties(props: &Properties) -> ComponentResult<Self> {
        let sprite = props.child_named("sprite").ok_or(ComponentError::MissingProperty {
            component: "particle emitter",
            name: "sprite",
        })?;
        let sprite_path = sprite.get_str("path").ok_or(ComponentError::MissingProperty {
            component: "particle emitter",
            name: "sprite.path",
        })?;

        let count = |name: &str, default: u32| -> ComponentResult<u32> {
            match props.get_str(name) {
                None => Ok(default),
                Some(v) => v.trim().parse().map_err(|_| ComponentError::InvalidProperty {
                    component: "particle emitter",
                    name: name.to_string(),
                }),
            }
        };
        let range = |min: &str, max: &str, default: f32| {
            Vec2::new(
                props.get_f32(min).unwrap_or(default),
                props.get_f32(max).unwrap_or(default),
            )
        };

        Ok(Self {
            id: props.id().to_string(),
            sprite_path: sprite_path.to_string(),
            blending: sprite.get_str("blending").unwrap_or("ALPHA").to_string(),
            particle_count_max: count("particleCountMax", 100)?,
            emission_rate: count("emissionRate", 10)?,
            ellipsoid: props.get_bool("ellipsoid").unwrap_or(false),
            size_start: range("sizeStartMin", "sizeStartMax", 1.0),
            size_end: range("sizeEndMin", "sizeEndMax", 1.0),
            energy: range("energyMin", "energyMax", 1000.0),
            color_start: props.get_vec4("colorStart").unwrap_or(Vec4::ONE),
            color_end: props.get_vec4("colorEnd").unwrap_or(Vec4::ONE),
            position: props.get_vec3("position").unwrap_or(Vec3::ZERO),
            position_variance: props.get_vec3("positionVar").unwrap_or(Vec3::ZERO),
            velocity: props.get_vec3("velocity").unwrap_or(Vec3::ZERO),
            velocity_variance: props.get_vec3("velocityVar").unwrap_or(Vec3::ZERO),
            acceleration: props.get_vec3("acceleration").unwrap_or(Vec3::ZERO),
        })
    }
}

/// Builds node components out of properties namespaces.
///
/// The default methods use the plain `from_properties` constructors; an
/// engine with GPU resources overrides them.
pub trait ComponentFactory {
    fn create_material(&self, props: &Properties) -> ComponentResult<Material> {
        Material::from_properties(props)
    }

    fn create_audio_source(&self, props: &Properties) -> ComponentResult<AudioSource> {
        AudioSource::from_properties(props)
    }

    fn create_particle_emitter(&self, props: &Properties) -> ComponentResult<ParticleEmitter> {
        ParticleEmitter::from_properties(props)
    }
}

/// The stock [`ComponentFactory`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultComponents;

impl ComponentFactory for DefaultComponents {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_layers() {
        let props = Properties::parse(
            r#"
material red
{
    u_worldViewProjectionMatrix = WORLD_VIEW_PROJECTION_MATRIX
    u_diffuseColor = 1, 1, 1, 1

    technique
    {
        pass
        {
            vertexShader = res/colored.vert
            fragmentShader = res/colored.frag
            defines = LIGHTING; SPECULAR
            u_diffuseColor = 1, 0, 0, 1

            sampler u_diffuseTexture
            {
                path = res/red.png
                mipmap = true
            }

            renderState
            {
                cullFace = true
            }
        }
    }
}
"#,
        )
        .unwrap();
        let material = Material::from_properties(props.first_namespace().unwrap()).unwrap();

        assert_eq!(material.id, "red");
        assert_eq!(material.vertex_shader.as_deref(), Some("res/colored.vert"));
        assert_eq!(material.defines, vec!["LIGHTING", "SPECULAR"]);
        assert_eq!(
            material.parameter("u_diffuseColor"),
            Some(&MaterialValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0)))
        );
        assert_eq!(
            material.parameter("u_worldViewProjectionMatrix"),
            Some(&MaterialValue::Binding("WORLD_VIEW_PROJECTION_MATRIX".to_string()))
        );
        assert_eq!(material.samplers.len(), 1);
        assert!(material.samplers[0].mipmap);
        assert_eq!(material.render_state, vec![("cullFace".to_string(), "true".to_string())]);
    }

    #[test]
    fn test_material_requires_shaders() {
        let props = Properties::new("material", "m").with("vertexShader", "a.vert");
        assert!(matches!(
            Material::from_properties(&props),
            Err(ComponentError::MissingProperty { name: "fragmentShader", .. })
        ));
    }

    #[test]
    fn test_audio_source() {
        let props = Properties::new("audio", "boom")
            .with("path", "res/boom.wav")
            .with("looped", "true")
            .with("gain", "0.5");
        let audio = AudioSource::from_properties(&props).unwrap();
        assert_eq!(audio.path, "res/boom.wav");
        assert!(audio.looped);
        assert_eq!(audio.gain, 0.5);
        assert_eq!(audio.pitch, 1.0);

        assert!(AudioSource::from_properties(&Properties::new("audio", "")).is_err());
    }

    #[test]
    fn test_particle_emitter() {
        let props = Properties::parse(
            "particle fire\n{\n  sprite { path = res/fire.png }\n  particleCountMax = 250\n  energyMin = 200\n  energyMax = 900\n}",
        )
        .unwrap();
        let emitter = ParticleEmitter::from_properties(props.first_namespace().unwrap()).unwrap();
        assert_eq!(emitter.sprite_path, "res/fire.png");
        assert_eq!(emitter.particle_count_max, 250);
        assert_eq!(emitter.emission_rate, 10);
        assert_eq!(emitter.energy, Vec2::new(200.0, 900.0));

        let bad = Properties::new("particle", "p")
            .with_namespace(Properties::new("sprite", "").with("path", "a.png"))
            .with("emissionRate", "fast");
        assert!(matches!(
            ParticleEmitter::from_properties(&bad),
            Err(ComponentError::InvalidProperty { .. })
        ));
    }
}
