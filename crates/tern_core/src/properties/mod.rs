//! Hierarchical properties files.
//!
//! Scene descriptions, materials, rigid bodies, audio sources, particle
//! emitters and animations are all written in the same nested
//! `namespace id { name = value }` text format. This module parses that
//! format into a [`Properties`] tree and exposes typed getters over it.
//!
//! # Example
//!
//! ```ignore
//! use tern_core::properties::Properties;
//!
//! let props = Properties::parse("scene { path = res/box.gpb }")?;
//! let scene = props.child_named("scene").unwrap();
//! assert_eq!(scene.get_str("path"), Some("res/box.gpb"));
//! ```

mod parser;

pub use parser::*;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tern_math::{quat_from_axis_angle_degrees, Mat4, Quat, Vec2, Vec3, Vec4};
use thiserror::Error;

/// Errors that can occur while reading properties files.
#[derive(Error, Debug)]
pub enum PropertiesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unclosed namespace starting at line {0}")]
    UnclosedBlock(usize),

    #[error("Properties file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for properties operations.
pub type PropertiesResult<T> = Result<T, PropertiesError>;

/// Value classification, decided by the number of commas in the raw text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyType {
    None,
    String,
    Number,
    Vector2,
    Vector3,
    Vector4,
    Matrix,
}

/// One namespace of a properties file.
///
/// The root object returned by [`Properties::parse`] has an empty namespace
/// name and id; the file's top-level namespaces are its children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties {
    namespace: String,
    id: String,
    parent_id: Option<String>,
    values: Vec<(String, String)>,
    children: Vec<Properties>,
    dir_path: Option<PathBuf>,
}

impl Properties {
    /// Create an empty namespace.
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    /// Parse properties text.
    pub fn parse(content: &str) -> PropertiesResult<Properties> {
        PropertiesParser::new(content).parse()
    }

    /// Read and parse a properties file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> PropertiesResult<Properties> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut props = Self::parse(&content)?;
        props.dir_path = path.parent().map(Path::to_path_buf);
        Ok(props)
    }

    /// Namespace tag name (`node`, `material`, ...).
    pub fn namespace_name(&self) -> &str {
        &self.namespace
    }

    /// Namespace identifier, empty when the namespace has none.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory of the file this tree was loaded from, if any.
    pub fn dir_path(&self) -> Option<&Path> {
        self.dir_path.as_deref()
    }

    pub(crate) fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Set (or overwrite in place) a property.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Builder-style [`Properties::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Append a child namespace.
    pub fn push_namespace(&mut self, child: Properties) {
        self.children.push(child);
    }

    /// Builder-style [`Properties::push_namespace`].
    pub fn with_namespace(mut self, child: Properties) -> Self {
        self.children.push(child);
        self
    }

    /// Direct child namespaces in declaration order.
    pub fn namespaces(&self) -> impl Iterator<Item = &Properties> {
        self.children.iter()
    }

    pub fn first_namespace(&self) -> Option<&Properties> {
        self.children.first()
    }

    /// Find a namespace by id anywhere below this one (depth first).
    pub fn namespace(&self, id: &str) -> Option<&Properties> {
        for child in &self.children {
            if child.id == id {
                return Some(child);
            }
            if let Some(found) = child.namespace(id) {
                return Some(found);
            }
        }
        None
    }

    /// First direct child with the given tag name and id.
    pub fn child(&self, namespace: &str, id: &str) -> Option<&Properties> {
        self.children
            .iter()
            .find(|c| c.namespace == namespace && c.id == id)
    }

    /// First direct child with the given tag name.
    pub fn child_named(&self, namespace: &str) -> Option<&Properties> {
        self.children.iter().find(|c| c.namespace == namespace)
    }

    /// Name/value pairs in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.values.iter().any(|(n, _)| n == name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get_str(name)?.trim().parse().ok()
    }

    /// `true` only for the literal `true`, like the engine's reader.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_str(name).map(|v| v == "true")
    }

    pub fn get_vec2(&self, name: &str) -> Option<Vec2> {
        let v = self.get_floats::<2>(name)?;
        Some(Vec2::from_array(v))
    }

    pub fn get_vec3(&self, name: &str) -> Option<Vec3> {
        let v = self.get_floats::<3>(name)?;
        Some(Vec3::from_array(v))
    }

    pub fn get_vec4(&self, name: &str) -> Option<Vec4> {
        let v = self.get_floats::<4>(name)?;
        Some(Vec4::from_array(v))
    }

    /// Read `x, y, z, angleDegrees` as a rotation.
    pub fn get_quat_from_axis_angle(&self, name: &str) -> Option<Quat> {
        let [x, y, z, angle] = self.get_floats::<4>(name)?;
        Some(quat_from_axis_angle_degrees(Vec3::new(x, y, z), angle))
    }

    /// Read 16 comma separated floats in column-major order.
    pub fn get_matrix(&self, name: &str) -> Option<Mat4> {
        let m = self.get_floats::<16>(name)?;
        Some(Mat4::from_cols_array(&m))
    }

    /// Read a list of floats separated by commas and/or whitespace.
    pub fn get_list_f32(&self, name: &str) -> Option<Vec<f32>> {
        self.get_str(name)?
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().ok())
            .collect()
    }

    pub fn property_type(&self, name: &str) -> PropertyType {
        let Some(value) = self.get_str(name) else {
            return PropertyType::None;
        };
        match value.matches(',').count() {
            0 if is_numeric(value) => PropertyType::Number,
            0 => PropertyType::String,
            1 => PropertyType::Vector2,
            2 => PropertyType::Vector3,
            3 => PropertyType::Vector4,
            15 => PropertyType::Matrix,
            _ => PropertyType::String,
        }
    }

    fn get_floats<const N: usize>(&self, name: &str) -> Option<[f32; N]> {
        let value = self.get_str(name)?;
        let mut out = [0.0; N];
        let mut count = 0;
        for part in value.split(',') {
            if count == N {
                return None;
            }
            out[count] = part.trim().parse().ok()?;
            count += 1;
        }
        (count == N).then_some(out)
    }

    /// Overwrite or add every property and namespace found in `overrides`.
    ///
    /// Child namespaces merge when both tag name and id match.
    pub(crate) fn merge_with(&mut self, overrides: Properties) {
        for (name, value) in overrides.values {
            self.set(name, value);
        }
        for child in overrides.children {
            match self
                .children
                .iter_mut()
                .find(|c| c.namespace == child.namespace && c.id == child.id)
            {
                Some(existing) => existing.merge_with(child),
                None => self.children.push(child),
            }
        }
    }
}

fn is_numeric(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut chars = digits.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_digit()) {
        return false;
    }
    let mut decimals = 0;
    for c in chars {
        if c == '.' {
            decimals += 1;
            if decimals > 1 {
                return false;
            }
        } else if !c.is_ascii_digit() {
            return false;
        }
    }
    true
}

/// Somewhere to read properties files from.
pub trait PropertiesSource {
    fn load_properties(&self, path: &Path) -> PropertiesResult<Properties>;
}

/// Reads properties files from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSystem;

impl PropertiesSource for FileSystem {
    fn load_properties(&self, path: &Path) -> PropertiesResult<Properties> {
        Properties::load(path)
    }
}

/// Properties files held in memory, keyed by path.
#[derive(Clone, Debug, Default)]
pub struct MemoryFiles {
    files: HashMap<PathBuf, String>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }
}

impl PropertiesSource for MemoryFiles {
    fn load_properties(&self, path: &Path) -> PropertiesResult<Properties> {
        let content = self
            .files
            .get(path)
            .ok_or_else(|| PropertiesError::NotFound(path.to_path_buf()))?;
        let mut props = Properties::parse(content)?;
        props.dir_path = path.parent().map(Path::to_path_buf);
        Ok(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Properties {
        Properties::new("node", "box")
            .with("translate", "1, 2, 3")
            .with("limits", "-45, 45")
            .with("rotate", "0, 1, 0, 90")
            .with("mass", "2.5")
            .with("name", "crate")
            .with("kinematic", "true")
    }

    #[test]
    fn test_typed_getters() {
        let p = sample();
        assert_eq!(p.get_vec3("translate"), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(p.get_vec2("limits"), Some(Vec2::new(-45.0, 45.0)));
        assert_eq!(p.get_f32("mass"), Some(2.5));
        assert_eq!(p.get_bool("kinematic"), Some(true));
        assert_eq!(p.get_str("missing"), None);

        let q = p.get_quat_from_axis_angle("rotate").unwrap();
        let v = q * Vec3::Z;
        assert!((v - Vec3::X).length() < 0.001);
    }

    #[test]
    fn test_vector_component_count_is_exact() {
        let p = sample();
        // A 2-vector is not a 3-vector and a 3-vector is not a 2-vector.
        assert_eq!(p.get_vec3("limits"), None);
        assert_eq!(p.get_vec2("translate"), None);
        assert_eq!(p.get_vec4("translate"), None);
    }

    #[test]
    fn test_property_type() {
        let p = sample();
        assert_eq!(p.property_type("mass"), PropertyType::Number);
        assert_eq!(p.property_type("name"), PropertyType::String);
        assert_eq!(p.property_type("limits"), PropertyType::Vector2);
        assert_eq!(p.property_type("translate"), PropertyType::Vector3);
        assert_eq!(p.property_type("rotate"), PropertyType::Vector4);
        assert_eq!(p.property_type("nope"), PropertyType::None);
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut p = Properties::new("a", "");
        p.set("x", "1");
        p.set("y", "2");
        p.set("x", "3");
        let pairs: Vec<_> = p.properties().collect();
        assert_eq!(pairs, vec![("x", "3"), ("y", "2")]);
    }

    #[test]
    fn test_list_and_matrix() {
        let p = Properties::new("animation", "")
            .with("keyTimes", "0 500, 1000")
            .with(
                "world",
                "1,0,0,0, 0,1,0,0, 0,0,1,0, 5,6,7,1",
            );
        assert_eq!(p.get_list_f32("keyTimes"), Some(vec![0.0, 500.0, 1000.0]));
        let m = p.get_matrix("world").unwrap();
        assert_eq!(m.transform_point3(Vec3::ZERO), Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn test_namespace_lookup() {
        let root = Properties::new("", "")
            .with_namespace(
                Properties::new("scene", "level")
                    .with_namespace(Properties::new("node", "box"))
                    .with_namespace(Properties::new("physics", "")),
            );
        assert_eq!(root.namespace("box").unwrap().namespace_name(), "node");
        let scene = root.child_named("scene").unwrap();
        assert!(scene.child("node", "box").is_some());
        assert!(scene.child("node", "level").is_none());
        assert!(scene.child_named("physics").is_some());
    }

    #[test]
    fn test_memory_files() {
        let files = MemoryFiles::new().with_file("res/a.material", "material a { x = 1 }");
        let p = files.load_properties(Path::new("res/a.material")).unwrap();
        assert_eq!(p.dir_path(), Some(Path::new("res")));
        assert!(matches!(
            files.load_properties(Path::new("res/b.material")),
            Err(PropertiesError::NotFound(_))
        ));
    }
}
