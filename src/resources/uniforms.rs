//! Uniform Types
//!
//! Typed uniform values and the descriptors a shader declares for them.
//! A [`Shader`](crate::resources::shader::Shader) owns a table of
//! [`UniformDescriptor`]s built once from its reflected interface; draws set
//! uniforms through resolved locations instead of looking names up per call.

use glam::{Mat4, Vec3};

/// Location of a uniform within its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub u32);

/// Declared GLSL-side type of a uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Vec3,
    Mat4,
    Int,
    /// A 2D sampler; set with an integer texture unit.
    Sampler2D,
}

impl UniformType {
    /// Whether a value of type `value` can be written to a uniform declared as `self`.
    #[inline]
    #[must_use]
    pub fn accepts(self, value: UniformType) -> bool {
        self == value || (self == Self::Sampler2D && value == Self::Int)
    }
}

/// A value ready to be written to a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec3(Vec3),
    Mat4(Mat4),
    Int(i32),
}

impl UniformValue {
    #[must_use]
    pub fn ty(&self) -> UniformType {
        match self {
            Self::Float(_) => UniformType::Float,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Mat4(_) => UniformType::Mat4,
            Self::Int(_) => UniformType::Int,
        }
    }

    /// Integer value selecting texture `unit` for a sampler uniform.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn sampler(unit: u32) -> Self {
        Self::Int(unit as i32)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

/// A uniform as reflected from a linked program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformDescriptor {
    pub name: String,
    pub location: UniformLocation,
    pub ty: UniformType,
}

/// A uniform whose presence and type were checked against a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedUniform {
    pub location: UniformLocation,
    pub ty: UniformType,
}

/// Attribute and uniform names shared between this crate and its shaders.
///
/// Struct-like uniform groups use dotted field names, as reflected by the
/// shader compiler.
pub mod names {
    // Vertex attributes
    pub const POSITION: &str = "a_position";
    pub const NORMAL: &str = "a_normal";
    pub const TANGENT: &str = "a_tangent";
    pub const TEXTURE_COORD: &str = "a_texture_coord";

    // Per-object
    pub const MODEL: &str = "u_m";

    // Material group
    pub const MATERIAL_AMBIENT: &str = "u_material.kA";
    pub const MATERIAL_DIFFUSE: &str = "u_material.kD";
    pub const MATERIAL_SPECULAR: &str = "u_material.kS";
    pub const MATERIAL_SHININESS: &str = "u_material.shininess";
    pub const MATERIAL_MAP_DIFFUSE: &str = "u_material.map_kD";
    pub const MATERIAL_MAP_SPECULAR: &str = "u_material.map_nS";
    pub const MATERIAL_MAP_NORMAL: &str = "u_material.map_norm";

    // Shadow mapping
    pub const SHADOW_MAP: &str = "u_shadow_map";
    pub const LIGHT_SPACE_MATRIX: &str = "u_light_space_matrix";
    pub const LIGHT_DIRECTION: &str = "u_light_direction";
}
