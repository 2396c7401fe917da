//! CPU-side resource definitions, independent of the context:
//! - Geometry: draw modes and bounding boxes
//! - Material: Phong coefficients and texture maps
//! - Shader: reflected program interface
//! - Uniforms: typed uniform values and the shared name table

pub mod geometry;
pub mod material;
pub mod shader;
pub mod uniforms;

pub use geometry::{BoundingBox, DrawMode};
pub use material::{Material, MaterialFeatures, SHADOW_MAP_UNIT, TextureSlot};
pub use shader::{ActiveShader, Shader, ShaderInterface};
pub use uniforms::{UniformType, UniformValue};
