//! Vertex Layout Generator
//!
//! Describes how a drawable's vertex buffer is laid out and binds that
//! description against a shader's declared attribute locations.
//!
//! Two arrangements exist:
//!
//! - **Planar** (unshaded drawables): every position first, then every normal,
//!   each block tightly packed.
//! - **Interleaved** (shaded drawables): one record per vertex. The record is
//!   position + normal (6 floats), extended with tangent + texture coordinate
//!   (11 floats) when the material samples any texture.
//!
//! The authored vertex data must match the arrangement; nothing here can
//! detect a buffer whose contents were written for another stride.

use smallvec::SmallVec;
use wgpu::VertexFormat;

use crate::errors::Result;
use crate::renderer::core::context::{BufferId, BufferTarget, RenderContext, VertexLayoutId};
use crate::resources::shader::Shader;
use crate::resources::uniforms::names;

/// Size of one `f32` component in bytes.
pub const FLOAT_SIZE: u64 = std::mem::size_of::<f32>() as u64;

/// Floats per vertex of an untextured shaded record (position + normal).
pub const BASE_STRIDE_FLOATS: usize = 6;

/// Floats per vertex of a textured shaded record (+ tangent + uv).
pub const TEXTURED_STRIDE_FLOATS: usize = 11;

/// Floats per vertex of the planar arrangement (position block + normal block).
pub const PLANAR_FLOATS_PER_VERTEX: usize = 6;

/// How attributes are arranged in the vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexArrangement {
    Planar,
    Interleaved { textured: bool },
}

impl VertexArrangement {
    /// Number of floats that make up one vertex.
    #[must_use]
    pub fn floats_per_vertex(self) -> usize {
        match self {
            Self::Planar => PLANAR_FLOATS_PER_VERTEX,
            Self::Interleaved { textured: false } => BASE_STRIDE_FLOATS,
            Self::Interleaved { textured: true } => TEXTURED_STRIDE_FLOATS,
        }
    }
}

/// One attribute of a layout before shader locations are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeSpec {
    pub name: &'static str,
    pub format: VertexFormat,
    pub offset: u64,
    /// Byte distance between consecutive elements of this attribute.
    pub stride: u64,
}

/// The attributes a vertex buffer provides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayoutSpec {
    pub arrangement: VertexArrangement,
    pub attributes: SmallVec<[VertexAttributeSpec; 4]>,
}

impl VertexLayoutSpec {
    /// Positions for `vertex_count` vertices followed by as many normals.
    #[must_use]
    pub fn planar(vertex_count: usize) -> Self {
        let vec3 = VertexFormat::Float32x3.size();
        let normal_offset = vertex_count as u64 * vec3;

        let mut attributes = SmallVec::new();
        attributes.push(VertexAttributeSpec {
            name: names::POSITION,
            format: VertexFormat::Float32x3,
            offset: 0,
            stride: vec3,
        });
        attributes.push(VertexAttributeSpec {
            name: names::NORMAL,
            format: VertexFormat::Float32x3,
            offset: normal_offset,
            stride: vec3,
        });

        Self {
            arrangement: VertexArrangement::Planar,
            attributes,
        }
    }

    /// Interleaved position/normal records, with tangent/uv when `textured`.
    ///
    /// Offsets are 0/12/24/36 bytes for position/normal/tangent/uv.
    #[must_use]
    pub fn interleaved(textured: bool) -> Self {
        let arrangement = VertexArrangement::Interleaved { textured };
        let stride = arrangement.floats_per_vertex() as u64 * FLOAT_SIZE;

        let mut fields: SmallVec<[(&'static str, VertexFormat); 4]> = SmallVec::new();
        fields.push((names::POSITION, VertexFormat::Float32x3));
        fields.push((names::NORMAL, VertexFormat::Float32x3));
        if textured {
            fields.push((names::TANGENT, VertexFormat::Float32x3));
            fields.push((names::TEXTURE_COORD, VertexFormat::Float32x2));
        }

        let mut offset = 0;
        let attributes = fields
            .into_iter()
            .map(|(name, format)| {
                let spec = VertexAttributeSpec {
                    name,
                    format,
                    offset,
                    stride,
                };
                offset += format.size();
                spec
            })
            .collect();

        Self {
            arrangement,
            attributes,
        }
    }

    /// Byte stride of one interleaved record; `None` for planar data.
    #[must_use]
    pub fn record_stride(&self) -> Option<u64> {
        match self.arrangement {
            VertexArrangement::Planar => None,
            VertexArrangement::Interleaved { .. } => {
                Some(self.arrangement.floats_per_vertex() as u64 * FLOAT_SIZE)
            }
        }
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&VertexAttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// An attribute that was enabled on a layout object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundAttribute {
    pub name: &'static str,
    pub attribute: wgpu::VertexAttribute,
    pub stride: u64,
}

/// A layout object built against one shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    id: VertexLayoutId,
    spec: VertexLayoutSpec,
    bound: SmallVec<[BoundAttribute; 4]>,
}

impl VertexLayout {
    #[inline]
    #[must_use]
    pub fn id(&self) -> VertexLayoutId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn spec(&self) -> &VertexLayoutSpec {
        &self.spec
    }

    /// Attributes the shader declared, in spec order.
    #[inline]
    #[must_use]
    pub fn bound_attributes(&self) -> &[BoundAttribute] {
        &self.bound
    }

    #[must_use]
    pub fn bound_attribute(&self, name: &str) -> Option<&BoundAttribute> {
        self.bound.iter().find(|a| a.name == name)
    }

    /// Releases the layout object.
    pub fn release(self, ctx: &mut dyn RenderContext) {
        ctx.delete_vertex_layout(self.id);
    }
}

/// Creates a layout object sourcing `vertex_buffer` and enables every
/// attribute of `spec` that `shader` declares.
///
/// Attributes the shader does not declare are skipped without error. The
/// layout and array buffer are unbound again before returning.
pub fn build_vertex_layout(
    ctx: &mut dyn RenderContext,
    spec: VertexLayoutSpec,
    vertex_buffer: BufferId,
    shader: &Shader,
    label: &str,
) -> Result<VertexLayout> {
    let id = ctx.create_vertex_layout(label)?;
    ctx.bind_vertex_layout(Some(id));
    ctx.bind_buffer(BufferTarget::Array, Some(vertex_buffer));

    let mut bound = SmallVec::new();
    for attr in &spec.attributes {
        let Some(location) = shader.attribute_location(attr.name) else {
            log::trace!(
                "{label}: shader '{}' does not declare '{}', skipping",
                shader.label(),
                attr.name
            );
            continue;
        };

        let attribute = wgpu::VertexAttribute {
            format: attr.format,
            offset: attr.offset,
            shader_location: location,
        };
        ctx.set_vertex_attribute(&attribute, attr.stride);
        bound.push(BoundAttribute {
            name: attr.name,
            attribute,
            stride: attr.stride,
        });
    }

    ctx.bind_vertex_layout(None);
    ctx.bind_buffer(BufferTarget::Array, None);

    log::debug!(
        "{label}: built {:?} layout with {}/{} attributes for shader '{}'",
        spec.arrangement,
        bound.len(),
        spec.attributes.len(),
        shader.label()
    );

    Ok(VertexLayout { id, spec, bound })
}
