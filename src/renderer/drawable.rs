//! Drawables
//!
//! A [`Drawable`] owns the GPU copy of one mesh (a vertex buffer and a 32-bit
//! index buffer), its model matrix and a vertex layout built against exactly
//! one shader. Two kinds exist:
//!
//! - [`DrawableKind::Basic`]: planar positions and normals, shaded by the
//!   model matrix alone.
//! - [`DrawableKind::Shaded`]: interleaved records whose stride depends on
//!   the [`Material`]; pushes material coefficients and texture maps, and can
//!   sample the shadow map produced by the depth pre-pass.
//!
//! Every draw follows the same discipline: bind layout and element buffer,
//! activate the shader, push uniforms, issue one indexed draw of all indices,
//! then unbind in reverse order. The unbinding is carried by the
//! [`GeometryScope`] and [`ActiveShader`](crate::resources::shader::ActiveShader)
//! guards, so an early return cannot leak bindings.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::errors::{PenumbraError, Result};
use crate::renderer::core::context::{BufferId, BufferTarget, RenderContext};
use crate::renderer::core::scope::GeometryScope;
use crate::renderer::graph::shadow::ShadowParams;
use crate::renderer::pipeline::vertex::{
    VertexArrangement, VertexLayout, VertexLayoutSpec, build_vertex_layout,
};
use crate::resources::geometry::{BoundingBox, DrawMode};
use crate::resources::material::{Material, SHADOW_MAP_UNIT, TextureSlot};
use crate::resources::shader::Shader;
use crate::resources::uniforms::{ResolvedUniform, UniformType, UniformValue, names};

// ============================================================================
// Renderable
// ============================================================================

/// The draw contract shared by every drawable kind.
pub trait Renderable {
    fn label(&self) -> &str;

    /// Rebuilds the vertex layout against `shader` and renders with it from now on.
    fn build_layout(&mut self, ctx: &mut dyn RenderContext, shader: Arc<Shader>) -> Result<()>;

    /// Main-pass draw. `shadow` is ignored by kinds that cannot receive shadows.
    fn issue_draw(&self, ctx: &mut dyn RenderContext, shadow: Option<&ShadowParams>) -> Result<()>;

    /// Depth-only draw into the bound shadow target.
    fn render_shadow(
        &self,
        ctx: &mut dyn RenderContext,
        depth_shader: &Shader,
        light_space_matrix: Mat4,
    ) -> Result<()>;
}

// ============================================================================
// Descriptor
// ============================================================================

/// Shading variant of a drawable.
///
/// A shaded drawable shares its material; several drawables may hold the
/// same one.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawableKind {
    Basic,
    Shaded(Arc<Material>),
}

impl DrawableKind {
    #[must_use]
    pub fn arrangement(&self) -> VertexArrangement {
        match self {
            Self::Basic => VertexArrangement::Planar,
            Self::Shaded(material) => VertexArrangement::Interleaved {
                textured: material.has_texture(),
            },
        }
    }

    #[must_use]
    pub fn material(&self) -> Option<&Material> {
        match self {
            Self::Basic => None,
            Self::Shaded(material) => Some(material.as_ref()),
        }
    }

    /// The shared handle, for callers that keep the material alive elsewhere.
    #[must_use]
    pub fn shared_material(&self) -> Option<&Arc<Material>> {
        match self {
            Self::Basic => None,
            Self::Shaded(material) => Some(material),
        }
    }

    fn layout_spec(&self, vertex_count: usize) -> VertexLayoutSpec {
        match self.arrangement() {
            VertexArrangement::Planar => VertexLayoutSpec::planar(vertex_count),
            VertexArrangement::Interleaved { textured } => VertexLayoutSpec::interleaved(textured),
        }
    }
}

/// Everything needed to create a [`Drawable`].
#[derive(Debug, Clone)]
pub struct DrawableDescriptor {
    pub label: String,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub draw_mode: DrawMode,
    /// `Some` makes the drawable [`Shaded`](DrawableKind::Shaded).
    pub material: Option<Arc<Material>>,
}

impl DrawableDescriptor {
    #[must_use]
    pub fn new(label: impl Into<String>, vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            label: label.into(),
            vertices,
            indices,
            draw_mode: DrawMode::Triangles,
            material: None,
        }
    }

    #[must_use]
    pub fn with_draw_mode(mut self, draw_mode: DrawMode) -> Self {
        self.draw_mode = draw_mode;
        self
    }

    /// Accepts an owned material or an `Arc` shared with other drawables.
    #[must_use]
    pub fn with_material(mut self, material: impl Into<Arc<Material>>) -> Self {
        self.material = Some(material.into());
        self
    }
}

// ============================================================================
// Uniform slots
// ============================================================================

#[derive(Debug, Clone)]
struct MaterialSlots {
    ambient: ResolvedUniform,
    diffuse: ResolvedUniform,
    specular: ResolvedUniform,
    shininess: ResolvedUniform,
    samplers: SmallVec<[(TextureSlot, ResolvedUniform); 3]>,
}

#[derive(Debug, Clone, Copy)]
struct ShadowSlots {
    shadow_map: ResolvedUniform,
    light_space_matrix: ResolvedUniform,
    light_direction: ResolvedUniform,
}

/// Uniforms a drawable writes, resolved once per shader.
#[derive(Debug, Clone)]
struct UniformSlots {
    model: ResolvedUniform,
    material: Option<MaterialSlots>,
    shadow: Option<ShadowSlots>,
}

impl UniformSlots {
    fn resolve(shader: &Shader, kind: &DrawableKind) -> Result<Self> {
        let model = shader.resolve_uniform(names::MODEL, UniformType::Mat4)?;

        let DrawableKind::Shaded(material) = kind else {
            return Ok(Self {
                model,
                material: None,
                shadow: None,
            });
        };

        let samplers = material
            .textures()
            .map(|(slot, _)| {
                shader
                    .resolve_uniform(slot.sampler_name(), UniformType::Int)
                    .map(|uniform| (slot, uniform))
            })
            .collect::<Result<_>>()?;

        let material_slots = MaterialSlots {
            ambient: shader.resolve_uniform(names::MATERIAL_AMBIENT, UniformType::Vec3)?,
            diffuse: shader.resolve_uniform(names::MATERIAL_DIFFUSE, UniformType::Vec3)?,
            specular: shader.resolve_uniform(names::MATERIAL_SPECULAR, UniformType::Vec3)?,
            shininess: shader.resolve_uniform(names::MATERIAL_SHININESS, UniformType::Float)?,
            samplers,
        };

        Ok(Self {
            model,
            material: Some(material_slots),
            shadow: Self::resolve_shadow(shader)?,
        })
    }

    /// All three shadow uniforms, or none of them.
    fn resolve_shadow(shader: &Shader) -> Result<Option<ShadowSlots>> {
        let shadow_map = shader.resolve_optional_uniform(names::SHADOW_MAP, UniformType::Int)?;
        let light_space_matrix =
            shader.resolve_optional_uniform(names::LIGHT_SPACE_MATRIX, UniformType::Mat4)?;
        let light_direction =
            shader.resolve_optional_uniform(names::LIGHT_DIRECTION, UniformType::Vec3)?;

        match (shadow_map, light_space_matrix, light_direction) {
            (Some(shadow_map), Some(light_space_matrix), Some(light_direction)) => {
                Ok(Some(ShadowSlots {
                    shadow_map,
                    light_space_matrix,
                    light_direction,
                }))
            }
            (None, None, None) => Ok(None),
            (shadow_map, light_space_matrix, _) => {
                let missing = if shadow_map.is_none() {
                    names::SHADOW_MAP
                } else if light_space_matrix.is_none() {
                    names::LIGHT_SPACE_MATRIX
                } else {
                    names::LIGHT_DIRECTION
                };
                Err(PenumbraError::MissingUniform {
                    shader: shader.label().to_owned(),
                    name: missing.to_owned(),
                })
            }
        }
    }
}

#[derive(Debug)]
struct ShaderBinding {
    shader: Arc<Shader>,
    layout: VertexLayout,
    slots: UniformSlots,
}

// ============================================================================
// Drawable
// ============================================================================

/// A GPU-resident mesh with a model transform and a draw contract.
#[derive(Debug)]
pub struct Drawable {
    label: String,
    kind: DrawableKind,
    vertices: Vec<f32>,
    indices: Vec<u32>,
    vertex_count: usize,
    draw_mode: DrawMode,
    model_matrix: Mat4,

    vertex_buffer: BufferId,
    index_buffer: BufferId,
    binding: Option<ShaderBinding>,
}

impl Drawable {
    /// Uploads the mesh and, when `shader` is given, builds the layout against it.
    ///
    /// Vertex data must divide into whole vertices of the kind's stride and
    /// every index must address one of them; both are checked before any GPU
    /// object is created. Without a shader the drawable refuses to render
    /// until [`set_shader`](Self::set_shader) is called.
    ///
    /// On error every buffer created so far is released; the material's
    /// textures stay with the caller.
    pub fn new(
        ctx: &mut dyn RenderContext,
        desc: DrawableDescriptor,
        shader: Option<Arc<Shader>>,
    ) -> Result<Self> {
        let DrawableDescriptor {
            label,
            vertices,
            indices,
            draw_mode,
            material,
        } = desc;

        let kind = match material {
            Some(material) => DrawableKind::Shaded(material),
            None => DrawableKind::Basic,
        };

        let stride_floats = kind.arrangement().floats_per_vertex();
        if vertices.len() % stride_floats != 0 {
            return Err(PenumbraError::VertexStrideMismatch {
                object: label,
                float_count: vertices.len(),
                stride_floats,
            });
        }
        let vertex_count = vertices.len() / stride_floats;

        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(PenumbraError::IndexOutOfRange {
                object: label,
                index,
                vertex_count,
            });
        }

        let vertex_buffer = ctx.create_buffer(
            BufferTarget::Array,
            bytemuck::cast_slice(&vertices),
            &format!("{label} Vertices"),
        )?;
        let index_buffer = match ctx.create_buffer(
            BufferTarget::ElementArray,
            bytemuck::cast_slice(&indices),
            &format!("{label} Indices"),
        ) {
            Ok(buffer) => buffer,
            Err(err) => {
                ctx.delete_buffer(vertex_buffer);
                return Err(err);
            }
        };

        let mut drawable = Self {
            label,
            kind,
            vertices,
            indices,
            vertex_count,
            draw_mode,
            model_matrix: Mat4::IDENTITY,
            vertex_buffer,
            index_buffer,
            binding: None,
        };

        if let Some(shader) = shader
            && let Err(err) = drawable.set_shader(ctx, shader)
        {
            ctx.delete_buffer(drawable.vertex_buffer);
            ctx.delete_buffer(drawable.index_buffer);
            return Err(err);
        }

        log::debug!(
            "Drawable '{}' created: {} vertices, {} indices, {:?}",
            drawable.label,
            drawable.vertex_count,
            drawable.indices.len(),
            drawable.kind.arrangement()
        );

        Ok(drawable)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &DrawableKind {
        &self.kind
    }

    #[inline]
    #[must_use]
    pub fn material(&self) -> Option<&Material> {
        self.kind.material()
    }

    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    #[must_use]
    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    #[inline]
    #[must_use]
    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    #[inline]
    #[must_use]
    pub fn index_buffer(&self) -> BufferId {
        self.index_buffer
    }

    /// The shader the current layout was built against.
    #[must_use]
    pub fn shader(&self) -> Option<&Arc<Shader>> {
        self.binding.as_ref().map(|binding| &binding.shader)
    }

    #[must_use]
    pub fn vertex_layout(&self) -> Option<&VertexLayout> {
        self.binding.as_ref().map(|binding| &binding.layout)
    }

    /// Whether the current shader declares the shadow uniforms.
    #[must_use]
    pub fn receives_shadows(&self) -> bool {
        self.binding
            .as_ref()
            .is_some_and(|binding| binding.slots.shadow.is_some())
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Swaps the shader and rebuilds the vertex layout against it.
    ///
    /// The new layout is built before the old one is released, so on error
    /// the drawable keeps rendering with its previous shader.
    pub fn set_shader(&mut self, ctx: &mut dyn RenderContext, shader: Arc<Shader>) -> Result<()> {
        let slots = UniformSlots::resolve(&shader, &self.kind)?;
        let layout = build_vertex_layout(
            ctx,
            self.kind.layout_spec(self.vertex_count),
            self.vertex_buffer,
            &shader,
            &format!("{} Layout", self.label),
        )?;

        if let Some(previous) = self.binding.take() {
            log::debug!(
                "Drawable '{}': shader '{}' -> '{}'",
                self.label,
                previous.shader.label(),
                shader.label()
            );
            previous.layout.release(ctx);
        }

        self.binding = Some(ShaderBinding {
            shader,
            layout,
            slots,
        });
        Ok(())
    }

    pub fn set_draw_mode(&mut self, draw_mode: DrawMode) {
        self.draw_mode = draw_mode;
    }

    /// Replaces the model matrix. Nothing is composed.
    pub fn set_transformation(&mut self, transformation: Mat4) {
        self.model_matrix = transformation;
    }

    #[inline]
    #[must_use]
    pub fn transformation(&self) -> Mat4 {
        self.model_matrix
    }

    /// Per-frame hook. Drawables are static, so this does nothing.
    pub fn update(&mut self) {}

    // ========================================================================
    // Bounds
    // ========================================================================

    /// Positions as authored.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        let (step, floats) = match self.kind.arrangement() {
            VertexArrangement::Planar => (3, &self.vertices[..self.vertex_count * 3]),
            arrangement => (arrangement.floats_per_vertex(), self.vertices.as_slice()),
        };
        floats
            .chunks_exact(step)
            .map(|v| Vec3::new(v[0], v[1], v[2]))
    }

    /// Bounds in model space.
    #[must_use]
    pub fn local_bounds(&self) -> BoundingBox {
        BoundingBox::from_points(self.positions())
    }

    /// Bounds after the model matrix.
    #[must_use]
    pub fn world_bounds(&self) -> BoundingBox {
        self.local_bounds().transform(&self.model_matrix)
    }

    // ========================================================================
    // Draws
    // ========================================================================

    /// Main-pass draw without shadows.
    pub fn render(&self, ctx: &mut dyn RenderContext) -> Result<()> {
        self.render_with_shadows(ctx, None)
    }

    /// Main-pass draw. Shaded drawables sample the shadow map when `shadow`
    /// carries one and the shader declares the shadow uniforms; otherwise the
    /// draw is unshadowed. Basic drawables ignore `shadow`.
    pub fn render_with_shadows(
        &self,
        ctx: &mut dyn RenderContext,
        shadow: Option<&ShadowParams>,
    ) -> Result<()> {
        let binding = self.binding()?;

        let mut geometry = GeometryScope::bind(ctx, binding.layout.id(), self.index_buffer);
        let mut active = binding.shader.activate(&mut *geometry);
        active.set_resolved(binding.slots.model, self.model_matrix);

        if let (DrawableKind::Shaded(material), Some(slots)) =
            (&self.kind, binding.slots.material.as_ref())
        {
            active.set_resolved(slots.ambient, material.ambient);
            active.set_resolved(slots.diffuse, material.diffuse);
            active.set_resolved(slots.specular, material.specular);
            active.set_resolved(slots.shininess, material.shininess);

            for &(slot, sampler) in &slots.samplers {
                if let Some(texture) = material.texture(slot) {
                    active.bind_texture(slot.unit(), texture);
                    active.set_resolved(sampler, UniformValue::sampler(slot.unit()));
                }
            }

            match (shadow, binding.slots.shadow) {
                (Some(params), Some(shadow_slots)) => match params.shadow_map {
                    Some(shadow_map) => {
                        active.bind_texture(SHADOW_MAP_UNIT, shadow_map);
                        active.set_resolved(
                            shadow_slots.shadow_map,
                            UniformValue::sampler(SHADOW_MAP_UNIT),
                        );
                        active.set_resolved(
                            shadow_slots.light_space_matrix,
                            params.light_space_matrix,
                        );
                        active.set_resolved(shadow_slots.light_direction, params.light_direction);
                    }
                    None => log::debug!("Drawable '{}': shadow params carry no map", self.label),
                },
                (Some(_), None) => log::warn!(
                    "Drawable '{}': shader '{}' has no shadow uniforms, rendering unshadowed",
                    self.label,
                    binding.shader.label()
                ),
                (None, _) => {}
            }
        } else if shadow.is_some() {
            log::trace!("Drawable '{}' is unshaded, ignoring shadow params", self.label);
        }

        self.draw(&mut *active);
        Ok(())
    }

    /// Depth-only draw with `depth_shader` for the shadow pre-pass.
    ///
    /// Uses the layout built for the main shader, so the depth shader must
    /// read positions from the same attribute location.
    pub fn render_shadow(
        &self,
        ctx: &mut dyn RenderContext,
        depth_shader: &Shader,
        light_space_matrix: Mat4,
    ) -> Result<()> {
        let binding = self.binding()?;

        let lsm = depth_shader.resolve_uniform(names::LIGHT_SPACE_MATRIX, UniformType::Mat4)?;
        let model = depth_shader.resolve_uniform(names::MODEL, UniformType::Mat4)?;

        let depth_location = depth_shader.attribute_location(names::POSITION);
        let layout_location = binding
            .layout
            .bound_attribute(names::POSITION)
            .map(|a| a.attribute.shader_location);
        if depth_location != layout_location {
            log::warn!(
                "Drawable '{}': depth shader '{}' reads {} at {:?}, layout provides {:?}",
                self.label,
                depth_shader.label(),
                names::POSITION,
                depth_location,
                layout_location
            );
        }

        let mut geometry = GeometryScope::bind(ctx, binding.layout.id(), self.index_buffer);
        let mut active = depth_shader.activate(&mut *geometry);
        active.set_resolved(lsm, light_space_matrix);
        active.set_resolved(model, self.model_matrix);
        self.draw(&mut *active);
        Ok(())
    }

    fn draw(&self, ctx: &mut dyn RenderContext) {
        ctx.draw_elements(
            self.draw_mode.topology(),
            self.indices.len() as u32,
            wgpu::IndexFormat::Uint32,
            0,
        );
    }

    fn binding(&self) -> Result<&ShaderBinding> {
        self.binding
            .as_ref()
            .ok_or_else(|| PenumbraError::MissingShader {
                object: self.label.clone(),
            })
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Releases the buffers and the layout.
    ///
    /// The material's textures are deleted only when this drawable held the
    /// last reference to it; otherwise they stay with the remaining holders.
    pub fn destroy(self, ctx: &mut dyn RenderContext) {
        if let Some(binding) = self.binding {
            binding.layout.release(ctx);
        }
        ctx.delete_buffer(self.vertex_buffer);
        ctx.delete_buffer(self.index_buffer);
        if let DrawableKind::Shaded(material) = self.kind {
            match Arc::into_inner(material) {
                Some(material) => material.destroy(ctx),
                None => log::trace!(
                    "Drawable '{}': material still shared, keeping its maps",
                    self.label
                ),
            }
        }
        log::debug!("Drawable '{}' destroyed", self.label);
    }
}

impl Renderable for Drawable {
    fn label(&self) -> &str {
        &self.label
    }

    fn build_layout(&mut self, ctx: &mut dyn RenderContext, shader: Arc<Shader>) -> Result<()> {
        self.set_shader(ctx, shader)
    }

    fn issue_draw(&self, ctx: &mut dyn RenderContext, shadow: Option<&ShadowParams>) -> Result<()> {
        self.render_with_shadows(ctx, shadow)
    }

    fn render_shadow(
        &self,
        ctx: &mut dyn RenderContext,
        depth_shader: &Shader,
        light_space_matrix: Mat4,
    ) -> Result<()> {
        Drawable::render_shadow(self, ctx, depth_shader, light_space_matrix)
    }
}
