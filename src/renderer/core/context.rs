//! Rendering Context
//!
//! The [`RenderContext`] trait is the single capability through which every
//! GPU command in this crate is issued. It models an immediate-mode,
//! bind-to-edit API: objects are created and destroyed through it, state is
//! changed by binding, and one indexed-draw entry point consumes whatever is
//! currently bound.
//!
//! Nothing here saves or restores state implicitly. Callers bind what they
//! need and unbind it before returning; the scoped guards in
//! [`scope`](super::scope) and [`ActiveShader`](crate::resources::shader::ActiveShader)
//! make that structural.
//!
//! Handles are `slotmap` keys so a backend can map them onto native object
//! names with a `SecondaryMap`.

use std::fmt;

use bitflags::bitflags;
use slotmap::new_key_type;

use crate::errors::Result;
use crate::resources::uniforms::{UniformLocation, UniformValue};

new_key_type! {
    /// A GPU buffer (vertex or index data).
    pub struct BufferId;
    /// A GPU texture.
    pub struct TextureId;
    /// An offscreen render target.
    pub struct FramebufferId;
    /// A vertex attribute layout object.
    pub struct VertexLayoutId;
    /// A linked shader program, produced by the (external) shader compiler.
    pub struct ProgramId;
}

/// Binding point of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data.
    Array,
    /// Index data consumed by [`RenderContext::draw_elements`].
    ElementArray,
}

/// Category of GPU object, used in error reporting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuObjectKind {
    Buffer,
    Texture,
    Framebuffer,
    VertexLayout,
}

impl fmt::Display for GpuObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buffer => "buffer",
            Self::Texture => "texture",
            Self::Framebuffer => "framebuffer",
            Self::VertexLayout => "vertex layout",
        };
        f.write_str(name)
    }
}

/// Completeness of an offscreen framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    /// An attachment exists but cannot be rendered to (wrong format, deleted texture).
    IncompleteAttachment,
    /// No attachment at all.
    MissingAttachment,
    /// The combination of attachments is not supported by the driver.
    Unsupported,
}

impl FramebufferStatus {
    #[inline]
    #[must_use]
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

bitflags! {
    /// Buffers affected by [`RenderContext::clear`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ClearFlags: u32 {
        const COLOR   = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// A pixel rectangle of the current render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// A viewport covering `width` x `height` from the origin.
    #[inline]
    #[must_use]
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Creation parameters for a 2D texture without initial contents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub filter: wgpu::FilterMode,
    pub address_mode: wgpu::AddressMode,
}

/// The opaque rendering capability consumed by drawables and the shadow mapper.
///
/// Implementations enqueue commands in call order and never block on the GPU.
/// Object creation is the only fallible operation; state changes and draws are
/// assumed to succeed once their objects exist.
pub trait RenderContext {
    // ------------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------------

    /// Creates a buffer holding `data`. The buffer is left unbound.
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8], label: &str) -> Result<BufferId>;

    fn delete_buffer(&mut self, buffer: BufferId);

    /// Binds `buffer` to `target`, or clears the binding with `None`.
    ///
    /// While a vertex layout is bound, the element-array binding is recorded in it.
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>);

    // ------------------------------------------------------------------------
    // Vertex layouts
    // ------------------------------------------------------------------------

    fn create_vertex_layout(&mut self, label: &str) -> Result<VertexLayoutId>;

    fn delete_vertex_layout(&mut self, layout: VertexLayoutId);

    fn bind_vertex_layout(&mut self, layout: Option<VertexLayoutId>);

    /// Enables `attribute.shader_location` on the bound layout and sources it
    /// from the bound array buffer at `attribute.offset` with the given byte stride.
    fn set_vertex_attribute(&mut self, attribute: &wgpu::VertexAttribute, stride: u64);

    // ------------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------------

    fn create_texture(&mut self, descriptor: &TextureDescriptor<'_>) -> Result<TextureId>;

    fn delete_texture(&mut self, texture: TextureId);

    /// Makes `unit` active and binds `texture` to it (`None` unbinds).
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);

    // ------------------------------------------------------------------------
    // Render targets
    // ------------------------------------------------------------------------

    fn create_framebuffer(&mut self, label: &str) -> Result<FramebufferId>;

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Binds an offscreen target, or the default target with `None`.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Attaches `texture` as the depth attachment of `framebuffer`.
    fn attach_depth_texture(&mut self, framebuffer: FramebufferId, texture: TextureId);

    fn framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus;

    fn set_viewport(&mut self, viewport: Viewport);

    fn clear(&mut self, flags: ClearFlags);

    // ------------------------------------------------------------------------
    // Programs and draws
    // ------------------------------------------------------------------------

    /// Activates `program`, or deactivates the current one with `None`.
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Sets a uniform of the active program.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Issues one indexed draw from the bound layout and element buffer.
    fn draw_elements(
        &mut self,
        topology: wgpu::PrimitiveTopology,
        index_count: u32,
        index_format: wgpu::IndexFormat,
        first_index_offset: u64,
    );
}
