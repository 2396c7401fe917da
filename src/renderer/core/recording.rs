//! Recording Context
//!
//! A headless [`RenderContext`] that records every command, keeps the objects
//! it created in slotmaps, and tracks binding state the way an immediate-mode
//! driver would. Misuse that a real driver would silently accept (drawing with
//! nothing bound, indexing past the element buffer, setting a uniform with no
//! active program) is collected as a violation and logged.
//!
//! Used for validating draw sequences without a window or GPU, and by the
//! test suite.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::errors::{PenumbraError, Result};
use crate::renderer::core::context::{
    BufferId, BufferTarget, ClearFlags, FramebufferId, FramebufferStatus, GpuObjectKind,
    ProgramId, RenderContext, TextureDescriptor, TextureId, VertexLayoutId, Viewport,
};
use crate::resources::uniforms::{UniformLocation, UniformValue};

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer {
        buffer: BufferId,
        target: BufferTarget,
        size: usize,
    },
    DeleteBuffer(BufferId),
    BindBuffer {
        target: BufferTarget,
        buffer: Option<BufferId>,
    },
    CreateVertexLayout(VertexLayoutId),
    DeleteVertexLayout(VertexLayoutId),
    BindVertexLayout(Option<VertexLayoutId>),
    SetVertexAttribute {
        attribute: wgpu::VertexAttribute,
        stride: u64,
    },
    CreateTexture(TextureId),
    DeleteTexture(TextureId),
    BindTexture {
        unit: u32,
        texture: Option<TextureId>,
    },
    CreateFramebuffer(FramebufferId),
    DeleteFramebuffer(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    AttachDepthTexture {
        framebuffer: FramebufferId,
        texture: TextureId,
    },
    SetViewport(Viewport),
    Clear(ClearFlags),
    UseProgram(Option<ProgramId>),
    SetUniform {
        location: UniformLocation,
        value: UniformValue,
    },
    DrawElements(DrawCall),
}

/// Snapshot of the state an indexed draw consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub topology: wgpu::PrimitiveTopology,
    pub index_count: u32,
    pub index_format: wgpu::IndexFormat,
    pub first_index_offset: u64,
    pub vertex_layout: Option<VertexLayoutId>,
    pub element_buffer: Option<BufferId>,
    pub program: Option<ProgramId>,
    pub framebuffer: Option<FramebufferId>,
    /// Largest index read by the draw, when the element buffer could be read.
    pub max_index: Option<u32>,
    /// Texture bindings at draw time, sorted by unit.
    pub textures: Vec<(u32, TextureId)>,
}

/// Current bindings of the recording context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingState {
    pub vertex_layout: Option<VertexLayoutId>,
    pub array_buffer: Option<BufferId>,
    pub element_buffer: Option<BufferId>,
    pub program: Option<ProgramId>,
    pub framebuffer: Option<FramebufferId>,
    pub texture_units: FxHashMap<u32, TextureId>,
    pub viewport: Option<Viewport>,
}

impl BindingState {
    /// No layout, buffer, program or texture is bound (framebuffer and viewport aside).
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.vertex_layout.is_none()
            && self.array_buffer.is_none()
            && self.element_buffer.is_none()
            && self.program.is_none()
            && self.texture_units.is_empty()
    }
}

/// An attribute pointer recorded into a vertex layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutAttribute {
    pub attribute: wgpu::VertexAttribute,
    pub stride: u64,
    pub buffer: Option<BufferId>,
}

#[derive(Debug)]
struct BufferRecord {
    target: BufferTarget,
    data: Vec<u8>,
    label: String,
}

#[derive(Debug, Default)]
struct LayoutRecord {
    label: String,
    attributes: Vec<LayoutAttribute>,
    element_buffer: Option<BufferId>,
}

#[derive(Debug)]
struct TextureRecord {
    label: String,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

#[derive(Debug)]
struct FramebufferRecord {
    label: String,
    depth: Option<TextureId>,
}

/// A command-recording, state-tracking [`RenderContext`].
#[derive(Debug, Default)]
pub struct RecordingContext {
    commands: Vec<Command>,
    state: BindingState,
    violations: Vec<String>,

    buffers: SlotMap<BufferId, BufferRecord>,
    layouts: SlotMap<VertexLayoutId, LayoutRecord>,
    textures: SlotMap<TextureId, TextureRecord>,
    framebuffers: SlotMap<FramebufferId, FramebufferRecord>,
    programs: SlotMap<ProgramId, String>,
    uniforms: FxHashMap<(ProgramId, UniformLocation), UniformValue>,

    fail_next: Option<GpuObjectKind>,
    forced_status: Option<FramebufferStatus>,
}

impl RecordingContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Setup helpers
    // ========================================================================

    /// Registers a linked program, standing in for the external shader compiler.
    pub fn register_program(&mut self, label: impl Into<String>) -> ProgramId {
        self.programs.insert(label.into())
    }

    /// Makes the next creation of `kind` fail with a resource error.
    pub fn fail_next_allocation(&mut self, kind: GpuObjectKind) {
        self.fail_next = Some(kind);
    }

    /// Overrides the status reported by [`RenderContext::framebuffer_status`].
    pub fn force_framebuffer_status(&mut self, status: Option<FramebufferStatus>) {
        self.forced_status = status;
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::DrawElements(call) => Some(call),
            _ => None,
        })
    }

    #[must_use]
    pub fn state(&self) -> &BindingState {
        &self.state
    }

    /// Protocol misuse observed so far.
    #[must_use]
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Last value written to `location` of `program`.
    #[must_use]
    pub fn uniform(&self, program: ProgramId, location: UniformLocation) -> Option<UniformValue> {
        self.uniforms.get(&(program, location)).copied()
    }

    #[must_use]
    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(buffer).map(|record| record.data.as_slice())
    }

    #[must_use]
    pub fn buffer_target(&self, buffer: BufferId) -> Option<BufferTarget> {
        self.buffers.get(buffer).map(|record| record.target)
    }

    #[must_use]
    pub fn layout_attributes(&self, layout: VertexLayoutId) -> Option<&[LayoutAttribute]> {
        self.layouts.get(layout).map(|record| record.attributes.as_slice())
    }

    #[must_use]
    pub fn layout_label(&self, layout: VertexLayoutId) -> Option<&str> {
        self.layouts.get(layout).map(|record| record.label.as_str())
    }

    #[must_use]
    pub fn texture_label(&self, texture: TextureId) -> Option<&str> {
        self.textures.get(texture).map(|record| record.label.as_str())
    }

    #[must_use]
    pub fn framebuffer_label(&self, framebuffer: FramebufferId) -> Option<&str> {
        self.framebuffers.get(framebuffer).map(|record| record.label.as_str())
    }

    #[must_use]
    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(texture).map(|record| (record.width, record.height))
    }

    #[must_use]
    pub fn texture_format(&self, texture: TextureId) -> Option<wgpu::TextureFormat> {
        self.textures.get(texture).map(|record| record.format)
    }

    #[must_use]
    pub fn depth_attachment(&self, framebuffer: FramebufferId) -> Option<TextureId> {
        self.framebuffers.get(framebuffer).and_then(|record| record.depth)
    }

    /// Number of live objects of `kind`.
    #[must_use]
    pub fn live_objects(&self, kind: GpuObjectKind) -> usize {
        match kind {
            GpuObjectKind::Buffer => self.buffers.len(),
            GpuObjectKind::Texture => self.textures.len(),
            GpuObjectKind::Framebuffer => self.framebuffers.len(),
            GpuObjectKind::VertexLayout => self.layouts.len(),
        }
    }

    #[must_use]
    pub fn is_layout_live(&self, layout: VertexLayoutId) -> bool {
        self.layouts.contains_key(layout)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn violation(&mut self, message: String) {
        log::warn!("RecordingContext: {message}");
        self.violations.push(message);
    }

    fn take_injected_failure(&mut self, kind: GpuObjectKind, label: &str) -> Result<()> {
        if self.fail_next == Some(kind) {
            self.fail_next = None;
            return Err(PenumbraError::ResourceCreationFailed {
                kind,
                label: label.to_owned(),
                reason: "allocation failure injected by RecordingContext".to_owned(),
            });
        }
        Ok(())
    }

    fn read_max_index(
        &mut self,
        buffer: BufferId,
        index_count: u32,
        format: wgpu::IndexFormat,
        offset: u64,
    ) -> Option<u32> {
        let Some(record) = self.buffers.get(buffer) else {
            self.violation(format!("draw reads deleted element buffer {buffer:?}"));
            return None;
        };

        let index_size = match format {
            wgpu::IndexFormat::Uint16 => 2usize,
            wgpu::IndexFormat::Uint32 => 4usize,
        };
        let start = offset as usize;
        let end = start + index_count as usize * index_size;
        if end > record.data.len() {
            let len = record.data.len();
            let label = record.label.clone();
            self.violation(format!(
                "draw of {index_count} indices reads bytes {start}..{end} of element buffer '{label}' ({len} bytes)"
            ));
            return None;
        }

        let bytes = &record.data[start..end];
        match format {
            wgpu::IndexFormat::Uint16 => bytes
                .chunks_exact(2)
                .map(|c| u32::from(u16::from_ne_bytes([c[0], c[1]])))
                .max(),
            wgpu::IndexFormat::Uint32 => bytes
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .max(),
        }
    }
}

impl RenderContext for RecordingContext {
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8], label: &str) -> Result<BufferId> {
        self.take_injected_failure(GpuObjectKind::Buffer, label)?;
        let buffer = self.buffers.insert(BufferRecord {
            target,
            data: data.to_vec(),
            label: label.to_owned(),
        });
        self.commands.push(Command::CreateBuffer {
            buffer,
            target,
            size: data.len(),
        });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(buffer).is_none() {
            self.violation(format!("delete of unknown buffer {buffer:?}"));
            return;
        }
        if self.state.array_buffer == Some(buffer) {
            self.state.array_buffer = None;
        }
        if self.state.element_buffer == Some(buffer) {
            self.state.element_buffer = None;
        }
        self.commands.push(Command::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferId>) {
        if let Some(id) = buffer {
            match self.buffers.get(id) {
                None => self.violation(format!("bind of unknown buffer {id:?}")),
                Some(record) if record.target != target => {
                    let message = format!(
                        "buffer '{}' created as {:?} bound as {target:?}",
                        record.label, record.target
                    );
                    self.violation(message);
                }
                Some(_) => {}
            }
        }

        match target {
            BufferTarget::Array => self.state.array_buffer = buffer,
            BufferTarget::ElementArray => {
                self.state.element_buffer = buffer;
                if let Some(layout) = self.state.vertex_layout
                    && let Some(record) = self.layouts.get_mut(layout)
                {
                    record.element_buffer = buffer;
                }
            }
        }
        self.commands.push(Command::BindBuffer { target, buffer });
    }

    fn create_vertex_layout(&mut self, label: &str) -> Result<VertexLayoutId> {
        self.take_injected_failure(GpuObjectKind::VertexLayout, label)?;
        let layout = self.layouts.insert(LayoutRecord {
            label: label.to_owned(),
            ..Default::default()
        });
        self.commands.push(Command::CreateVertexLayout(layout));
        Ok(layout)
    }

    fn delete_vertex_layout(&mut self, layout: VertexLayoutId) {
        if self.layouts.remove(layout).is_none() {
            self.violation(format!("delete of unknown vertex layout {layout:?}"));
            return;
        }
        if self.state.vertex_layout == Some(layout) {
            self.state.vertex_layout = None;
            self.state.element_buffer = None;
        }
        self.commands.push(Command::DeleteVertexLayout(layout));
    }

    fn bind_vertex_layout(&mut self, layout: Option<VertexLayoutId>) {
        match layout {
            Some(id) => match self.layouts.get(id) {
                Some(record) => {
                    self.state.vertex_layout = Some(id);
                    self.state.element_buffer = record.element_buffer;
                }
                None => {
                    self.violation(format!("bind of unknown vertex layout {id:?}"));
                    self.state.vertex_layout = None;
                }
            },
            None => {
                self.state.vertex_layout = None;
                self.state.element_buffer = None;
            }
        }
        self.commands.push(Command::BindVertexLayout(layout));
    }

    fn set_vertex_attribute(&mut self, attribute: &wgpu::VertexAttribute, stride: u64) {
        let buffer = self.state.array_buffer;
        if buffer.is_none() {
            self.violation(format!(
                "attribute {} set with no array buffer bound",
                attribute.shader_location
            ));
        }

        match self.state.vertex_layout.and_then(|id| self.layouts.get_mut(id)) {
            Some(record) => {
                record
                    .attributes
                    .retain(|a| a.attribute.shader_location != attribute.shader_location);
                record.attributes.push(LayoutAttribute {
                    attribute: *attribute,
                    stride,
                    buffer,
                });
            }
            None => self.violation(format!(
                "attribute {} set with no vertex layout bound",
                attribute.shader_location
            )),
        }

        self.commands.push(Command::SetVertexAttribute {
            attribute: *attribute,
            stride,
        });
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor<'_>) -> Result<TextureId> {
        self.take_injected_failure(GpuObjectKind::Texture, descriptor.label)?;
        let texture = self.textures.insert(TextureRecord {
            label: descriptor.label.to_owned(),
            format: descriptor.format,
            width: descriptor.width,
            height: descriptor.height,
        });
        self.commands.push(Command::CreateTexture(texture));
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(texture).is_none() {
            self.violation(format!("delete of unknown texture {texture:?}"));
            return;
        }
        self.state.texture_units.retain(|_, bound| *bound != texture);
        self.commands.push(Command::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        match texture {
            Some(id) => {
                if !self.textures.contains_key(id) {
                    self.violation(format!("bind of unknown texture {id:?} to unit {unit}"));
                }
                self.state.texture_units.insert(unit, id);
            }
            None => {
                self.state.texture_units.remove(&unit);
            }
        }
        self.commands.push(Command::BindTexture { unit, texture });
    }

    fn create_framebuffer(&mut self, label: &str) -> Result<FramebufferId> {
        self.take_injected_failure(GpuObjectKind::Framebuffer, label)?;
        let framebuffer = self.framebuffers.insert(FramebufferRecord {
            label: label.to_owned(),
            depth: None,
        });
        self.commands.push(Command::CreateFramebuffer(framebuffer));
        Ok(framebuffer)
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(framebuffer).is_none() {
            self.violation(format!("delete of unknown framebuffer {framebuffer:?}"));
            return;
        }
        if self.state.framebuffer == Some(framebuffer) {
            self.state.framebuffer = None;
        }
        self.commands.push(Command::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        if let Some(id) = framebuffer
            && !self.framebuffers.contains_key(id)
        {
            self.violation(format!("bind of unknown framebuffer {id:?}"));
        }
        self.state.framebuffer = framebuffer;
        self.commands.push(Command::BindFramebuffer(framebuffer));
    }

    fn attach_depth_texture(&mut self, framebuffer: FramebufferId, texture: TextureId) {
        match self.framebuffers.get_mut(framebuffer) {
            Some(record) => record.depth = Some(texture),
            None => self.violation(format!("attachment to unknown framebuffer {framebuffer:?}")),
        }
        self.commands.push(Command::AttachDepthTexture {
            framebuffer,
            texture,
        });
    }

    fn framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus {
        if let Some(status) = self.forced_status {
            return status;
        }

        let Some(record) = self.framebuffers.get(framebuffer) else {
            return FramebufferStatus::MissingAttachment;
        };

        match record.depth {
            None => FramebufferStatus::MissingAttachment,
            Some(texture) => match self.textures.get(texture) {
                Some(tex) if tex.format.has_depth_aspect() && tex.width > 0 && tex.height > 0 => {
                    FramebufferStatus::Complete
                }
                _ => FramebufferStatus::IncompleteAttachment,
            },
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = Some(viewport);
        self.commands.push(Command::SetViewport(viewport));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.commands.push(Command::Clear(flags));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(id) = program
            && !self.programs.contains_key(id)
        {
            self.violation(format!("use of unregistered program {id:?}"));
        }
        self.state.program = program;
        self.commands.push(Command::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        match self.state.program {
            Some(program) => {
                self.uniforms.insert((program, location), value);
            }
            None => self.violation(format!("uniform {location:?} set with no active program")),
        }
        self.commands.push(Command::SetUniform { location, value });
    }

    fn draw_elements(
        &mut self,
        topology: wgpu::PrimitiveTopology,
        index_count: u32,
        index_format: wgpu::IndexFormat,
        first_index_offset: u64,
    ) {
        if self.state.program.is_none() {
            self.violation("draw with no active program".to_owned());
        }
        if self.state.vertex_layout.is_none() {
            self.violation("draw with no vertex layout bound".to_owned());
        }

        let max_index = match self.state.element_buffer {
            Some(buffer) => self.read_max_index(buffer, index_count, index_format, first_index_offset),
            None => {
                self.violation("draw with no element buffer bound".to_owned());
                None
            }
        };

        let mut textures: Vec<(u32, TextureId)> = self
            .state
            .texture_units
            .iter()
            .map(|(unit, texture)| (*unit, *texture))
            .collect();
        textures.sort_unstable_by_key(|(unit, _)| *unit);

        self.commands.push(Command::DrawElements(DrawCall {
            topology,
            index_count,
            index_format,
            first_index_offset,
            vertex_layout: self.state.vertex_layout,
            element_buffer: self.state.element_buffer,
            program: self.state.program,
            framebuffer: self.state.framebuffer,
            max_index,
            textures,
        }));
    }
}
