//! Context seam and binding discipline.

pub mod context;
pub mod recording;
pub mod scope;

pub use context::{
    BufferId, BufferTarget, ClearFlags, FramebufferId, FramebufferStatus, GpuObjectKind,
    ProgramId, RenderContext, TextureDescriptor, TextureId, VertexLayoutId, Viewport,
};
pub use recording::{BindingState, Command, DrawCall, RecordingContext};
pub use scope::GeometryScope;
