//! Shadow Settings
//!
//! Construction-time configuration of the [`ShadowMapper`](crate::renderer::graph::shadow::ShadowMapper).
//!
//! ```rust,ignore
//! let settings = ShadowSettings {
//!     width: 1024,
//!     height: 1024,
//!     ..Default::default()
//! };
//! let mapper = ShadowMapper::new(&mut ctx, settings)?;
//! ```

/// Shadow target configuration.
///
/// The target is a single depth texture; there is no color attachment and no
/// renderbuffer. Resolution cannot change after the mapper is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSettings {
    pub width: u32,
    pub height: u32,
    /// Must carry a depth aspect.
    pub depth_format: wgpu::TextureFormat,
    pub filter: wgpu::FilterMode,
    pub address_mode: wgpu::AddressMode,
    /// Also clear the color buffer when the pass starts. The target has no
    /// color attachment, so this only matters for drivers that require it.
    pub clear_color_buffer: bool,
    /// Treat an incomplete framebuffer as a construction error. When `false`
    /// the failure is logged and the mapper is returned anyway.
    pub strict_completeness: bool,
    pub label: String,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 2048,
            depth_format: wgpu::TextureFormat::Depth32Float,
            filter: wgpu::FilterMode::Linear,
            address_mode: wgpu::AddressMode::ClampToEdge,
            clear_color_buffer: true,
            strict_completeness: true,
            label: "Shadow Map".to_owned(),
        }
    }
}

impl ShadowSettings {
    /// Default settings at `width` x `height`.
    #[must_use]
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}
