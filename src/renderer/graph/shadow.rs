//! Directional Shadow Mapper
//!
//! Owns the offscreen depth target and brackets the depth pre-pass:
//!
//! ```text
//! Idle --prepare()--> Prepared --finalize()--> Idle
//! ```
//!
//! [`ShadowMapper::prepare`] binds the target, clears it and returns the
//! [`ShadowParams`] the main pass consumes. [`ShadowMapper::finalize`] must be
//! called afterwards even if no caster was drawn; it rebinds the default
//! target and may be called any number of times.
//!
//! The mapper keeps no light or transform state between frames.

use glam::{Mat4, Vec3};

use crate::errors::{PenumbraError, Result};
use crate::renderer::core::context::{
    ClearFlags, FramebufferId, FramebufferStatus, GpuObjectKind, RenderContext, TextureDescriptor,
    TextureId, Viewport,
};
use crate::renderer::graph::shadow_utils::{
    SceneExtent, is_view_degenerate, light_direction, light_space_matrix,
};
use crate::renderer::settings::ShadowSettings;

/// Per-frame inputs of a shadow-receiving draw. Never cache across frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowParams {
    /// Depth texture to sample; `None` renders receivers unshadowed.
    pub shadow_map: Option<TextureId>,
    pub light_space_matrix: Mat4,
    /// Normalized direction the light travels in.
    pub light_direction: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadowPassState {
    #[default]
    Idle,
    /// The shadow target is bound and cleared.
    Prepared,
}

/// Offscreen depth target for a single directional light.
#[derive(Debug)]
pub struct ShadowMapper {
    settings: ShadowSettings,
    depth_texture: TextureId,
    framebuffer: FramebufferId,
    status: FramebufferStatus,
    state: ShadowPassState,
}

impl ShadowMapper {
    /// Creates the depth texture and framebuffer and validates completeness once.
    ///
    /// Bindings are restored to the default target before returning. With
    /// [`strict_completeness`](ShadowSettings::strict_completeness) an
    /// incomplete framebuffer releases both objects and fails.
    pub fn new(ctx: &mut dyn RenderContext, settings: ShadowSettings) -> Result<Self> {
        if !settings.depth_format.has_depth_aspect() {
            return Err(PenumbraError::ResourceCreationFailed {
                kind: GpuObjectKind::Texture,
                label: settings.label,
                reason: format!("{:?} has no depth aspect", settings.depth_format),
            });
        }

        let depth_texture = ctx.create_texture(&TextureDescriptor {
            label: &format!("{} Depth", settings.label),
            width: settings.width,
            height: settings.height,
            format: settings.depth_format,
            filter: settings.filter,
            address_mode: settings.address_mode,
        })?;

        let framebuffer = match ctx.create_framebuffer(&settings.label) {
            Ok(framebuffer) => framebuffer,
            Err(err) => {
                ctx.delete_texture(depth_texture);
                return Err(err);
            }
        };

        ctx.bind_framebuffer(Some(framebuffer));
        ctx.attach_depth_texture(framebuffer, depth_texture);
        let status = ctx.framebuffer_status(framebuffer);
        ctx.bind_framebuffer(None);

        if !status.is_complete() {
            if settings.strict_completeness {
                ctx.delete_framebuffer(framebuffer);
                ctx.delete_texture(depth_texture);
                return Err(PenumbraError::FramebufferIncomplete {
                    label: settings.label,
                    status,
                });
            }
            log::error!(
                "Shadow framebuffer '{}' is incomplete ({status:?}); shadows will be wrong",
                settings.label
            );
        }

        log::debug!(
            "ShadowMapper '{}' created: {}x{} {:?}",
            settings.label,
            settings.width,
            settings.height,
            settings.depth_format
        );

        Ok(Self {
            settings,
            depth_texture,
            framebuffer,
            status,
            state: ShadowPassState::Idle,
        })
    }

    // ========================================================================
    // Pass bracketing
    // ========================================================================

    /// Starts the depth pre-pass for a light at `light_position` looking at
    /// `scene_center`.
    ///
    /// `extent` is either a scalar `e` (the volume `[-e, e]` on every axis) or
    /// an explicit [`OrthoBounds`](super::shadow_utils::OrthoBounds) six-tuple
    /// used verbatim. The view uses +Y as up; keeping the light off the
    /// vertical through `scene_center` is the caller's concern. A light that
    /// coincides with the scene center yields a zero light direction.
    pub fn prepare(
        &mut self,
        ctx: &mut dyn RenderContext,
        light_position: Vec3,
        scene_center: Vec3,
        extent: impl Into<SceneExtent>,
    ) -> Result<ShadowParams> {
        if self.state == ShadowPassState::Prepared {
            return Err(PenumbraError::ShadowPassAlreadyActive {
                label: self.settings.label.clone(),
            });
        }

        let extent = extent.into();
        let params = ShadowParams {
            shadow_map: Some(self.depth_texture),
            light_space_matrix: light_space_matrix(light_position, scene_center, extent),
            light_direction: light_direction(light_position, scene_center),
        };
        if params.light_direction == Vec3::ZERO {
            log::warn!(
                "ShadowMapper '{}': light at {light_position} coincides with scene center",
                self.settings.label
            );
        } else if is_view_degenerate(light_position, scene_center) {
            log::warn!(
                "ShadowMapper '{}': light at {light_position} is vertically above or below {scene_center}; the light view has no horizontal axes",
                self.settings.label
            );
        }

        let mut clear = ClearFlags::DEPTH;
        if self.settings.clear_color_buffer {
            clear |= ClearFlags::COLOR;
        }

        ctx.bind_framebuffer(Some(self.framebuffer));
        ctx.set_viewport(Viewport::from_size(self.settings.width, self.settings.height));
        ctx.clear(clear);
        self.state = ShadowPassState::Prepared;

        log::trace!(
            "ShadowMapper '{}' prepared: light {light_position} -> {scene_center}, {extent:?}",
            self.settings.label
        );

        Ok(params)
    }

    /// Ends the depth pre-pass by rebinding the default target.
    ///
    /// The caller restores its own main-pass viewport.
    pub fn finalize(&mut self, ctx: &mut dyn RenderContext) {
        ctx.bind_framebuffer(None);
        if self.state == ShadowPassState::Idle {
            log::trace!("ShadowMapper '{}' finalized while idle", self.settings.label);
        }
        self.state = ShadowPassState::Idle;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.state == ShadowPassState::Prepared
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ShadowPassState {
        self.state
    }

    /// Width and height of the depth target.
    #[inline]
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        (self.settings.width, self.settings.height)
    }

    #[inline]
    #[must_use]
    pub fn shadow_map(&self) -> TextureId {
        self.depth_texture
    }

    #[inline]
    #[must_use]
    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    /// Completeness reported at construction.
    #[inline]
    #[must_use]
    pub fn status(&self) -> FramebufferStatus {
        self.status
    }

    #[must_use]
    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// Releases the framebuffer and the depth texture, ending an open pass first.
    pub fn destroy(mut self, ctx: &mut dyn RenderContext) {
        if self.is_prepared() {
            self.finalize(ctx);
        }
        ctx.delete_framebuffer(self.framebuffer);
        ctx.delete_texture(self.depth_texture);
        log::debug!("ShadowMapper '{}' destroyed", self.settings.label);
    }
}
