//! Error Types
//!
//! This module defines the error type used throughout the crate.
//!
//! # Overview
//!
//! [`PenumbraError`] separates two families of failure:
//! - **Resource errors**: a GPU object could not be created, or the shadow
//!   framebuffer is incomplete. These surface at construction time.
//! - **Contract violations**: a draw was requested while a prerequisite is
//!   missing (no shader, vertex data authored for the wrong stride, index out
//!   of range, a uniform the shader does not declare). These fail fast and
//!   name the offending object.
//!
//! Degraded features (a material without texture maps, a frame rendered
//! without shadow parameters) are not errors. They are logged and skipped.
//!
//! # Usage
//!
//! ```rust,ignore
//! use penumbra::errors::{PenumbraError, Result};
//!
//! fn build() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::renderer::core::context::{FramebufferStatus, GpuObjectKind};
use crate::resources::uniforms::UniformType;

/// The main error type for the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PenumbraError {
    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The rendering context refused to create a GPU object.
    #[error("Failed to create {kind} '{label}': {reason}")]
    ResourceCreationFailed {
        /// What kind of object was requested
        kind: GpuObjectKind,
        /// Debug label of the object
        label: String,
        /// Backend-provided reason
        reason: String,
    },

    /// The shadow framebuffer did not validate after its attachment was set.
    #[error("Framebuffer '{label}' is incomplete: {status:?}")]
    FramebufferIncomplete {
        /// Debug label of the framebuffer
        label: String,
        /// Status reported by the context
        status: FramebufferStatus,
    },

    // ========================================================================
    // Contract Violations
    // ========================================================================
    /// A draw was requested on an object that has no shader (and therefore no layout).
    #[error("Drawable '{object}' has no shader set; call set_shader before rendering")]
    MissingShader {
        /// Label of the drawable
        object: String,
    },

    /// The authored vertex data does not divide into whole vertices of the expected stride.
    #[error(
        "Drawable '{object}' has {float_count} floats, which is not a multiple of its {stride_floats}-float vertex stride"
    )]
    VertexStrideMismatch {
        /// Label of the drawable
        object: String,
        /// Number of floats supplied
        float_count: usize,
        /// Floats per vertex implied by the layout
        stride_floats: usize,
    },

    /// An index refers past the end of the vertex data.
    #[error("Drawable '{object}' references vertex {index} but only has {vertex_count} vertices")]
    IndexOutOfRange {
        /// Label of the drawable
        object: String,
        /// The offending index value
        index: u32,
        /// Number of vertices actually present
        vertex_count: usize,
    },

    /// A uniform required by the draw protocol is not declared by the shader.
    #[error("Shader '{shader}' does not declare uniform '{name}'")]
    MissingUniform {
        /// Label of the shader
        shader: String,
        /// Uniform name as addressed by the protocol
        name: String,
    },

    /// A uniform was set with a value whose type differs from the declaration.
    #[error("Shader '{shader}' declares uniform '{name}' as {expected:?}, got {found:?}")]
    UniformTypeMismatch {
        /// Label of the shader
        shader: String,
        /// Uniform name
        name: String,
        /// Declared type
        expected: UniformType,
        /// Type of the supplied value
        found: UniformType,
    },

    /// `prepare` was called while the depth pre-pass is still open.
    #[error("Shadow pass '{label}' is already prepared; finalize it before preparing again")]
    ShadowPassAlreadyActive {
        /// Label of the shadow mapper
        label: String,
    },
}

impl PenumbraError {
    /// Returns `true` for failures of GPU object creation or validation.
    #[must_use]
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            Self::ResourceCreationFailed { .. } | Self::FramebufferIncomplete { .. }
        )
    }

    /// Returns `true` for misuse of the draw protocol.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        !self.is_resource_error()
    }
}

/// Alias for `Result<T, PenumbraError>`.
pub type Result<T> = std::result::Result<T, PenumbraError>;
