//! Rendering Module
//!
//! - [`core`]: the [`RenderContext`](core::context::RenderContext) seam, binding
//!   scopes and the headless recording backend
//! - [`pipeline`]: vertex layout construction
//! - [`drawable`]: GPU-resident meshes and their draw contract
//! - [`graph`]: the directional shadow pass and frame orchestration
//! - [`settings`]: shadow target configuration

pub mod core;
pub mod drawable;
pub mod graph;
pub mod pipeline;
pub mod settings;

pub use drawable::{Drawable, DrawableDescriptor, DrawableKind, Renderable};
pub use settings::ShadowSettings;
