//! Shadow Pass
//!
//! - [`shadow`]: the shadow mapper and the per-frame shadow params
//! - [`shadow_utils`]: light-space math and scene framing
//! - [`frame`]: depth pre-pass followed by the main pass

pub mod frame;
pub mod shadow;
pub mod shadow_utils;

pub use frame::{FrameStats, ShadowFrame};
pub use shadow::{ShadowMapper, ShadowParams, ShadowPassState};
pub use shadow_utils::{OrthoBounds, SceneExtent, SceneFraming};
