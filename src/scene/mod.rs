//! Scene-side inputs of the shadow pass.

pub mod light;

pub use light::{Light, LightKind, main_shadow_light};
