#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{PenumbraError, Result};
pub use renderer::core::{RecordingContext, RenderContext};
pub use renderer::graph::{ShadowFrame, ShadowMapper, ShadowParams};
pub use renderer::{Drawable, DrawableDescriptor, DrawableKind, Renderable, ShadowSettings};
pub use resources::{BoundingBox, DrawMode, Material, Shader, ShaderInterface};
pub use scene::Light;
