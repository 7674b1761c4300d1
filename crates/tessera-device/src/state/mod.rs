//! Pending render state, dirty tracking and the ordered commit.

mod dirty;
mod sampler;
mod tracker;
mod types;
mod uniforms;

pub use dirty::{DirtyFlags, StateCategory};
pub use sampler::{MagFilter, MinFilter, SamplerCache, SamplerFilterKey};
pub use tracker::{ApplyState, RenderState, StateTracker};
pub use types::{Blend, BlendOperation, CullMode, FillMode, TextureAddress, TextureFilter};
pub use uniforms::{UniformInfo, UniformKind, UniformSlot, UniformStore};
