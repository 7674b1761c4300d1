//! Shader registry with lazily compiled alpha-test variants.

mod manager;

pub use manager::{with_define, ShaderManager, ShaderProgram, ShaderSlot};
