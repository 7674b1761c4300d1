//! Tessera render device crate.
//!
//! This crate owns the retained-state layer between a drawing interface and an
//! immediate-mode graphics backend: pending render state with lazy commits, shared
//! vertex-buffer arenas, and deferred deletion of GPU resources.

pub mod arena;
pub mod backend;
pub mod device;
pub mod draw;
pub mod logging;
pub mod paint;
pub mod resources;
pub mod shader;
pub mod state;

pub use arena::{FlatVertex, Vertex, VertexFormat, WorldVertex};
pub use device::{DeviceConfig, DeviceError, DeviceStats, PixelBufferMap, RenderDevice};
pub use draw::PrimitiveType;
pub use paint::PixelColor;
pub use resources::{CubeMapFace, IndexBuffer, Release, Texture, TextureKind, VertexBuffer};
pub use shader::ShaderSlot;
pub use state::{UniformKind, UniformSlot};
