//! The render device.
//!
//! This module is responsible for:
//! - tracking pending render state and committing it before draws
//! - packing vertex buffers into per-format arenas
//! - frame begin/end/present and deferred resource destruction

mod apply;
mod config;
mod draw;
mod error;
mod frame;
mod render_device;
mod stats;
mod upload;

pub use config::DeviceConfig;
pub use error::DeviceError;
pub use render_device::RenderDevice;
pub use stats::DeviceStats;
pub use upload::PixelBufferMap;
