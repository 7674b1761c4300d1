use thiserror::Error;

/// Failure of a device operation.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The backend raised its error flag after a call.
    #[error("backend error 0x{code:04X}")]
    Backend { code: u32 },

    /// An error check ran while the context was not current on this thread.
    #[error("Unexpected current rendering context")]
    ContextNotCurrent,

    /// The render target's framebuffer could not be created.
    #[error("Error setting render target: {0}")]
    RenderTarget(String),

    /// A buffer, texture, vertex layout or sampler could not be created.
    #[error("failed to create {what}: {message}")]
    Construction { what: &'static str, message: String },

    #[error("Failed to bind shader {name}:\n{log}")]
    ShaderCompile { name: String, log: String },

    #[error("shader slot {0} was never declared")]
    UnknownShader(u16),

    #[error("uniform slot {0} was never declared")]
    UnknownUniform(u16),

    #[error("uniform slot {slot} holds {capacity} floats, got {len}")]
    UniformOverflow { slot: u16, len: usize, capacity: usize },

    /// The handle belongs to another device, or its device is gone.
    #[error("stale {0} handle")]
    StaleHandle(&'static str),

    #[error("range {offset}..{end} exceeds buffer of {size} bytes")]
    OutOfRange { offset: usize, end: usize, size: usize },

    #[error("expected {expected} pixels, got {actual}")]
    PixelCount { expected: usize, actual: usize },

    #[error("operation needs a {expected} texture")]
    WrongTextureKind { expected: &'static str },

    #[error("{len} bytes is not a whole number of {stride}-byte vertices")]
    VertexDataSize { len: usize, stride: usize },

    #[error("no vertex buffer is bound")]
    NoVertexBuffer,

    #[error("failed to map pixel buffer: {0}")]
    MapFailed(String),
}

impl DeviceError {
    /// Wraps a backend construction failure.
    pub(crate) fn construction(what: &'static str, err: anyhow::Error) -> Self {
        DeviceError::Construction {
            what,
            message: format!("{err:#}"),
        }
    }
}
