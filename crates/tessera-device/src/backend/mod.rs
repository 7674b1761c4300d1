//! Backend abstraction.
//!
//! [`Backend`] is the immediate-mode graphics API the device drives: one call per
//! state change or draw, errors reported through a sticky flag read by
//! [`Backend::poll_error`]. [`RenderContext`] is the window-system side.

use std::fmt::Debug;

use anyhow::Result;

use crate::arena::VertexFormat;
use crate::draw::PrimitiveType;
use crate::logging::DebugLog;
use crate::paint::PixelColor;
use crate::resources::{CubeMapFace, TextureDesc, TextureKind};
use crate::state::{
    Blend, BlendOperation, CullMode, FillMode, SamplerFilterKey, TextureAddress, UniformKind,
};

#[cfg(feature = "gl")]
mod gl;
mod headless;

#[cfg(feature = "gl")]
pub use gl::GlBackend;
pub use headless::{
    DrawKind, HeadlessBackend, HeadlessCall, HeadlessContext, HeadlessCounters, HeadlessUniform,
    ObjectId, RecordedDraw, UniformPush,
};

/// Error code reported for operations the backend considers invalid.
pub const INVALID_OPERATION: u32 = 0x0502;

/// Rendering context owned by the window system.
///
/// "Current" is per thread: a context can only be current on one thread at a time.
pub trait RenderContext {
    /// Makes the context current on the calling thread. Returns `false` on failure.
    fn make_current(&mut self) -> bool;
    fn clear_current(&mut self);
    fn swap_buffers(&mut self);
    fn is_current(&self) -> bool;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
    PixelUnpack,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Static,
    Stream,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub operation: BlendOperation,
    pub source: Blend,
    pub destination: Blend,
}

/// Depth testing is on whenever this is passed; `write` toggles the depth mask.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub write: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SamplerDesc {
    pub key: SamplerFilterKey,
    pub wrap: TextureAddress,
}

/// Immediate-mode graphics API.
///
/// Object creation that can fail returns `anyhow::Result`; everything else reports
/// through [`poll_error`](Self::poll_error).
pub trait Backend {
    type Buffer: Copy + Eq + Debug;
    type VertexArray: Copy + Eq + Debug;
    type Program: Copy + Eq + Debug;
    type Uniform: Clone + Debug;
    type Texture: Copy + Eq + Debug;
    type Framebuffer: Copy + Eq + Debug;
    type Sampler: Copy + Eq + Debug;

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        size: usize,
        usage: BufferUsage,
    ) -> Result<Self::Buffer>;
    /// Replaces the whole store; the buffer takes `data.len()` bytes.
    fn upload_buffer(
        &mut self,
        target: BufferTarget,
        buffer: Self::Buffer,
        data: &[u8],
        usage: BufferUsage,
    );
    fn write_buffer(
        &mut self,
        target: BufferTarget,
        buffer: Self::Buffer,
        offset: usize,
        data: &[u8],
    );
    fn copy_buffer(
        &mut self,
        src: Self::Buffer,
        dst: Self::Buffer,
        src_offset: usize,
        dst_offset: usize,
        len: usize,
    );
    fn delete_buffer(&mut self, buffer: Self::Buffer);

    /// Maps `len` bytes of a pixel-unpack buffer for writing.
    fn map_buffer(&mut self, buffer: Self::Buffer, len: usize) -> Result<()>;
    fn mapped_buffer(&mut self, buffer: Self::Buffer) -> Option<&mut [u8]>;
    fn unmap_buffer(&mut self, buffer: Self::Buffer);

    /// A vertex layout for `format` sourcing attributes from `buffer`.
    fn create_vertex_array(
        &mut self,
        format: VertexFormat,
        buffer: Self::Buffer,
    ) -> Result<Self::VertexArray>;
    fn bind_vertex_array(&mut self, array: Option<Self::VertexArray>);
    fn delete_vertex_array(&mut self, array: Self::VertexArray);
    /// Binds the element buffer. The binding belongs to the bound vertex array.
    fn bind_index_buffer(&mut self, buffer: Option<Self::Buffer>);

    // ── programs ──────────────────────────────────────────────────────────

    /// Compiles and links a program. The error is the compiler or linker log.
    fn create_program(
        &mut self,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) -> std::result::Result<Self::Program, String>;
    fn uniform_location(&mut self, program: Self::Program, name: &str) -> Option<Self::Uniform>;
    fn use_program(&mut self, program: Option<Self::Program>);
    fn set_uniform(&mut self, location: &Self::Uniform, kind: UniformKind, values: &[f32]);
    fn delete_program(&mut self, program: Self::Program);

    // ── textures and targets ──────────────────────────────────────────────

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Self::Texture>;
    /// Uploads one face (`None` for flat textures).
    fn upload_texture(
        &mut self,
        texture: Self::Texture,
        desc: &TextureDesc,
        face: Option<CubeMapFace>,
        pixels: &[PixelColor],
    );
    /// Uploads a flat texture from a pixel-unpack buffer.
    fn upload_texture_from_buffer(
        &mut self,
        texture: Self::Texture,
        desc: &TextureDesc,
        buffer: Self::Buffer,
    );
    fn bind_texture(&mut self, unit: u32, texture: Option<(Self::Texture, TextureKind)>);
    fn delete_texture(&mut self, texture: Self::Texture);

    fn create_framebuffer(
        &mut self,
        texture: Self::Texture,
        desc: &TextureDesc,
        depth: bool,
    ) -> Result<Self::Framebuffer>;
    /// `None` binds the backbuffer.
    fn bind_framebuffer(&mut self, framebuffer: Option<Self::Framebuffer>);
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);
    /// Copies the bound framebuffer into a cube face.
    fn copy_framebuffer_to_cube_face(
        &mut self,
        texture: Self::Texture,
        face: CubeMapFace,
        size: u32,
        generate_mipmaps: bool,
    );

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<Self::Sampler>;
    fn bind_sampler(&mut self, unit: u32, sampler: Option<Self::Sampler>);
    fn delete_sampler(&mut self, sampler: Self::Sampler);

    // ── fixed function ────────────────────────────────────────────────────

    fn set_viewport(&mut self, width: u32, height: u32);
    /// Clears color and/or depth of the bound target. Clearing depth enables depth
    /// writes first.
    fn clear(&mut self, color: Option<PixelColor>, depth: Option<f32>);
    fn set_rasterizer(&mut self, cull: CullMode, fill: FillMode);
    /// `None` disables blending.
    fn set_blend(&mut self, blend: Option<BlendState>);
    /// `None` disables depth testing.
    fn set_depth(&mut self, depth: Option<DepthState>);

    // ── draws ─────────────────────────────────────────────────────────────

    fn draw_arrays(&mut self, primitive: PrimitiveType, first: u32, count: u32);
    /// Draws `count` 32-bit indices starting at `index_offset` bytes, adding
    /// `base_vertex` to each.
    fn draw_indexed(
        &mut self,
        primitive: PrimitiveType,
        count: u32,
        index_offset: usize,
        base_vertex: i32,
    );

    /// Returns and clears the sticky error flag.
    fn poll_error(&mut self) -> Option<u32>;

    /// Forwards driver diagnostics to `log`. Backends without diagnostics ignore it.
    fn enable_debug_output(&mut self, log: DebugLog) {
        let _ = log;
    }
}
