use bytemuck::Pod;

use super::{DeviceError, RenderDevice};
use crate::arena::{Vertex, VertexFormat};
use crate::backend::{Backend, BufferTarget, BufferUsage};
use crate::paint::PixelColor;
use crate::resources::{
    CubeMapFace, IndexBuffer, IndexBufferId, Texture, TextureId, TextureKind, VertexBuffer,
    VertexBufferId,
};
use crate::state::DirtyFlags;

impl<B: Backend> RenderDevice<B> {
    // ── vertex data ───────────────────────────────────────────────────────

    /// Replaces the buffer's contents. The data moves to the end of its format's
    /// arena, compacting the arena first when it does not fit.
    pub fn set_vertex_buffer_data<V: Vertex>(
        &mut self,
        buffer: &VertexBuffer,
        vertices: &[V],
    ) -> Result<(), DeviceError> {
        self.set_vertex_buffer_bytes(buffer, V::FORMAT, bytemuck::cast_slice(vertices))
    }

    /// Untyped form of [`set_vertex_buffer_data`](Self::set_vertex_buffer_data).
    pub fn set_vertex_buffer_bytes(
        &mut self,
        buffer: &VertexBuffer,
        format: VertexFormat,
        bytes: &[u8],
    ) -> Result<(), DeviceError> {
        let result = self
            .vertex_buffer_id(buffer)
            .and_then(|id| self.upload_vertices(id, format, bytes));
        self.record(result)
    }

    fn upload_vertices(
        &mut self,
        id: VertexBufferId,
        format: VertexFormat,
        bytes: &[u8],
    ) -> Result<(), DeviceError> {
        let stride = format.stride();
        if bytes.len() % stride != 0 {
            return Err(DeviceError::VertexDataSize {
                len: bytes.len(),
                stride,
            });
        }

        self.core.ensure_current();

        // The old range becomes a hole; it is not copied if compaction runs now.
        let record = &mut self.core.vertex_buffers[id];
        let old_format = record.format;
        let mut old = None;
        if let Some(previous) = record.allocation.take() {
            old = self.core.arenas[old_format.index()].arena.free(previous);
        }

        let (allocation_id, allocation, rebuilt) =
            match self.core.allocate_vertices(format, bytes.len()) {
                Ok(allocated) => allocated,
                Err(err) => {
                    // A failed rebuild leaves the arena as it was, old bytes included.
                    if let Some(old) = old {
                        let restored = self.core.arenas[old_format.index()].arena.reinstate(old);
                        self.core.vertex_buffers[id].allocation = restored;
                    }
                    return Err(err);
                }
            };
        if rebuilt {
            self.tracker.invalidate(DirtyFlags::VERTEX_BUFFER);
        }

        let record = &mut self.core.vertex_buffers[id];
        record.format = format;
        record.allocation = Some(allocation_id);

        if let Some(arena_buffer) = self.core.arenas[format.index()].buffer {
            self.core
                .backend
                .write_buffer(BufferTarget::Vertex, arena_buffer, allocation.offset, bytes);
        }

        if old_format != format && self.tracker.state().vertex_buffer == Some(id) {
            self.tracker.forget_vertex_buffer(id);
            self.tracker.set_vertex_buffer(Some((id, format)));
        }

        self.core.check_error()
    }

    /// Overwrites part of the buffer in place. `offset` is in bytes from the start
    /// of the buffer's own data; the write never moves the buffer.
    pub fn set_vertex_buffer_subdata<T: Pod>(
        &mut self,
        buffer: &VertexBuffer,
        offset: usize,
        data: &[T],
    ) -> Result<(), DeviceError> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let result = self
            .vertex_buffer_id(buffer)
            .and_then(|id| self.write_vertices(id, offset, bytes));
        self.record(result)
    }

    fn write_vertices(
        &mut self,
        id: VertexBufferId,
        offset: usize,
        bytes: &[u8],
    ) -> Result<(), DeviceError> {
        let record = &self.core.vertex_buffers[id];
        let slot = &self.core.arenas[record.format.index()];
        let allocation = record.allocation.and_then(|a| slot.arena.get(a));

        let end = offset.saturating_add(bytes.len());
        let (allocation, arena_buffer) = match (allocation, slot.buffer) {
            (Some(allocation), Some(arena_buffer)) if end <= allocation.size => {
                (allocation, arena_buffer)
            }
            (allocation, _) => {
                return Err(DeviceError::OutOfRange {
                    offset,
                    end,
                    size: allocation.map_or(0, |a| a.size),
                });
            }
        };

        self.core.ensure_current();
        self.core.backend.write_buffer(
            BufferTarget::Vertex,
            arena_buffer,
            allocation.offset + offset,
            bytes,
        );
        self.core.check_error()
    }

    // ── index data ────────────────────────────────────────────────────────

    /// Replaces the index buffer's contents with 32-bit indices.
    pub fn set_index_buffer_data(
        &mut self,
        buffer: &IndexBuffer,
        indices: &[u32],
    ) -> Result<(), DeviceError> {
        let result = self
            .index_buffer_id(buffer)
            .and_then(|id| self.upload_indices(id, indices));
        self.record(result)
    }

    fn upload_indices(&mut self, id: IndexBufferId, indices: &[u32]) -> Result<(), DeviceError> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        self.core.ensure_current();

        let gpu = match self.core.index_buffers[id].buffer {
            Some(gpu) => gpu,
            None => {
                let gpu = self
                    .core
                    .backend
                    .create_buffer(BufferTarget::Index, bytes.len(), BufferUsage::Static)
                    .map_err(|e| DeviceError::construction("index buffer", e))?;
                self.core.index_buffers[id].buffer = Some(gpu);
                // The element binding may have referenced the buffer before it existed.
                if self.tracker.state().index_buffer == Some(id) {
                    self.tracker.invalidate(DirtyFlags::INDEX_BUFFER);
                }
                gpu
            }
        };

        self.core
            .backend
            .upload_buffer(BufferTarget::Index, gpu, bytes, BufferUsage::Static);
        self.core.check_error()
    }

    // ── texture data ──────────────────────────────────────────────────────

    /// Replaces a flat texture's pixels (`width * height`, row-major).
    pub fn set_pixels(
        &mut self,
        texture: &Texture,
        pixels: &[PixelColor],
    ) -> Result<(), DeviceError> {
        let result = self
            .texture_id(texture)
            .and_then(|id| self.store_pixels(id, None, pixels));
        self.record(result)
    }

    /// Replaces one face of a cube texture.
    pub fn set_cube_pixels(
        &mut self,
        texture: &Texture,
        face: CubeMapFace,
        pixels: &[PixelColor],
    ) -> Result<(), DeviceError> {
        let result = self
            .texture_id(texture)
            .and_then(|id| self.store_pixels(id, Some(face), pixels));
        self.record(result)
    }

    fn store_pixels(
        &mut self,
        id: TextureId,
        face: Option<CubeMapFace>,
        pixels: &[PixelColor],
    ) -> Result<(), DeviceError> {
        let record = &mut self.core.textures[id];
        match (record.desc.kind, face) {
            (TextureKind::Flat, None) | (TextureKind::Cube, Some(_)) => {}
            (TextureKind::Flat, Some(_)) => {
                return Err(DeviceError::WrongTextureKind { expected: "cube" });
            }
            (TextureKind::Cube, None) => {
                return Err(DeviceError::WrongTextureKind { expected: "flat" });
            }
        }

        let expected = record.desc.texel_count();
        if pixels.len() != expected {
            return Err(DeviceError::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }

        let index = face.map_or(0, CubeMapFace::index);
        record.pixels[index] = pixels.to_vec();

        // Not created yet: the pixels go up with the first bind.
        let Some(gpu) = record.gpu else {
            return Ok(());
        };
        let desc = record.desc;

        self.core.ensure_current();
        self.core.backend.upload_texture(gpu, &desc, face, pixels);
        self.tracker.invalidate(DirtyFlags::TEXTURES);
        self.core.check_error()
    }

    // ── pixel buffers ─────────────────────────────────────────────────────

    /// Maps the texture's pixel-unpack buffer for writing. The pixels reach the
    /// texture when the returned map is unmapped or dropped.
    pub fn map_pbo(&mut self, texture: &Texture) -> Result<PixelBufferMap<'_, B>, DeviceError> {
        let result = self
            .texture_id(texture)
            .and_then(|id| self.map_pixel_buffer(id).map(|buffer| (id, buffer)));
        let (texture, buffer) = self.record(result)?;
        Ok(PixelBufferMap {
            device: self,
            texture,
            buffer,
            mapped: true,
        })
    }

    fn map_pixel_buffer(&mut self, id: TextureId) -> Result<B::Buffer, DeviceError> {
        let desc = self.core.textures[id].desc;
        if desc.kind != TextureKind::Flat {
            return Err(DeviceError::WrongTextureKind { expected: "flat" });
        }

        self.core.ensure_current();
        let buffer = match self.core.textures[id].pbo {
            Some(buffer) => buffer,
            None => {
                let buffer = self
                    .core
                    .backend
                    .create_buffer(BufferTarget::PixelUnpack, desc.byte_len(), BufferUsage::Stream)
                    .map_err(|e| DeviceError::construction("pixel buffer", e))?;
                self.core.textures[id].pbo = Some(buffer);
                buffer
            }
        };

        self.core
            .backend
            .map_buffer(buffer, desc.byte_len())
            .map_err(|e| DeviceError::MapFailed(format!("{e:#}")))?;
        if let Err(err) = self.core.check_error() {
            self.core.backend.unmap_buffer(buffer);
            return Err(err);
        }
        Ok(buffer)
    }

    fn unmap_pixel_buffer(&mut self, id: TextureId, buffer: B::Buffer) -> Result<(), DeviceError> {
        self.core.ensure_current();
        self.core.backend.unmap_buffer(buffer);

        let texture = self.core.gpu_texture(id)?;
        let desc = self.core.textures[id].desc;
        self.core
            .backend
            .upload_texture_from_buffer(texture, &desc, buffer);
        self.tracker.invalidate(DirtyFlags::TEXTURES);
        self.core.check_error()
    }
}

/// A mapped pixel-unpack buffer. Unmapping uploads its contents into the texture.
pub struct PixelBufferMap<'a, B: Backend> {
    device: &'a mut RenderDevice<B>,
    texture: TextureId,
    buffer: B::Buffer,
    mapped: bool,
}

impl<B: Backend> PixelBufferMap<'_, B> {
    /// The mapped texels, `width * height` of them.
    pub fn pixels_mut(&mut self) -> &mut [PixelColor] {
        self.device
            .core
            .backend
            .mapped_buffer(self.buffer)
            .map(bytemuck::cast_slice_mut)
            .unwrap_or_default()
    }

    /// Unmaps the buffer and uploads it into the texture.
    pub fn unmap(mut self) -> Result<(), DeviceError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), DeviceError> {
        if !std::mem::replace(&mut self.mapped, false) {
            return Ok(());
        }
        let result = self.device.unmap_pixel_buffer(self.texture, self.buffer);
        self.device.record(result)
    }
}

impl<B: Backend> Drop for PixelBufferMap<'_, B> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}
