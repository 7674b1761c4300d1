use super::{DeviceError, RenderDevice};
use crate::arena::{Allocation, FlatVertex, VertexFormat};
use crate::backend::{Backend, BufferTarget, BufferUsage};
use crate::draw::PrimitiveType;
use crate::state::DirtyFlags;

impl<B: Backend> RenderDevice<B> {
    /// Commits pending state. A failed commit leaves the failing category dirty.
    pub(super) fn commit_if_needed(&mut self) -> Result<(), DeviceError> {
        if !self.tracker.needs_commit() {
            return Ok(());
        }
        self.core.stats.commits += 1;
        self.tracker.commit(&mut self.core)
    }

    fn bound_allocation(&self) -> Result<(Allocation, VertexFormat), DeviceError> {
        self.tracker
            .state()
            .vertex_buffer
            .and_then(|id| self.core.allocation(id))
            .ok_or(DeviceError::NoVertexBuffer)
    }

    /// Draws `count` primitives reading vertices from `start` within the bound
    /// vertex buffer.
    pub fn draw(
        &mut self,
        primitive: PrimitiveType,
        start: u32,
        count: u32,
    ) -> Result<(), DeviceError> {
        let result = self.draw_arrays(primitive, start, count);
        self.record(result)
    }

    fn draw_arrays(
        &mut self,
        primitive: PrimitiveType,
        start: u32,
        count: u32,
    ) -> Result<(), DeviceError> {
        self.commit_if_needed()?;
        let (allocation, format) = self.bound_allocation()?;
        let range = primitive.vertex_count(count).and_then(|vertices| {
            let first = allocation.start_index.checked_add(start)?;
            first.checked_add(vertices)?;
            Some((first, vertices))
        });
        let (first, vertices) = range.ok_or_else(|| unaddressable(start, format.stride()))?;

        self.core.backend.draw_arrays(primitive, first, vertices);
        self.core.stats.draws += 1;
        self.core.check_error()
    }

    /// Draws `count` primitives using 32-bit indices from the bound index buffer,
    /// starting at index `start`. Indices are relative to the bound vertex buffer.
    pub fn draw_indexed(
        &mut self,
        primitive: PrimitiveType,
        start: u32,
        count: u32,
    ) -> Result<(), DeviceError> {
        let result = self.draw_elements(primitive, start, count);
        self.record(result)
    }

    fn draw_elements(
        &mut self,
        primitive: PrimitiveType,
        start: u32,
        count: u32,
    ) -> Result<(), DeviceError> {
        self.commit_if_needed()?;
        let (allocation, _) = self.bound_allocation()?;
        let index_size = std::mem::size_of::<u32>();
        let vertices = primitive
            .vertex_count(count)
            .filter(|&vertices| start.checked_add(vertices).is_some())
            .ok_or_else(|| unaddressable(start, index_size))?;
        let base_vertex = i32::try_from(allocation.start_index)
            .map_err(|_| unaddressable(allocation.start_index, index_size))?;

        self.core.backend.draw_indexed(
            primitive,
            vertices,
            start as usize * index_size,
            base_vertex,
        );
        self.core.stats.draws += 1;
        self.core.check_error()
    }

    /// Draws caller-owned vertices through the streaming buffer. The arena binding
    /// is restored on the next draw.
    pub fn draw_data(
        &mut self,
        primitive: PrimitiveType,
        start: u32,
        count: u32,
        vertices: &[FlatVertex],
    ) -> Result<(), DeviceError> {
        let result = self.draw_streamed(primitive, start, count, vertices);
        self.record(result)
    }

    fn draw_streamed(
        &mut self,
        primitive: PrimitiveType,
        start: u32,
        count: u32,
        vertices: &[FlatVertex],
    ) -> Result<(), DeviceError> {
        let stride = VertexFormat::Flat.stride();
        let vertex_count = primitive
            .vertex_count(count)
            .ok_or_else(|| unaddressable(start, stride))?;
        let first = start as usize;
        let end = first.saturating_add(vertex_count as usize);
        if end > vertices.len() {
            return Err(DeviceError::OutOfRange {
                offset: first.saturating_mul(stride),
                end: end.saturating_mul(stride),
                size: vertices.len() * stride,
            });
        }

        self.commit_if_needed()?;
        let (buffer, array) = self.stream_buffer()?;

        self.core.backend.bind_vertex_array(Some(array));
        self.tracker.invalidate(DirtyFlags::VERTEX_BUFFER);

        let bytes: &[u8] = bytemuck::cast_slice(&vertices[first..end]);
        self.core
            .backend
            .upload_buffer(BufferTarget::Vertex, buffer, bytes, BufferUsage::Stream);
        self.core.backend.draw_arrays(primitive, 0, vertex_count);
        self.core.stats.immediate_draws += 1;
        self.core.check_error()
    }

    fn stream_buffer(&mut self) -> Result<(B::Buffer, B::VertexArray), DeviceError> {
        if let Some(stream) = self.core.stream {
            return Ok(stream);
        }

        let backend = &mut self.core.backend;
        let buffer = backend
            .create_buffer(BufferTarget::Vertex, 0, BufferUsage::Stream)
            .map_err(|e| DeviceError::construction("stream buffer", e))?;
        let array = match backend.create_vertex_array(VertexFormat::Flat, buffer) {
            Ok(array) => array,
            Err(e) => {
                backend.delete_buffer(buffer);
                return Err(DeviceError::construction("stream layout", e));
            }
        };

        self.core.stream = Some((buffer, array));
        Ok((buffer, array))
    }
}

/// A draw whose vertex or index range does not fit the backend's 32-bit arguments.
fn unaddressable(start: u32, stride: usize) -> DeviceError {
    DeviceError::OutOfRange {
        offset: (start as usize).saturating_mul(stride),
        end: usize::MAX,
        size: (u32::MAX as usize).saturating_mul(stride),
    }
}
