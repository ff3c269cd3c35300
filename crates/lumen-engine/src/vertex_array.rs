//! Vertex array objects: attribute layouts plus one index buffer.

use std::rc::Weak;

use crate::buffer::Buffer;
use crate::gl::{AttributeType, BindGuard, BufferKind, GlContext, IndexType, PrimitiveMode};

/// Layout of one attribute slot inside an interleaved vertex buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub components: i32,
    pub ty: AttributeType,
    pub normalized: bool,
    /// Byte distance between consecutive vertices; `0` means tightly packed.
    pub stride: i32,
    /// Byte offset of the first component.
    pub offset: i32,
}

impl VertexAttribute {
    /// `components` floats at `offset` within a `stride`-byte vertex.
    pub fn floats(components: i32, stride: i32, offset: i32) -> Self {
        Self {
            components,
            ty: AttributeType::Float,
            normalized: false,
            stride,
            offset,
        }
    }
}

/// Non-owning link to a buffer the array reads from.
#[derive(Debug, Clone)]
struct BufferLink {
    handle: u32,
    alive: Weak<()>,
}

impl BufferLink {
    fn to(buffer: &Buffer) -> Self {
        Self {
            handle: buffer.handle(),
            alive: buffer.liveness(),
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// Recorded attribute slot.
#[derive(Debug, Clone)]
pub struct AttributeBinding {
    pub slot: u32,
    pub layout: VertexAttribute,
    pub buffer: u32,
    source: BufferLink,
}

/// One vertex array object, released when dropped.
///
/// The array never owns the buffers it references. Vertex and index buffers
/// must outlive every draw through this array; debug builds assert it in
/// [`bind`](Self::bind) and [`draw`](Self::draw).
pub struct VertexArray {
    ctx: GlContext,
    handle: u32,
    attributes: Vec<AttributeBinding>,
    index_buffer: Option<BufferLink>,
}

impl VertexArray {
    pub fn new(ctx: &GlContext) -> Self {
        let handle = ctx.api().create_vertex_array();
        if handle == 0 {
            log::warn!("device refused to allocate a vertex array");
        }
        Self {
            ctx: ctx.clone(),
            handle,
            attributes: Vec::new(),
            index_buffer: None,
        }
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    /// Points `slot` at `layout` inside `buffer` and enables it.
    ///
    /// Re-adding a slot replaces its previous layout. Slot collisions and
    /// stride/offset consistency with the buffer size are not checked.
    pub fn add_vertex_attribute(&mut self, buffer: &Buffer, slot: u32, layout: VertexAttribute) {
        debug_assert_eq!(buffer.kind(), BufferKind::Vertex, "attribute source must be a vertex buffer");
        {
            let api = self.ctx.api();
            let _array = BindGuard::vertex_array(api, self.handle);
            let _buffer = BindGuard::buffer(api, BufferKind::Vertex.target(), buffer.handle());
            api.enable_vertex_attrib_array(slot);
            api.vertex_attrib_pointer(
                slot,
                layout.components,
                layout.ty.gl_enum(),
                layout.normalized,
                layout.stride,
                layout.offset,
            );
        }

        let binding = AttributeBinding {
            slot,
            layout,
            buffer: buffer.handle(),
            source: BufferLink::to(buffer),
        };
        match self.attributes.iter_mut().find(|a| a.slot == slot) {
            Some(existing) => *existing = binding,
            None => self.attributes.push(binding),
        }
    }

    /// Associates `buffer` as the element source; the last call wins.
    pub fn set_index_buffer(&mut self, buffer: &Buffer) {
        debug_assert_eq!(buffer.kind(), BufferKind::Index, "element source must be an index buffer");
        {
            let api = self.ctx.api();
            let _array = BindGuard::vertex_array(api, self.handle);
            // Captured by the array; not restored.
            api.bind_buffer(BufferKind::Index.target(), buffer.handle());
        }
        self.index_buffer = Some(BufferLink::to(buffer));
    }

    pub fn attributes(&self) -> &[AttributeBinding] {
        &self.attributes
    }

    /// Handle of the associated index buffer, if any.
    pub fn index_buffer(&self) -> Option<u32> {
        self.index_buffer.as_ref().map(|link| link.handle)
    }

    /// `false` once the associated index buffer has been dropped.
    pub fn index_buffer_alive(&self) -> bool {
        self.index_buffer.as_ref().is_some_and(BufferLink::is_alive)
    }

    fn sources_alive(&self) -> bool {
        self.attributes.iter().all(|a| a.source.is_alive())
            && self.index_buffer.as_ref().is_none_or(BufferLink::is_alive)
    }

    pub fn bind(&self) {
        debug_assert!(self.sources_alive(), "vertex array {} outlived a source buffer", self.handle);
        self.ctx.api().bind_vertex_array(self.handle);
    }

    pub fn unbind(&self) {
        self.ctx.api().bind_vertex_array(0);
    }

    /// Binds this array and issues an indexed draw of `count` elements.
    pub fn draw(&self, mode: PrimitiveMode, count: i32, index_type: IndexType) {
        debug_assert!(self.index_buffer.is_some(), "indexed draw without an index buffer");
        self.bind();
        self.ctx.draw_elements(mode, count, index_type, 0);
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        if self.handle != 0 {
            self.ctx.api().delete_vertex_array(self.handle);
        }
    }
}

impl std::fmt::Debug for VertexArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexArray")
            .field("handle", &self.handle)
            .field("attributes", &self.attributes.len())
            .field("index_buffer", &self.index_buffer())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{BufferUsage, GlApi};

    fn vertex_buffer(ctx: &GlContext, data: &[f32]) -> Buffer {
        let mut buf = Buffer::new(ctx, BufferKind::Vertex);
        buf.upload(data, BufferUsage::StaticDraw).unwrap();
        buf
    }

    fn index_buffer(ctx: &GlContext, data: &[u32]) -> Buffer {
        let mut buf = Buffer::new(ctx, BufferKind::Index);
        buf.upload(data, BufferUsage::StaticDraw).unwrap();
        buf
    }

    #[test]
    fn attribute_layout_reaches_the_device() {
        let (ctx, gl) = GlContext::headless();
        let vbo = vertex_buffer(&ctx, &[0.0; 10]);
        let mut vao = VertexArray::new(&ctx);

        vao.add_vertex_attribute(&vbo, 1, VertexAttribute::floats(2, 20, 12));

        let pointer = gl.attrib_pointer(vao.handle(), 1).unwrap();
        assert!(pointer.enabled);
        assert_eq!(pointer.buffer, vbo.handle());
        assert_eq!((pointer.components, pointer.stride, pointer.offset), (2, 20, 12));
        assert_eq!(gl.vertex_array_binding(), 0);
        assert_eq!(gl.buffer_binding(glow::ARRAY_BUFFER), 0);
    }

    #[test]
    fn same_slot_replaces_the_recorded_layout() {
        let (ctx, _gl) = GlContext::headless();
        let vbo = vertex_buffer(&ctx, &[0.0; 8]);
        let mut vao = VertexArray::new(&ctx);

        vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(3, 0, 0));
        vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(4, 0, 0));

        assert_eq!(vao.attributes().len(), 1);
        assert_eq!(vao.attributes()[0].layout.components, 4);
    }

    #[test]
    fn index_buffer_is_captured_by_the_array() {
        let (ctx, gl) = GlContext::headless();
        let first = index_buffer(&ctx, &[0, 1, 2]);
        let second = index_buffer(&ctx, &[2, 1, 0]);
        let mut vao = VertexArray::new(&ctx);

        vao.set_index_buffer(&first);
        vao.set_index_buffer(&second);

        assert_eq!(vao.index_buffer(), Some(second.handle()));
        assert_eq!(gl.element_buffer(vao.handle()), second.handle());
        assert_eq!(gl.buffer_binding(glow::ELEMENT_ARRAY_BUFFER), 0);
    }

    #[test]
    fn index_link_reports_a_dropped_buffer() {
        let (ctx, _gl) = GlContext::headless();
        let ebo = index_buffer(&ctx, &[0, 1, 2]);
        let mut vao = VertexArray::new(&ctx);
        vao.set_index_buffer(&ebo);
        assert!(vao.index_buffer_alive());

        drop(ebo);
        assert!(!vao.index_buffer_alive());
        assert!(vao.index_buffer().is_some());
    }

    #[test]
    fn bind_and_unbind_are_idempotent() {
        let (ctx, gl) = GlContext::headless();
        let vao = VertexArray::new(&ctx);
        vao.bind();
        vao.bind();
        assert_eq!(gl.vertex_array_binding(), vao.handle());
        vao.unbind();
        vao.unbind();
        assert_eq!(gl.vertex_array_binding(), 0);
        assert!(gl.take_errors().is_empty());
    }

    #[test]
    fn draw_fetches_through_the_layout() {
        let (ctx, gl) = GlContext::headless();
        // Two vertices of (x, y, u, v); only xy is wired.
        let vbo = vertex_buffer(&ctx, &[1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 1.0, 1.0]);
        let ebo = index_buffer(&ctx, &[1, 0]);
        let mut vao = VertexArray::new(&ctx);
        vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(2, 16, 0));
        vao.set_index_buffer(&ebo);

        vao.draw(PrimitiveMode::Lines, 2, IndexType::U32);

        let draws = gl.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].mode, glow::LINES);
        assert_eq!(draws[0].fetched[&0], vec![3.0, 4.0, 1.0, 2.0]);
    }

    // ── liveness ───────────────────────────────────────────────────────────

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outlived a source buffer")]
    fn bind_after_vertex_buffer_dropped_panics() {
        let (ctx, _gl) = GlContext::headless();
        let vbo = vertex_buffer(&ctx, &[0.0; 9]);
        let mut vao = VertexArray::new(&ctx);
        vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(3, 0, 0));
        drop(vbo);
        vao.bind();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outlived a source buffer")]
    fn bind_after_index_buffer_dropped_panics() {
        let (ctx, _gl) = GlContext::headless();
        let ebo = index_buffer(&ctx, &[0, 1, 2]);
        let mut vao = VertexArray::new(&ctx);
        vao.set_index_buffer(&ebo);
        drop(ebo);
        vao.bind();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outlived a source buffer")]
    fn draw_after_vertex_buffer_dropped_panics() {
        let (ctx, _gl) = GlContext::headless();
        let vbo = vertex_buffer(&ctx, &[0.0; 9]);
        let ebo = index_buffer(&ctx, &[0, 1, 2]);
        let mut vao = VertexArray::new(&ctx);
        vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(3, 0, 0));
        vao.set_index_buffer(&ebo);
        drop(vbo);
        vao.draw(PrimitiveMode::Triangles, 3, IndexType::U32);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outlived a source buffer")]
    fn draw_after_index_buffer_dropped_panics() {
        let (ctx, _gl) = GlContext::headless();
        let vbo = vertex_buffer(&ctx, &[0.0; 9]);
        let ebo = index_buffer(&ctx, &[0, 1, 2]);
        let mut vao = VertexArray::new(&ctx);
        vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(3, 0, 0));
        vao.set_index_buffer(&ebo);
        drop(ebo);
        vao.draw(PrimitiveMode::Triangles, 3, IndexType::U32);
    }

    #[test]
    fn live_sources_pass_the_check() {
        let (ctx, gl) = GlContext::headless();
        let vbo = vertex_buffer(&ctx, &[0.0; 9]);
        let ebo = index_buffer(&ctx, &[0, 1, 2]);
        let mut vao = VertexArray::new(&ctx);
        vao.add_vertex_attribute(&vbo, 0, VertexAttribute::floats(3, 0, 0));
        vao.set_index_buffer(&ebo);

        vao.draw(PrimitiveMode::Triangles, 3, IndexType::U32);

        assert_eq!(gl.draws().len(), 1);
    }

    #[test]
    fn drop_releases_the_handle() {
        let (ctx, gl) = GlContext::headless();
        let vao = VertexArray::new(&ctx);
        assert_eq!(gl.live_vertex_arrays(), 1);
        drop(vao);
        assert_eq!(gl.live_vertex_arrays(), 0);
    }
}
