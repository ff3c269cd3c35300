//! Owned device buffers.

use std::rc::{Rc, Weak};

use bytemuck::Pod;

use crate::error::{EngineError, Result};
use crate::gl::{BindGuard, BufferKind, BufferUsage, GlContext};

/// One device buffer, released when dropped.
///
/// `size` tracks the byte length of the last successful [`upload`](Self::upload);
/// partial [`update`](Self::update)s must stay inside it.
pub struct Buffer {
    ctx: GlContext,
    handle: u32,
    kind: BufferKind,
    size: usize,
    alive: Rc<()>,
}

impl Buffer {
    /// Allocates a buffer name.
    ///
    /// A device that refuses the allocation yields a buffer whose
    /// [`is_null`](Self::is_null) is `true`; every operation on it is then
    /// reported by the driver rather than here.
    pub fn new(ctx: &GlContext, kind: BufferKind) -> Self {
        let handle = ctx.api().create_buffer();
        if handle == 0 {
            log::warn!("device refused to allocate a {kind:?} buffer");
        }
        Self {
            ctx: ctx.clone(),
            handle,
            kind,
            size: 0,
            alive: Rc::new(()),
        }
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn is_null(&self) -> bool {
        self.handle == 0
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Byte length of the last upload.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Replaces the whole backing store with `data`.
    pub fn upload<T: Pod>(&mut self, data: &[T], usage: BufferUsage) -> Result<()> {
        self.upload_bytes(bytemuck::cast_slice(data), usage)
    }

    pub fn upload_bytes(&mut self, bytes: &[u8], usage: BufferUsage) -> Result<()> {
        if bytes.is_empty() {
            log::error!("refusing empty upload to {:?} buffer {}", self.kind, self.handle);
            return Err(EngineError::InvalidData);
        }
        let api = self.ctx.api();
        let target = self.kind.target();
        let _bound = BindGuard::buffer(api, target, self.handle);
        api.buffer_data(target, bytes, usage.gl_enum());
        self.size = bytes.len();
        Ok(())
    }

    /// Overwrites `data.len()` elements starting at byte `offset`.
    pub fn update<T: Pod>(&mut self, offset: usize, data: &[T]) -> Result<()> {
        self.update_bytes(offset, bytemuck::cast_slice(data))
    }

    pub fn update_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let fits = offset
            .checked_add(bytes.len())
            .is_some_and(|end| end <= self.size);
        if !fits {
            let err = EngineError::OutOfBounds {
                offset,
                len: bytes.len(),
                size: self.size,
            };
            log::error!("{err}");
            return Err(err);
        }
        if bytes.is_empty() {
            return Ok(());
        }
        let api = self.ctx.api();
        let target = self.kind.target();
        let _bound = BindGuard::buffer(api, target, self.handle);
        api.buffer_sub_data(target, offset, bytes);
        Ok(())
    }

    /// Copies the device contents back to the host.
    pub fn read_back(&self) -> Vec<u8> {
        let mut out = vec![0; self.size];
        if self.size > 0 {
            let api = self.ctx.api();
            let target = self.kind.target();
            let _bound = BindGuard::buffer(api, target, self.handle);
            api.get_buffer_sub_data(target, 0, &mut out);
        }
        out
    }

    pub fn bind(&self) {
        self.ctx.api().bind_buffer(self.kind.target(), self.handle);
    }

    pub fn unbind(&self) {
        self.ctx.api().bind_buffer(self.kind.target(), 0);
    }

    /// Weak token that stops upgrading once this buffer is dropped.
    pub(crate) fn liveness(&self) -> Weak<()> {
        Rc::downgrade(&self.alive)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if self.handle != 0 {
            self.ctx.api().delete_buffer(self.handle);
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .finish()
    }
}
