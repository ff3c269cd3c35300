//! OpenGL function-table abstraction.
//!
//! Every wrapper talks to the driver through [`GlApi`]. Two backends exist:
//! - [`GlowApi`]: a loaded `glow::Context` owned by a [`Window`](crate::window::Window)
//! - `HeadlessGl`: an in-memory model for tests and offline tooling, built
//!   with the `headless` feature
//!
//! [`GlContext`] is the cheap, cloneable handle resources keep so they can
//! release their native objects on drop.

mod api;
mod bind;
#[cfg(any(test, feature = "headless"))]
mod headless;
mod native;
mod types;

use std::fmt;
use std::rc::Rc;

pub use api::{ActiveVariable, GlApi};
pub use bind::BindGuard;
#[cfg(any(test, feature = "headless"))]
pub use headless::{AttribPointer, DrawRecord, HeadlessGl, UniformData};
pub use native::GlowApi;
pub use types::{
    AttributeType, BufferKind, BufferUsage, ClearMask, IndexType, PrimitiveMode, ShaderStage,
    TextureTarget,
};

/// Shared handle to the function table of one context.
///
/// Not `Send`: a context is current on exactly one thread.
#[derive(Clone)]
pub struct GlContext {
    api: Rc<dyn GlApi>,
}

impl GlContext {
    pub fn new(api: Rc<dyn GlApi>) -> Self {
        Self { api }
    }

    /// Context over a fresh [`HeadlessGl`], returning both handles.
    #[cfg(any(test, feature = "headless"))]
    pub fn headless() -> (Self, Rc<HeadlessGl>) {
        let gl = Rc::new(HeadlessGl::new());
        (Self::new(gl.clone()), gl)
    }

    pub fn api(&self) -> &dyn GlApi {
        &*self.api
    }

    pub fn clear_color(&self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba;
        self.api.clear_color(r, g, b, a);
    }

    pub fn clear(&self, mask: ClearMask) {
        self.api.clear(mask.bits());
    }

    pub fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.api.viewport(x, y, width, height);
    }

    /// Indexed draw with whatever vertex array and program are bound.
    ///
    /// `offset` is in bytes into the bound index buffer.
    pub fn draw_elements(&self, mode: PrimitiveMode, count: i32, index_type: IndexType, offset: i32) {
        self.api
            .draw_elements(mode.gl_enum(), count, index_type.gl_enum(), offset);
    }

    /// Whether both handles point at the same function table.
    pub fn same_context(&self, other: &GlContext) -> bool {
        Rc::ptr_eq(&self.api, &other.api)
    }
}

impl fmt::Debug for GlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlContext")
            .field("api", &Rc::as_ptr(&self.api))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_commands_reach_the_backend() {
        let (ctx, gl) = GlContext::headless();
        ctx.clear_color([0.82, 0.0, 0.07, 1.0]);
        ctx.clear(ClearMask::COLOR | ClearMask::DEPTH);
        ctx.viewport(0, 0, 800, 600);

        assert_eq!(gl.clear_color_value(), [0.82, 0.0, 0.07, 1.0]);
        assert_eq!(gl.clear_count(), 1);
        assert_eq!(gl.viewport_rect(), [0, 0, 800, 600]);
    }

    #[test]
    fn clones_share_one_table() {
        let (ctx, _gl) = GlContext::headless();
        let other = GlContext::headless().0;
        assert!(ctx.same_context(&ctx.clone()));
        assert!(!ctx.same_context(&other));
    }
}
