//! Native window + OpenGL context.
//!
//! Owns the `winit` window, the `glutin` context and surface, and the
//! `glow` function table exposed to resources as a [`GlContext`](crate::gl::GlContext).
//! The event loop behind every window on a thread is shared and released
//! with the last window.

mod gl_window;
mod platform;

pub use gl_window::{Window, WindowConfig};
