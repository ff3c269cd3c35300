//! Shared scaffolding for the demo binaries.

use std::path::PathBuf;

use anyhow::{Context, Result};
use lumen_engine::gl::GlContext;
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::time::{FrameClock, FrameTime};
use lumen_engine::{Window, WindowConfig};

/// Exit status for a geometry upload failure.
pub const UPLOAD_FAILED: i32 = -1;

/// Path of a file under this crate's `assets/` directory.
pub fn asset_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join(relative)
}

/// Installs logging and opens an 800×600 window titled `title`.
pub fn open_window(title: &str) -> Result<Window> {
    init_logging(LoggingConfig::default());
    Window::new(WindowConfig {
        title: title.to_string(),
        ..WindowConfig::default()
    })
    .with_context(|| format!("failed to open the '{title}' window"))
}

/// Polls, renders and presents until the window is asked to close.
pub fn run_frames(
    window: &mut Window,
    mut frame: impl FnMut(&GlContext, FrameTime) -> Result<()>,
) -> Result<()> {
    let gl = window.gl();
    let mut clock = FrameClock::new();
    let mut presented = 0u64;
    while !window.should_close() {
        window.poll_events();
        frame(&gl, clock.tick())?;
        window.swap_buffers().context("failed to present")?;
        presented += 1;
    }
    log::info!("window closed after {presented} frames");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_assets_exist() {
        for name in ["triangle.vert", "triangle.frag", "textured.vert", "textured.frag"] {
            let path = asset_path(&format!("shaders/{name}"));
            assert!(path.is_file(), "missing {}", path.display());
        }
    }
}
