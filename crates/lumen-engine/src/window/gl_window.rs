use std::num::NonZeroU32;
use std::rc::Rc;

use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::dpi::PhysicalSize;
use winit::window::WindowId;

use crate::error::{EngineError, Result};
use crate::gl::{GlContext, GlowApi};

use super::platform::Platform;

/// Window and context configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    /// Inner size in physical pixels.
    pub width: u32,
    pub height: u32,
    /// Requested core-profile version, `(major, minor)`.
    pub gl_version: (u8, u8),
    pub vsync: bool,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            width: 800,
            height: 600,
            gl_version: (3, 3),
            vsync: true,
            resizable: true,
        }
    }
}

/// A native window with a current core-profile OpenGL context.
///
/// Must stay on the thread that created it. Resources created from
/// [`gl`](Self::gl) may outlive the window; their native objects are then
/// abandoned with the context instead of being deleted.
pub struct Window {
    gl: GlContext,
    api: Rc<GlowApi>,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: winit::window::Window,
    platform: Rc<Platform>,
    id: WindowId,
    size: (u32, u32),
    should_close: bool,
}

impl Window {
    /// Opens the window, creates and binds the context, and loads the
    /// function table.
    pub fn new(config: WindowConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(EngineError::init(
                "window creation",
                format!("invalid size {}x{}", config.width, config.height),
            ));
        }
        let platform = Platform::acquire()?;

        let attributes = winit::window::Window::default_attributes()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        let (window, gl_config) = platform
            .with_event_loop(|event_loop| {
                DisplayBuilder::new()
                    .with_window_attributes(Some(attributes))
                    .build(event_loop, ConfigTemplateBuilder::new(), pick_config)
            })
            .map_err(|e| EngineError::init("display creation", e))?;
        let window = window.ok_or_else(|| EngineError::init("window creation", "no window returned"))?;

        let raw_handle = window
            .window_handle()
            .map_err(|e| EngineError::init("window handle", e))?
            .as_raw();
        let (major, minor) = config.gl_version;
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
            .build(Some(raw_handle));

        let display = gl_config.display();
        // SAFETY: `raw_handle` belongs to `window`, which outlives the context.
        let not_current = unsafe { display.create_context(&gl_config, &context_attributes) }
            .map_err(|e| EngineError::init("context creation", e))?;

        let surface_attributes = window
            .build_surface_attributes(Default::default())
            .map_err(|e| EngineError::init("surface creation", e))?;
        // SAFETY: as above, the window outlives the surface.
        let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
            .map_err(|e| EngineError::init("surface creation", e))?;
        let context = not_current
            .make_current(&surface)
            .map_err(|e| EngineError::init("making the context current", e))?;

        if config.vsync {
            if let Err(e) = surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN)) {
                log::warn!("vsync unavailable: {e}");
            }
        }

        if display.get_proc_address(c"glGetString").is_null() {
            return Err(EngineError::init("function loading", "glGetString did not resolve"));
        }
        // SAFETY: the context was made current on this thread above and
        // stays current until `Drop` releases the table.
        let api = unsafe {
            let gl = glow::Context::from_loader_function_cstr(|name| display.get_proc_address(name).cast());
            Rc::new(GlowApi::new(gl))
        };
        log::info!("OpenGL {}", api.version_string());

        let gl = GlContext::new(api.clone());
        let PhysicalSize { width, height } = window.inner_size();
        gl.viewport(0, 0, width as i32, height as i32);

        let id = window.id();
        platform.register(id);
        log::debug!("window {id:?} '{}' opened at {width}x{height}", config.title);

        Ok(Self {
            gl,
            api,
            surface,
            context,
            window,
            platform,
            id,
            size: (width, height),
            should_close: false,
        })
    }

    /// Handle for creating resources on this window's context.
    pub fn gl(&self) -> GlContext {
        self.gl.clone()
    }

    /// Inner size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn should_close(&self) -> bool {
        self.should_close
    }

    pub fn set_should_close(&mut self, value: bool) {
        self.should_close = value;
    }

    /// Dispatches pending OS events without blocking.
    ///
    /// A close request latches [`should_close`](Self::should_close); a
    /// resize updates the surface and the viewport.
    pub fn poll_events(&mut self) {
        self.platform.pump();
        let signals = self.platform.take_signals(self.id);
        if signals.close_requested {
            log::debug!("window {:?} close requested", self.id);
            self.should_close = true;
        }
        if let Some(size) = signals.resized {
            self.resize(size);
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = (size.width, size.height);
        // Minimized windows report 0x0.
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return;
        };
        self.surface.resize(&self.context, width, height);
        self.gl.viewport(0, 0, size.width as i32, size.height as i32);
    }

    /// Presents the back buffer.
    pub fn swap_buffers(&self) -> Result<()> {
        self.window.pre_present_notify();
        self.surface.swap_buffers(&self.context).map_err(|e| {
            let err = EngineError::Present {
                reason: e.to_string(),
            };
            log::error!("{err}");
            err
        })
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.api.release();
        self.platform.unregister(self.id);
        log::debug!("window {:?} closed", self.id);
    }
}

/// Prefers the config with the most samples.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, candidate| {
            if candidate.num_samples() > best.num_samples() {
                candidate
            } else {
                best
            }
        })
        .expect("display offered no framebuffer configs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_demos() {
        let config = WindowConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.gl_version, (3, 3));
        assert!(config.vsync);
    }

    #[test]
    fn zero_sized_window_is_rejected_before_touching_the_platform() {
        let config = WindowConfig {
            width: 0,
            ..WindowConfig::default()
        };
        let err = Window::new(config).err().unwrap();
        assert!(matches!(err, EngineError::InitFailed { what: "window creation", .. }));
        assert!(!Platform::is_live());
    }
}
