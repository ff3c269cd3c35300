use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::WindowId;

use crate::error::{EngineError, Result};

/// Slot holding at most one shared instance of `T`.
///
/// The first [`acquire`](Self::acquire) creates the instance; later calls
/// share it while any lease is alive. When the last lease drops, so does
/// the instance, and the next `acquire` creates a new one.
pub(crate) struct LeaseSlot<T> {
    current: RefCell<Weak<T>>,
}

impl<T> LeaseSlot<T> {
    pub(crate) const fn new() -> Self {
        Self {
            current: RefCell::new(Weak::new()),
        }
    }

    pub(crate) fn acquire<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<Rc<T>, E> {
        if let Some(live) = self.current.borrow().upgrade() {
            return Ok(live);
        }
        let fresh = Rc::new(init()?);
        *self.current.borrow_mut() = Rc::downgrade(&fresh);
        Ok(fresh)
    }

    #[cfg(test)]
    pub(crate) fn is_live(&self) -> bool {
        self.current.borrow().strong_count() > 0
    }
}

thread_local! {
    static PLATFORM: LeaseSlot<Platform> = const { LeaseSlot::new() };
}

/// Window-level events accumulated between two polls.
#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct WindowSignals {
    pub close_requested: bool,
    pub resized: Option<PhysicalSize<u32>>,
}

/// Process windowing state: the event loop and per-window event mailboxes.
///
/// Shared by every [`Window`](super::Window) on the thread. Pumping on behalf
/// of one window may deliver events for another; those wait in its mailbox.
pub(crate) struct Platform {
    event_loop: RefCell<EventLoop<()>>,
    windows: RefCell<HashMap<WindowId, WindowSignals>>,
}

impl Platform {
    /// Lease on this thread's platform, creating it if no window holds one.
    pub(crate) fn acquire() -> Result<Rc<Platform>> {
        PLATFORM.with(|slot| slot.acquire(Platform::new))
    }

    /// Whether any window on this thread still holds the platform.
    #[cfg(test)]
    pub(crate) fn is_live() -> bool {
        PLATFORM.with(LeaseSlot::is_live)
    }

    fn new() -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| EngineError::init("event loop creation", e))?;
        log::debug!("windowing platform initialized");
        Ok(Self {
            event_loop: RefCell::new(event_loop),
            windows: RefCell::new(HashMap::new()),
        })
    }

    pub(crate) fn with_event_loop<R>(&self, f: impl FnOnce(&EventLoop<()>) -> R) -> R {
        f(&self.event_loop.borrow())
    }

    pub(crate) fn register(&self, id: WindowId) {
        self.windows.borrow_mut().insert(id, WindowSignals::default());
    }

    pub(crate) fn unregister(&self, id: WindowId) {
        self.windows.borrow_mut().remove(&id);
    }

    /// Returns and resets the mailbox of `id`.
    pub(crate) fn take_signals(&self, id: WindowId) -> WindowSignals {
        self.windows
            .borrow_mut()
            .get_mut(&id)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Dispatches pending OS events without blocking.
    pub(crate) fn pump(&self) {
        let mut sink = EventSink {
            windows: &self.windows,
        };
        let status = self
            .event_loop
            .borrow_mut()
            .pump_app_events(Some(Duration::ZERO), &mut sink);

        if let PumpStatus::Exit(code) = status {
            log::info!("event loop exited with code {code}");
            for signals in self.windows.borrow_mut().values_mut() {
                signals.close_requested = true;
            }
        }
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        log::debug!("windowing platform released");
    }
}

struct EventSink<'a> {
    windows: &'a RefCell<HashMap<WindowId, WindowSignals>>,
}

impl ApplicationHandler for EventSink<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let mut windows = self.windows.borrow_mut();
        let Some(signals) = windows.get_mut(&id) else {
            return;
        };
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                signals.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                signals.resized = Some(size);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counted<'a>(&'a Cell<u32>);

    impl Drop for Counted<'_> {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn leases_share_one_instance() {
        let slot = LeaseSlot::new();
        let created = Cell::new(0);

        let a = slot
            .acquire(|| {
                created.set(created.get() + 1);
                Ok::<_, ()>(7)
            })
            .unwrap();
        let b = slot.acquire(|| Ok::<_, ()>(8)).unwrap();

        assert_eq!(*b, 7);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(created.get(), 1);
    }

    #[test]
    fn last_lease_tears_down_and_next_acquire_recreates() {
        let dropped = Cell::new(0);
        let slot = LeaseSlot::new();

        let a = slot.acquire(|| Ok::<_, ()>(Counted(&dropped))).unwrap();
        let b = slot.acquire(|| Ok::<_, ()>(Counted(&dropped))).unwrap();
        drop(a);
        assert!(slot.is_live());
        assert_eq!(dropped.get(), 0);

        drop(b);
        assert!(!slot.is_live());
        assert_eq!(dropped.get(), 1);

        let _c = slot.acquire(|| Ok::<_, ()>(Counted(&dropped))).unwrap();
        assert!(slot.is_live());
    }

    #[test]
    fn failed_init_leaves_the_slot_empty() {
        let slot: LeaseSlot<u8> = LeaseSlot::new();
        assert_eq!(slot.acquire(|| Err("no display")).unwrap_err(), "no display");
        assert!(!slot.is_live());
    }
}
