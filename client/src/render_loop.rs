use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces repaint requests into one `requestAnimationFrame` callback.
///
/// The map only changes in response to input or data, so there is no
/// continuous loop: every `mark_dirty()` between two frames results in a
/// single call of the paint function.
pub struct RenderScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    pending: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl Inner {
    fn request_frame(&self) {
        if self.pending.get().is_some() {
            return;
        }
        let Some(window) = self.window.as_ref() else {
            return;
        };
        let Some(cb) = self
            .callback
            .borrow()
            .as_ref()
            .map(|cb| cb.as_ref().clone())
        else {
            return;
        };
        if let Ok(id) = window.request_animation_frame(cb.unchecked_ref()) {
            self.pending.set(Some(id));
        }
    }
}

impl RenderScheduler {
    pub fn new(paint: impl Fn() + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            pending: Cell::new(None),
            callback: RefCell::new(None),
        });

        let frame_inner = Rc::downgrade(&inner);
        let cb = Closure::<dyn FnMut()>::new(move || {
            if let Some(inner) = frame_inner.upgrade() {
                inner.pending.set(None);
            }
            paint();
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    /// Schedule a repaint on the next frame unless one is already pending.
    pub fn mark_dirty(&self) {
        self.inner.request_frame();
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        if let Some(id) = self.inner.pending.take()
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(id);
        }
        self.inner.callback.borrow_mut().take();
    }
}
