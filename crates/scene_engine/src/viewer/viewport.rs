//! Viewport events
//!
//! Resize notifications are queued with [`Viewport::resize`] and delivered to
//! registered handlers on [`Viewport::dispatch`]. A handler returns `true` to
//! consume the event and stop forwarding. Handlers are removed with the id
//! returned at registration.

/// Event raised by the output surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    /// The surface changed size
    Resized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
}

/// Receives viewport events; returns true if the event was consumed
pub trait ViewportHandler {
    /// Handle an event
    fn on_viewport_event(&mut self, event: &ViewportEvent) -> bool;
}

impl<F> ViewportHandler for F
where
    F: FnMut(&ViewportEvent) -> bool,
{
    fn on_viewport_event(&mut self, event: &ViewportEvent) -> bool {
        self(event)
    }
}

/// Registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Output surface size plus its resize listeners
pub struct Viewport {
    width: u32,
    height: u32,
    queue: Vec<ViewportEvent>,
    handlers: Vec<(HandlerId, Box<dyn ViewportHandler>)>,
    next_id: u64,
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewport")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("queued", &self.queue.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl Viewport {
    /// Create a viewport with no listeners
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            queue: Vec::new(),
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Current size
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Register a handler; it receives every event dispatched from now on
    pub fn register_handler(&mut self, handler: Box<dyn ViewportHandler>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    /// Remove a handler; returns false if it was not registered
    pub fn deregister_handler(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        before != self.handlers.len()
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Record a new size and queue a resize event
    ///
    /// Zero-sized and unchanged sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.queue.push(ViewportEvent::Resized { width, height });
    }

    /// Deliver queued events in order; returns how many were delivered
    pub fn dispatch(&mut self) -> usize {
        let events = std::mem::take(&mut self.queue);
        for event in &events {
            for (_, handler) in self.handlers.iter_mut() {
                if handler.on_viewport_event(event) {
                    break;
                }
            }
        }
        events.len()
    }

    /// Drop queued events
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<ViewportEvent>>>, consume: bool) -> Box<dyn ViewportHandler> {
        let log = Rc::clone(log);
        Box::new(move |event: &ViewportEvent| {
            log.borrow_mut().push(*event);
            consume
        })
    }

    #[test]
    fn test_resize_reaches_handler() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut viewport = Viewport::new(800, 600);
        viewport.register_handler(recorder(&log, false));

        viewport.resize(1024, 768);
        assert_eq!(viewport.dispatch(), 1);

        assert_eq!(log.borrow().as_slice(), &[ViewportEvent::Resized { width: 1024, height: 768 }]);
        assert_eq!(viewport.size(), (1024, 768));
    }

    #[test]
    fn test_consumed_event_stops_forwarding() {
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));
        let mut viewport = Viewport::new(10, 10);
        viewport.register_handler(recorder(&first, true));
        viewport.register_handler(recorder(&second, false));

        viewport.resize(20, 20);
        viewport.dispatch();

        assert_eq!(first.borrow().len(), 1);
        assert!(second.borrow().is_empty());
    }

    #[test]
    fn test_deregistered_handler_is_silent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut viewport = Viewport::new(10, 10);
        let id = viewport.register_handler(recorder(&log, false));

        assert!(viewport.deregister_handler(id));
        assert!(!viewport.deregister_handler(id));
        viewport.resize(30, 30);
        viewport.dispatch();

        assert!(log.borrow().is_empty());
        assert_eq!(viewport.handler_count(), 0);
    }

    #[test]
    fn test_degenerate_resize_ignored() {
        let mut viewport = Viewport::new(10, 10);
        viewport.resize(0, 10);
        viewport.resize(10, 10);
        assert_eq!(viewport.dispatch(), 0);
    }
}
