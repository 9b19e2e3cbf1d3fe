//! Synchronous observer lists for the slice-transform subsystem
//!
//! The original signal/slot wiring maps onto a plain callback list:
//! `connect` registers a boxed closure and returns a [`Connection`] handle,
//! `emit` iterates the registered closures synchronously on the calling
//! thread. There is no queuing and no thread-hopping; the slice subsystem
//! is single-threaded by design.

use std::cell::RefCell;
use std::rc::Rc;

/// Handle identifying a single subscription on a [`Signal`]
///
/// Pass it back to [`Signal::disconnect`] to unsubscribe. Dropping the
/// handle does not disconnect; teardown is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection(u64);

type Slot<T> = Rc<dyn Fn(&T)>;

/// A synchronous, single-threaded event publisher
///
/// Not `Send`/`Sync` on purpose: publishers and subscribers live on the
/// thread that drives the slice pipeline.
pub struct Signal<T> {
    slots: RefCell<Vec<(u64, Slot<T>)>>,
    next_id: std::cell::Cell<u64>,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Signal {
            slots: RefCell::new(Vec::new()),
            next_id: std::cell::Cell::new(0),
        }
    }

    /// Register a callback; returns a handle for later disconnect
    pub fn connect(&self, slot: impl Fn(&T) + 'static) -> Connection {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.slots.borrow_mut().push((id, Rc::new(slot)));
        Connection(id)
    }

    /// Remove a previously registered callback
    ///
    /// Disconnecting an already-disconnected handle is a no-op.
    pub fn disconnect(&self, conn: Connection) {
        self.slots.borrow_mut().retain(|(id, _)| *id != conn.0);
    }

    /// Invoke all registered callbacks with `value`, in connect order
    ///
    /// The slot list is snapshotted before iteration so a slot may
    /// connect or disconnect (itself included) while the emit runs.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Slot<T>> = self
            .slots
            .borrow()
            .iter()
            .map(|(_, slot)| Rc::clone(slot))
            .collect();
        for slot in snapshot {
            slot(value);
        }
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_emit_reaches_all_slots() {
        let signal = Signal::<i32>::new();
        let hits = Rc::new(Cell::new(0));

        let h1 = hits.clone();
        signal.connect(move |v| h1.set(h1.get() + *v));
        let h2 = hits.clone();
        signal.connect(move |v| h2.set(h2.get() + *v * 10));

        signal.emit(&3);
        assert_eq!(hits.get(), 33);
    }

    #[test]
    fn test_disconnect_stops_delivery() {
        let signal = Signal::<()>::new();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let conn = signal.connect(move |_| h.set(h.get() + 1));

        signal.emit(&());
        signal.disconnect(conn);
        signal.emit(&());

        assert_eq!(hits.get(), 1);
        assert!(signal.is_empty());
    }

    #[test]
    fn test_disconnect_twice_is_noop() {
        let signal = Signal::<()>::new();
        let conn = signal.connect(|_| {});
        signal.disconnect(conn);
        signal.disconnect(conn);
        assert_eq!(signal.len(), 0);
    }

    #[test]
    fn test_emit_order_is_connect_order() {
        let signal = Signal::<()>::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in 0..3 {
            let o = order.clone();
            signal.connect(move |_| o.borrow_mut().push(tag));
        }

        signal.emit(&());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}
