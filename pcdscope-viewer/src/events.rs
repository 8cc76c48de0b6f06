//! Viewport resize notifications

use std::sync::{Arc, Mutex, MutexGuard};

/// Identifies one registered resize listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    Resized,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, flume::Sender<ViewportEvent>)>,
}

/// Broadcasts viewport resizes to registered listeners.
///
/// Each listener receives events on its own channel; the window or layout
/// code calls [`ViewportEvents::notify_resize`] and the viewer drains its
/// receiver on the next tick. Clones share the registry.
#[derive(Clone, Default)]
pub struct ViewportEvents {
    registry: Arc<Mutex<Registry>>,
}

impl ViewportEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> (ListenerId, flume::Receiver<ViewportEvent>) {
        let (sender, receiver) = flume::unbounded();
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry.listeners.push((id, sender));
        (id, receiver)
    }

    /// Remove a listener; returns `false` if it was not registered
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(lid, _)| *lid != id);
        registry.listeners.len() != before
    }

    /// Notify every listener; returns how many were reached
    pub fn notify_resize(&self) -> usize {
        let mut registry = self.lock();
        registry
            .listeners
            .retain(|(_, sender)| sender.send(ViewportEvent::Resized).is_ok());
        registry.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_reaches_registered_listeners() {
        let events = ViewportEvents::new();
        let (_, first) = events.register();
        let (_, second) = events.register();

        assert_eq!(events.notify_resize(), 2);
        assert_eq!(first.try_recv(), Ok(ViewportEvent::Resized));
        assert_eq!(second.try_recv(), Ok(ViewportEvent::Resized));
    }

    #[test]
    fn test_unregister_targets_one_listener() {
        let events = ViewportEvents::new();
        let (a, rx_a) = events.register();
        let (_, rx_b) = events.register();

        assert!(events.unregister(a));
        assert!(!events.unregister(a));
        events.notify_resize();
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let events = ViewportEvents::new();
        let (_, receiver) = events.register();
        drop(receiver);
        assert_eq!(events.notify_resize(), 0);
        assert_eq!(events.listener_count(), 0);
    }
}
