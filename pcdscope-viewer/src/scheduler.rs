//! Frame-synchronized callback scheduling

use std::cell::RefCell;
use std::rc::Rc;

/// Identifies one requested frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Schedules the next render tick.
///
/// The driver that owns the scheduler calls back into the viewer with the
/// handle once the frame is due.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;

    /// Cancel a request; unknown or already fired handles are ignored
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Default)]
struct QueueState {
    next_handle: u64,
    pending: Vec<FrameHandle>,
    cancelled: usize,
}

/// Frame scheduler backed by a shared queue.
///
/// Clones share the queue: hand one to the viewer and keep another in the
/// event loop, which drains due handles on each redraw.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    state: Rc<RefCell<QueueState>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every pending handle, oldest first
    pub fn take_due(&self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.state.borrow().pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Number of requests cancelled before they fired
    pub fn cancelled(&self) -> usize {
        self.state.borrow().cancelled
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = FrameHandle(state.next_handle);
        state.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut state = self.state.borrow_mut();
        let before = state.pending.len();
        state.pending.retain(|h| *h != handle);
        if state.pending.len() != before {
            state.cancelled += 1;
        }
    }
}
