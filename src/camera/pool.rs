use crate::error::FrameSourceError;
use crate::frame::FrameAccounting;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{trace, warn};

/// Bookkeeping for a bounded set of frame buffers.
///
/// Every frame handed out gets a fresh id; releasing an id that is not
/// outstanding is counted (double release or foreign frame) and otherwise
/// ignored, so the pool can never be driven above its capacity.
pub struct FramePool {
    capacity: usize,
    state: Mutex<PoolState>,
}

#[derive(Default)]
struct PoolState {
    outstanding: HashSet<u64>,
    next_id: u64,
    acquired: u64,
    released: u64,
    double_releases: u64,
    unknown_releases: u64,
}

impl FramePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn has_capacity(&self) -> bool {
        self.state.lock().outstanding.len() < self.capacity
    }

    /// Reserve a buffer and return the id of the frame that will occupy it
    pub fn checkout(&self) -> Result<u64, FrameSourceError> {
        let mut state = self.state.lock();

        if state.outstanding.len() >= self.capacity {
            return Err(FrameSourceError::unavailable(format!(
                "all {} frame buffers in use",
                self.capacity
            )));
        }

        let id = state.next_id;
        state.next_id += 1;
        state.outstanding.insert(id);
        state.acquired += 1;

        trace!(
            "Frame {} checked out ({}/{} in use)",
            id,
            state.outstanding.len(),
            self.capacity
        );
        Ok(id)
    }

    /// Give a buffer back
    pub fn checkin(&self, id: u64) {
        let mut state = self.state.lock();

        if state.outstanding.remove(&id) {
            state.released += 1;
            trace!(
                "Frame {} returned ({}/{} in use)",
                id,
                state.outstanding.len(),
                self.capacity
            );
        } else if id < state.next_id {
            state.double_releases += 1;
            warn!("Frame {} released more than once", id);
        } else {
            state.unknown_releases += 1;
            warn!("Release of frame {} that was never acquired", id);
        }
    }

    pub fn accounting(&self) -> FrameAccounting {
        let state = self.state.lock();
        FrameAccounting {
            acquired: state.acquired,
            released: state.released,
            outstanding: state.outstanding.len(),
            capacity: self.capacity,
            double_releases: state.double_releases,
            unknown_releases: state.unknown_releases,
        }
    }
}
