use std::collections::BTreeMap;
use std::time::Duration;
use tracing::trace;

/// The nominal interval between two display refreshes.
pub const FRAME_INTERVAL_MS: f64 = 16.67;

/// Convert a duration in milliseconds into a whole number of frames.
pub fn frames_for_millis(millis: u64) -> u32 {
    (millis as f64 / FRAME_INTERVAL_MS).round() as u32
}

/// The wall clock interval between frames.
pub fn frame_interval() -> Duration {
    Duration::from_secs_f64(FRAME_INTERVAL_MS / 1000.0)
}

/// Identifies a display element, and therefore the engine that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A cancellable registration for a future frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(u64);

/// Registers frame callbacks on behalf of engines.
pub trait FrameScheduler {
    /// Ask for `owner` to be called back `delay_frames` frames after the next refresh.
    fn request_frame(&mut self, owner: ElementId, delay_frames: u32) -> FrameHandle;

    /// Drop a registration. Cancelling an unknown or already fired handle is a no-op.
    fn cancel(&mut self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy)]
struct Registration {
    owner: ElementId,
    due_frame: u64,
}

/// A cooperative, single threaded frame queue.
///
/// Nothing happens on its own: whoever drives the display calls [FrameQueue::advance] once per
/// refresh and dispatches the returned registrations. Tests drive it by hand.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frame: u64,
    next_handle: u64,
    pending: BTreeMap<FrameHandle, Registration>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of refreshes that happened so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, handle: FrameHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Move to the next refresh and take every registration due on it, oldest registration first.
    pub fn advance(&mut self) -> Vec<(FrameHandle, ElementId)> {
        self.frame += 1;
        let frame = self.frame;
        let due: Vec<FrameHandle> =
            self.pending.iter().filter(|(_, r)| r.due_frame <= frame).map(|(handle, _)| *handle).collect();
        due.into_iter()
            .filter_map(|handle| self.pending.remove(&handle).map(|r| (handle, r.owner)))
            .collect()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self, owner: ElementId, delay_frames: u32) -> FrameHandle {
        let handle = FrameHandle(self.next_handle);
        self.next_handle += 1;
        let due_frame = self.frame + 1 + u64::from(delay_frames);
        self.pending.insert(handle, Registration { owner, due_frame });
        trace!("frame {handle:?} requested for {owner:?} at frame {due_frame}");
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        if self.pending.remove(&handle).is_some() {
            trace!("frame {handle:?} cancelled");
        }
    }
}
