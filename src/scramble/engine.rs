use super::charset::{Charset, CharsetResolver, VariableRegistry};
use super::mapping::MappingTable;
use super::queue::{QueueSpec, RevealRecord, build_queue};
use super::random::RandomSource;
use super::scheduler::{ElementId, FrameHandle, FrameScheduler};
use super::surface::{Color, Frame, Segment, Surface};
use crate::config::ScrambleOptions;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use tracing::{debug, trace};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every position reached its target character.
    Settled,

    /// The run was stopped before it settled.
    Cancelled,

    /// The engine wasn't allowed to run, e.g. an active only element that isn't active.
    Skipped,
}

#[derive(Debug, Default)]
struct CompletionState {
    outcome: Option<Outcome>,
    wakers: Vec<Waker>,
}

/// A signal that resolves exactly once, when a run ends.
///
/// Clones share the same state. It can be polled through [Completion::outcome] or awaited.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    state: Rc<RefCell<CompletionState>>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that already resolved.
    pub fn resolved(outcome: Outcome) -> Self {
        let completion = Self::new();
        completion.resolve(outcome);
        completion
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.state.borrow().outcome
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome().is_some()
    }

    /// Whether both handles refer to the same signal.
    pub fn same_as(&self, other: &Completion) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Resolve the signal. Only the first call has any effect.
    fn resolve(&self, outcome: Outcome) -> bool {
        let wakers = {
            let mut state = self.state.borrow_mut();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome);
            std::mem::take(&mut state.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
        true
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        if let Some(outcome) = state.outcome {
            return Poll::Ready(outcome);
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

/// The state of an engine after handling a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickState {
    /// The element was rendered into and the run goes on.
    Modified,

    /// Nothing was rendered.
    Unmodified,

    /// The element was rendered into and the run settled.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameAction {
    Tick,
    Restart,
}

#[derive(Debug, Clone, Copy)]
struct PendingFrame {
    handle: FrameHandle,
    action: FrameAction,
}

/// Drives the scramble animation of a single display element.
pub struct ScrambleEngine<S> {
    id: ElementId,
    surface: S,
    random: Box<dyn RandomSource>,
    charset: Charset,
    mappings: MappingTable,
    total_ticks: u32,
    intensity: f64,
    color: Color,
    preserve_whitespace: bool,
    settle_frames: u32,
    original_text: String,
    displayed_text: String,
    queue: Vec<RevealRecord>,
    tick: u32,
    phase: Phase,
    pending: Option<PendingFrame>,
    completion: Option<Completion>,
    continuous: bool,
    active_only: bool,
    active: bool,
}

impl<S: Surface> ScrambleEngine<S> {
    /// Build an engine for `surface`, resolving its charset and mappings against `registry`.
    pub fn new(
        id: ElementId,
        surface: S,
        options: &ScrambleOptions,
        registry: &VariableRegistry,
        random: Box<dyn RandomSource>,
    ) -> Self {
        let original_text = surface.text();
        let charset = CharsetResolver::new(registry).resolve(options.chars.as_deref(), &Charset::builtin());
        let mappings = MappingTable::parse(options.mappings.as_deref(), registry, options.case_insensitive)
            .with_folded_lookups(options.fold_lookups);
        Self {
            id,
            surface,
            random,
            charset,
            mappings,
            total_ticks: options.total_ticks(),
            intensity: options.intensity.clamp(0.0, 1.0),
            color: options.color,
            preserve_whitespace: options.preserve_whitespace,
            settle_frames: options.settle_frames(),
            displayed_text: original_text.clone(),
            original_text,
            queue: Vec::new(),
            tick: 0,
            phase: Phase::Idle,
            pending: None,
            completion: None,
            continuous: options.continuous,
            active_only: options.active_only,
            active: false,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// The plain text the element shows right now.
    pub fn displayed_text(&self) -> &str {
        &self.displayed_text
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Whether a frame is registered for this engine, either a tick or a continuous restart.
    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn queue(&self) -> &[RevealRecord] {
        &self.queue
    }

    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active_only(&self) -> bool {
        self.active_only
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    /// Re-resolve the global charset from a new reference.
    pub fn set_chars(&mut self, reference: Option<&str>, registry: &VariableRegistry) {
        self.charset = CharsetResolver::new(registry).resolve(reference, &Charset::builtin());
    }

    /// Start scrambling from the displayed text towards `text`.
    ///
    /// Starting while a run is in flight is a no-op that hands back the in flight run's signal.
    pub fn start(&mut self, text: &str, scheduler: &mut dyn FrameScheduler) -> Completion {
        if let (Phase::Running, Some(completion)) = (self.phase, &self.completion) {
            debug!("{:?} is already running, ignoring start", self.id);
            return completion.clone();
        }
        self.cancel_pending(scheduler);
        if self.active_only && !self.active {
            debug!("{:?} is not active, restoring instead of starting", self.id);
            self.restore();
            return Completion::resolved(Outcome::Skipped);
        }

        let spec = QueueSpec {
            total_ticks: self.total_ticks,
            preserve_whitespace: self.preserve_whitespace,
            mappings: &self.mappings,
            charset: &self.charset,
        };
        self.queue = build_queue(&self.displayed_text, text, spec, &mut *self.random);
        self.tick = 0;
        self.phase = Phase::Running;
        let completion = Completion::new();
        self.completion = Some(completion.clone());
        self.schedule(scheduler, FrameAction::Tick, 0);
        debug!("{:?} started scrambling {} positions over {} ticks", self.id, self.queue.len(), self.total_ticks);
        completion
    }

    /// Stop any run or pending restart and put the original text back.
    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.cancel_pending(scheduler);
        if self.phase == Phase::Running {
            debug!("{:?} stopped at tick {}", self.id, self.tick);
        }
        self.phase = Phase::Idle;
        if let Some(completion) = self.completion.take() {
            completion.resolve(Outcome::Cancelled);
        }
        self.restore();
    }

    /// Stop the engine and hand its display element back.
    pub fn detach(mut self, scheduler: &mut dyn FrameScheduler) -> S {
        self.stop(scheduler);
        self.surface
    }

    /// Handle a frame registered by this engine. Frames that aren't the pending one are ignored.
    pub fn on_frame(&mut self, handle: FrameHandle, scheduler: &mut dyn FrameScheduler) -> TickState {
        let Some(pending) = self.pending.filter(|p| p.handle == handle) else {
            trace!("{:?} ignoring stale frame {handle:?}", self.id);
            return TickState::Unmodified;
        };
        self.pending = None;
        match pending.action {
            FrameAction::Tick => self.advance(scheduler),
            FrameAction::Restart => {
                let original = self.original_text.clone();
                self.start(&original, scheduler);
                TickState::Unmodified
            }
        }
    }

    fn advance(&mut self, scheduler: &mut dyn FrameScheduler) -> TickState {
        if self.phase != Phase::Running {
            return TickState::Unmodified;
        }
        let tick = self.tick;
        let mut settled = 0;
        let mut segments = Vec::with_capacity(self.queue.len());
        for record in &mut self.queue {
            if record.is_settled(tick) {
                settled += 1;
                segments.extend(record.to.map(Segment::Plain));
            } else if tick >= record.start_tick {
                if record.chosen.is_none() || self.random.next_unit() < self.intensity {
                    record.chosen = record.charset.draw(&mut *self.random).or(record.chosen);
                }
                let segment = match record.chosen {
                    Some(glyph) => Some(Segment::Scrambled { glyph, color: self.color }),
                    None => record.to.map(Segment::Plain),
                };
                segments.extend(segment);
            } else {
                segments.extend(record.from.map(Segment::Plain));
            }
        }

        let frame = Frame::new(segments);
        self.displayed_text = frame.plain_text();
        self.surface.render(&frame);

        if settled < self.queue.len() {
            self.tick += 1;
            self.schedule(scheduler, FrameAction::Tick, 0);
            return TickState::Modified;
        }

        self.phase = Phase::Idle;
        debug!("{:?} settled after {} ticks", self.id, tick);
        if let Some(completion) = self.completion.take() {
            completion.resolve(Outcome::Settled);
        }
        if self.continuous && (!self.active_only || self.active) {
            self.schedule(scheduler, FrameAction::Restart, self.settle_frames);
        }
        TickState::Done
    }

    fn schedule(&mut self, scheduler: &mut dyn FrameScheduler, action: FrameAction, delay_frames: u32) {
        self.cancel_pending(scheduler);
        let handle = scheduler.request_frame(self.id, delay_frames);
        self.pending = Some(PendingFrame { handle, action });
    }

    fn cancel_pending(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let Some(pending) = self.pending.take() {
            scheduler.cancel(pending.handle);
        }
    }

    fn restore(&mut self) {
        self.displayed_text = self.original_text.clone();
        self.surface.render(&Frame::plain(&self.original_text));
    }
}
