mod charset;
mod engine;
mod glyphs;
mod mapping;
mod queue;
mod random;
mod scheduler;
mod surface;

pub use charset::{Charset, CharsetResolver, Scope, Variable, VariableRegistry};
pub use engine::{Completion, Outcome, ScrambleEngine, TickState};
pub use mapping::MappingTable;
pub use queue::{QueueSpec, RevealRecord, build_queue};
pub use random::{RandomSource, ScriptedRandom};
pub use scheduler::{
    ElementId, FRAME_INTERVAL_MS, FrameHandle, FrameQueue, FrameScheduler, frame_interval, frames_for_millis,
};
pub use surface::{Color, ColorError, Frame, Segment, Surface, TextElement};
