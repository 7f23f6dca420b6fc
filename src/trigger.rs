use crate::config::ScrambleOptions;
use crate::scramble::{
    Completion, ElementId, FrameQueue, RandomSource, ScrambleEngine, Surface, TickState, VariableRegistry,
};
use tracing::{debug, trace};

/// Identifies a group of elements where only one member is active at a time, e.g. tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

struct Slot<S> {
    engine: ScrambleEngine<S>,
    group: Option<GroupId>,
    hover: bool,
    continuous: bool,
}

/// Owns every registered element's engine and maps external events to engine calls.
///
/// Within a group at most one member, the active one, is ever in continuous mode.
pub struct TriggerController<S> {
    registry: VariableRegistry,
    slots: Vec<Option<Slot<S>>>,
    groups: Vec<Vec<ElementId>>,
    scheduler: FrameQueue,
    seed: Option<u64>,
}

impl<S: Surface> TriggerController<S> {
    pub fn new(registry: VariableRegistry) -> Self {
        Self { registry, slots: Vec::new(), groups: Vec::new(), scheduler: FrameQueue::new(), seed: None }
    }

    /// Seed every engine's random source so runs are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &FrameQueue {
        &self.scheduler
    }

    /// Register a standalone element.
    pub fn register(&mut self, surface: S, options: &ScrambleOptions) -> ElementId {
        self.insert(surface, options, None)
    }

    pub fn create_group(&mut self) -> GroupId {
        self.groups.push(Vec::new());
        GroupId(self.groups.len() - 1)
    }

    /// Register an element as a member of `group`, activating it right away if `active` is set.
    pub fn register_in_group(
        &mut self,
        group: GroupId,
        surface: S,
        options: &ScrambleOptions,
        active: bool,
    ) -> ElementId {
        let id = self.insert(surface, options, Some(group));
        if let Some(slot) = self.slot_mut(id) {
            slot.engine.set_continuous(false);
        }
        match self.groups.get_mut(group.0) {
            Some(members) => members.push(id),
            None => debug!("{group:?} does not exist, {id:?} is standalone"),
        }
        if active {
            self.activate(id);
        }
        id
    }

    /// Remove an element, stopping its engine and handing its surface back with the original text.
    pub fn detach(&mut self, id: ElementId) -> Option<S> {
        let slot = self.slots.get_mut(id.index())?.take()?;
        if let Some(members) = slot.group.and_then(|group| self.groups.get_mut(group.0)) {
            members.retain(|member| *member != id);
        }
        debug!("{id:?} detached");
        Some(slot.engine.detach(&mut self.scheduler))
    }

    pub fn engine(&self, id: ElementId) -> Option<&ScrambleEngine<S>> {
        self.slots.get(id.index())?.as_ref().map(|slot| &slot.engine)
    }

    /// The active member of a group, if any.
    pub fn active_member(&self, group: GroupId) -> Option<ElementId> {
        let members = self.groups.get(group.0)?;
        members.iter().copied().find(|id| self.engine(*id).is_some_and(|engine| engine.is_active()))
    }

    /// The pointer entered an element: scramble its original text unless hover is disabled.
    pub fn pointer_enter(&mut self, id: ElementId) -> Option<Completion> {
        let slot = self.slots.get_mut(id.index())?.as_mut()?;
        if !slot.hover {
            trace!("{id:?} ignores hover");
            return None;
        }
        let original = slot.engine.original_text().to_string();
        Some(slot.engine.start(&original, &mut self.scheduler))
    }

    /// Make `id` the active member of its group.
    ///
    /// Every other member is stopped and restored before `id` starts scrambling, resuming
    /// continuous mode if it's configured for it.
    pub fn activate(&mut self, id: ElementId) -> Option<Completion> {
        let group = self.slot_mut(id)?.group;
        if let Some(group) = group {
            let siblings: Vec<ElementId> = self.groups.get(group.0).cloned().unwrap_or_default();
            for sibling in siblings.into_iter().filter(|sibling| *sibling != id) {
                if let Some(slot) = self.slots.get_mut(sibling.index()).and_then(Option::as_mut) {
                    if slot.engine.is_active() || slot.engine.has_pending_frame() {
                        slot.engine.stop(&mut self.scheduler);
                    }
                    slot.engine.set_active(false);
                    slot.engine.set_continuous(false);
                }
            }
        }
        let slot = self.slots.get_mut(id.index())?.as_mut()?;
        slot.engine.set_active(true);
        slot.engine.set_continuous(slot.continuous);
        debug!("{id:?} activated");
        let original = slot.engine.original_text().to_string();
        Some(slot.engine.start(&original, &mut self.scheduler))
    }

    /// Take active status away from `id`, stopping and restoring it.
    pub fn deactivate(&mut self, id: ElementId) {
        let Some(slot) = self.slots.get_mut(id.index()).and_then(Option::as_mut) else {
            return;
        };
        slot.engine.set_active(false);
        if slot.group.is_some() {
            slot.engine.set_continuous(false);
        }
        slot.engine.stop(&mut self.scheduler);
        debug!("{id:?} deactivated");
    }

    /// Scramble an element towards arbitrary text.
    pub fn start(&mut self, id: ElementId, text: &str) -> Option<Completion> {
        let slot = self.slots.get_mut(id.index())?.as_mut()?;
        Some(slot.engine.start(text, &mut self.scheduler))
    }

    pub fn stop(&mut self, id: ElementId) {
        if let Some(slot) = self.slots.get_mut(id.index()).and_then(Option::as_mut) {
            slot.engine.stop(&mut self.scheduler);
        }
    }

    /// Run one display refresh, dispatching every due frame to its engine.
    pub fn advance_frame(&mut self) -> Vec<(ElementId, TickState)> {
        let mut states = Vec::new();
        for (handle, owner) in self.scheduler.advance() {
            let Some(slot) = self.slots.get_mut(owner.index()).and_then(Option::as_mut) else {
                trace!("dropping frame for detached {owner:?}");
                continue;
            };
            states.push((owner, slot.engine.on_frame(handle, &mut self.scheduler)));
        }
        states
    }

    /// Whether no engine has a frame pending.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    fn insert(&mut self, surface: S, options: &ScrambleOptions, group: Option<GroupId>) -> ElementId {
        let id = ElementId(self.slots.len());
        let random: Box<dyn RandomSource> = match self.seed {
            Some(seed) => Box::new(fastrand::Rng::with_seed(seed.wrapping_add(id.index() as u64))),
            None => Box::new(fastrand::Rng::new()),
        };
        let engine = ScrambleEngine::new(id, surface, options, &self.registry, random);
        let slot = Slot { engine, group, hover: !options.no_hover, continuous: options.continuous };
        self.slots.push(Some(slot));
        debug!("{id:?} registered");
        id
    }

    fn slot_mut(&mut self, id: ElementId) -> Option<&mut Slot<S>> {
        self.slots.get_mut(id.index())?.as_mut()
    }
}
