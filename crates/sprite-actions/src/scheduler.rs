//! The per-session action scheduler.
//!
//! [`Scheduler`] owns every top-level action, advances them once per frame in
//! registration order, applies deferred [`Commands`], and drops finished
//! actions in the same frame they terminate, releasing their bindings.

use std::fmt;

use crate::action::Action;
use crate::binding::{BindingKey, Tag, TargetBindings};
use crate::commands::{Command, Commands};
use crate::condition::frames_from_seconds;
use crate::config::EngineConfig;
use crate::debug::{ActionEvent, DebugSink, EventKind, TracingSink};
use crate::error::SchedulerError;
use crate::state::{ActionState, StopReason};
use crate::target::{TargetId, TargetStore};

/// Identifies a top-level action for the lifetime of its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionId(u64);

impl ActionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

/// An action that failed structurally and was isolated.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub action: ActionId,
    pub error: SchedulerError,
}

/// Outcome of one [`Scheduler::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Frame number of this tick, starting at 1.
    pub frame: u64,
    /// Number of running actions whose update returned `Ok`. Paused
    /// actions are visited but not counted.
    pub updated: usize,
    /// Actions removed this tick, with the reason they stopped.
    pub finished: Vec<(ActionId, StopReason)>,
    pub faults: Vec<Fault>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn finished_ids(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.finished.iter().map(|(id, _)| *id)
    }
}

struct Entry {
    id: ActionId,
    action: Box<dyn Action>,
    binding: Option<BindingKey>,
}

struct Debugger {
    enabled: bool,
    sink: Box<dyn DebugSink>,
}

impl Debugger {
    fn emit(&mut self, frame: u64, entry: &Entry, kind: EventKind) {
        if !self.enabled {
            return;
        }
        let event = ActionEvent {
            frame,
            action: entry.id,
            name: entry.action.name(),
            target: entry.binding.as_ref().map(|key| key.target).or(entry.action.target()),
            tag: entry.binding.as_ref().map(|key| key.tag.clone()),
            kind,
        };
        self.sink.record(&event);
    }
}

/// Registry of active top-level actions.
///
/// Single-threaded: drive it from the game loop with [`Scheduler::tick`] once
/// per frame. Dropping the scheduler cancels everything still active.
pub struct Scheduler {
    entries: Vec<Entry>,
    bindings: TargetBindings,
    commands: Commands,
    config: EngineConfig,
    debugger: Debugger,
    frame: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            entries: Vec::new(),
            bindings: TargetBindings::new(),
            commands: Commands::new(),
            debugger: Debugger {
                enabled: config.debug_actions,
                sink: Box::new(TracingSink),
            },
            config,
            frame: 0,
        }
    }

    /// Scheduler configured from `ACTIONS_*` environment variables.
    pub fn from_env() -> Self {
        Self::with_config(EngineConfig::from_env())
    }

    /// Replaces the debug sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.set_sink(sink);
        self
    }

    pub fn set_sink(&mut self, sink: impl DebugSink + 'static) {
        self.debugger.sink = Box::new(sink);
    }

    /// Toggles lifecycle debug events at runtime.
    pub fn set_debug(&mut self, enabled: bool) {
        self.config.debug_actions = enabled;
        self.debugger.enabled = enabled;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle for queuing operations from callbacks.
    pub fn commands(&self) -> Commands {
        self.commands.clone()
    }

    /// Number of ticks run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.entry(id).is_some()
    }

    /// State of an active action, `None` once it has been removed.
    pub fn state(&self, id: ActionId) -> Option<ActionState> {
        self.entry(id).map(|entry| entry.action.state())
    }

    /// Ids of active actions in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.entries.iter().map(|entry| entry.id)
    }

    /// Starts `action` and adds it to the active set.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotPending`] if the action was already started.
    pub fn schedule(&mut self, action: Box<dyn Action>) -> Result<ActionId, SchedulerError> {
        let id = self.commands.allocate_id();
        self.insert(id, None, action)?;
        Ok(id)
    }

    /// Schedules `action` as the single occupant of `(target, tag)`.
    ///
    /// A live occupant is cancelled with [`StopReason::Replaced`] before the
    /// new action starts.
    pub fn bind(
        &mut self,
        target: TargetId,
        tag: impl Into<Tag>,
        action: Box<dyn Action>,
    ) -> Result<ActionId, SchedulerError> {
        let id = self.commands.allocate_id();
        self.bind_with_id(id, BindingKey::new(target, tag), action)?;
        self.prune(None);
        Ok(id)
    }

    /// Stops and unbinds the occupant of `(target, tag)`, if any.
    pub fn unbind(&mut self, target: TargetId, tag: impl Into<Tag>) {
        self.unbind_key(&BindingKey::new(target, tag));
        self.prune(None);
    }

    /// Returns true if `(target, tag)` has an active occupant.
    pub fn query(&self, target: TargetId, tag: impl Into<Tag>) -> bool {
        self.occupant(target, tag).is_some()
    }

    pub fn occupant(&self, target: TargetId, tag: impl Into<Tag>) -> Option<ActionId> {
        self.bindings
            .occupant(&BindingKey::new(target, tag))
            .filter(|id| self.state(*id).is_some_and(|state| !state.is_terminal()))
    }

    /// Cancels one action. Returns false if `id` was already stopped or
    /// removed, which makes repeated stops from several cleanup paths safe.
    pub fn stop(&mut self, id: ActionId) -> bool {
        let stopped = self.stop_entry(id, StopReason::Cancelled);
        self.prune(None);
        stopped
    }

    pub fn stop_all(&mut self) {
        self.stop_matching(|_| true);
        self.prune(None);
    }

    /// Cancels every action that writes to `target`, composites included.
    pub fn stop_for_target(&mut self, target: TargetId) {
        self.stop_matching(|action| action.touches(target));
        self.prune(None);
    }

    pub fn pause(&mut self, id: ActionId) -> Result<(), SchedulerError> {
        let frame = self.frame;
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];
        entry.action.pause()?;
        self.debugger.emit(frame, entry, EventKind::Paused);
        Ok(())
    }

    pub fn resume(&mut self, id: ActionId) -> Result<(), SchedulerError> {
        let frame = self.frame;
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];
        entry.action.resume()?;
        self.debugger.emit(frame, entry, EventKind::Resumed);
        Ok(())
    }

    pub fn pause_all(&mut self) -> Result<(), SchedulerError> {
        for entry in &mut self.entries {
            if entry.action.state() == ActionState::Running {
                entry.action.pause()?;
                self.debugger.emit(self.frame, entry, EventKind::Paused);
            }
        }
        Ok(())
    }

    pub fn resume_all(&mut self) -> Result<(), SchedulerError> {
        for entry in &mut self.entries {
            if entry.action.state() == ActionState::Paused {
                entry.action.resume()?;
                self.debugger.emit(self.frame, entry, EventKind::Resumed);
            }
        }
        Ok(())
    }

    /// Advances every active action by `dt` reference frames.
    ///
    /// Actions are updated in registration order. A failing update is
    /// isolated: it is recorded in the report and, unless disabled in the
    /// config, the action is cancelled with [`StopReason::Faulted`]. Deferred
    /// commands are applied after the update pass, then finished actions are
    /// removed.
    pub fn tick(&mut self, targets: &mut dyn TargetStore, dt: f32) -> TickReport {
        self.frame += 1;
        let mut report = TickReport {
            frame: self.frame,
            ..TickReport::default()
        };

        for entry in &mut self.entries {
            if entry.action.is_done() {
                continue;
            }
            let running = entry.action.state() == ActionState::Running;
            match entry.action.update(targets, dt) {
                Ok(()) if running => report.updated += 1,
                Ok(()) => {}
                Err(error) => {
                    tracing::warn!("{} ({}) faulted: {}", entry.id, entry.action.name(), error);
                    self.debugger
                        .emit(self.frame, entry, EventKind::Fault(error.to_string()));
                    if self.config.cancel_on_fault {
                        entry.action.stop_with(StopReason::Faulted);
                    }
                    report.faults.push(Fault {
                        action: entry.id,
                        error: error.into(),
                    });
                }
            }
        }

        let faults = self.apply_commands();
        report.faults.extend(faults);
        self.prune(Some(&mut report));
        report
    }

    /// [`Scheduler::tick`] with a delta given in seconds.
    pub fn advance(&mut self, targets: &mut dyn TargetStore, seconds: f32) -> TickReport {
        self.tick(targets, frames_from_seconds(seconds))
    }

    /// Applies queued commands immediately, outside of a tick.
    pub fn flush_commands(&mut self) -> Vec<Fault> {
        let faults = self.apply_commands();
        self.prune(None);
        faults
    }

    /// Cancels everything and clears bindings and queued commands.
    pub fn shutdown(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!("Scheduler shutting down with {} active actions", self.entries.len());
        }
        self.stop_matching(|_| true);
        self.prune(None);
        // Dropping a queued composite cancels its children, whose callbacks
        // may queue more commands.
        while self.commands.pop().is_some() {}
        self.bindings.clear();
    }

    fn entry(&self, id: ActionId) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn index_of(&self, id: ActionId) -> Result<usize, SchedulerError> {
        self.entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(SchedulerError::UnknownAction(id))
    }

    fn insert(
        &mut self,
        id: ActionId,
        binding: Option<BindingKey>,
        mut action: Box<dyn Action>,
    ) -> Result<(), SchedulerError> {
        let state = action.state();
        if state != ActionState::Pending {
            return Err(SchedulerError::NotPending {
                action: action.name(),
                state,
            });
        }

        action.start()?;
        let entry = Entry {
            id,
            action,
            binding,
        };
        self.debugger.emit(self.frame, &entry, EventKind::Created);
        self.debugger.emit(self.frame, &entry, EventKind::Started);
        self.entries.push(entry);
        Ok(())
    }

    fn bind_with_id(
        &mut self,
        id: ActionId,
        key: BindingKey,
        action: Box<dyn Action>,
    ) -> Result<(), SchedulerError> {
        let state = action.state();
        if state != ActionState::Pending {
            return Err(SchedulerError::NotPending {
                action: action.name(),
                state,
            });
        }

        if let Some(occupant) = self.bindings.occupant(&key) {
            if let Ok(index) = self.index_of(occupant) {
                let entry = &mut self.entries[index];
                if !entry.action.is_done() {
                    self.debugger.emit(self.frame, entry, EventKind::Replaced);
                    entry.action.stop_with(StopReason::Replaced);
                }
            }
        }

        self.insert(id, Some(key.clone()), action)?;
        self.bindings.insert(key, id);
        Ok(())
    }

    fn unbind_key(&mut self, key: &BindingKey) {
        if let Some(id) = self.bindings.remove(key) {
            self.stop_entry(id, StopReason::Cancelled);
        }
    }

    fn stop_entry(&mut self, id: ActionId, reason: StopReason) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) if !entry.action.is_done() => {
                entry.action.stop_with(reason);
                true
            }
            _ => false,
        }
    }

    fn stop_matching(&mut self, mut filter: impl FnMut(&dyn Action) -> bool) {
        for entry in &mut self.entries {
            if !entry.action.is_done() && filter(&*entry.action) {
                entry.action.stop_with(StopReason::Cancelled);
            }
        }
    }

    fn apply_commands(&mut self) -> Vec<Fault> {
        let mut faults = Vec::new();
        while let Some(command) = self.commands.pop() {
            let result = match command {
                Command::Schedule { id, action } => self.insert(id, None, action).map_err(|e| (id, e)),
                Command::Bind { id, key, action } => {
                    self.bind_with_id(id, key, action).map_err(|e| (id, e))
                }
                Command::Unbind(key) => {
                    self.unbind_key(&key);
                    Ok(())
                }
                Command::Stop(id) => {
                    self.stop_entry(id, StopReason::Cancelled);
                    Ok(())
                }
                Command::StopForTarget(target) => {
                    self.stop_matching(|action| action.touches(target));
                    Ok(())
                }
                Command::StopAll => {
                    self.stop_matching(|_| true);
                    Ok(())
                }
            };

            if let Err((action, error)) = result {
                tracing::warn!("Deferred command for {} failed: {}", action, error);
                faults.push(Fault { action, error });
            }
        }
        faults
    }

    fn prune(&mut self, mut report: Option<&mut TickReport>) {
        let frame = self.frame;
        let bindings = &mut self.bindings;
        let debugger = &mut self.debugger;

        self.entries.retain(|entry| {
            if !entry.action.is_done() {
                return true;
            }
            let reason = entry.action.stop_reason().unwrap_or(StopReason::Cancelled);
            if let Some(key) = &entry.binding {
                bindings.release(key, entry.id);
            }
            debugger.emit(frame, entry, EventKind::Stopped(reason));
            if let Some(report) = report.as_deref_mut() {
                report.finished.push((entry.id, reason));
            }
            false
        });
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("frame", &self.frame)
            .field("active", &self.entries.len())
            .field("bindings", &self.bindings.len())
            .field("config", &self.config)
            .finish()
    }
}
