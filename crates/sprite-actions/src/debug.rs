//! Lifecycle diagnostics.
//!
//! When debugging is enabled the scheduler reports every lifecycle transition
//! of its top-level actions to a single [`DebugSink`]. The engine itself
//! performs no I/O; what happens to the events is up to the sink.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::binding::Tag;
use crate::scheduler::ActionId;
use crate::state::StopReason;
use crate::target::TargetId;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EventKind {
    Created,
    Started,
    Paused,
    Resumed,
    /// Evicted by a newer binding on the same `(target, tag)`.
    Replaced,
    Stopped(StopReason),
    /// An update returned a structural error.
    Fault(String),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Created => f.write_str("created"),
            EventKind::Started => f.write_str("started"),
            EventKind::Paused => f.write_str("paused"),
            EventKind::Resumed => f.write_str("resumed"),
            EventKind::Replaced => f.write_str("replaced"),
            EventKind::Stopped(reason) => write!(f, "stopped({reason})"),
            EventKind::Fault(message) => write!(f, "fault({message})"),
        }
    }
}

/// One lifecycle record.
///
/// Only serializable: records are written out by sinks, never read back.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ActionEvent {
    pub frame: u64,
    pub action: ActionId,
    pub name: &'static str,
    pub target: Option<TargetId>,
    pub tag: Option<Tag>,
    pub kind: EventKind,
}

/// Receives lifecycle records.
pub trait DebugSink {
    fn record(&mut self, event: &ActionEvent);
}

impl<F> DebugSink for F
where
    F: FnMut(&ActionEvent),
{
    fn record(&mut self, event: &ActionEvent) {
        self(event)
    }
}

/// Emits every record as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn record(&mut self, event: &ActionEvent) {
        match (&event.target, &event.tag) {
            (Some(target), Some(tag)) => tracing::debug!(
                target: "sprite_actions",
                "[frame {}] {} {} on {}/{}: {}",
                event.frame,
                event.name,
                event.action,
                target,
                tag,
                event.kind
            ),
            _ => tracing::debug!(
                target: "sprite_actions",
                "[frame {}] {} {}: {}",
                event.frame,
                event.name,
                event.action,
                event.kind
            ),
        }
    }
}

/// Collects records in memory.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<ActionEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ActionEvent> {
        self.events.borrow().clone()
    }

    /// Kinds recorded for `action`, in order.
    pub fn kinds_for(&self, action: ActionId) -> Vec<EventKind> {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.action == action)
            .map(|event| event.kind.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl DebugSink for RecordingSink {
    fn record(&mut self, event: &ActionEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
