//! Deferred scheduler commands.
//!
//! `on_stop` callbacks run while the scheduler is in the middle of a tick, so
//! they cannot borrow it. They queue [`Command`]s through a [`Commands`]
//! handle instead; the scheduler applies the queue in FIFO order after the
//! update pass of the current tick, before finished actions are pruned.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::action::Action;
use crate::binding::{BindingKey, Tag};
use crate::scheduler::ActionId;
use crate::target::TargetId;

pub enum Command {
    Schedule {
        id: ActionId,
        action: Box<dyn Action>,
    },
    Bind {
        id: ActionId,
        key: BindingKey,
        action: Box<dyn Action>,
    },
    Unbind(BindingKey),
    Stop(ActionId),
    StopForTarget(TargetId),
    StopAll,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Schedule { id, action } => f
                .debug_struct("Schedule")
                .field("id", id)
                .field("action", &action.name())
                .finish(),
            Command::Bind { id, key, action } => f
                .debug_struct("Bind")
                .field("id", id)
                .field("key", key)
                .field("action", &action.name())
                .finish(),
            Command::Unbind(key) => f.debug_tuple("Unbind").field(key).finish(),
            Command::Stop(id) => f.debug_tuple("Stop").field(id).finish(),
            Command::StopForTarget(target) => f.debug_tuple("StopForTarget").field(target).finish(),
            Command::StopAll => f.write_str("StopAll"),
        }
    }
}

/// Cloneable handle onto a scheduler's command queue.
///
/// Ids for scheduled actions are allocated from the scheduler's own counter,
/// so they are known before the command is applied.
#[derive(Clone, Default)]
pub struct Commands {
    queue: Rc<RefCell<VecDeque<Command>>>,
    next_id: Rc<Cell<u64>>,
}

impl Commands {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&self) -> ActionId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ActionId::new(id)
    }

    pub(crate) fn pop(&self) -> Option<Command> {
        self.queue.borrow_mut().pop_front()
    }

    fn push(&self, command: Command) {
        self.queue.borrow_mut().push_back(command);
    }

    /// Queues `action` for scheduling and returns the id it will have.
    pub fn schedule(&self, action: Box<dyn Action>) -> ActionId {
        let id = self.allocate_id();
        self.push(Command::Schedule { id, action });
        id
    }

    /// Queues a bind of `action` under `(target, tag)`.
    pub fn bind(&self, target: TargetId, tag: impl Into<Tag>, action: Box<dyn Action>) -> ActionId {
        let id = self.allocate_id();
        self.push(Command::Bind {
            id,
            key: BindingKey::new(target, tag),
            action,
        });
        id
    }

    pub fn unbind(&self, target: TargetId, tag: impl Into<Tag>) {
        self.push(Command::Unbind(BindingKey::new(target, tag)));
    }

    pub fn stop(&self, id: ActionId) {
        self.push(Command::Stop(id));
    }

    pub fn stop_for_target(&self, target: TargetId) {
        self.push(Command::StopForTarget(target));
    }

    pub fn stop_all(&self) {
        self.push(Command::StopAll);
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commands")
            .field("queued", &self.len())
            .field("next_id", &self.next_id.get())
            .finish()
    }
}
