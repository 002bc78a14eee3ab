//! Installation of the bridge into the host's handler slot.
//!
//! The host owns a single handler slot. Its own handler is put there during
//! the host's setup, which may not be finished when the embedder wants to
//! install the bridge. Installation is therefore a task posted to the host's
//! single-threaded [`TaskQueue`]:
//!
//! ```text
//! BridgeInstaller::schedule()      post(task)
//!          │                            │
//!          ▼                            ▼
//!   host finishes setup  ──►  queue.run_pending()
//!                                  └─ previous = slot.current()
//!                                  └─ slot.replace(bridge.attach(previous))
//! ```
//!
//! Until the task has run the slot still holds the host's handler, so no
//! request can reach the bridge before its delegate is captured.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use thiserror::Error;
use tracing::{info, warn};

use crate::dispatcher::{CorsBypassHandler, DetachedBridge};
use crate::handler::{DefaultHandler, ResourceHandler};

/// Installation misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallError {
    #[error("the handler slot already holds a CORS bridge")]
    AlreadyInstalled,

    #[error("bridge installation was already scheduled")]
    AlreadyScheduled,
}

// ─────────────────────────────────────────────────────────────────────────────
// HandlerSlot
// ─────────────────────────────────────────────────────────────────────────────

/// The host's single "current handler" slot.
#[derive(Default)]
pub struct HandlerSlot {
    current: RefCell<Option<Rc<dyn ResourceHandler>>>,
}

impl HandlerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(handler: Rc<dyn ResourceHandler>) -> Self {
        Self {
            current: RefCell::new(Some(handler)),
        }
    }

    pub fn current(&self) -> Option<Rc<dyn ResourceHandler>> {
        self.current.borrow().clone()
    }

    /// Current occupant, or the no-op handler when the slot is empty.
    pub fn handler_or_default(&self) -> Rc<dyn ResourceHandler> {
        self.current().unwrap_or_else(|| Rc::new(DefaultHandler))
    }

    /// Puts `handler` in the slot and returns the previous occupant.
    pub fn replace(&self, handler: Rc<dyn ResourceHandler>) -> Option<Rc<dyn ResourceHandler>> {
        self.current.borrow_mut().replace(handler)
    }

    pub fn take(&self) -> Option<Rc<dyn ResourceHandler>> {
        self.current.borrow_mut().take()
    }

    pub fn is_empty(&self) -> bool {
        self.current.borrow().is_none()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TaskQueue
// ─────────────────────────────────────────────────────────────────────────────

type Task = Box<dyn FnOnce()>;

/// FIFO of callbacks run on the host thread.
///
/// Not `Send`: tasks are posted and run on the same thread.
#[derive(Default)]
pub struct TaskQueue {
    tasks: RefCell<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Runs queued tasks in order, including tasks posted while draining.
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // The borrow ends before the task runs, so tasks may post.
            let next = self.tasks.borrow_mut().pop_front();
            let Some(task) = next else { break };
            task();
            ran += 1;
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Installation
// ─────────────────────────────────────────────────────────────────────────────

/// Where an installer is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    /// Not scheduled yet.
    Idle,
    /// Task posted, not run yet.
    Pending,
    Installed,
    Failed(InstallError),
}

/// Wraps the slot's current occupant right now.
///
/// Returns the installed bridge. Fails if the slot already holds one.
pub fn install_now(
    bridge: DetachedBridge,
    slot: &HandlerSlot,
) -> Result<Rc<CorsBypassHandler>, InstallError> {
    let previous = slot.current();
    if previous.as_ref().is_some_and(|handler| handler.is_bridge()) {
        return Err(InstallError::AlreadyInstalled);
    }

    let previous_name = previous.as_ref().map_or("none", |h| h.name());
    let handler = Rc::new(bridge.attach(previous));
    slot.replace(handler.clone());

    info!(previous = previous_name, "CORS bridge installed in handler slot");
    Ok(handler)
}

/// One-shot deferred installer.
pub struct BridgeInstaller {
    bridge: Option<DetachedBridge>,
    state: Rc<RefCell<InstallState>>,
}

impl BridgeInstaller {
    pub fn new(bridge: DetachedBridge) -> Self {
        Self {
            bridge: Some(bridge),
            state: Rc::new(RefCell::new(InstallState::Idle)),
        }
    }

    /// Posts the installation task. The slot is read when the task runs, not now.
    pub fn schedule(&mut self, slot: &Rc<HandlerSlot>, queue: &TaskQueue) -> Result<(), InstallError> {
        let bridge = self.bridge.take().ok_or(InstallError::AlreadyScheduled)?;
        *self.state.borrow_mut() = InstallState::Pending;

        let slot = Rc::clone(slot);
        let state = Rc::clone(&self.state);
        queue.post(move || {
            let outcome = match install_now(bridge, &slot) {
                Ok(_) => InstallState::Installed,
                Err(error) => {
                    warn!(%error, "CORS bridge not installed");
                    InstallState::Failed(error)
                }
            };
            *state.borrow_mut() = outcome;
        });
        Ok(())
    }

    pub fn state(&self) -> InstallState {
        self.state.borrow().clone()
    }

    pub fn is_installed(&self) -> bool {
        *self.state.borrow() == InstallState::Installed
    }
}
