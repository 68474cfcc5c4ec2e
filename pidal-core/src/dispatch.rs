//! Layered switch bindings.
//!
//! Each switch family owns a [`DispatchStack`]: a non-empty stack of frames,
//! each frame mapping the four switch indices to an optional handler. Only
//! the top frame is consulted when an event arrives. Overlays (menus) push a
//! fresh empty frame, bind what they need, and pop it on close, exposing the
//! bindings underneath untouched.

use std::sync::{Arc, Mutex, MutexGuard};

use pidal_types::{SwitchKind, SWITCH_COUNT};

use crate::error::{EngineError, EngineResult};

/// Called with `true` on press and `false` on release.
pub type SwitchHandler = Arc<dyn Fn(bool) + Send + Sync>;

/// Wrap a closure as a [`SwitchHandler`].
pub fn handler<F>(f: F) -> SwitchHandler
where
    F: Fn(bool) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One layer of bindings.
#[derive(Clone, Default)]
pub struct DispatchFrame {
    slots: [Option<SwitchHandler>; SWITCH_COUNT],
}

impl DispatchFrame {
    pub fn get(&self, index: usize) -> Option<&SwitchHandler> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }
}

/// Outcome of [`DispatchStack::pop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopStatus {
    Popped,
    /// Only the base frame was left; nothing was removed.
    AtBase,
}

/// A stack of frames that always holds at least the base frame.
pub struct DispatchStack {
    kind: SwitchKind,
    frames: Mutex<Vec<DispatchFrame>>,
}

impl DispatchStack {
    pub fn new(kind: SwitchKind) -> Self {
        Self {
            kind,
            frames: Mutex::new(vec![DispatchFrame::default()]),
        }
    }

    pub fn kind(&self) -> SwitchKind {
        self.kind
    }

    fn frames(&self) -> MutexGuard<'_, Vec<DispatchFrame>> {
        // A panicking handler never runs under this lock, so a poisoned
        // guard still holds consistent frames.
        self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bind `handler` at `index` in the top frame, replacing any prior
    /// binding in that frame only.
    pub fn register(&self, index: usize, handler: SwitchHandler) -> EngineResult {
        if index >= SWITCH_COUNT {
            return Err(EngineError::InvalidIndex(index));
        }
        let mut frames = self.frames();
        if let Some(top) = frames.last_mut() {
            top.slots[index] = Some(handler);
        }
        log::debug!(target: "dispatch", "bound {} {} at depth {}", self.kind, index, frames.len());
        Ok(())
    }

    /// Clear the binding at `index` in the top frame.
    pub fn unregister(&self, index: usize) {
        if let Some(top) = self.frames().last_mut() {
            if let Some(slot) = top.slots.get_mut(index) {
                *slot = None;
            }
        }
    }

    /// Push an all-empty frame.
    pub fn push(&self) {
        let mut frames = self.frames();
        frames.push(DispatchFrame::default());
        log::debug!(target: "dispatch", "{} scope pushed (depth {})", self.kind, frames.len());
    }

    /// Discard the top frame unless it is the base frame.
    pub fn pop(&self) -> PopStatus {
        let mut frames = self.frames();
        if frames.len() > 1 {
            frames.pop();
            log::debug!(target: "dispatch", "{} scope popped (depth {})", self.kind, frames.len());
            PopStatus::Popped
        } else {
            PopStatus::AtBase
        }
    }

    /// The handler bound at `index` in the top frame. The lock is released
    /// before returning so the caller may invoke it freely.
    pub fn current(&self, index: usize) -> Option<SwitchHandler> {
        self.frames().last().and_then(|f| f.get(index).cloned())
    }

    pub fn depth(&self) -> usize {
        self.frames().len()
    }

    /// Invoke the top-frame handler at `index`, if any. Returns whether a
    /// handler ran.
    pub fn dispatch(&self, index: usize, pressed: bool) -> bool {
        match self.current(index) {
            Some(h) => {
                h(pressed);
                true
            }
            None => false,
        }
    }
}

/// Scope over both stacks: pushes a frame on each when created and pops
/// both when dropped, so the pop runs on every exit path.
pub struct OverlayGuard {
    footswitches: Arc<DispatchStack>,
    auxiliary: Arc<DispatchStack>,
}

impl OverlayGuard {
    pub fn new(footswitches: Arc<DispatchStack>, auxiliary: Arc<DispatchStack>) -> Self {
        footswitches.push();
        auxiliary.push();
        Self {
            footswitches,
            auxiliary,
        }
    }
}

impl Drop for OverlayGuard {
    fn drop(&mut self) {
        for stack in [&self.auxiliary, &self.footswitches] {
            if stack.pop() == PopStatus::AtBase {
                log::warn!(target: "dispatch", "overlay closed with {} stack at base frame", stack.kind());
            }
        }
    }
}
