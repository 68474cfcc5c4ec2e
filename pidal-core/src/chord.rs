//! "Hold both" chording for footswitch pairs.

use std::sync::Arc;

use crate::debounce::DebounceMonitor;
use crate::dispatch::{handler, SwitchHandler};

/// Read access to debounced footswitch state.
pub trait PressedState: Send + Sync {
    fn is_pressed(&self, index: usize) -> bool;
}

impl PressedState for DebounceMonitor {
    fn is_pressed(&self, index: usize) -> bool {
        DebounceMonitor::is_pressed(self, index)
    }
}

impl<T: PressedState + ?Sized> PressedState for Arc<T> {
    fn is_pressed(&self, index: usize) -> bool {
        (**self).is_pressed(index)
    }
}

/// Wrap `primary` so that a press arriving while footswitch `companion` is
/// held goes to `alternate` instead.
///
/// There is no lookahead: whichever switch of the pair lands first still
/// delivers its press to its own primary handler. Releases always go to
/// `primary`, including the release of a press that went to `alternate`.
pub fn double_press<S>(
    primary: SwitchHandler,
    alternate: SwitchHandler,
    companion: usize,
    state: S,
) -> SwitchHandler
where
    S: PressedState + 'static,
{
    handler(move |pressed| {
        if pressed && state.is_pressed(companion) {
            alternate(true);
            return;
        }
        primary(pressed);
    })
}
