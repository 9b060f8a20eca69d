//! Panic isolation for calls into unit code.

use crate::framework::UnitError;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs `f`, turning a panic into [`UnitError::Panicked`].
///
/// A unit that panics halfway through a hook may be left in a partial state.
/// The registry fences a unit whose enable failed and skips it on disable and
/// command registration. Reload still reaches it, and a reload that succeeds
/// lifts the fence.
pub fn guarded<T>(f: impl FnOnce() -> Result<T, UnitError>) -> Result<T, UnitError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(UnitError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
