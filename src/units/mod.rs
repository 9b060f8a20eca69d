//! Sample feature units built on the [`Lifecycle`] template.
//!
//! - [`kiss`] - player interaction with a cooldown and a per-player opt-out
//! - [`webbridge`] - chat relay with a primary and an additional command
//! - [`announcer`] - timed broadcasts, depends on `webbridge`

use crate::framework::{Lifecycle, Unit};

pub mod announcer;
pub mod kiss;
pub mod webbridge;

pub use announcer::Announcer;
pub use kiss::Kiss;
pub use webbridge::WebBridge;

/// Every sample unit, boxed and ready to register.
pub fn sample_units() -> Vec<Box<dyn Unit>> {
    vec![
        Lifecycle::boxed(Kiss::new()),
        Lifecycle::boxed(Announcer::new()),
        Lifecycle::boxed(WebBridge::new()),
    ]
}
