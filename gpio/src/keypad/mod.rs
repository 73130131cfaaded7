mod matrix;
mod watch;

use std::fmt::Debug;
use crate::{GpioResult, PinId};
pub use matrix::*;
pub use watch::*;

/// The `Keypad` trait defines the interface for interrupt-armed keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Puts the keypad in its idle (armed) state, so a key press produces a falling edge.
    fn init(&self) -> GpioResult<()>;

    /// Resolves the key behind the edge seen on `trigger`.
    ///
    /// Returns `Ok(None)` if `trigger` doesn't belong to this keypad or no key could be resolved.
    /// The keypad is left armed on return.
    fn scan(&self, trigger: PinId) -> GpioResult<Option<Self::Key>>;
}
