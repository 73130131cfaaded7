use std::fmt::{Debug, Formatter};
use crate::{GpioResult, PinDriver, PinId};

/// Watches a set of input pins for falling edges by sampling them on every [EdgeWatcher::poll].
///
/// Stands in for an edge interrupt where the backend only offers level reads.
pub struct EdgeWatcher<'a, const N: usize> {
    driver: &'a dyn PinDriver,
    pins: [PinId; N],
    levels: [bool; N],
}

impl<'a, const N: usize> EdgeWatcher<'a, N> {
    /// Creates a watcher, taking the current levels of `pins` as the starting point.
    pub fn new(driver: &'a dyn PinDriver, pins: [PinId; N]) -> GpioResult<Self> {
        let mut watcher = EdgeWatcher {
            driver,
            pins,
            levels: [true; N],
        };
        watcher.levels = watcher.sample()?;
        Ok(watcher)
    }

    pub fn pins(&self) -> &[PinId; N] {
        &self.pins
    }

    fn sample(&self) -> GpioResult<[bool; N]> {
        let mut levels = [true; N];
        for (level, &pin) in levels.iter_mut().zip(&self.pins) {
            *level = self.driver.read_pin(pin)?;
        }
        Ok(levels)
    }

    /// Samples all pins and returns the ones that went from high to low since the last poll,
    /// in the order they were given.
    pub fn poll(&mut self) -> GpioResult<Vec<PinId>> {
        let current = self.sample()?;

        let fell = self
            .pins
            .iter()
            .zip(self.levels.iter().zip(&current))
            .filter(|(_, (was, is))| **was && !**is)
            .map(|(&pin, _)| pin)
            .collect();

        self.levels = current;
        Ok(fell)
    }
}

impl<const N: usize> Debug for EdgeWatcher<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "EdgeWatcher({:?}, {:?})", self.pins, self.driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypad::{KEYPAD_MAP, Keypad, KeypadHandle, KeypadKey, MatrixKeypad};
    use crate::sim::SimGpio;
    use crate::PinBank;

    #[test]
    fn reports_only_falling_edges() {
        let sim = SimGpio::new("sim", 8);
        let mut bank = PinBank::new();
        bank.add_port(&sim);
        let handle = KeypadHandle::new(
            [0, 1, 2, 3].map(|line| PinId::new(0, line)),
            [4, 5, 6, 7].map(|line| PinId::new(0, line)),
        );
        handle.claim_pins(&mut bank).unwrap();

        let mut watcher = EdgeWatcher::new(&bank, handle.col_pins).unwrap();
        assert!(watcher.poll().unwrap().is_empty());

        sim.press(1, 6);
        assert_eq!(watcher.poll().unwrap(), vec![PinId::new(0, 6)]);
        assert!(watcher.poll().unwrap().is_empty(), "held key is not a new edge");

        sim.release(1, 6);
        assert!(watcher.poll().unwrap().is_empty(), "rising edge is ignored");

        sim.press(0, 4);
        sim.press(2, 7);
        assert_eq!(
            watcher.poll().unwrap(),
            vec![PinId::new(0, 4), PinId::new(0, 7)]
        );
    }

    #[test]
    fn edge_then_scan_yields_key_once() {
        let sim = SimGpio::new("sim", 8);
        let mut bank = PinBank::new();
        bank.add_port(&sim);
        let handle = KeypadHandle::new(
            [0, 1, 2, 3].map(|line| PinId::new(0, line)),
            [4, 5, 6, 7].map(|line| PinId::new(0, line)),
        );
        handle.claim_pins(&mut bank).unwrap();

        let keypad = MatrixKeypad::new(handle, &bank, &KEYPAD_MAP);
        keypad.init().unwrap();
        let mut watcher = EdgeWatcher::new(&bank, handle.col_pins).unwrap();

        sim.press(3, 6);
        let mut keys = Vec::new();
        for _ in 0..3 {
            for pin in watcher.poll().unwrap() {
                keys.extend(keypad.scan(pin).unwrap());
            }
        }

        assert_eq!(keys, vec![KeypadKey::KeyHash]);
    }
}
