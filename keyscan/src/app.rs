use std::time::Instant;
use log::{debug, info};
use keyscan_gpio::GpioResult;
use keyscan_gpio::debounce::TimedKeyFilter;
use keyscan_gpio::keypad::{EdgeWatcher, Keypad, KeypadKey, KEYPAD_COLS};

pub struct App<'a> {
    keypad: &'a dyn Keypad<Key = KeypadKey>,
    watcher: EdgeWatcher<'a, KEYPAD_COLS>,
    filter: TimedKeyFilter<KeypadKey>,
}

impl<'a> App<'a> {
    pub fn new(
        keypad: &'a dyn Keypad<Key = KeypadKey>,
        watcher: EdgeWatcher<'a, KEYPAD_COLS>,
        filter: TimedKeyFilter<KeypadKey>,
    ) -> Self {
        App {
            keypad,
            watcher,
            filter,
        }
    }

    /// Dispatches every column that fell since the last update to the keypad scan,
    /// and returns the keys that made it through debouncing.
    pub fn update(&mut self, now: Instant) -> GpioResult<Vec<KeypadKey>> {
        let mut accepted = Vec::new();

        for pin in self.watcher.poll()? {
            let Some(key) = self.keypad.scan(pin)? else {
                debug!("Edge on {} resolved to no key.", pin);
                continue;
            };

            if let Some(key) = self.filter.accept(key, now) {
                info!("Key {} pressed.", key);
                accepted.push(key);
            }
        }

        Ok(accepted)
    }
}
