use std::fmt::{Debug, Display, Formatter};
use log::trace;
use crate::{GpioBias, GpioResult, PinBank, PinDriver, PinId};
use crate::keypad::Keypad;

/// Represents the keys on a 4x4 keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeypadKey {
    /// The `1` key.
    Key1,
    /// The `2` key.
    Key2,
    /// The `3` key.
    Key3,
    /// The `4` key.
    Key4,
    /// The `5` key.
    Key5,
    /// The `6` key.
    Key6,
    /// The `7` key.
    Key7,
    /// The `8` key.
    Key8,
    /// The `9` key.
    Key9,
    /// The `0` key.
    Key0,
    /// The `*` key.
    KeyAsterisk,
    /// The `#` key.
    KeyHash,
    /// The `A` key.
    KeyA,
    /// The `B` key.
    KeyB,
    /// The `C` key.
    KeyC,
    /// The `D` key.
    KeyD,
}

pub const KEYPAD_ROWS: usize = 4;
pub const KEYPAD_COLS: usize = 4;

/// Key layout of the reference 4x4 membrane keypad, indexed `[row][column]`.
pub static KEYPAD_MAP: [[KeypadKey; KEYPAD_COLS]; KEYPAD_ROWS] = {
    use KeypadKey::*;

    [
        [ Key1, Key2, Key3, KeyA, ],
        [ Key4, Key5, Key6, KeyB, ],
        [ Key7, Key8, Key9, KeyC, ],
        [ KeyAsterisk, Key0, KeyHash, KeyD, ],
    ]
};

impl KeypadKey {
    /// Converts a (row, column) position on the reference layout to a [KeypadKey].
    pub fn from_position(row: usize, col: usize) -> Option<KeypadKey> {
        KEYPAD_MAP.get(row)?.get(col).copied()
    }

    /// Converts a character to its [KeypadKey], if there is one.
    pub fn from_char(c: char) -> Option<KeypadKey> {
        KEYPAD_MAP
            .iter()
            .flatten()
            .find(|key| key.to_char() == c)
            .copied()
    }

    /// Converts the [KeypadKey] to its corresponding character.
    pub fn to_char(self) -> char {
        use KeypadKey::*;

        match self {
            Key1 => '1',
            Key2 => '2',
            Key3 => '3',
            Key4 => '4',
            Key5 => '5',
            Key6 => '6',
            Key7 => '7',
            Key8 => '8',
            Key9 => '9',
            Key0 => '0',
            KeyAsterisk => '*',
            KeyHash => '#',
            KeyA => 'A',
            KeyB => 'B',
            KeyC => 'C',
            KeyD => 'D',
        }
    }
}

impl Display for KeypadKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// The pins a matrix keypad is wired to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KeypadHandle<const R: usize, const C: usize> {
    pub row_pins: [PinId; R],
    pub col_pins: [PinId; C],
}

pub type KeypadHandle4x4 = KeypadHandle<KEYPAD_ROWS, KEYPAD_COLS>;

impl<const R: usize, const C: usize> KeypadHandle<R, C> {
    pub fn new(row_pins: [PinId; R], col_pins: [PinId; C]) -> Self {
        KeypadHandle { row_pins, col_pins }
    }

    /// Gets the index of the column wired to `pin`.
    pub fn column_of(&self, pin: PinId) -> Option<usize> {
        self.col_pins.iter().position(|&col| col == pin)
    }

    /// Claims the rows as outputs (driven low, i.e. armed) and the columns as pulled-up inputs.
    pub fn claim_pins(&self, bank: &mut PinBank<'_>) -> GpioResult<()> {
        for &pin in &self.row_pins {
            bank.claim_output(pin, false)?;
        }
        for &pin in &self.col_pins {
            bank.claim_input(pin, GpioBias::PullUp)?;
        }
        Ok(())
    }
}

/// A row/column matrix keypad scanned on demand, after a falling edge on one of its columns.
///
/// Rows are outputs and idle low; columns are pulled-up inputs.
/// Pressing a key shorts its column to its row, pulling the column low.
pub struct MatrixKeypad<'a, const R: usize, const C: usize> {
    handle: KeypadHandle<R, C>,
    driver: &'a dyn PinDriver,
    keymap: &'static [[KeypadKey; C]; R],
}

pub type MatrixKeypad4x4<'a> = MatrixKeypad<'a, KEYPAD_ROWS, KEYPAD_COLS>;

impl<const R: usize, const C: usize> Debug for MatrixKeypad<'_, R, C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MatrixKeypad(rows {:?}, cols {:?}, {:?})",
            self.handle.row_pins, self.handle.col_pins, self.driver
        )
    }
}

impl<'a, const R: usize, const C: usize> MatrixKeypad<'a, R, C> {
    /// Creates a new `MatrixKeypad` scanning the pins of `handle` through `driver`.
    ///
    /// The pins must already be configured, see [KeypadHandle::claim_pins].
    pub fn new(
        handle: KeypadHandle<R, C>,
        driver: &'a dyn PinDriver,
        keymap: &'static [[KeypadKey; C]; R],
    ) -> Self {
        MatrixKeypad { handle, driver, keymap }
    }

    pub fn handle(&self) -> &KeypadHandle<R, C> {
        &self.handle
    }

    fn write_rows(&self, high: bool) -> GpioResult<()> {
        for &pin in &self.handle.row_pins {
            self.driver.write_pin(pin, high)?;
        }
        Ok(())
    }

    /// Drives one row low at a time and returns the key of the first row that pulls `col` low.
    fn probe(&self, col: usize) -> GpioResult<Option<KeypadKey>> {
        let col_pin = self.handle.col_pins[col];

        self.write_rows(true)?;

        for (row, &row_pin) in self.handle.row_pins.iter().enumerate() {
            self.driver.write_pin(row_pin, false)?;

            if !self.driver.read_pin(col_pin)? {
                return Ok(Some(self.keymap[row][col]));
            }

            self.driver.write_pin(row_pin, true)?;
        }

        Ok(None)
    }
}

impl<const R: usize, const C: usize> Keypad for MatrixKeypad<'_, R, C> {
    type Key = KeypadKey;

    fn init(&self) -> GpioResult<()> {
        self.write_rows(false)
    }

    fn scan(&self, trigger: PinId) -> GpioResult<Option<Self::Key>> {
        let Some(col) = self.handle.column_of(trigger) else {
            trace!("{} is not a column of {:?}, ignoring.", trigger, self);
            return Ok(None);
        };

        let found = self.probe(col);
        // Rows go back low even when probing failed.
        let armed = self.write_rows(false);
        let found = found?;
        armed?;

        match found {
            Some(key) => trace!("Column {} resolved to {}.", col, key),
            None => trace!("Column {} fell but no row conducts.", col),
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpioError;
    use crate::sim::{SimEvent, SimGpio};

    const ROW_LINES: [usize; 4] = [0, 1, 2, 3];
    const COL_LINES: [usize; 4] = [4, 5, 6, 7];

    fn handle() -> KeypadHandle4x4 {
        KeypadHandle::new(
            ROW_LINES.map(|line| PinId::new(0, line)),
            COL_LINES.map(|line| PinId::new(0, line)),
        )
    }

    fn bank(sim: &SimGpio) -> PinBank<'_> {
        let mut bank = PinBank::new();
        bank.add_port(sim);
        handle().claim_pins(&mut bank).unwrap();
        bank
    }

    fn rows_low(sim: &SimGpio) -> bool {
        ROW_LINES.iter().all(|&line| sim.output_level(line) == Some(false))
    }

    #[test]
    fn init_arms_every_row() {
        let sim = SimGpio::new("sim", 8);
        let bank = bank(&sim);
        for &line in &ROW_LINES {
            bank.write_pin(PinId::new(0, line), true).unwrap();
        }

        let keypad = MatrixKeypad::new(handle(), &bank, &KEYPAD_MAP);
        keypad.init().unwrap();

        assert!(rows_low(&sim));
    }

    #[test]
    fn resolves_every_key() {
        let sim = SimGpio::new("sim", 8);
        let bank = bank(&sim);
        let keypad = MatrixKeypad::new(handle(), &bank, &KEYPAD_MAP);
        keypad.init().unwrap();

        for row in 0..KEYPAD_ROWS {
            for col in 0..KEYPAD_COLS {
                sim.press(ROW_LINES[row], COL_LINES[col]);

                let key = keypad.scan(PinId::new(0, COL_LINES[col])).unwrap();
                assert_eq!(key, Some(KEYPAD_MAP[row][col]), "row {row} col {col}");
                assert!(rows_low(&sim));

                sim.release_all();
            }
        }
    }

    #[test]
    fn row_two_column_two_is_nine() {
        let sim = SimGpio::new("sim", 8);
        let bank = bank(&sim);
        let keypad = MatrixKeypad::new(handle(), &bank, &KEYPAD_MAP);
        keypad.init().unwrap();

        sim.press(ROW_LINES[2], COL_LINES[2]);
        let key = keypad.scan(PinId::new(0, COL_LINES[2])).unwrap();

        assert_eq!(key.map(KeypadKey::to_char), Some('9'));
    }

    #[test]
    fn foreign_pin_touches_nothing() {
        let sim = SimGpio::new("sim", 8);
        let bank = bank(&sim);
        let keypad = MatrixKeypad::new(handle(), &bank, &KEYPAD_MAP);
        keypad.init().unwrap();
        sim.take_history();

        sim.press(ROW_LINES[0], COL_LINES[0]);
        assert_eq!(keypad.scan(PinId::new(0, 9)).unwrap(), None);
        assert_eq!(keypad.scan(PinId::new(1, COL_LINES[0])).unwrap(), None);

        assert!(sim.take_history().is_empty());
        assert!(rows_low(&sim));
    }

    #[test]
    fn bounce_returns_no_key_and_rearms() {
        let sim = SimGpio::new("sim", 8);
        let bank = bank(&sim);
        let keypad = MatrixKeypad::new(handle(), &bank, &KEYPAD_MAP);
        keypad.init().unwrap();
        sim.take_history();

        assert_eq!(keypad.scan(PinId::new(0, COL_LINES[1])).unwrap(), None);

        let history = sim.take_history();
        let reads = history
            .iter()
            .filter(|event| matches!(event, SimEvent::Read { .. }))
            .count();
        assert_eq!(reads, KEYPAD_ROWS, "every row should have been probed");
        assert!(rows_low(&sim));
    }

    #[test]
    fn exactly_one_row_is_low_when_sampling() {
        let sim = SimGpio::new("sim", 8);
        let bank = bank(&sim);
        let keypad = MatrixKeypad::new(handle(), &bank, &KEYPAD_MAP);
        keypad.init().unwrap();

        // A held key on another column must not disturb probing.
        sim.press(ROW_LINES[0], COL_LINES[0]);
        sim.press(ROW_LINES[3], COL_LINES[1]);
        sim.take_history();

        assert_eq!(
            keypad.scan(PinId::new(0, COL_LINES[1])).unwrap(),
            Some(KeypadKey::Key0)
        );

        for event in sim.take_history() {
            if let SimEvent::Read { index, outputs_low, .. } = event {
                assert_eq!(index, COL_LINES[1]);
                assert_eq!(outputs_low, 1);
            }
        }
    }

    #[test]
    fn stops_at_first_conducting_row() {
        let sim = SimGpio::new("sim", 8);
        let bank = bank(&sim);
        let keypad = MatrixKeypad::new(handle(), &bank, &KEYPAD_MAP);
        keypad.init().unwrap();

        sim.press(ROW_LINES[1], COL_LINES[3]);
        sim.press(ROW_LINES[2], COL_LINES[3]);
        sim.take_history();

        assert_eq!(
            keypad.scan(PinId::new(0, COL_LINES[3])).unwrap(),
            Some(KeypadKey::KeyB)
        );
        let reads = sim
            .take_history()
            .into_iter()
            .filter(|event| matches!(event, SimEvent::Read { .. }))
            .count();
        assert_eq!(reads, 2);
    }

    #[test]
    fn failed_probe_still_rearms() {
        let sim = SimGpio::new("sim", 8);
        let mut bank = PinBank::new();
        bank.add_port(&sim);
        for &line in &ROW_LINES {
            bank.claim_output(PinId::new(0, line), false).unwrap();
        }

        let keypad = MatrixKeypad::new(handle(), &bank, &KEYPAD_MAP);
        let trigger = PinId::new(0, COL_LINES[0]);

        assert_eq!(keypad.scan(trigger), Err(GpioError::UnknownPin(trigger)));
        assert!(rows_low(&sim));
    }

    #[test]
    fn keys_convert_to_and_from_chars() {
        assert_eq!(KeypadKey::from_position(3, 0), Some(KeypadKey::KeyAsterisk));
        assert_eq!(KeypadKey::from_position(4, 0), None);
        assert_eq!(KeypadKey::from_char('#'), Some(KeypadKey::KeyHash));
        assert_eq!(KeypadKey::from_char('x'), None);
        assert_eq!(KeypadKey::KeyD.to_string(), "D");

        let chars: String = KEYPAD_MAP.iter().flatten().map(|key| key.to_char()).collect();
        assert_eq!(chars, "123A456B789C*0#D");
    }
}
