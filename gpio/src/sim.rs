//! An in-memory GPIO port with a simulated switch matrix wired across its lines.
//!
//! Holding a key connects two lines. An input connected to an output that is driven low reads low;
//! otherwise it reads its bias level (low with a pull-down, high otherwise).
//! Every write and read is recorded so tests can check what happened on the lines.
use crate::{GpioBias, GpioDriver, GpioError, GpioInput, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

/// A single recorded line access.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimEvent {
    Write { index: usize, value: bool },
    /// `outputs_low` is the number of claimed outputs that were low when the read happened.
    Read { index: usize, value: bool, outputs_low: usize },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum SimLine {
    Unclaimed,
    Input(GpioBias),
    Output(bool),
}

pub struct SimGpio {
    name: String,
    used_pins: BitVec<AtomicU8>,
    lines: RefCell<Vec<SimLine>>,
    closed: RefCell<Vec<(usize, usize)>>,
    history: RefCell<Vec<SimEvent>>,
}

impl SimGpio {
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        SimGpio {
            name: name.into(),
            used_pins: BitVec::repeat(false, count),
            lines: RefCell::new(vec![SimLine::Unclaimed; count]),
            closed: RefCell::new(Vec::new()),
            history: RefCell::new(Vec::new()),
        }
    }

    /// Closes the switch between lines `a` and `b`, as if the key joining them was held.
    ///
    /// Lines outside the port are ignored.
    pub fn press(&self, a: usize, b: usize) {
        let count = self.used_pins.len();
        if a >= count || b >= count {
            return;
        }

        let mut closed = self.closed.borrow_mut();
        if !closed.iter().any(|&pair| pair == (a, b) || pair == (b, a)) {
            closed.push((a, b));
        }
    }

    /// Opens the switch between lines `a` and `b`.
    pub fn release(&self, a: usize, b: usize) {
        self.closed
            .borrow_mut()
            .retain(|&pair| pair != (a, b) && pair != (b, a));
    }

    pub fn release_all(&self) {
        self.closed.borrow_mut().clear();
    }

    /// Gets the level an output line is currently driven to, or `None` if it isn't an output.
    pub fn output_level(&self, index: usize) -> Option<bool> {
        match self.lines.borrow().get(index) {
            Some(SimLine::Output(level)) => Some(*level),
            _ => None,
        }
    }

    /// Takes every event recorded so far, leaving the history empty.
    pub fn take_history(&self) -> Vec<SimEvent> {
        self.history.take()
    }

    fn claim(&self, index: usize, line: SimLine) -> GpioResult<()> {
        if index >= self.used_pins.len() {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);
        self.lines.borrow_mut()[index] = line;
        Ok(())
    }

    fn release_line(&self, index: usize) {
        self.used_pins.set_aliased(index, false);
        self.lines.borrow_mut()[index] = SimLine::Unclaimed;
    }

    fn drive(&self, index: usize, value: bool) {
        self.lines.borrow_mut()[index] = SimLine::Output(value);
        self.history
            .borrow_mut()
            .push(SimEvent::Write { index, value });
    }

    fn sample(&self, index: usize) -> bool {
        let lines = self.lines.borrow();

        let pulled_low = self.closed.borrow().iter().any(|&(a, b)| {
            let other = match index {
                i if i == a => b,
                i if i == b => a,
                _ => return false,
            };
            lines[other] == SimLine::Output(false)
        });

        let value = !pulled_low && lines[index] != SimLine::Input(GpioBias::PullDown);
        let outputs_low = lines
            .iter()
            .filter(|&&line| line == SimLine::Output(false))
            .count();

        self.history.borrow_mut().push(SimEvent::Read {
            index,
            value,
            outputs_low,
        });
        value
    }
}

impl Debug for SimGpio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimGpio({})", self.name)
    }
}

impl GpioDriver for SimGpio {
    fn name(&self) -> &str {
        &self.name
    }

    fn count(&self) -> GpioResult<usize> {
        Ok(self.used_pins.len())
    }

    fn get_output(&self, index: usize, initial: bool) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.claim(index, SimLine::Output(initial))?;
        self.drive(index, initial);
        Ok(Box::new(SimOutput { driver: self, index }))
    }

    fn get_input(&self, index: usize, bias: GpioBias) -> GpioResult<Box<dyn GpioInput + '_>> {
        self.claim(index, SimLine::Input(bias))?;
        Ok(Box::new(SimInput { driver: self, index }))
    }
}

struct SimInput<'a> {
    driver: &'a SimGpio,
    index: usize,
}

impl Debug for SimInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][input]", self.driver, self.index)
    }
}

impl GpioInput for SimInput<'_> {
    fn read(&self) -> GpioResult<bool> {
        Ok(self.driver.sample(self.index))
    }
}

impl Drop for SimInput<'_> {
    fn drop(&mut self) {
        self.driver.release_line(self.index);
    }
}

struct SimOutput<'a> {
    driver: &'a SimGpio,
    index: usize,
}

impl Debug for SimOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.index)
    }
}

impl GpioOutput for SimOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.drive(self.index, value);
        Ok(())
    }
}

impl Drop for SimOutput<'_> {
    fn drop(&mut self) {
        self.driver.release_line(self.index);
    }
}
