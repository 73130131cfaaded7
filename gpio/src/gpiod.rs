//! GpiodDriver implementation for claiming GPIO lines through the Linux GPIO character device.
use crate::{GpioBias, GpioDriver, GpioError, GpioInput, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::AtomicU8;

/// GpiodDriver is a GPIO driver that uses the gpiod library to manage the lines of one GPIO chip.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_pins: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        let bits = BitVec::repeat(false, n);
        Self {
            chip,
            used_pins: bits,
        }
    }

    /// Opens the GPIO chip at the given path, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        let chip = gpiod::Chip::new(path.as_ref())?;
        debug!("Opened {} with {} lines.", chip.name(), chip.num_lines());
        Ok(Self::new(chip))
    }

    fn claim(&self, index: usize) -> GpioResult<()> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);
        Ok(())
    }

    fn release(&self, index: usize) {
        self.used_pins.set_aliased(index, false);
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl From<GpioBias> for gpiod::Bias {
    fn from(bias: GpioBias) -> Self {
        match bias {
            GpioBias::None => gpiod::Bias::Disable,
            GpioBias::PullUp => gpiod::Bias::PullUp,
            GpioBias::PullDown => gpiod::Bias::PullDown,
        }
    }
}

impl GpioDriver for GpiodDriver {
    fn name(&self) -> &str {
        self.chip.name()
    }

    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn get_output(&self, index: usize, initial: bool) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.claim(index)?;

        let line = self
            .chip
            .request_lines(
                gpiod::Options::output([index as u32])
                    .values([initial])
                    .consumer(env!("CARGO_PKG_NAME")),
            )
            .inspect_err(|_| self.release(index))?;

        Ok(Box::new(GpiodOutput {
            driver: self,
            index,
            line,
        }))
    }

    fn get_input(&self, index: usize, bias: GpioBias) -> GpioResult<Box<dyn GpioInput + '_>> {
        self.claim(index)?;

        let line = self
            .chip
            .request_lines(
                gpiod::Options::input([index as u32])
                    .consumer(env!("CARGO_PKG_NAME"))
                    .bias(bias.into()),
            )
            .inspect_err(|_| self.release(index))?;

        Ok(Box::new(GpiodInput {
            driver: self,
            index,
            line,
        }))
    }
}

struct GpiodInput<'a> {
    driver: &'a GpiodDriver,
    index: usize,
    line: gpiod::Lines<gpiod::Input>,
}

impl Debug for GpiodInput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][input]", self.driver, self.index)
    }
}

impl GpioInput for GpiodInput<'_> {
    fn read(&self) -> GpioResult<bool> {
        let values = self.line.get_values([false])?;
        Ok(values[0])
    }
}

impl Drop for GpiodInput<'_> {
    fn drop(&mut self) {
        self.driver.release(self.index);
    }
}

struct GpiodOutput<'a> {
    driver: &'a GpiodDriver,
    index: usize,
    line: gpiod::Lines<gpiod::Output>,
}

impl Debug for GpiodOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.index)
    }
}

impl GpioOutput for GpiodOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.line.set_values([value])?;
        Ok(())
    }
}

impl Drop for GpiodOutput<'_> {
    fn drop(&mut self) {
        self.driver.release(self.index);
    }
}
