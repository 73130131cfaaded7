use crate::{GpioBias, GpioDriver, GpioError, GpioInput, GpioOutput, GpioResult, PinDriver, PinId};
use log::debug;
use std::fmt::{Debug, Formatter};

/// A [PinDriver] over lines claimed from one or more [GpioDriver] ports.
///
/// Ports are numbered in the order they were added, matching [PinId::port].
pub struct PinBank<'a> {
    ports: Vec<&'a dyn GpioDriver>,
    outputs: Vec<(PinId, Box<dyn GpioOutput + 'a>)>,
    inputs: Vec<(PinId, Box<dyn GpioInput + 'a>)>,
}

impl<'a> PinBank<'a> {
    pub fn new() -> Self {
        PinBank {
            ports: Vec::new(),
            outputs: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Adds a port and returns its number.
    pub fn add_port(&mut self, driver: &'a dyn GpioDriver) -> usize {
        self.ports.push(driver);
        self.ports.len() - 1
    }

    fn port(&self, pin: PinId) -> GpioResult<&'a dyn GpioDriver> {
        self.ports
            .get(pin.port)
            .copied()
            .ok_or(GpioError::InvalidArgument)
    }

    /// Claims `pin` as an output driven to `initial`.
    pub fn claim_output(&mut self, pin: PinId, initial: bool) -> GpioResult<()> {
        let port = self.port(pin)?;
        let output = port.get_output(pin.pin, initial)?;
        debug!("Claimed {} as output on {}.", pin, port.name());
        self.outputs.push((pin, output));
        Ok(())
    }

    /// Claims `pin` as an input with the given bias.
    pub fn claim_input(&mut self, pin: PinId, bias: GpioBias) -> GpioResult<()> {
        let port = self.port(pin)?;
        let input = port.get_input(pin.pin, bias)?;
        debug!("Claimed {} as input ({:?}) on {}.", pin, bias, port.name());
        self.inputs.push((pin, input));
        Ok(())
    }
}

impl Default for PinBank<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for PinBank<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PinBank({:?}, {} outputs, {} inputs)",
            self.ports,
            self.outputs.len(),
            self.inputs.len()
        )
    }
}

impl PinDriver for PinBank<'_> {
    fn write_pin(&self, pin: PinId, high: bool) -> GpioResult<()> {
        let (_, output) = self
            .outputs
            .iter()
            .find(|(id, _)| *id == pin)
            .ok_or(GpioError::UnknownPin(pin))?;
        output.write(high)
    }

    fn read_pin(&self, pin: PinId) -> GpioResult<bool> {
        let (_, input) = self
            .inputs
            .iter()
            .find(|(id, _)| *id == pin)
            .ok_or(GpioError::UnknownPin(pin))?;
        input.read()
    }
}
