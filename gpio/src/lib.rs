pub mod gpiod;
pub mod debounce;
pub mod keypad;
pub mod sim;
mod bank;

use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
pub use bank::PinBank;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("pin {0} was never claimed")]
    UnknownPin(PinId),
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// Identifies a single GPIO line: the port (GPIO chip) it lives on and its offset within that port.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PinId {
    pub port: usize,
    pub pin: usize,
}

impl PinId {
    pub const fn new(port: usize, pin: usize) -> Self {
        PinId { port, pin }
    }
}

impl Display for PinId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.port, self.pin)
    }
}

impl FromStr for PinId {
    type Err = GpioError;

    /// Parses `"port:pin"`, or a bare `"pin"` on port 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |s: &str| s.trim().parse::<usize>().map_err(|_| GpioError::InvalidArgument);

        match s.split_once(':') {
            Some((port, pin)) => Ok(PinId::new(parse(port)?, parse(pin)?)),
            None => Ok(PinId::new(0, parse(s)?)),
        }
    }
}

/// Specifies the bias of the GPIO pin.
///
/// You can use this to enable pull-up or pull-down resistors on inputs.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

/// A single GPIO port, such as one GPIO chip.
///
/// Lines handed out by [GpioDriver::get_output] and [GpioDriver::get_input] are exclusive
/// until the returned handle is dropped.
pub trait GpioDriver: Debug {
    /// Gets the name of the port, used for logging.
    fn name(&self) -> &str;

    /// Gets the amount of GPIO lines available.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the line at the given index as an output, driving it to `initial`.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the line is already claimed.
    fn get_output(&self, index: usize, initial: bool) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Claims the line at the given index as an input with the given bias.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the line is already claimed.
    /// - `GpioError::NotSupported` if the backend can't apply the bias.
    fn get_input(&self, index: usize, bias: GpioBias) -> GpioResult<Box<dyn GpioInput + '_>>;
}

pub trait GpioInput: Debug {
    /// Reads the state of the GPIO pin.
    fn read(&self) -> GpioResult<bool>;
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO pin.
    fn write(&self, value: bool) -> GpioResult<()>;
}

/// Level access to already configured pins, addressed by [PinId].
///
/// This is the only hardware capability the keypad scanner needs.
pub trait PinDriver: Debug {
    /// Drives an output pin high (`true`) or low (`false`).
    fn write_pin(&self, pin: PinId, high: bool) -> GpioResult<()>;

    /// Reads the level of an input pin.
    fn read_pin(&self, pin: PinId) -> GpioResult<bool>;
}
