use std::{fmt, result};

use crate::tuners::GainMode;

/// A result of a function that may return a `TunerError`.
pub type Result<T> = result::Result<T, TunerError>;

// Macro to create an error enum with From converters for each input error class
macro_rules! define_errcodes {
    [ $typename:ident => $( $name:ident $(: $class:ty)? ),+ ] => {
        #[derive(Debug)]
        pub enum $typename {
            $(
                $name $( ($class) )?,
            )+
        }

        impl fmt::Display for $typename {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                match *self {
                    $(
                        $typename::$name(ref err) => err.fmt(f),
                    )+
                }
            }
        }

        $( $(
            impl From<$class> for $typename {
                fn from(e: $class) -> Self {
                    $typename::$name(e)
                }
            } )?
        )+
    };
}

define_errcodes![
    TunerError =>
    Usb: rusb::Error,
    Transport: TransportError,
    Range: RangeError,
    NotSupported: NotSupported,
    Tuner: String
];

impl std::error::Error for TunerError {}

/// An I2C transfer to a tuner failed. Never retried by the bus layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The control transfer carrying the I2C message failed.
    Usb { addr: u8, source: rusb::Error },
    /// Nothing was transferred; the device did not acknowledge.
    Nak { addr: u8 },
    Short {
        addr: u8,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TransportError::Usb { addr, source } => {
                write!(f, "i2c transfer to {:#04x} failed: {}", addr, source)
            }
            TransportError::Nak { addr } => write!(f, "i2c device {:#04x} did not ack", addr),
            TransportError::Short {
                addr,
                expected,
                actual,
            } => write!(
                f,
                "short i2c transfer to {:#04x}: {} of {} bytes",
                addr, actual, expected
            ),
        }
    }
}

/// The quantity a `RangeError` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Frequency,
    Bandwidth,
    Gain,
    Crystal,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Quantity::Frequency => "frequency",
            Quantity::Bandwidth => "bandwidth",
            Quantity::Gain => "gain",
            Quantity::Crystal => "crystal frequency",
        };
        f.write_str(name)
    }
}

/// A requested value the chip cannot represent. Raised before any bus I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeError {
    pub quantity: Quantity,
    pub requested: i64,
}

impl RangeError {
    pub fn new(quantity: Quantity, requested: impl Into<i64>) -> RangeError {
        RangeError {
            quantity,
            requested: requested.into(),
        }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} out of range", self.quantity, self.requested)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotSupported {
    /// A stage gain could not be read back while evaluating the gain mode.
    GainModeEvaluation,
    GainMode(GainMode),
    NoTuner,
}

impl fmt::Display for NotSupported {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NotSupported::GainModeEvaluation => f.write_str("gain mode evaluation not supported"),
            NotSupported::GainMode(mode) => write!(f, "gain mode {:?} not supported", mode),
            NotSupported::NoTuner => f.write_str("no supported tuner found"),
        }
    }
}
