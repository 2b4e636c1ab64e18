//! UART serial receive abstractions
//!
//! The POST code source only ever talks to us, so only the receive side is
//! modelled. Reads never block: the monitor runs inside a cooperative loop.

/// Non-blocking UART receiver
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Number of bytes that can be read right now without blocking
    ///
    /// A lower bound is acceptable: returning 1 while more bytes are
    /// buffered only means the caller reads in smaller steps.
    fn available(&mut self) -> usize;

    /// Read up to `buf.len()` already-buffered bytes
    ///
    /// Returns `Ok(0)` when nothing is buffered. Never waits for data.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Read a single buffered byte, if any
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        let mut buf = [0u8; 1];
        match self.read_available(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }
}

impl<T: UartRx + ?Sized> UartRx for &mut T {
    type Error = T::Error;

    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read_available(buf)
    }
}

/// Adapter from an `embedded-io` reader to [`UartRx`]
///
/// `ReadReady` only says whether at least one byte is buffered, so
/// [`UartRx::available`] reports 0 or 1. A read issued while the reader is
/// ready returns without blocking.
#[cfg(feature = "embedded-io")]
pub struct IoRx<T> {
    inner: T,
}

#[cfg(feature = "embedded-io")]
impl<T> IoRx<T> {
    /// Wrap an embedded-io reader
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Release the wrapped reader
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(feature = "embedded-io")]
impl<T: embedded_io::Read + embedded_io::ReadReady> UartRx for IoRx<T> {
    type Error = T::Error;

    fn available(&mut self) -> usize {
        match self.inner.read_ready() {
            Ok(true) => 1,
            _ => 0,
        }
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() || !self.inner.read_ready()? {
            return Ok(0);
        }
        self.inner.read(buf)
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopBits {
    One,
    Two,
}
