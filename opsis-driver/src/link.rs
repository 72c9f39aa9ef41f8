//! Transmit half of the serial link to the sensor.
//!
//! The engine never touches a serial peripheral directly; it writes request
//! frames through this trait and is handed received bytes one at a time by
//! the integrator's receive interrupt (see [`Camera::feed_byte`]).
//!
//! [`Camera::feed_byte`]: crate::Camera::feed_byte

/// Byte transmitter toward the sensor
///
/// Implementations block per byte on the channel's ready signal. That wait
/// is bounded by the link's baud rate, not by the sensor — the sensor's
/// processing latency only ever shows up on the receive side.
pub trait SensorLink {
    /// Error type for transmit operations
    type Error;

    /// Write data to the sensor
    ///
    /// Blocks until all data has been accepted by the channel or an error
    /// occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Adapter exposing any [`embedded_io::Write`] TX half as a [`SensorLink`]
#[cfg(feature = "embedded-io")]
pub struct IoLink<W>(pub W);

#[cfg(feature = "embedded-io")]
impl<W: embedded_io::Write> SensorLink for IoLink<W> {
    type Error = W::Error;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()
    }
}
