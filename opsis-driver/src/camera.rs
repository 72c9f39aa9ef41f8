//! Transaction dispatcher and the per-command polling API.
//!
//! Every command method is non-blocking and follows one contract:
//! `Ok(None)` means the transaction is still in flight (poll again),
//! `Ok(Some(value))` delivers the decoded result, `Err` is a terminal
//! failure for that attempt. All methods run through one generic
//! dispatcher core; a command only contributes its request descriptor and
//! its reply decode.

use opsis_protocol::line::{FeatureMode, FeatureSet, LineFeatures, LineModeFlags};
use opsis_protocol::reply::{
    self, Blocks, DecodeError, Resolution, Rgb, SensorCode, Version,
};
use opsis_protocol::request::{Request, SignatureMap};

use crate::link::SensorLink;
use crate::receiver::{Receiver, TransactionState};

/// Errors reported by a command poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The transmit link failed
    Link(E),
    /// The reply's checksum did not match its payload
    BadChecksum,
    /// The reply opcode fits neither the expected reply nor an error frame
    UnexpectedReply(u8),
    /// The sensor answered with an error frame; code passed through
    Sensor(SensorCode),
    /// The reply payload did not decode
    Decode(DecodeError),
    /// A received byte was dropped because the receive buffer was full
    Overrun,
}

impl<E> From<DecodeError> for Error<E> {
    fn from(inner: DecodeError) -> Self {
        Error::Decode(inner)
    }
}

/// A fully assembled, checksum-verified reply awaiting decode
struct Reply<'a> {
    frame_type: u8,
    payload: &'a [u8],
}

/// The protocol engine for one sensor on one serial link
///
/// Exactly one transaction is in flight at a time. Any command method
/// issued while another transaction is pending reports busy (`Ok(None)`)
/// without side effects; the engine does not track which command started
/// the transaction, so the caller is expected to keep polling the same
/// command until it resolves.
///
/// # Receive path
///
/// The integrator's receive interrupt hands every incoming byte to
/// [`Camera::feed_byte`]. The receive path and the command methods must
/// not run concurrently — wrap the engine in the platform's critical
/// section. Within that rule the engine is single-writer by construction:
/// the receive path only advances state while a transaction is pending,
/// and the dispatch path only transitions out of `Idle` and `Complete`.
///
/// # Result views
///
/// Results that reference the receive buffer ([`Version`], [`Blocks`],
/// [`LineFeatures`]) borrow the engine. They stay valid until the next
/// call that takes `&mut self`, which the borrow checker enforces; copy
/// out what you need before starting the next transaction.
pub struct Camera<L> {
    link: L,
    receiver: Receiver,
}

impl<L: SensorLink> Camera<L> {
    /// Create an engine over a transmit link
    pub fn new(link: L) -> Self {
        Self {
            link,
            receiver: Receiver::new(),
        }
    }

    /// Tear down the engine and hand the link back
    pub fn free(self) -> L {
        self.link
    }

    /// Deliver one received byte to the frame receiver
    ///
    /// Call from the serial receive interrupt, once per byte, never
    /// concurrently with a command method.
    pub fn feed_byte(&mut self, byte: u8) {
        self.receiver.feed(byte);
    }

    /// Current phase of the in-flight transaction
    pub fn state(&self) -> TransactionState {
        self.receiver.state()
    }

    /// Abandon the in-flight transaction and return the engine to idle
    ///
    /// The engine never measures elapsed time; when the sensor stays
    /// silent a transaction polls busy forever. A caller that enforces its
    /// own deadline recovers the engine with this method. Must not race a
    /// concurrent [`Camera::feed_byte`].
    pub fn reset(&mut self) {
        self.receiver.reset();
    }

    /// One step of the generic transaction: start it when idle, harvest
    /// it when complete, report busy otherwise.
    fn poll(&mut self, request: &Request) -> Result<Option<Reply<'_>>, Error<L::Error>> {
        if self.receiver.overrun() {
            self.receiver.reset();
            return Err(Error::Overrun);
        }

        match self.receiver.state() {
            TransactionState::Idle => {
                self.receiver.begin_transaction();
                let frame = request.encode_to_vec();
                self.link.write_blocking(&frame).map_err(Error::Link)?;
                self.link.flush().map_err(Error::Link)?;
                self.receiver.mark_sent();
                Ok(None)
            }
            TransactionState::Complete => {
                // Whatever the outcome, this attempt is over and the
                // engine is free again
                let checksum_ok = self.receiver.verify_checksum();
                self.receiver.finish();
                if !checksum_ok {
                    return Err(Error::BadChecksum);
                }
                Ok(Some(Reply {
                    frame_type: self.receiver.frame_type(),
                    payload: self.receiver.payload(),
                }))
            }
            _ => Ok(None),
        }
    }

    /// Poll a set-style command: the reply is an acknowledge or an error
    /// frame, either way carrying a result code.
    fn poll_ack(&mut self, request: &Request) -> Result<Option<()>, Error<L::Error>> {
        match self.poll(request)? {
            None => Ok(None),
            Some(reply) => match reply.frame_type {
                reply::REP_ACK => Ok(Some(())),
                reply::REP_ERROR => Err(Error::Sensor(SensorCode::from_raw(reply::return_code(
                    reply.payload,
                )?))),
                other => Err(Error::UnexpectedReply(other)),
            },
        }
    }

    /// Query hardware and firmware identification
    pub fn version(&mut self) -> Result<Option<Version<'_>>, Error<L::Error>> {
        match self.poll(&Request::Version)? {
            None => Ok(None),
            Some(reply) => {
                let payload = expect(reply, reply::REP_VERSION)?;
                Ok(Some(Version::parse(payload)?))
            }
        }
    }

    /// Query the frame resolution of the sensor's current program
    pub fn resolution(&mut self) -> Result<Option<Resolution>, Error<L::Error>> {
        match self.poll(&Request::Resolution)? {
            None => Ok(None),
            Some(reply) => {
                let payload = expect(reply, reply::REP_RESOLUTION)?;
                Ok(Some(Resolution::parse(payload)?))
            }
        }
    }

    /// Query the current capture rate in frames per second
    ///
    /// Also a cheap ambient-light probe: the sensor drops its frame rate
    /// in the dark.
    pub fn frame_rate(&mut self) -> Result<Option<u32>, Error<L::Error>> {
        match self.poll(&Request::FrameRate)? {
            None => Ok(None),
            Some(reply) => {
                let payload = expect(reply, reply::REP_FRAME_RATE)?;
                Ok(Some(reply::frame_rate(payload)?))
            }
        }
    }

    /// Query detected color blocks, largest first
    pub fn blocks(
        &mut self,
        signatures: SignatureMap,
        max_blocks: u8,
    ) -> Result<Option<Blocks<'_>>, Error<L::Error>> {
        let request = Request::Blocks {
            signatures,
            max_blocks,
        };
        match self.poll(&request)? {
            None => Ok(None),
            Some(reply) => {
                let payload = expect(reply, reply::REP_BLOCKS)?;
                Ok(Some(Blocks::new(payload)))
            }
        }
    }

    /// Query line-tracking features
    pub fn line_features(
        &mut self,
        mode: FeatureMode,
        filter: FeatureSet,
    ) -> Result<Option<LineFeatures<'_>>, Error<L::Error>> {
        let request = Request::LineFeatures { mode, filter };
        match self.poll(&request)? {
            None => Ok(None),
            Some(reply) => {
                let payload = expect(reply, reply::REP_LINE_FEATURES)?;
                Ok(Some(LineFeatures::parse(payload)?))
            }
        }
    }

    /// Query the average color of the 5x5 pixel square centered on (x, y)
    ///
    /// With `saturate` set the sensor scales the components so the
    /// brightest one reads 255.
    pub fn pixel_color(
        &mut self,
        x: u16,
        y: u16,
        saturate: bool,
    ) -> Result<Option<Rgb>, Error<L::Error>> {
        let request = Request::PixelColor { x, y, saturate };
        match self.poll(&request)? {
            None => Ok(None),
            Some(reply) => {
                let payload = expect(reply, reply::REP_ACK)?;
                Ok(Some(Rgb::parse(payload)?))
            }
        }
    }

    /// Set the relative exposure of the image sensor
    pub fn set_brightness(&mut self, brightness: u8) -> Result<Option<()>, Error<L::Error>> {
        self.poll_ack(&Request::Brightness(brightness))
    }

    /// Set both RC servo outputs (0-511 each)
    pub fn set_servos(&mut self, s0: u16, s1: u16) -> Result<Option<()>, Error<L::Error>> {
        self.poll_ack(&Request::Servos { s0, s1 })
    }

    /// Override the RGB LED color
    pub fn set_led(&mut self, red: u8, green: u8, blue: u8) -> Result<Option<()>, Error<L::Error>> {
        self.poll_ack(&Request::Led { red, green, blue })
    }

    /// Switch the white illumination LEDs and the RGB LED lamp
    pub fn set_lamp(&mut self, upper: bool, lower: bool) -> Result<Option<()>, Error<L::Error>> {
        self.poll_ack(&Request::Lamp { upper, lower })
    }

    /// Configure the line-tracking algorithm
    pub fn set_line_mode(&mut self, flags: LineModeFlags) -> Result<Option<()>, Error<L::Error>> {
        self.poll_ack(&Request::LineMode(flags))
    }

    /// Choose the branch angle for the next intersection only
    ///
    /// Zero is straight ahead, 90 left, -90 right. After the intersection
    /// the sensor falls back to the default turn angle.
    pub fn set_next_turn(&mut self, angle: i16) -> Result<Option<()>, Error<L::Error>> {
        self.poll_ack(&Request::NextTurn { angle })
    }

    /// Choose the default branch angle for intersections
    pub fn set_default_turn(&mut self, angle: i16) -> Result<Option<()>, Error<L::Error>> {
        self.poll_ack(&Request::DefaultTurn { angle })
    }

    /// Manually select the vector to track (manual-select mode)
    pub fn set_vector(&mut self, index: u8) -> Result<Option<()>, Error<L::Error>> {
        self.poll_ack(&Request::Vector { index })
    }

    /// Swap head and tail of the tracked vector
    pub fn reverse_vector(&mut self) -> Result<Option<()>, Error<L::Error>> {
        self.poll_ack(&Request::ReverseVector)
    }
}

/// Map a reply to its payload: the expected opcode passes, an error frame
/// surfaces the sensor's code, anything else is a type error.
fn expect<E>(reply: Reply<'_>, expected: u8) -> Result<&[u8], Error<E>> {
    if reply.frame_type == expected {
        Ok(reply.payload)
    } else if reply.frame_type == reply::REP_ERROR {
        Err(Error::Sensor(SensorCode::from_raw(reply::return_code(
            reply.payload,
        )?)))
    } else {
        Err(Error::UnexpectedReply(reply.frame_type))
    }
}
