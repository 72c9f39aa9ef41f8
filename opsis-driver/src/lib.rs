//! Opsis Vision Sensor Transaction Engine
//!
//! Non-blocking request/response engine for the Opsis smart vision sensor
//! on a byte-oriented serial link. The sensor answers a command only after
//! its imaging cycle, tens of milliseconds later, so replies arrive
//! byte-by-byte on an asynchronous receive path while the controller's
//! main loop keeps running. The engine assembles and validates frames
//! incrementally and exposes a polling contract instead of blocking.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Application (poll loop)                     │
//! └──────────────────────────────────────────────┘
//!         │ command methods                ▲ typed views
//!         ▼                                │
//! ┌──────────────────────────────────────────────┐
//! │  Camera: transaction dispatcher              │
//! │    ├── Receiver: frame state machine         │
//! │    └── SensorLink: transmit seam             │
//! └──────────────────────────────────────────────┘
//!         │ write_blocking                 ▲ feed_byte (RX interrupt)
//!         ▼                                │
//!              serial peripheral (external)
//! ```
//!
//! # Polling contract
//!
//! Every command method returns `Ok(Some(result))` when its transaction
//! completed, `Ok(None)` while it is in flight, or `Err` on a terminal
//! failure of that attempt. Sending a request blocks only on per-byte
//! channel readiness; waiting for the reply never blocks.
//!
//! ```ignore
//! let mut camera = Camera::new(link);
//! let resolution = loop {
//!     match camera.resolution() {
//!         Ok(Some(resolution)) => break resolution,
//!         Ok(None) => continue, // reply not in yet
//!         Err(error) => return Err(error),
//!     }
//! };
//! ```
//!
//! Failed attempts are never retried by the engine; a failure returns it
//! to idle so the caller can issue a fresh command. A sensor that stays
//! silent leaves the engine polling busy forever — deadlines are the
//! caller's job, recovery is [`Camera::reset`].

#![no_std]
#![deny(unsafe_code)]

pub mod camera;
pub mod link;
pub mod receiver;

pub use camera::{Camera, Error};
pub use link::SensorLink;
pub use receiver::TransactionState;

#[cfg(feature = "embedded-io")]
pub use link::IoLink;

// The full wire vocabulary travels with the engine
pub use opsis_protocol as protocol;
