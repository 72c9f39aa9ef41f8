//! Opsis Vision Sensor Wire Protocol
//!
//! This crate defines the binary frame format spoken by the Opsis smart
//! vision sensor over its serial link: request encoding, reply payload
//! decoding and the checksum rule. It is pure — no I/O, no state — so the
//! same code serves the driver engine, tooling and tests.
//!
//! # Frame format
//!
//! All multi-byte integers are little-endian.
//!
//! ```text
//! Request:
//! ┌────────┬──────┬────────┬──────────┐
//! │ SYNC   │ TYPE │ LENGTH │ PAYLOAD  │
//! │ 0xC1AE │ 1B   │ 1B     │ 0–5B     │
//! └────────┴──────┴────────┴──────────┘
//!
//! Reply:
//! ┌──────────────┬──────┬────────┬────────────────────┬──────────┐
//! │ SYNC         │ TYPE │ LENGTH │ CHECKSUM           │ PAYLOAD  │
//! │ 0xC1AE/C1AF  │ 1B   │ 1B     │ 2B, 0xC1AF only    │ 0–255B   │
//! └──────────────┴──────┴────────┴────────────────────┴──────────┘
//! ```
//!
//! The checksum is the 16-bit wrapping sum of the payload bytes. Requests
//! never carry one.
//!
//! Reply payloads decode in place: typed records ([`Version`], [`Block`],
//! the line-tracking records behind [`LineFeatures`]) borrow the payload
//! bytes and read their fields on access.

#![no_std]
#![deny(unsafe_code)]

pub mod frame;
pub mod line;
pub mod reply;
pub mod request;

pub use frame::{
    checksum, sync_has_checksum, EncodeError, CHECKSUM_HEADER_SIZE, HEADER_SIZE,
    MAX_REQUEST_FRAME, MAX_REQUEST_PAYLOAD, SYNC_CHECKSUM, SYNC_NO_CHECKSUM,
};
pub use line::{
    Barcode, FeatureMode, FeatureSet, Intersection, IntersectionBranch, LineFeatures,
    LineModeFlags, Vector,
};
pub use reply::{
    frame_rate, return_code, Block, Blocks, DecodeError, Record, Records, RecordsIter,
    Resolution, Rgb, SensorCode, Version,
};
pub use request::{Request, SignatureMap};
