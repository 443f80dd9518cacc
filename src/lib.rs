//! Client library for the SANE ("Scanner Access Now Easy") network
//! protocol. Connects to a `saned` daemon over TCP, enumerates scanners,
//! negotiates their option set, and assembles acquired frames into an
//! in-memory raster image.

pub mod auth;
pub mod config;
pub mod error;
pub mod listener;
pub mod net;

pub use error::{Result, SaneError};
pub use listener::{NullListener, RateLimitedListener, ScanListener};
pub use net::{OpenDevice, SaneDeviceInfo, SaneImage, SaneSession, DEFAULT_PORT};
