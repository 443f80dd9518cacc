//! SANE network protocol engine.
//!
//! Implements the saned wire protocol on port 6566: session setup, device
//! enumeration, typed option negotiation, and frame acquisition over the
//! auxiliary data socket.

pub mod device;
pub mod frame;
pub mod image;
pub mod option;
pub mod session;
pub mod types;
pub mod wire;


// Re-export public API
pub use device::{DeviceOption, OpenDevice};
pub use image::{Frame, SaneImage};
pub use session::{ConnectionDiagnosis, SaneDeviceInfo, SaneSession, DEFAULT_PORT};
