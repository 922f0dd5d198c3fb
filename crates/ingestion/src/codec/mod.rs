//! Wire frame decoders for the supported device protocols.

pub mod timer;
pub mod vibration;
