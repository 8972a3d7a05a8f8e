mod device;
mod firmware;
mod message;
mod registration;
mod transfer;

pub use device::*;
pub use firmware::*;
pub use message::*;
pub use registration::*;
pub use transfer::*;
