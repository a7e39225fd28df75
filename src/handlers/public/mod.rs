// handlers/public/mod.rs - no authentication
//
// Service metadata, health, and the SMS one-time code bridge used by the
// mobile client before it holds a token.

pub mod otp;
pub mod system;

pub use otp::{send_otp, verify_otp};
pub use system::{health, root};
