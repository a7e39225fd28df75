pub mod migrate;
pub mod sms;
pub mod token;
