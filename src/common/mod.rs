pub mod error;
pub mod notify;
pub mod patch;
