//! Core types and trait definitions for the silverwatch monitoring backend.
//!
//! No HTTP or database code lives here. The store trait returns `Send`
//! futures so backends can be driven from a multi-threaded runtime.

pub mod alert;
pub mod change;
pub mod conversation;
pub mod error;
pub mod status;
pub mod store;
pub mod user;

pub use error::{Error, Result};
