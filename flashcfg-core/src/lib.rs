//! JSON configuration store for flash-backed microcontrollers
//!
//! This crate contains the board-agnostic configuration logic:
//!
//! - [`ConfigStore`] - key-value document mirrored to one JSON file
//! - [`ConfigValue`] - typed access with best-effort coercion
//! - [`ConfigError`] - failures surfaced by initialization and persistence
//!
//! The store runs on any [`flashcfg_hal::FlashFilesystem`]. Every mutation
//! rewrites the whole file before returning.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

mod log;

pub mod error;
pub mod store;
pub mod value;

pub use error::ConfigError;
pub use store::{ConfigStore, MountRecovery, StoreOptions};
pub use value::ConfigValue;
