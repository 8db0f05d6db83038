//! flashcfg Hardware Abstraction Layer
//!
//! This crate defines the flash filesystem traits the configuration store
//! is written against, plus a chip-agnostic backend that implements them
//! on top of any NOR flash. Chip-specific HALs (RP2040, ...) only need to
//! hand over their flash driver and partition range.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (flashcfg-core, firmware)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  flashcfg-hal (this crate - traits)     │
//! │  SeqFilesystem (sequential-storage)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ flashcfg-hal- │       │  MockNorFlash │
//! │    rp2040     │       │  (host tests) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`fs::FlashFilesystem`] - Mount/format and open files by path
//! - [`fs::FileHandle`] - Read, write and close an open file

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod fs;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "sequential-storage")]
pub mod seqfs;

// Re-export key traits at crate root for convenience
pub use fs::{FileHandle, FlashFilesystem, FsError, OpenMode, MAX_FILE_SIZE, MAX_PATH_LEN};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockNorFlash;

#[cfg(feature = "sequential-storage")]
pub use seqfs::SeqFilesystem;
