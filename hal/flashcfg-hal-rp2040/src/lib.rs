//! RP2040-specific HAL for flashcfg
//!
//! This crate provides the RP2040 implementation of the shared
//! `flashcfg-hal` filesystem traits:
//!
//! - Config partition layout in on-board QSPI flash
//! - Flash filesystem driver (a `flashcfg_hal::SeqFilesystem` over the
//!   embassy-rp flash peripheral)

#![no_std]

pub mod flash;

// Re-export shared traits from flashcfg-hal for convenience
pub use flashcfg_hal::{FileHandle, FlashFilesystem, FsError, OpenMode};
