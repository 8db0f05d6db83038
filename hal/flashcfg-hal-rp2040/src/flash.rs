//! Flash filesystem driver for RP2040
//!
//! Places a `SeqFilesystem` in the last 64KB of flash, behind the
//! firmware image.
//!
//! Implements the `FlashFilesystem` trait from `flashcfg-hal`.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use flashcfg_hal::SeqFilesystem;

// Re-export shared types from flashcfg-hal
pub use flashcfg_hal::fs::{FsError, MAX_FILE_SIZE};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on the Pico
pub const CONFIG_PARTITION_SIZE: usize = 64 * 1024; // 64KB for config
pub const CONFIG_PARTITION_START: usize = FLASH_SIZE - CONFIG_PARTITION_SIZE;

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Flash range for the config partition
pub const CONFIG_RANGE: core::ops::Range<u32> =
    (CONFIG_PARTITION_START as u32)..(FLASH_SIZE as u32);

// A file must fit in one erase page of the map
const _: () = assert!(MAX_FILE_SIZE < FLASH_ERASE_SIZE);

/// Raw flash driver type used by the filesystem
pub type Rp2040Flash<'d> = Flash<'d, FLASH, Async, FLASH_SIZE>;

/// RP2040 flash filesystem
pub type Rp2040Filesystem<'d> = SeqFilesystem<Rp2040Flash<'d>>;

/// Create the flash filesystem over the config partition
///
/// The filesystem starts unmounted.
pub fn filesystem<'d>(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Rp2040Filesystem<'d> {
    SeqFilesystem::new(Flash::new(flash, dma), CONFIG_RANGE)
}
