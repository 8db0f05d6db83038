//! Mock NOR flash for testing
//!
//! Provides an in-memory flash simulation for host-side unit tests.

use alloc::vec;
use alloc::vec::Vec;

use embedded_storage_async::nor_flash::{
    ErrorType, MultiwriteNorFlash, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

/// Page (erase block) size of the mock flash
pub const MOCK_PAGE_SIZE: usize = 4096;

/// Number of pages in the mock flash
pub const MOCK_PAGE_COUNT: usize = 4;

/// Total mock flash capacity
pub const MOCK_CAPACITY: usize = MOCK_PAGE_SIZE * MOCK_PAGE_COUNT;

/// Errors reported by [`MockNorFlash`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MockFlashError {
    /// Access outside the flash
    OutOfBounds,
    /// Offset or length not aligned to the operation granularity
    NotAligned,
    /// Write rejected by fault injection
    WriteFailed,
    /// Erase rejected by fault injection
    EraseFailed,
}

impl NorFlashError for MockFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            MockFlashError::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            MockFlashError::NotAligned => NorFlashErrorKind::NotAligned,
            MockFlashError::WriteFailed | MockFlashError::EraseFailed => NorFlashErrorKind::Other,
        }
    }
}

/// Mock NOR flash
///
/// Simulates flash storage in memory. Supports:
/// - Erase to `0xFF`, writes that can only clear bits
/// - Fault injection for writes and erases
/// - Erase counting
///
/// Fresh instances are fully erased, so a filesystem on top of them
/// fails to mount until it is formatted.
#[derive(Debug, Clone)]
pub struct MockNorFlash {
    /// Flash contents (initialized to 0xFF - erased state)
    storage: Vec<u8>,
    /// Total number of page erases
    erase_count: u32,
    fail_writes: bool,
    fail_erases: bool,
}

impl MockNorFlash {
    /// Create an erased mock flash
    pub fn new() -> Self {
        Self {
            storage: vec![0xFF; MOCK_CAPACITY],
            erase_count: 0,
            fail_writes: false,
            fail_erases: false,
        }
    }

    /// Make every following write fail (or succeed again)
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Make every following erase fail (or succeed again)
    pub fn set_fail_erases(&mut self, fail: bool) {
        self.fail_erases = fail;
    }

    /// Number of pages erased so far
    pub fn erase_count(&self) -> u32 {
        self.erase_count
    }

    /// Raw flash contents (for test verification)
    pub fn contents(&self) -> &[u8] {
        &self.storage
    }

    fn check_range(&self, offset: u32, len: usize) -> Result<(), MockFlashError> {
        let end = offset as usize + len;
        if end > self.storage.len() {
            return Err(MockFlashError::OutOfBounds);
        }
        Ok(())
    }
}

impl Default for MockNorFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for MockNorFlash {
    type Error = MockFlashError;
}

impl ReadNorFlash for MockNorFlash {
    const READ_SIZE: usize = 1;

    async fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.check_range(offset, bytes.len())?;
        let start = offset as usize;
        bytes.copy_from_slice(&self.storage[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.storage.len()
    }
}

impl NorFlash for MockNorFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = MOCK_PAGE_SIZE;

    async fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if self.fail_erases {
            return Err(MockFlashError::EraseFailed);
        }
        if from > to {
            return Err(MockFlashError::OutOfBounds);
        }
        if from as usize % Self::ERASE_SIZE != 0 || to as usize % Self::ERASE_SIZE != 0 {
            return Err(MockFlashError::NotAligned);
        }
        self.check_range(from, (to - from) as usize)?;

        for byte in &mut self.storage[from as usize..to as usize] {
            *byte = 0xFF;
        }
        self.erase_count += (to - from) / Self::ERASE_SIZE as u32;
        Ok(())
    }

    async fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MockFlashError::WriteFailed);
        }
        if offset as usize % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(MockFlashError::NotAligned);
        }
        self.check_range(offset, bytes.len())?;

        // NOR flash can only clear bits
        let start = offset as usize;
        for (cell, byte) in self.storage[start..start + bytes.len()].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        Ok(())
    }
}

impl MultiwriteNorFlash for MockNorFlash {}
