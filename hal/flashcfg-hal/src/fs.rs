//! Flash filesystem abstractions
//!
//! Provides traits for a small POSIX-like filesystem living in a flash
//! partition. Files are opened, transferred and closed within a single
//! operation; a handle borrows the filesystem, so only one file can be
//! open at a time.

use alloc::vec::Vec;

/// Maximum length of a file path in bytes
pub const MAX_PATH_LEN: usize = 64;

/// Maximum size of a single file in bytes
pub const MAX_FILE_SIZE: usize = 2048;

/// Chunk size used by [`FileHandle::read_to_end`]
const READ_CHUNK: usize = 128;

/// How a file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    /// Read an existing file from the start
    Read,
    /// Replace the file's contents (creating it) when the handle is closed
    Write,
}

/// Errors from flash filesystem operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FsError {
    /// Filesystem has not been mounted
    NotMounted,
    /// Partition does not contain a filesystem
    NotFormatted,
    /// File not found
    NotFound,
    /// Path is empty, too long or otherwise unusable
    InvalidPath,
    /// Operation not allowed by the mode the file was opened with
    BadMode,
    /// File exceeds [`MAX_FILE_SIZE`]
    FileTooLarge,
    /// Storage is full
    Full,
    /// Data corrupted or invalid
    Corrupted,
    /// Flash operation failed
    Flash,
    /// Storage operation failed
    Storage,
}

/// Check that a path can be stored
pub fn validate_path(path: &str) -> Result<(), FsError> {
    if path.is_empty() || path.len() > MAX_PATH_LEN {
        return Err(FsError::InvalidPath);
    }
    Ok(())
}

/// An open file
///
/// Writes are only guaranteed to reach flash once [`FileHandle::close`]
/// returns `Ok`. Dropping a write handle without closing it discards the
/// pending data.
pub trait FileHandle {
    /// Current size of the file in bytes
    fn size(&self) -> usize;

    /// Read from the current position into `buf`
    ///
    /// # Returns
    /// The number of bytes read, `0` at end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError>;

    /// Append `data` at the current position
    ///
    /// # Returns
    /// The number of bytes accepted. Fewer than `data.len()` (possibly
    /// zero) means the file reached its size limit.
    fn write(&mut self, data: &[u8]) -> Result<usize, FsError>;

    /// Close the file, committing any written data
    fn close(self) -> Result<(), FsError>;

    /// Read everything from the current position to the end of the file
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, FsError> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            let n = self.read(&mut chunk)?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&chunk[..n]);
            total += n;
        }
    }
}

/// Flash filesystem trait
///
/// Implementations should handle:
/// - Wear leveling across flash sectors
/// - Data integrity (CRC or similar)
/// - Whole-file replacement on close of a write handle
pub trait FlashFilesystem {
    /// Handle type returned by [`FlashFilesystem::open`]
    type File<'a>: FileHandle
    where
        Self: 'a;

    /// Mount the filesystem
    ///
    /// Fails with [`FsError::NotFormatted`] if the partition does not hold
    /// a filesystem.
    fn mount(&mut self) -> Result<(), FsError>;

    /// Erase the partition and write an empty filesystem
    ///
    /// This destroys every file. Leaves the filesystem unmounted.
    fn format(&mut self) -> Result<(), FsError>;

    /// Whether [`FlashFilesystem::mount`] has succeeded
    fn is_mounted(&self) -> bool;

    /// Check if a file exists
    fn exists(&mut self, path: &str) -> bool;

    /// Open a file
    ///
    /// [`OpenMode::Read`] fails with [`FsError::NotFound`] for a missing
    /// file. [`OpenMode::Write`] starts an empty file; it replaces the
    /// existing one only on [`FileHandle::close`], so a handle dropped
    /// without closing leaves the old contents in place.
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File<'_>, FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert_eq!(validate_path("/config.json"), Ok(()));
        assert_eq!(validate_path(""), Err(FsError::InvalidPath));

        let long = [b'a'; MAX_PATH_LEN + 1];
        let long = core::str::from_utf8(&long).unwrap();
        assert_eq!(validate_path(long), Err(FsError::InvalidPath));
        assert_eq!(validate_path(&long[..MAX_PATH_LEN]), Ok(()));
    }
}
