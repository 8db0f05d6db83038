//! Flash filesystem on top of sequential-storage
//!
//! Every file is one item of a sequential-storage map, keyed by its path.
//! A superblock item marks the partition as formatted. sequential-storage
//! provides wear leveling and CRC-checked items; replacing a file writes a
//! new item and the old one is reclaimed when its page is recycled.
//!
//! The map API is async, the filesystem API is blocking. Flash futures
//! are driven to completion with `embassy_futures::block_on`.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use embassy_futures::block_on;
use embedded_storage_async::nor_flash::NorFlash;
use heapless::String as HString;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{self, Key, SerializationError};

use crate::fs::{
    validate_path, FileHandle, FlashFilesystem, FsError, OpenMode, MAX_FILE_SIZE, MAX_PATH_LEN,
};

/// Contents of the superblock item
const SUPERBLOCK: &[u8] = b"FCFG\x01";

/// Scratch buffer size: largest key plus largest file, with room for
/// item alignment
const DATA_BUFFER_SIZE: usize = MAX_FILE_SIZE + MAX_PATH_LEN + 32;

const TAG_SUPERBLOCK: u8 = 0;
const TAG_FILE: u8 = 1;

/// Map keys used on flash
#[derive(Debug, Clone, PartialEq, Eq)]
enum FsKey {
    /// Marks a formatted partition
    Superblock,
    /// File contents by path
    File(HString<MAX_PATH_LEN>),
}

impl FsKey {
    fn file(path: &str) -> Result<Self, FsError> {
        validate_path(path)?;
        let mut name = HString::new();
        name.push_str(path).map_err(|_| FsError::InvalidPath)?;
        Ok(FsKey::File(name))
    }
}

impl Key for FsKey {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        match self {
            FsKey::Superblock => {
                if buffer.is_empty() {
                    return Err(SerializationError::BufferTooSmall);
                }
                buffer[0] = TAG_SUPERBLOCK;
                Ok(1)
            }
            FsKey::File(name) => {
                let len = name.len();
                if buffer.len() < len + 2 {
                    return Err(SerializationError::BufferTooSmall);
                }
                buffer[0] = TAG_FILE;
                buffer[1] = len as u8;
                buffer[2..2 + len].copy_from_slice(name.as_bytes());
                Ok(len + 2)
            }
        }
    }

    fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
        match buffer.first() {
            None => Err(SerializationError::BufferTooSmall),
            Some(&TAG_SUPERBLOCK) => Ok((FsKey::Superblock, 1)),
            Some(&TAG_FILE) => {
                let len = *buffer.get(1).ok_or(SerializationError::BufferTooSmall)? as usize;
                let bytes = buffer
                    .get(2..2 + len)
                    .ok_or(SerializationError::BufferTooSmall)?;
                let path =
                    core::str::from_utf8(bytes).map_err(|_| SerializationError::InvalidFormat)?;
                let mut name = HString::new();
                name.push_str(path)
                    .map_err(|_| SerializationError::InvalidFormat)?;
                Ok((FsKey::File(name), len + 2))
            }
            Some(_) => Err(SerializationError::InvalidFormat),
        }
    }
}

fn storage_error<E>(e: sequential_storage::Error<E>) -> FsError {
    match e {
        sequential_storage::Error::FullStorage => FsError::Full,
        sequential_storage::Error::Corrupted { .. } => FsError::Corrupted,
        sequential_storage::Error::Storage { .. } => FsError::Flash,
        _ => FsError::Storage,
    }
}

/// Flash filesystem stored in a sequential-storage map
///
/// The flash range must span at least two erase pages, and a page must be
/// able to hold a [`MAX_FILE_SIZE`] file.
pub struct SeqFilesystem<F> {
    flash: F,
    range: Range<u32>,
    mounted: bool,
    buffer: Vec<u8>,
}

impl<F: NorFlash> SeqFilesystem<F> {
    /// Create an unmounted filesystem over `range` of `flash`
    pub fn new(flash: F, range: Range<u32>) -> Self {
        Self {
            flash,
            range,
            mounted: false,
            buffer: vec![0u8; DATA_BUFFER_SIZE],
        }
    }

    /// Get the underlying flash for low-level access
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Consume the filesystem and return the flash
    pub fn into_flash(self) -> F {
        self.flash
    }

    fn fetch(&mut self, key: &FsKey) -> Result<Option<Vec<u8>>, FsError> {
        let result = block_on(map::fetch_item::<FsKey, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut self.buffer[..],
            key,
        ));

        match result {
            Ok(Some(data)) => Ok(Some(data.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_error(e)),
        }
    }

    fn store(&mut self, key: &FsKey, data: &[u8]) -> Result<(), FsError> {
        if data.len() > MAX_FILE_SIZE {
            return Err(FsError::FileTooLarge);
        }

        block_on(map::store_item(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut self.buffer[..],
            key,
            &data,
        ))
        .map_err(storage_error)
    }
}

impl<F: NorFlash> FlashFilesystem for SeqFilesystem<F> {
    type File<'a>
        = SeqFile<'a, F>
    where
        Self: 'a;

    fn mount(&mut self) -> Result<(), FsError> {
        self.mounted = false;
        match self.fetch(&FsKey::Superblock)? {
            Some(data) if data == SUPERBLOCK => {
                self.mounted = true;
                Ok(())
            }
            Some(_) => Err(FsError::Corrupted),
            None => Err(FsError::NotFormatted),
        }
    }

    fn format(&mut self) -> Result<(), FsError> {
        self.mounted = false;

        block_on(self.flash.erase(self.range.start, self.range.end))
            .map_err(|_| FsError::Flash)?;

        self.store(&FsKey::Superblock, SUPERBLOCK)
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn exists(&mut self, path: &str) -> bool {
        if !self.mounted {
            return false;
        }
        let Ok(key) = FsKey::file(path) else {
            return false;
        };
        matches!(self.fetch(&key), Ok(Some(_)))
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<SeqFile<'_, F>, FsError> {
        if !self.mounted {
            return Err(FsError::NotMounted);
        }
        let key = FsKey::file(path)?;

        let data = match mode {
            OpenMode::Read => self.fetch(&key)?.ok_or(FsError::NotFound)?,
            OpenMode::Write => Vec::new(),
        };

        Ok(SeqFile {
            fs: self,
            key,
            mode,
            data,
            pos: 0,
        })
    }
}

/// An open file of a [`SeqFilesystem`]
///
/// Read handles hold a copy of the file. Write handles buffer data in RAM
/// and store it as a new map item on [`FileHandle::close`].
pub struct SeqFile<'a, F> {
    fs: &'a mut SeqFilesystem<F>,
    key: FsKey,
    mode: OpenMode,
    data: Vec<u8>,
    pos: usize,
}

impl<'a, F: NorFlash> FileHandle for SeqFile<'a, F> {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        if self.mode != OpenMode::Read {
            return Err(FsError::BadMode);
        }
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        if self.mode != OpenMode::Write {
            return Err(FsError::BadMode);
        }
        let n = data.len().min(MAX_FILE_SIZE - self.data.len());
        self.data.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn close(self) -> Result<(), FsError> {
        match self.mode {
            OpenMode::Read => Ok(()),
            OpenMode::Write => self.fs.store(&self.key, &self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockNorFlash, MOCK_CAPACITY, MOCK_PAGE_COUNT};

    fn formatted() -> SeqFilesystem<MockNorFlash> {
        let mut fs = SeqFilesystem::new(MockNorFlash::new(), 0..MOCK_CAPACITY as u32);
        fs.format().unwrap();
        fs.mount().unwrap();
        fs
    }

    fn write_file(fs: &mut SeqFilesystem<MockNorFlash>, path: &str, data: &[u8]) {
        let mut file = fs.open(path, OpenMode::Write).unwrap();
        assert_eq!(file.write(data).unwrap(), data.len());
        file.close().unwrap();
    }

    fn read_file(fs: &mut SeqFilesystem<MockNorFlash>, path: &str) -> Vec<u8> {
        let mut file = fs.open(path, OpenMode::Read).unwrap();
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        file.close().unwrap();
        out
    }

    #[test]
    fn test_erased_flash_is_not_formatted() {
        let mut fs = SeqFilesystem::new(MockNorFlash::new(), 0..MOCK_CAPACITY as u32);
        assert_eq!(fs.mount(), Err(FsError::NotFormatted));
        assert!(!fs.is_mounted());
    }

    #[test]
    fn test_format_then_mount() {
        let mut fs = SeqFilesystem::new(MockNorFlash::new(), 0..MOCK_CAPACITY as u32);
        fs.format().unwrap();
        assert!(!fs.is_mounted());
        fs.mount().unwrap();
        assert!(fs.is_mounted());
    }

    #[test]
    fn test_open_requires_mount() {
        let mut fs = SeqFilesystem::new(MockNorFlash::new(), 0..MOCK_CAPACITY as u32);
        fs.format().unwrap();
        assert!(matches!(
            fs.open("/a", OpenMode::Read),
            Err(FsError::NotMounted)
        ));
        assert!(!fs.exists("/a"));
    }

    #[test]
    fn test_write_and_read_back() {
        let mut fs = formatted();
        write_file(&mut fs, "/config.json", b"{\"a\":1}");

        assert!(fs.exists("/config.json"));
        assert_eq!(read_file(&mut fs, "/config.json"), b"{\"a\":1}");
    }

    #[test]
    fn test_missing_file() {
        let mut fs = formatted();
        assert!(!fs.exists("/missing"));
        assert!(matches!(
            fs.open("/missing", OpenMode::Read),
            Err(FsError::NotFound)
        ));
    }

    #[test]
    fn test_open_for_write_truncates_on_close() {
        let mut fs = formatted();
        write_file(&mut fs, "/f", b"hello world");

        let file = fs.open("/f", OpenMode::Write).unwrap();
        file.close().unwrap();

        assert!(fs.exists("/f"));
        let file = fs.open("/f", OpenMode::Read).unwrap();
        assert_eq!(file.size(), 0);
    }

    #[test]
    fn test_unclosed_write_keeps_old_contents() {
        let mut fs = formatted();
        write_file(&mut fs, "/f", b"hello world");

        let mut file = fs.open("/f", OpenMode::Write).unwrap();
        file.write(b"partial").unwrap();
        drop(file);

        assert_eq!(read_file(&mut fs, "/f"), b"hello world");
    }

    #[test]
    fn test_new_file_exists_only_after_close() {
        let mut fs = formatted();
        let file = fs.open("/new", OpenMode::Write).unwrap();
        drop(file);
        assert!(!fs.exists("/new"));

        let file = fs.open("/new", OpenMode::Write).unwrap();
        file.close().unwrap();
        assert!(fs.exists("/new"));
    }

    #[test]
    fn test_foreign_superblock_is_corrupted() {
        let mut fs = SeqFilesystem::new(MockNorFlash::new(), 0..MOCK_CAPACITY as u32);
        fs.store(&FsKey::Superblock, b"LFS2\x00").unwrap();
        assert_eq!(fs.mount(), Err(FsError::Corrupted));
        assert!(!fs.is_mounted());
    }

    #[test]
    fn test_overwrite_replaces_contents() {
        let mut fs = formatted();
        write_file(&mut fs, "/f", b"first version");
        write_file(&mut fs, "/f", b"second");
        assert_eq!(read_file(&mut fs, "/f"), b"second");
    }

    #[test]
    fn test_files_are_independent() {
        let mut fs = formatted();
        write_file(&mut fs, "/a", b"alpha");
        write_file(&mut fs, "/b", b"beta");
        assert_eq!(read_file(&mut fs, "/a"), b"alpha");
        assert_eq!(read_file(&mut fs, "/b"), b"beta");
    }

    #[test]
    fn test_write_stops_at_size_limit() {
        let mut fs = formatted();
        let big = vec![b'x'; MAX_FILE_SIZE + 10];

        let mut file = fs.open("/big", OpenMode::Write).unwrap();
        assert_eq!(file.write(&big).unwrap(), MAX_FILE_SIZE);
        assert_eq!(file.write(b"more").unwrap(), 0);
        file.close().unwrap();

        assert_eq!(read_file(&mut fs, "/big").len(), MAX_FILE_SIZE);
    }

    #[test]
    fn test_wrong_mode() {
        let mut fs = formatted();
        write_file(&mut fs, "/f", b"data");

        let mut file = fs.open("/f", OpenMode::Read).unwrap();
        assert_eq!(file.write(b"x"), Err(FsError::BadMode));
    }

    #[test]
    fn test_invalid_path() {
        let mut fs = formatted();
        assert!(matches!(
            fs.open("", OpenMode::Write),
            Err(FsError::InvalidPath)
        ));
        assert!(!fs.exists(""));
    }

    #[test]
    fn test_contents_survive_remount() {
        let mut fs = formatted();
        write_file(&mut fs, "/config.json", b"{}");

        let flash = fs.into_flash();
        let mut fs = SeqFilesystem::new(flash, 0..MOCK_CAPACITY as u32);
        fs.mount().unwrap();
        assert_eq!(read_file(&mut fs, "/config.json"), b"{}");
    }

    #[test]
    fn test_format_erases_files() {
        let mut fs = formatted();
        write_file(&mut fs, "/f", b"data");

        fs.format().unwrap();
        fs.mount().unwrap();
        assert!(!fs.exists("/f"));
    }

    #[test]
    fn test_many_rewrites_recycle_pages() {
        let mut fs = formatted();
        let payload = [b'z'; 1500];
        for _ in 0..32 {
            write_file(&mut fs, "/f", &payload);
        }
        assert_eq!(read_file(&mut fs, "/f").len(), payload.len());
        assert!(fs.flash_mut().erase_count() > MOCK_PAGE_COUNT as u32);
    }

    #[test]
    fn test_failed_commit_is_reported() {
        let mut fs = formatted();
        let mut file = fs.open("/f", OpenMode::Write).unwrap();
        file.write(b"data").unwrap();
        file.fs.flash_mut().set_fail_writes(true);
        assert!(file.close().is_err());
    }

    #[test]
    fn test_format_failure() {
        let mut fs = SeqFilesystem::new(MockNorFlash::new(), 0..MOCK_CAPACITY as u32);
        fs.flash_mut().set_fail_erases(true);
        assert_eq!(fs.format(), Err(FsError::Flash));
    }

    #[test]
    fn test_file_key_encoding() {
        let key = FsKey::file("/config.json").unwrap();
        let mut buf = [0u8; 32];
        let len = key.serialize_into(&mut buf).unwrap();
        assert_eq!(len, 14);
        assert_eq!(buf[0], TAG_FILE);
        assert_eq!(buf[1], 12);

        let (decoded, used) = FsKey::deserialize_from(&buf[..len]).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(used, len);

        assert!(FsKey::deserialize_from(&[7]).is_err());
        assert!(FsKey::Superblock.serialize_into(&mut []).is_err());
    }
}
