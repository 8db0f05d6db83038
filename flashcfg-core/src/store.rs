//! Configuration store
//!
//! Keeps the configuration document in RAM and mirrors it to a single JSON
//! file. Every mutation rewrites the whole file before returning; file
//! handles never outlive a single operation.
//!
//! ```text
//! initialize()          mount (format once on failure), create the file
//!      │                if missing, load it unless empty
//!      ▼
//! get_or_default(k, v)  insert + persist if k is missing, else read k
//! update(k, v)          overwrite + persist
//! debug_dump(out)       re-read the file from flash and print it
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use flashcfg_hal::{FileHandle, FlashFilesystem, OpenMode};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::log::{log_debug, log_error, log_info, log_warn};
use crate::value::{render, ConfigValue};

/// The in-memory configuration document
pub type Document = Map<String, Value>;

/// What [`ConfigStore::initialize`] does when the filesystem will not mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MountRecovery {
    /// Format the partition once and retry. Destroys all stored files.
    #[default]
    FormatAndRetry,
    /// Report the mount failure and leave the flash untouched
    Fail,
}

/// Store options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreOptions {
    /// Recovery policy for a failed mount
    pub mount_recovery: MountRecovery,
}

/// JSON configuration store
///
/// Owns the filesystem and the in-memory document. The backing file path
/// is fixed at construction.
pub struct ConfigStore<F> {
    fs: F,
    path: String,
    doc: Document,
    options: StoreOptions,
    synced: bool,
}

impl<F: FlashFilesystem> ConfigStore<F> {
    /// Create a store with default options
    ///
    /// Nothing is read until [`ConfigStore::initialize`] is called.
    pub fn new(fs: F, path: &str) -> Self {
        Self::with_options(fs, path, StoreOptions::default())
    }

    /// Create a store with explicit options
    pub fn with_options(fs: F, path: &str, options: StoreOptions) -> Self {
        Self {
            fs,
            path: String::from(path),
            doc: Document::new(),
            options,
            synced: false,
        }
    }

    /// Mount the filesystem and load the backing file
    ///
    /// Creates an empty file if none exists. An empty file is not an
    /// error: the document is left empty for later defaulting.
    pub fn initialize(&mut self) -> Result<(), ConfigError> {
        self.mount()?;

        if !self.fs.exists(&self.path) {
            log_info!("Config file not found. Creating an empty file.");

            let file = self
                .fs
                .open(&self.path, OpenMode::Write)
                .map_err(ConfigError::FileCreate);
            let created = file.and_then(|f| f.close().map_err(ConfigError::FileCreate));
            if let Err(e) = created {
                log_error!("Failed to create config file: {:?}", e);
                return Err(e);
            }

            log_info!("Config file created successfully.");
        }

        let bytes = match self.read_file() {
            Ok(bytes) => bytes,
            Err(e) => {
                log_error!("Failed to open config file for reading: {:?}", e);
                return Err(e);
            }
        };

        if bytes.is_empty() {
            log_info!("Config file is empty. No data to load.");
            self.doc.clear();
            self.synced = true;
            return Ok(());
        }

        match parse_document(&bytes) {
            Ok(doc) => {
                self.doc = doc;
                self.synced = true;
                log_info!(
                    "Loaded {} config key(s) from {}",
                    self.doc.len(),
                    self.path.as_str()
                );
                Ok(())
            }
            Err(e) => {
                log_error!(
                    "Failed to parse config file at line {} column {}",
                    e.line(),
                    e.column()
                );
                Err(ConfigError::Parse)
            }
        }
    }

    /// Get `key`, inserting and persisting `default` if it is missing
    ///
    /// An existing value is converted to `T` (see [`ConfigValue`]).
    /// Persistence failures are logged; the default is still returned
    /// and kept in memory.
    pub fn get_or_default<T: ConfigValue>(&mut self, key: &str, default: T) -> T {
        match self.try_get_or_default(key, default.clone()) {
            Ok(value) => value,
            Err(e) => {
                log_warn!("Default for {} not persisted: {:?}", key, e);
                default
            }
        }
    }

    /// Like [`ConfigStore::get_or_default`], but reports persistence failures
    pub fn try_get_or_default<T: ConfigValue>(
        &mut self,
        key: &str,
        default: T,
    ) -> Result<T, ConfigError> {
        if let Some(existing) = self.doc.get(key) {
            return Ok(T::from_value(existing));
        }

        log_debug!("Defaulting {}", key);
        self.doc.insert(String::from(key), default.clone().into_value());
        self.persist()?;
        Ok(default)
    }

    /// Overwrite `key` with `value` and persist
    ///
    /// Always returns `value`. Persistence failures are logged, and leave
    /// the store out of sync (see [`ConfigStore::is_synced`]).
    pub fn update<T: ConfigValue>(&mut self, key: &str, value: T) -> T {
        if let Err(e) = self.try_update(key, value.clone()) {
            log_warn!("Update of {} not persisted: {:?}", key, e);
        }
        value
    }

    /// Like [`ConfigStore::update`], but reports persistence failures
    pub fn try_update<T: ConfigValue>(&mut self, key: &str, value: T) -> Result<T, ConfigError> {
        let json = value.clone().into_value();
        let text = render(&json);
        self.doc.insert(String::from(key), json);

        let result = self.persist();
        log_info!("{} updated to: {}", key, text.as_str());
        result.map(|()| value)
    }

    /// [`ConfigStore::get_or_default`] with a string slice default
    pub fn get_or_default_str(&mut self, key: &str, default: &str) -> String {
        self.get_or_default(key, String::from(default))
    }

    /// [`ConfigStore::update`] with a string slice value
    pub fn update_str(&mut self, key: &str, value: &str) -> String {
        self.update(key, String::from(value))
    }

    /// Read `key` without inserting a default
    pub fn get<T: ConfigValue>(&self, key: &str) -> Option<T> {
        self.doc.get(key).map(T::from_value)
    }

    /// Serialize the whole document and overwrite the backing file
    pub fn persist(&mut self) -> Result<(), ConfigError> {
        let result = self.write_file();
        self.synced = result.is_ok();
        result
    }

    /// Print the backing file as `key: value` lines
    ///
    /// Reads the file from flash, not the in-memory document, so unsaved
    /// changes do not show up. Open and parse failures are reported on
    /// `out` as well.
    pub fn debug_dump<W: fmt::Write>(&mut self, out: &mut W) -> fmt::Result {
        writeln!(out, "Config file: {}", self.path)?;

        let bytes = match self.read_file() {
            Ok(bytes) => bytes,
            Err(_) => return writeln!(out, "Failed to open config file for printing"),
        };

        let doc = match parse_document(&bytes) {
            Ok(doc) => doc,
            Err(e) => return writeln!(out, "Failed to parse config file: {}", e),
        };

        writeln!(out, "Config file contents:")?;
        for (key, value) in &doc {
            writeln!(out, "{}: {}", key, render(value))?;
        }
        Ok(())
    }

    /// Whether the backing file matches the in-memory document
    ///
    /// False before initialization and after a failed persist.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Check if `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.doc.contains_key(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.doc.len()
    }

    /// Whether the document has no keys
    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    /// Iterate over the keys in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.doc.keys().map(String::as_str)
    }

    /// The in-memory document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Path of the backing file
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Store options
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Get the filesystem for direct access
    pub fn filesystem_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    /// Consume the store and return the filesystem
    pub fn into_filesystem(self) -> F {
        self.fs
    }

    fn mount(&mut self) -> Result<(), ConfigError> {
        let error = match self.fs.mount() {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        if self.options.mount_recovery == MountRecovery::Fail {
            log_error!("Failed to mount filesystem: {:?}", error);
            return Err(ConfigError::Mount(error));
        }

        log_warn!("Failed to mount filesystem ({:?}), trying to format...", error);
        if let Err(e) = self.fs.format() {
            log_error!("Formatting failed: {:?}", e);
            return Err(ConfigError::Mount(e));
        }
        log_info!("Filesystem formatted successfully!");

        self.fs.mount().map_err(|e| {
            log_error!("Failed to mount filesystem after formatting: {:?}", e);
            ConfigError::Mount(e)
        })
    }

    fn read_file(&mut self) -> Result<Vec<u8>, ConfigError> {
        let mut file = self
            .fs
            .open(&self.path, OpenMode::Read)
            .map_err(ConfigError::FileOpen)?;

        let mut bytes = Vec::with_capacity(file.size());
        let read = file.read_to_end(&mut bytes);
        let closed = file.close();
        read.map_err(ConfigError::FileOpen)?;
        closed.map_err(ConfigError::FileOpen)?;
        Ok(bytes)
    }

    fn write_file(&mut self) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec(&self.doc).map_err(|_| {
            log_error!("Failed to serialize config");
            ConfigError::Serialize
        })?;

        let mut file = match self.fs.open(&self.path, OpenMode::Write) {
            Ok(file) => file,
            Err(e) => {
                log_error!("Failed to open config file for writing: {:?}", e);
                return Err(ConfigError::FileOpen(e));
            }
        };

        // Dropping the handle without closing leaves the old file in place
        match file.write(&bytes) {
            Ok(written) if written < bytes.len() => {
                log_error!(
                    "Failed to write to config file ({} of {} bytes)",
                    written,
                    bytes.len()
                );
                return Err(ConfigError::Write);
            }
            Ok(_) => {}
            Err(e) => {
                log_error!("Failed to write to config file: {:?}", e);
                return Err(ConfigError::Write);
            }
        }

        file.close().map_err(|e| {
            log_error!("Failed to write to config file: {:?}", e);
            ConfigError::Write
        })?;

        log_debug!("Saved {} bytes to {}", bytes.len(), self.path.as_str());
        Ok(())
    }
}

/// Parse file contents into a document
///
/// Empty contents give an empty document; anything else must be a JSON
/// object.
fn parse_document(bytes: &[u8]) -> Result<Document, serde_json::Error> {
    if bytes.is_empty() {
        return Ok(Document::new());
    }
    serde_json::from_slice(bytes)
}
