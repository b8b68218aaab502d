//! # Track Storage
//!
//! The engine reads tracks through these traits so it does not care whether
//! the bytes come from a disk, a ROM image or a test fixture.

use crate::error::{AudioError, AudioResult};
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;

/// An open track
pub trait TrackFile {
    /// Read up to `buf.len()` bytes at the cursor; 0 means end of file
    fn read(&mut self, buf: &mut [u8]) -> AudioResult<usize>;

    /// Move the cursor to absolute byte `pos`
    fn seek(&mut self, pos: u64) -> AudioResult<()>;

    /// Total file size in bytes
    fn size(&self) -> u64;

    /// Read until `buf` is full or the file ends
    fn read_full(&mut self, buf: &mut [u8]) -> AudioResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

/// Something tracks can be opened from
pub trait Storage {
    /// Handle type of an open track
    type File: TrackFile;

    /// Open `path` for reading
    fn open(&mut self, path: &str) -> AudioResult<Self::File>;
}

/// Tracks held in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryStorage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        self.files.insert(path.into(), data.into());
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no files are stored
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Storage for MemoryStorage {
    type File = MemoryFile;

    fn open(&mut self, path: &str) -> AudioResult<MemoryFile> {
        let data = self.files.get(path).ok_or(AudioError::NotFound)?;
        Ok(MemoryFile {
            data: Arc::clone(data),
            pos: 0,
        })
    }
}

/// Open handle on a [`MemoryStorage`] file
#[derive(Debug, Clone)]
pub struct MemoryFile {
    data: Arc<[u8]>,
    pos: usize,
}

impl TrackFile for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> AudioResult<usize> {
        let rest = self.data.get(self.pos..).unwrap_or(&[]);
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> AudioResult<()> {
        self.pos = usize::try_from(pos).map_err(|_| AudioError::Io)?;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(feature = "std")]
pub use host::{HostFile, HostStorage};

#[cfg(feature = "std")]
mod host {
    use super::{Storage, TrackFile};
    use crate::error::AudioResult;
    use std::fs::File;
    use std::io::{Read, Seek, SeekFrom};
    use std::path::PathBuf;

    /// Tracks on the host file system, relative to a root directory
    #[derive(Debug, Clone, Default)]
    pub struct HostStorage {
        root: PathBuf,
    }

    impl HostStorage {
        /// Resolve paths relative to `root`
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }
    }

    impl Storage for HostStorage {
        type File = HostFile;

        fn open(&mut self, path: &str) -> AudioResult<HostFile> {
            let file = File::open(self.root.join(path))?;
            let size = file.metadata()?.len();
            Ok(HostFile { file, size })
        }
    }

    /// Open host file
    #[derive(Debug)]
    pub struct HostFile {
        file: File,
        size: u64,
    }

    impl TrackFile for HostFile {
        fn read(&mut self, buf: &mut [u8]) -> AudioResult<usize> {
            Ok(self.file.read(buf)?)
        }

        fn seek(&mut self, pos: u64) -> AudioResult<()> {
            self.file.seek(SeekFrom::Start(pos))?;
            Ok(())
        }

        fn size(&self) -> u64 {
            self.size
        }
    }
}
