// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Positioned readers and the shared reader pool.
//!
//! All random access into the data file flows through a [Reader]: a cursor
//! over one of three byte sources. File-backed readers own their own OS file
//! handle and issue a seek before every read. Memory-mapped and in-memory
//! readers are cheap cursors over a shared buffer.
//!
//! Readers are handed out by a [ReaderPool]. For file sources the pool is
//! bounded to a fixed number of pre-opened handles and [ReaderPool::borrow]
//! blocks when all of them are checked out. For buffer sources a borrow just
//! mints a new cursor. Borrowed readers are returned by dropping the
//! [PoolReader] guard.
//!
//! All integers in the data file are little-endian.

use crate::error::{Error, Result};
use memmap2::Mmap;
use parking_lot::{Condvar, Mutex};
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
    sync::Arc,
};

/// A shared, immutable byte buffer backing slice readers.
#[derive(Clone)]
pub enum SliceSource {
    Memory(Arc<Vec<u8>>),
    Mapped(Arc<Mmap>),
}

impl SliceSource {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Memory(data) => data.as_slice(),
            Self::Mapped(map) => map,
        }
    }

    pub fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

enum Backing {
    File(File),
    Slice(SliceSource),
}

/// A positioned little-endian reader over the data file.
pub struct Reader {
    backing: Backing,
    len: u64,
    pos: u64,
}

impl Reader {
    pub fn for_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::Io(e.to_string()))?;
        let len = file.metadata().map_err(|e| Error::Io(e.to_string()))?.len();

        Ok(Self {
            backing: Backing::File(file),
            len,
            pos: 0,
        })
    }

    pub fn for_slice(source: SliceSource) -> Self {
        let len = source.len();

        Self {
            backing: Backing::Slice(source),
            len,
            pos: 0,
        }
    }

    /// Total length of the underlying source in bytes.
    pub fn source_len(&self) -> u64 {
        self.len
    }

    /// Current absolute read position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Move the read position to an absolute offset.
    ///
    /// Seeking past the end is not itself an error; the following read is.
    pub fn seek(&mut self, offset: u64) {
        self.pos = offset;
    }

    /// Fill `buf` from the current position, advancing by `buf.len()`.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let wanted = buf.len() as u64;

        if self.pos.checked_add(wanted).map_or(true, |end| end > self.len) {
            return Err(Error::InvalidFormat(format!(
                "read of {} bytes at offset {} is beyond end of data ({} bytes)",
                wanted, self.pos, self.len
            )));
        }

        match &mut self.backing {
            Backing::File(file) => {
                file.seek(SeekFrom::Start(self.pos))?;
                file.read_exact(buf)?;
            }
            Backing::Slice(source) => {
                let start = self.pos as usize;
                buf.copy_from_slice(&source.as_slice()[start..start + buf.len()]);
            }
        }

        self.pos += wanted;

        Ok(())
    }

    /// Read `count` bytes from the current position.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_into(&mut buf)?;

        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;

        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;

        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.read_into(&mut buf)?;

        Ok(i16::from_le_bytes(buf))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;

        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;

        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;

        Ok(i64::from_le_bytes(buf))
    }
}

enum PoolSource {
    File { path: PathBuf, len: u64 },
    Slice(SliceSource),
}

struct PoolState {
    idle: Vec<Reader>,
    closed: bool,
}

/// A bounded pool of readers over one underlying source.
///
/// The pool is the concurrency arbiter for the streaming lists: every
/// on-demand materialization borrows a reader, seeks, reads, and releases.
pub struct ReaderPool {
    source: PoolSource,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ReaderPool {
    /// Create a pool of `readers` pre-opened file handles.
    pub fn for_file(path: impl Into<PathBuf>, readers: usize) -> Result<Self> {
        if readers == 0 {
            return Err(Error::Config(
                "reader pool requires at least one reader".to_string(),
            ));
        }

        let path = path.into();

        let idle = (0..readers)
            .map(|_| Reader::for_file(&path))
            .collect::<Result<Vec<_>>>()?;

        let len = idle[0].source_len();

        Ok(Self {
            source: PoolSource::File { path, len },
            state: Mutex::new(PoolState { idle, closed: false }),
            available: Condvar::new(),
        })
    }

    /// Create a pool over a shared byte buffer.
    ///
    /// Buffer readers are cheap cursors, so this pool is effectively
    /// unbounded: borrows never block.
    pub fn for_slice(source: SliceSource) -> Self {
        Self {
            source: PoolSource::Slice(source),
            state: Mutex::new(PoolState {
                idle: vec![],
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    pub fn source_len(&self) -> u64 {
        match &self.source {
            PoolSource::File { len, .. } => *len,
            PoolSource::Slice(source) => source.len(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Borrow a reader, blocking while the pool is exhausted.
    ///
    /// Fails with [Error::Closed] once the pool has been closed, including
    /// for callers already blocked waiting for a reader.
    pub fn borrow(&self) -> Result<PoolReader<'_>> {
        let mut state = self.state.lock();

        if state.closed {
            return Err(Error::Closed);
        }

        match &self.source {
            PoolSource::Slice(source) => Ok(PoolReader {
                pool: self,
                reader: Some(Reader::for_slice(source.clone())),
                pooled: false,
            }),
            PoolSource::File { .. } => loop {
                if state.closed {
                    return Err(Error::Closed);
                }

                if let Some(reader) = state.idle.pop() {
                    return Ok(PoolReader {
                        pool: self,
                        reader: Some(reader),
                        pooled: true,
                    });
                }

                self.available.wait(&mut state);
            },
        }
    }

    /// Close the pool, dropping idle handles and waking blocked borrowers.
    ///
    /// Idempotent. Readers currently checked out remain usable until
    /// released; they are dropped instead of returned.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.idle.clear();
        drop(state);

        self.available.notify_all();
    }

    fn release(&self, reader: Reader) {
        let mut state = self.state.lock();

        if !state.closed {
            state.idle.push(reader);
            drop(state);
            self.available.notify_one();
        }
    }
}

/// RAII guard for a borrowed reader. Releases back to the pool on drop.
pub struct PoolReader<'pool> {
    pool: &'pool ReaderPool,
    reader: Option<Reader>,
    pooled: bool,
}

impl<'pool> Deref for PoolReader<'pool> {
    type Target = Reader;

    fn deref(&self) -> &Reader {
        self.reader.as_ref().expect("reader present until drop")
    }
}

impl<'pool> DerefMut for PoolReader<'pool> {
    fn deref_mut(&mut self) -> &mut Reader {
        self.reader.as_mut().expect("reader present until drop")
    }
}

impl<'pool> Drop for PoolReader<'pool> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            if self.pooled {
                self.pool.release(reader);
            }
        }
    }
}
