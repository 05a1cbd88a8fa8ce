// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Opening data files.
//!
//! Assembly runs in a fixed order driven by the format: parse the preamble,
//! gate on the version pair, then walk the version-specific section
//! sequence reading each 12 byte header and skipping each body. Stream
//! sections are wired to the reader pool (optionally through a cache) and
//! serve records on demand; the small hot sections are then re-read
//! sequentially into resident lists before the dataset is returned.
//!
//! An error anywhere leaves nothing behind: the pool is closed on the way
//! out.

use crate::{
    cache::{ExternalCache, LruCache},
    dataset::Dataset,
    entities::{
        AsciiString, AsciiStringFactory, ComponentFactory, MapFactory, Node, NodeFactory,
        Profile, ProfileFactory, ProfileOffsetFactory, PropertyFactory, RootNodeFactory,
        Signature, SignatureFactory, Value, ValueFactory,
    },
    error::{Error, Result},
    header::SectionHeader,
    list::{MemoryFixedList, PropertiesList},
    preamble::{Preamble, Version},
    reader::{Reader, ReaderPool, SliceSource},
    stream::{CacheBackend, StreamList},
    tables::IntegerTable,
};
use chrono::{DateTime, Utc};
use log::debug;
use memmap2::Mmap;
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::{atomic::AtomicBool, Arc},
};

/// How the underlying bytes are accessed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Seek and read through a bounded pool of OS file handles.
    File,

    /// Map the file into memory; readers are cursors over the mapping.
    MemoryMapped,

    /// Read the whole file into a heap buffer up front.
    InMemory,
}

/// Default number of pooled file handles in [Mode::File].
pub const DEFAULT_READERS: usize = 10;

/// Default cache capacities per section, in entries.
pub const DEFAULT_STRINGS_CACHE: usize = 5000;
pub const DEFAULT_VALUES_CACHE: usize = 500;
pub const DEFAULT_PROFILES_CACHE: usize = 600;
pub const DEFAULT_SIGNATURES_CACHE: usize = 500;
pub const DEFAULT_NODES_CACHE: usize = 15000;

/// Cache arrangement for one streamed section.
#[derive(Clone)]
pub enum CachePolicy<V> {
    /// No cache: every read goes to the reader pool.
    None,

    /// The built-in LRU cache with the given capacity.
    Lru(usize),

    /// A caller-supplied cache.
    External(Arc<dyn ExternalCache<V>>),
}

impl<V: Clone> CachePolicy<V> {
    fn backend(&self) -> Result<CacheBackend<V>> {
        match self {
            Self::None => Ok(CacheBackend::Direct),
            Self::Lru(capacity) => Ok(CacheBackend::Lru(LruCache::new(*capacity)?)),
            Self::External(cache) => Ok(CacheBackend::External(cache.clone())),
        }
    }
}

/// Cache arrangement for every streamed section.
///
/// The defaults size each cache to its section's access pattern during
/// detection: strings and nodes run hot, values / profiles / signatures
/// less so. A missing cache (`CachePolicy::None`) wires the section
/// directly to the reader pool.
#[derive(Clone)]
pub struct CacheConfig {
    pub strings: CachePolicy<Arc<AsciiString>>,
    pub values: CachePolicy<Arc<Value>>,
    pub profiles: CachePolicy<Arc<Profile>>,
    pub signatures: CachePolicy<Arc<Signature>>,
    pub nodes: CachePolicy<Arc<Node>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strings: CachePolicy::Lru(DEFAULT_STRINGS_CACHE),
            values: CachePolicy::Lru(DEFAULT_VALUES_CACHE),
            profiles: CachePolicy::Lru(DEFAULT_PROFILES_CACHE),
            signatures: CachePolicy::Lru(DEFAULT_SIGNATURES_CACHE),
            nodes: CachePolicy::Lru(DEFAULT_NODES_CACHE),
        }
    }
}

/// Options controlling how a dataset is opened.
#[derive(Clone)]
pub struct OpenOptions {
    pub mode: Mode,

    /// Pooled file handles in [Mode::File]. Ignored in the other modes,
    /// where readers are cheap cursors and the pool is unbounded.
    pub readers: usize,

    /// Delete the backing file when the dataset is closed.
    pub delete_on_close: bool,

    /// Modification time to report for the source. Defaults to the file
    /// mtime for path-backed opens.
    pub last_modified: Option<DateTime<Utc>>,

    pub caches: CacheConfig,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            mode: Mode::File,
            readers: DEFAULT_READERS,
            delete_on_close: false,
            last_modified: None,
            caches: CacheConfig::default(),
        }
    }
}

/// Open a dataset from a file on disk.
pub fn open_path(path: impl AsRef<Path>, options: OpenOptions) -> Result<Dataset> {
    let path = path.as_ref();

    let pool = match options.mode {
        Mode::File => ReaderPool::for_file(path, options.readers)?,
        Mode::MemoryMapped => {
            let file = File::open(path).map_err(|e| Error::Io(e.to_string()))?;
            let map = unsafe { Mmap::map(&file) }.map_err(|e| Error::Io(e.to_string()))?;

            ReaderPool::for_slice(SliceSource::Mapped(Arc::new(map)))
        }
        Mode::InMemory => {
            let data = std::fs::read(path).map_err(|e| Error::Io(e.to_string()))?;

            ReaderPool::for_slice(SliceSource::Memory(Arc::new(data)))
        }
    };

    let last_modified = match options.last_modified {
        Some(ts) => Some(ts),
        None => std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from),
    };

    let delete_on_close = options.delete_on_close.then(|| PathBuf::from(path));

    assemble(Arc::new(pool), delete_on_close, last_modified, options.caches)
}

/// Open a dataset from bytes already in memory.
pub fn open_bytes(data: Vec<u8>, options: OpenOptions) -> Result<Dataset> {
    if options.delete_on_close {
        return Err(Error::Config(
            "delete_on_close requires a path-backed dataset".to_string(),
        ));
    }

    let pool = ReaderPool::for_slice(SliceSource::Memory(Arc::new(data)));

    assemble(Arc::new(pool), None, options.last_modified, options.caches)
}

/// Walks the contiguous sequence of section headers.
struct SectionWalker {
    position: u64,
    source_len: u64,
}

impl SectionWalker {
    fn load(&mut self, reader: &mut Reader, section: &'static str) -> Result<SectionHeader> {
        reader.seek(self.position);

        let header = SectionHeader::load(reader)?;
        header.validate(section, self.source_len, reader.position())?;

        self.position = header.start as u64 + header.length as u64;

        Ok(header)
    }
}

fn assemble(
    pool: Arc<ReaderPool>,
    delete_on_close: Option<PathBuf>,
    last_modified: Option<DateTime<Utc>>,
    caches: CacheConfig,
) -> Result<Dataset> {
    match assemble_inner(pool.clone(), delete_on_close, last_modified, caches) {
        Ok(dataset) => Ok(dataset),
        Err(err) => {
            pool.close();

            Err(err)
        }
    }
}

fn assemble_inner(
    pool: Arc<ReaderPool>,
    delete_on_close: Option<PathBuf>,
    last_modified: Option<DateTime<Utc>>,
    caches: CacheConfig,
) -> Result<Dataset> {
    let source_len = pool.source_len();
    let mut reader = pool.borrow()?;

    // Gate on the version pair before reading anything else so a file in
    // an unknown format fails with UnknownVersion rather than a parse
    // error from guessing at its preamble.
    reader.seek(0);
    let major = reader.read_u16()?;
    let minor = reader.read_u16()?;
    let version = Version::from_pair(major, minor)?;

    let (preamble, preamble_len) = read_preamble(&mut reader)?;

    debug!(
        "opening {}.{} data file published {:?}, {} bytes",
        major, minor, preamble.published, source_len
    );

    let mut walker = SectionWalker {
        position: preamble_len,
        source_len,
    };

    let strings_header = walker.load(&mut reader, "strings")?;
    let components_header = walker.load(&mut reader, "components")?;
    let maps_header = walker.load(&mut reader, "maps")?;
    let properties_header = walker.load(&mut reader, "properties")?;
    let values_header = walker.load(&mut reader, "values")?;
    let profiles_header = walker.load(&mut reader, "profiles")?;
    let signatures_header = walker.load(&mut reader, "signatures")?;

    let (signature_node_offsets_header, node_ranked_signature_indexes_header) = match version {
        Version::V31 => (None, None),
        Version::V32 => (
            Some(walker.load(&mut reader, "signature node offsets")?),
            Some(walker.load(&mut reader, "node ranked signature indexes")?),
        ),
    };

    let ranked_signature_indexes_header = walker.load(&mut reader, "ranked signature indexes")?;
    let nodes_header = walker.load(&mut reader, "nodes")?;
    let root_nodes_header = walker.load(&mut reader, "root nodes")?;
    let profile_offsets_header = walker.load(&mut reader, "profile offsets")?;

    debug!(
        "sections declared: {} strings bytes, {} components, {} properties, {} values, \
         {} profiles bytes, {} signatures, {} nodes bytes",
        strings_header.length,
        components_header.count,
        properties_header.count,
        values_header.count,
        profiles_header.length,
        signatures_header.count,
        nodes_header.length,
    );

    // Resident sections re-read through the borrowed reader.
    let component_factory = match version {
        Version::V31 => ComponentFactory::V31,
        Version::V32 => ComponentFactory::V32,
    };
    let components =
        MemoryFixedList::read("components", components_header, &component_factory, &mut reader)?;
    let maps = MemoryFixedList::read("maps", maps_header, &MapFactory, &mut reader)?;
    let property_records =
        MemoryFixedList::read("properties", properties_header, &PropertyFactory, &mut reader)?;
    let root_nodes =
        MemoryFixedList::read("root nodes", root_nodes_header, &RootNodeFactory, &mut reader)?;
    let profile_offsets = MemoryFixedList::read(
        "profile offsets",
        profile_offsets_header,
        &ProfileOffsetFactory,
        &mut reader,
    )?;

    // Release before anything below borrows from the pool; in file mode
    // with a single configured reader the name index build would
    // otherwise block on this handle.
    drop(reader);

    let strings = StreamList::new(
        "strings",
        strings_header,
        AsciiStringFactory,
        pool.clone(),
        caches.strings.backend()?,
    )?;
    let values = StreamList::new(
        "values",
        values_header,
        ValueFactory,
        pool.clone(),
        caches.values.backend()?,
    )?;
    let profiles = StreamList::new(
        "profiles",
        profiles_header,
        ProfileFactory,
        pool.clone(),
        caches.profiles.backend()?,
    )?;

    let signature_factory = match version {
        Version::V31 => SignatureFactory::V31 {
            profiles_count: preamble.signature_profiles_count,
            nodes_count: preamble.signature_nodes_count,
        },
        Version::V32 => SignatureFactory::V32 {
            profiles_count: preamble.signature_profiles_count,
        },
    };
    let signatures = StreamList::new(
        "signatures",
        signatures_header,
        signature_factory,
        pool.clone(),
        caches.signatures.backend()?,
    )?;

    let node_factory = match version {
        Version::V31 => NodeFactory::V31,
        Version::V32 => NodeFactory::V32,
    };
    let nodes = StreamList::new(
        "nodes",
        nodes_header,
        node_factory,
        pool.clone(),
        caches.nodes.backend()?,
    )?;

    let signature_node_offsets = signature_node_offsets_header
        .map(|header| IntegerTable::new("signature node offsets", header, pool.clone()))
        .transpose()?;
    let node_ranked_signature_indexes = node_ranked_signature_indexes_header
        .map(|header| IntegerTable::new("node ranked signature indexes", header, pool.clone()))
        .transpose()?;
    let ranked_signature_indexes = IntegerTable::new(
        "ranked signature indexes",
        ranked_signature_indexes_header,
        pool.clone(),
    )?;

    let properties = PropertiesList::build(property_records, &strings)?;

    Ok(Dataset {
        preamble,
        version,
        pool,
        closed: AtomicBool::new(false),
        delete_on_close,
        last_modified,
        strings,
        components,
        maps,
        properties,
        values,
        profiles,
        signatures,
        signature_node_offsets,
        node_ranked_signature_indexes,
        ranked_signature_indexes,
        nodes,
        root_nodes,
        profile_offsets,
    })
}

/// Parse the preamble, growing the read window on incomplete input.
///
/// The copyright notice makes the preamble variable-length, so the buffer
/// doubles until the streaming parser stops asking for more.
fn read_preamble(reader: &mut Reader) -> Result<(Preamble, u64)> {
    let source_len = reader.source_len();
    let mut window = source_len.min(256);

    loop {
        reader.seek(0);
        let buf = reader.read_bytes(window as usize)?;

        match Preamble::parse(&buf) {
            Ok((rest, preamble)) => {
                return Ok((preamble, (buf.len() - rest.len()) as u64));
            }
            Err(nom::Err::Incomplete(_)) if window < source_len => {
                window = source_len.min(window * 2);
            }
            Err(err) => {
                return Err(err.into());
            }
        }
    }
}
