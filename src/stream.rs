// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Streamed entity lists.
//!
//! A [StreamList] exposes a section as a lazy random-access array: records
//! are materialized from the file on every `get`, optionally through a
//! cache. The two indexing disciplines are:
//!
//! * fixed-length records: the key is the record number and the seek
//!   position is `start + key * record_size`;
//! * variable-length records: the key is the byte offset of the record
//!   inside the section body and the seek position is `start + key`.
//!
//! Iteration over a fixed section walks record numbers. Iteration over a
//! variable section is a cursor that must materialize each record to learn
//! where the next one starts; it stops after `header.count` records. A
//! materialization failure ends the iteration with that error. Iterators
//! are not restartable; create a fresh one instead.

use crate::{
    cache::{ExternalCache, LruCache},
    error::{Error, Result},
    factory::RecordFactory,
    header::SectionHeader,
    reader::ReaderPool,
};
use std::sync::Arc;

/// Cache arrangement in front of a streamed section.
pub enum CacheBackend<V> {
    /// Every `get` borrows a reader and materializes.
    Direct,

    /// Bounded LRU consulted first; misses load through the direct path.
    Lru(LruCache<u32, V>),

    /// Caller-supplied cache driven with lookup / load / store.
    External(Arc<dyn ExternalCache<V>>),
}

/// A lazy random-access list over one section.
pub struct StreamList<F: RecordFactory> {
    section: &'static str,
    header: SectionHeader,
    factory: F,
    pool: Arc<ReaderPool>,

    /// Record size for fixed-length kinds, [None] for self-sizing kinds.
    record_size: Option<u32>,

    cache: CacheBackend<Arc<F::Record>>,
}

impl<F: RecordFactory> StreamList<F> {
    /// Wire a list over a section.
    ///
    /// Consults the factory for a fixed record size and checks it against
    /// the header. The [Error::VariableLength] a self-sizing factory
    /// reports is consumed here and never escapes.
    pub fn new(
        section: &'static str,
        header: SectionHeader,
        factory: F,
        pool: Arc<ReaderPool>,
        cache: CacheBackend<Arc<F::Record>>,
    ) -> Result<Self> {
        let record_size = match factory.record_length() {
            Ok(size) => {
                header.check_fixed(section, size)?;
                Some(size)
            }
            Err(Error::VariableLength) => None,
            Err(err) => return Err(err),
        };

        Ok(Self {
            section,
            header,
            factory,
            pool,
            record_size,
            cache,
        })
    }

    pub fn header(&self) -> &SectionHeader {
        &self.header
    }

    /// Number of logical records in the section.
    pub fn len(&self) -> u32 {
        self.header.count
    }

    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Whether keys are record numbers rather than byte offsets.
    pub fn is_fixed(&self) -> bool {
        self.record_size.is_some()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Cache hit statistics, when an LRU cache is wired.
    pub fn cache_stats(&self) -> Option<(u64, u64)> {
        match &self.cache {
            CacheBackend::Lru(cache) => Some((cache.requests(), cache.misses())),
            _ => None,
        }
    }

    fn load_direct(&self, key: u32) -> Result<Arc<F::Record>> {
        let offset = match self.record_size {
            Some(size) => {
                if key >= self.header.count {
                    return Err(Error::InvalidIndex {
                        section: self.section,
                        index: key,
                    });
                }

                self.header.start as u64 + key as u64 * size as u64
            }
            None => {
                if key >= self.header.length {
                    return Err(Error::InvalidIndex {
                        section: self.section,
                        index: key,
                    });
                }

                self.header.start as u64 + key as u64
            }
        };

        let mut reader = self.pool.borrow()?;
        reader.seek(offset);

        let record = self.factory.create(&mut reader, key)?;

        Ok(Arc::new(record))
    }

    /// Fetch one record.
    ///
    /// For fixed-length sections `key` is the record number; for
    /// variable-length sections it is the byte offset of the record inside
    /// the section. An offset that does not fall on a record boundary is
    /// not detectable and parses garbage; it fails with
    /// [Error::InvalidFormat] at worst.
    pub fn get(&self, key: u32) -> Result<Arc<F::Record>> {
        match &self.cache {
            CacheBackend::Direct => self.load_direct(key),
            CacheBackend::Lru(cache) => cache.get_or_load(key, || self.load_direct(key)),
            CacheBackend::External(cache) => {
                if let Some(record) = cache.lookup(key) {
                    return Ok(record);
                }

                let record = self.load_direct(key)?;
                cache.store(key, record.clone());

                Ok(record)
            }
        }
    }

    /// Iterate the section in record order.
    pub fn iter(&self) -> StreamIter<'_, F> {
        StreamIter {
            list: self,
            next_key: 0,
            yielded: 0,
            failed: false,
        }
    }
}

/// Iterator over a streamed section.
pub struct StreamIter<'a, F: RecordFactory> {
    list: &'a StreamList<F>,
    next_key: u32,
    yielded: u32,
    failed: bool,
}

impl<'a, F: RecordFactory> Iterator for StreamIter<'a, F> {
    type Item = Result<Arc<F::Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.yielded >= self.list.header.count {
            return None;
        }

        match self.list.get(self.next_key) {
            Ok(record) => {
                self.yielded += 1;

                self.next_key += match self.list.record_size {
                    Some(_) => 1,
                    None => self.list.factory.entity_length(&record),
                };

                Some(Ok(record))
            }
            Err(err) => {
                self.failed = true;

                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        entities::{AsciiStringFactory, MapFactory},
        reader::SliceSource,
    };

    fn pool_over(raw: Vec<u8>) -> Arc<ReaderPool> {
        Arc::new(ReaderPool::for_slice(SliceSource::Memory(Arc::new(raw))))
    }

    fn strings_fixture(values: &[&[u8]]) -> (SectionHeader, Vec<u8>, Vec<u32>) {
        let mut raw = Vec::new();
        let mut offsets = Vec::new();

        for value in values {
            offsets.push(raw.len() as u32);
            raw.extend_from_slice(&(value.len() as u16).to_le_bytes());
            raw.extend_from_slice(value);
        }

        let header = SectionHeader {
            start: 0,
            length: raw.len() as u32,
            count: values.len() as u32,
        };

        (header, raw, offsets)
    }

    #[test]
    fn fixed_list_indexes_by_record_number() -> Result<()> {
        let mut raw = Vec::new();
        for v in [100u32, 200, 300] {
            raw.extend_from_slice(&v.to_le_bytes());
        }

        let header = SectionHeader {
            start: 0,
            length: 12,
            count: 3,
        };

        let list = StreamList::new(
            "maps",
            header,
            MapFactory,
            pool_over(raw),
            CacheBackend::Direct,
        )?;

        assert!(list.is_fixed());
        assert_eq!(list.get(2)?.name_index, 300);
        assert!(matches!(
            list.get(3),
            Err(Error::InvalidIndex { index: 3, .. })
        ));

        Ok(())
    }

    #[test]
    fn fixed_list_rejects_bad_record_multiple() {
        let header = SectionHeader {
            start: 0,
            length: 10,
            count: 3,
        };

        assert!(StreamList::new(
            "maps",
            header,
            MapFactory,
            pool_over(vec![0; 10]),
            CacheBackend::Direct,
        )
        .is_err());
    }

    #[test]
    fn variable_list_indexes_by_offset() -> Result<()> {
        let (header, raw, offsets) = strings_fixture(&[b"one\0", b"second\0", b"x\0"]);
        let list = StreamList::new(
            "strings",
            header,
            AsciiStringFactory,
            pool_over(raw),
            CacheBackend::Direct,
        )?;

        assert!(!list.is_fixed());
        assert_eq!(list.get(offsets[1])?.as_str(), "second");
        assert!(matches!(
            list.get(header.length),
            Err(Error::InvalidIndex { .. })
        ));

        Ok(())
    }

    #[test]
    fn variable_iteration_walks_every_record() -> Result<()> {
        let (header, raw, _) = strings_fixture(&[b"one\0", b"second\0", b"x\0"]);
        let list = StreamList::new(
            "strings",
            header,
            AsciiStringFactory,
            pool_over(raw),
            CacheBackend::Direct,
        )?;

        let items = list.iter().collect::<Result<Vec<_>>>()?;

        assert_eq!(items.len(), 3);
        assert_eq!(
            items
                .iter()
                .map(|s| AsciiStringFactory.entity_length(s))
                .sum::<u32>(),
            header.length
        );
        assert_eq!(items[2].as_str(), "x");

        Ok(())
    }

    #[test]
    fn lru_cache_serves_repeat_gets() -> Result<()> {
        let (header, raw, offsets) = strings_fixture(&[b"alpha\0", b"beta\0"]);
        let list = StreamList::new(
            "strings",
            header,
            AsciiStringFactory,
            pool_over(raw),
            CacheBackend::Lru(LruCache::new(8)?),
        )?;

        let first = list.get(offsets[0])?;
        let second = list.get(offsets[0])?;

        assert_eq!(first, second);
        assert_eq!(list.cache_stats(), Some((2, 1)));

        Ok(())
    }
}
