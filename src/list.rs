// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Fully-resident entity lists.
//!
//! Small, hot sections (components, maps, properties, root nodes, profile
//! offsets) are read into memory in one sequential pass at open time.
//! After the read every `get` is an O(1) array access that never touches
//! the reader pool.

use crate::{
    entities::{AsciiStringFactory, Property},
    error::{Error, Result},
    factory::RecordFactory,
    header::SectionHeader,
    reader::Reader,
    stream::StreamList,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A section fully materialized into a contiguous array.
pub struct MemoryFixedList<T> {
    section: &'static str,
    header: SectionHeader,
    entities: Vec<Arc<T>>,
}

impl<T> MemoryFixedList<T> {
    /// Read every record of the section into memory.
    ///
    /// Positions the reader at the section start and materializes
    /// `header.count` records sequentially. Fails with
    /// [Error::InvalidFormat] when the records do not consume exactly the
    /// section body.
    pub fn read<F>(
        section: &'static str,
        header: SectionHeader,
        factory: &F,
        reader: &mut Reader,
    ) -> Result<Self>
    where
        F: RecordFactory<Record = T>,
    {
        reader.seek(header.start as u64);

        let mut entities = Vec::with_capacity(header.count as usize);

        for index in 0..header.count {
            entities.push(Arc::new(factory.create(reader, index)?));
        }

        let end = header.start as u64 + header.length as u64;
        if reader.position() != end {
            return Err(Error::InvalidFormat(format!(
                "{} section records end at {} instead of {}",
                section,
                reader.position(),
                end
            )));
        }

        Ok(Self {
            section,
            header,
            entities,
        })
    }

    pub fn header(&self) -> &SectionHeader {
        &self.header
    }

    pub fn len(&self) -> u32 {
        self.entities.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Fetch the record with the given record number.
    pub fn get(&self, index: u32) -> Result<Arc<T>> {
        self.entities
            .get(index as usize)
            .cloned()
            .ok_or(Error::InvalidIndex {
                section: self.section,
                index,
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entities.iter()
    }
}

/// The properties section plus a name lookup index.
///
/// Property lookups by name are on the hot path of every detection
/// consumer, so the index is built once at open from the resident records.
pub struct PropertiesList {
    list: MemoryFixedList<Property>,
    by_name: FxHashMap<String, u32>,
}

impl PropertiesList {
    /// Build from the resident records, resolving each name through the
    /// strings section.
    pub fn build(list: MemoryFixedList<Property>, strings: &StreamList<AsciiStringFactory>) -> Result<Self> {
        let mut by_name =
            FxHashMap::with_capacity_and_hasher(list.len() as usize, Default::default());

        for property in list.iter() {
            let name = strings.get(property.name_index)?;
            by_name.insert(name.as_str().into_owned(), property.index);
        }

        Ok(Self { list, by_name })
    }

    pub fn header(&self) -> &SectionHeader {
        self.list.header()
    }

    pub fn len(&self) -> u32 {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn get(&self, index: u32) -> Result<Arc<Property>> {
        self.list.get(index)
    }

    /// Resolve a property by its name.
    pub fn by_name(&self, name: &str) -> Option<Arc<Property>> {
        let index = *self.by_name.get(name)?;

        self.list.get(index).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Property>> {
        self.list.iter()
    }
}
