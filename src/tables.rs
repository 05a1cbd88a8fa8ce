// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Packed integer side-tables.
//!
//! 3.2 data files factor repeated index runs out of signature and node
//! records into shared, densely packed arrays of 32-bit words
//! (`signature_node_offsets`, `node_ranked_signature_indexes`). Both
//! versions carry `ranked_signature_indexes`. Words are read on demand
//! through the reader pool.

use crate::{
    error::{Error, Result},
    header::SectionHeader,
    reader::ReaderPool,
};
use std::sync::Arc;

/// A read-only array of packed `u32` words backed by a section.
pub struct IntegerTable {
    section: &'static str,
    header: SectionHeader,
    pool: Arc<ReaderPool>,
}

impl IntegerTable {
    /// Word size of a table entry.
    const WORD_SIZE: u32 = 4;

    pub fn new(section: &'static str, header: SectionHeader, pool: Arc<ReaderPool>) -> Result<Self> {
        header.check_fixed(section, Self::WORD_SIZE)?;

        Ok(Self {
            section,
            header,
            pool,
        })
    }

    pub fn header(&self) -> &SectionHeader {
        &self.header
    }

    pub fn len(&self) -> u32 {
        self.header.count
    }

    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Fetch the word with the given index.
    pub fn get(&self, index: u32) -> Result<u32> {
        if index >= self.header.count {
            return Err(Error::InvalidIndex {
                section: self.section,
                index,
            });
        }

        let mut reader = self.pool.borrow()?;
        reader.seek(self.header.start as u64 + index as u64 * Self::WORD_SIZE as u64);

        reader.read_u32()
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<u32>> + '_ {
        (0..self.header.count).map(|index| self.get(index))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reader::SliceSource;

    #[test]
    fn get_and_iter() -> Result<()> {
        let mut raw = Vec::new();
        for v in [5u32, 10, 15, 20] {
            raw.extend_from_slice(&v.to_le_bytes());
        }

        let header = SectionHeader {
            start: 0,
            length: 16,
            count: 4,
        };
        let pool = Arc::new(ReaderPool::for_slice(SliceSource::Memory(Arc::new(raw))));

        let table = IntegerTable::new("ranked signature indexes", header, pool)?;

        assert_eq!(table.len(), 4);
        assert_eq!(table.get(2)?, 15);
        assert_eq!(table.iter().collect::<Result<Vec<_>>>()?, vec![5, 10, 15, 20]);
        assert!(matches!(table.get(4), Err(Error::InvalidIndex { .. })));

        Ok(())
    }

    #[test]
    fn misaligned_length_rejected() {
        let header = SectionHeader {
            start: 0,
            length: 10,
            count: 3,
        };
        let pool = Arc::new(ReaderPool::for_slice(SliceSource::Memory(Arc::new(vec![
            0;
            10
        ]))));

        assert!(IntegerTable::new("ranked signature indexes", header, pool).is_err());
    }
}
