// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Map records: named profile groupings for a data source.

use crate::{
    dataset::Dataset,
    error::Result,
    factory::RecordFactory,
    reader::Reader,
};
use std::sync::Arc;

/// A named set of profiles belonging to one data source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Map {
    /// Record number inside the maps section.
    pub index: u32,

    /// String offset of the map name.
    pub name_index: u32,
}

impl Map {
    pub fn name(&self, dataset: &Dataset) -> Result<Arc<crate::entities::AsciiString>> {
        dataset.string(self.name_index)
    }
}

/// Factory for [Map] records.
pub struct MapFactory;

impl MapFactory {
    const RECORD_SIZE: u32 = 4;
}

impl RecordFactory for MapFactory {
    type Record = Map;

    fn record_length(&self) -> Result<u32> {
        Ok(Self::RECORD_SIZE)
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<Map> {
        let name_index = reader.read_u32()?;

        Ok(Map {
            index: key,
            name_index,
        })
    }

    fn entity_length(&self, _record: &Map) -> u32 {
        Self::RECORD_SIZE
    }
}
