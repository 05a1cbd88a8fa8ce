// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Profile records.
//!
//! A profile is one device's set of property values for a single component.
//! Records are variable-length: a fixed prefix declares how many value and
//! signature indexes follow, so the record size is computable from the
//! prefix alone. Profile keys are byte offsets into the profiles section;
//! other records (components, signatures via profile offsets) store those
//! offsets directly.

use crate::{
    dataset::Dataset,
    error::Result,
    factory::RecordFactory,
    reader::Reader,
};
use std::sync::Arc;

/// A device's property values grouped by component.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Profile {
    /// Byte offset of this record inside the profiles section.
    pub index: u32,

    /// Record number of the owning component.
    pub component_index: u8,

    /// Stable identifier of the profile across exports.
    pub profile_id: u32,

    /// Record numbers into the values section.
    pub value_indexes: Vec<u32>,

    /// Record numbers into the signatures section. Empty in 3.1 exports.
    pub signature_indexes: Vec<u32>,
}

impl Profile {
    /// Serialized size of the fixed record prefix.
    pub const PREFIX_SIZE: u32 = 13;

    /// Serialized record size.
    pub fn length(&self) -> u32 {
        Self::PREFIX_SIZE
            + 4 * self.value_indexes.len() as u32
            + 4 * self.signature_indexes.len() as u32
    }

    /// The owning component.
    pub fn component(&self, dataset: &Dataset) -> Result<Arc<crate::entities::Component>> {
        dataset.components()?.get(self.component_index as u32)
    }

    /// The value records this profile selects, in stored order.
    pub fn values(&self, dataset: &Dataset) -> Result<Vec<Arc<crate::entities::Value>>> {
        let values = dataset.values()?;

        self.value_indexes
            .iter()
            .map(|index| values.get(*index))
            .collect()
    }
}

/// Factory for [Profile] records.
pub struct ProfileFactory;

impl RecordFactory for ProfileFactory {
    type Record = Profile;

    fn record_length(&self) -> Result<u32> {
        Err(crate::error::Error::VariableLength)
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<Profile> {
        let component_index = reader.read_u8()?;
        let profile_id = reader.read_u32()?;
        let value_index_count = reader.read_u32()?;
        let signature_index_count = reader.read_u32()?;

        let value_indexes = (0..value_index_count)
            .map(|_| reader.read_u32())
            .collect::<Result<Vec<_>>>()?;

        let signature_indexes = (0..signature_index_count)
            .map(|_| reader.read_u32())
            .collect::<Result<Vec<_>>>()?;

        Ok(Profile {
            index: key,
            component_index,
            profile_id,
            value_indexes,
            signature_indexes,
        })
    }

    fn entity_length(&self, record: &Profile) -> u32 {
        record.length()
    }
}
