// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Value records: the concrete options a property can take.

use crate::{
    dataset::Dataset,
    error::{Error, ParseResult, Result},
    factory::RecordFactory,
    reader::Reader,
};
use nom::number::complete::{le_i32, le_u16, le_u32};
use std::sync::Arc;

/// One concrete, string-valued option of a property.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Value {
    /// Record number inside the values section.
    pub index: u32,

    /// Record number of the owning property.
    pub property_index: u16,

    /// String offset of the value text.
    pub name_index: u32,

    /// String offset of the description, `-1` when none.
    pub description_index: i32,

    /// String offset of the documentation URL, `-1` when none.
    pub url_index: i32,
}

impl Value {
    /// Serialized record size.
    pub const RECORD_SIZE: u32 = 14;

    pub fn parse(index: u32) -> impl Fn(&[u8]) -> ParseResult<'_, Self> {
        move |s| {
            let (s, property_index) = le_u16(s)?;
            let (s, name_index) = le_u32(s)?;
            let (s, description_index) = le_i32(s)?;
            let (s, url_index) = le_i32(s)?;

            Ok((
                s,
                Self {
                    index,
                    property_index,
                    name_index,
                    description_index,
                    url_index,
                },
            ))
        }
    }

    /// The value text.
    pub fn name(&self, dataset: &Dataset) -> Result<Arc<crate::entities::AsciiString>> {
        dataset.string(self.name_index)
    }

    pub fn description(
        &self,
        dataset: &Dataset,
    ) -> Result<Option<Arc<crate::entities::AsciiString>>> {
        dataset.optional_string(self.description_index)
    }

    pub fn url(&self, dataset: &Dataset) -> Result<Option<Arc<crate::entities::AsciiString>>> {
        dataset.optional_string(self.url_index)
    }

    /// The property this value belongs to.
    pub fn property(&self, dataset: &Dataset) -> Result<Arc<crate::entities::Property>> {
        dataset.properties()?.get(self.property_index as u32)
    }
}

/// Factory for [Value] records.
pub struct ValueFactory;

impl RecordFactory for ValueFactory {
    type Record = Value;

    fn record_length(&self) -> Result<u32> {
        Ok(Value::RECORD_SIZE)
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<Value> {
        let buf = reader.read_bytes(Value::RECORD_SIZE as usize)?;
        let (_, value) = Value::parse(key)(&buf)
            .map_err(|_| Error::InvalidFormat(format!("invalid value record at index {}", key)))?;

        Ok(value)
    }

    fn entity_length(&self, _record: &Value) -> u32 {
        Value::RECORD_SIZE
    }
}
