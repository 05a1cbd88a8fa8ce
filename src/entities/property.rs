// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Property records.
//!
//! A property is the metadata for one detectable attribute (`IsMobile`,
//! `ScreenPixelsWidth`, ...): its name, value type, textual documentation
//! and the contiguous run of value records that belong to it. Records are a
//! fixed 44 bytes; the documentation indexes are `-1` when the export
//! carries no text for them.

use crate::{
    dataset::Dataset,
    error::{Error, ParseResult, Result},
    factory::RecordFactory,
    reader::Reader,
};
use nom::number::complete::{le_i32, le_u32, le_u8};
use num_enum::TryFromPrimitive;
use std::sync::Arc;

/// The type of the values a property can take.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum PropertyValueType {
    String = 0,
    Int = 1,
    Double = 2,
    Bool = 3,
    JavaScript = 4,
}

/// Metadata for one detectable attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Property {
    /// Record number inside the properties section.
    pub index: u32,

    /// Record number of the owning component.
    pub component_index: u8,

    /// Suggested ordering when displaying properties.
    pub display_order: u8,

    pub is_mandatory: bool,
    pub is_list: bool,
    pub show_values: bool,
    pub is_obsolete: bool,
    pub show: bool,

    pub value_type: PropertyValueType,

    /// Record number of the default value, `-1` when none.
    pub default_value_index: i32,

    /// String offset of the property name.
    pub name_index: u32,

    /// String offset of the description, `-1` when none.
    pub description_index: i32,

    /// String offset of the category name, `-1` when none.
    pub category_index: i32,

    /// String offset of the documentation URL, `-1` when none.
    pub url_index: i32,

    /// First record number of this property's run of values.
    pub first_value_index: u32,

    /// Last record number of this property's run of values, inclusive.
    pub last_value_index: u32,

    pub map_count: u32,
    pub first_map_index: u32,
}

impl Property {
    /// Serialized record size.
    pub const RECORD_SIZE: u32 = 44;

    pub fn parse(index: u32) -> impl Fn(&[u8]) -> ParseResult<'_, Self> {
        move |s| {
            let (s, component_index) = le_u8(s)?;
            let (s, display_order) = le_u8(s)?;
            let (s, is_mandatory) = le_u8(s)?;
            let (s, is_list) = le_u8(s)?;
            let (s, show_values) = le_u8(s)?;
            let (s, is_obsolete) = le_u8(s)?;
            let (s, show) = le_u8(s)?;
            let (s, value_type) = le_u8(s)?;
            let (s, default_value_index) = le_i32(s)?;
            let (s, name_index) = le_u32(s)?;
            let (s, description_index) = le_i32(s)?;
            let (s, category_index) = le_i32(s)?;
            let (s, url_index) = le_i32(s)?;
            let (s, first_value_index) = le_u32(s)?;
            let (s, last_value_index) = le_u32(s)?;
            let (s, map_count) = le_u32(s)?;
            let (s, first_map_index) = le_u32(s)?;

            let value_type = PropertyValueType::try_from(value_type).map_err(|_| {
                nom::Err::Failure(nom::error::ParseError::from_error_kind(
                    s,
                    nom::error::ErrorKind::Fail,
                ))
            })?;

            Ok((
                s,
                Self {
                    index,
                    component_index,
                    display_order,
                    is_mandatory: is_mandatory != 0,
                    is_list: is_list != 0,
                    show_values: show_values != 0,
                    is_obsolete: is_obsolete != 0,
                    show: show != 0,
                    value_type,
                    default_value_index,
                    name_index,
                    description_index,
                    category_index,
                    url_index,
                    first_value_index,
                    last_value_index,
                    map_count,
                    first_map_index,
                },
            ))
        }
    }

    /// The property name.
    pub fn name(&self, dataset: &Dataset) -> Result<Arc<crate::entities::AsciiString>> {
        dataset.string(self.name_index)
    }

    pub fn description(
        &self,
        dataset: &Dataset,
    ) -> Result<Option<Arc<crate::entities::AsciiString>>> {
        dataset.optional_string(self.description_index)
    }

    pub fn category(&self, dataset: &Dataset) -> Result<Option<Arc<crate::entities::AsciiString>>> {
        dataset.optional_string(self.category_index)
    }

    pub fn url(&self, dataset: &Dataset) -> Result<Option<Arc<crate::entities::AsciiString>>> {
        dataset.optional_string(self.url_index)
    }

    /// The owning component.
    pub fn component(&self, dataset: &Dataset) -> Result<Arc<crate::entities::Component>> {
        dataset.components()?.get(self.component_index as u32)
    }

    /// The default value record, when the export declares one.
    pub fn default_value(&self, dataset: &Dataset) -> Result<Option<Arc<crate::entities::Value>>> {
        if self.default_value_index < 0 {
            return Ok(None);
        }

        dataset
            .values()?
            .get(self.default_value_index as u32)
            .map(Some)
    }

    /// All values belonging to this property, in record order.
    pub fn values(&self, dataset: &Dataset) -> Result<Vec<Arc<crate::entities::Value>>> {
        let values = dataset.values()?;

        (self.first_value_index..=self.last_value_index)
            .map(|index| values.get(index))
            .collect()
    }
}

/// Factory for [Property] records.
pub struct PropertyFactory;

impl RecordFactory for PropertyFactory {
    type Record = Property;

    fn record_length(&self) -> Result<u32> {
        Ok(Property::RECORD_SIZE)
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<Property> {
        let buf = reader.read_bytes(Property::RECORD_SIZE as usize)?;
        let (_, property) = Property::parse(key)(&buf).map_err(|e| match e {
            nom::Err::Incomplete(_) => Error::InvalidFormat("truncated property record".to_string()),
            _ => Error::InvalidFormat(format!("invalid property record at index {}", key)),
        })?;

        Ok(property)
    }

    fn entity_length(&self, _record: &Property) -> u32 {
        Property::RECORD_SIZE
    }
}
