// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Component records.
//!
//! A component is a category of related properties: hardware, software
//! platform, browser, crawler. Every profile belongs to exactly one
//! component and every signature carries one profile per component.
//!
//! The two format versions differ in how a component knows which HTTP
//! headers feed its part of the detection: 3.1 derives the list from the
//! component name and the derivation is memoised on first access; 3.2
//! stores explicit string indexes in the record body, which makes 3.2
//! component records self-sizing. The components section is fully resident,
//! so the self-sizing is only ever consumed by the sequential open-time
//! read.

use crate::{
    dataset::Dataset,
    error::{Error, Result},
    factory::RecordFactory,
    reader::Reader,
};
use std::sync::{Arc, OnceLock};

/// Names of components whose detection input is the User-Agent header.
const USER_AGENT_COMPONENTS: [&str; 4] =
    ["HardwarePlatform", "SoftwarePlatform", "BrowserUA", "Crawler"];

#[derive(Clone, Debug)]
enum HttpHeaders {
    /// 3.1: derived from the component name, published at most once.
    Derived(Arc<OnceLock<Vec<String>>>),

    /// 3.2: explicit string indexes from the record body.
    Stored(Vec<u32>),
}

/// A named group of properties.
#[derive(Clone, Debug)]
pub struct Component {
    /// Record number inside the components section.
    pub index: u32,

    /// Stable identifier of the component across exports.
    pub component_id: u32,

    /// String offset of the component name.
    pub name_index: u32,

    /// Byte offset of the component's default profile inside the profiles
    /// section.
    pub default_profile_offset: u32,

    http_headers: HttpHeaders,
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        let headers = match (&self.http_headers, &other.http_headers) {
            (HttpHeaders::Derived(_), HttpHeaders::Derived(_)) => true,
            (HttpHeaders::Stored(a), HttpHeaders::Stored(b)) => a == b,
            _ => false,
        };

        headers
            && self.index == other.index
            && self.component_id == other.component_id
            && self.name_index == other.name_index
            && self.default_profile_offset == other.default_profile_offset
    }
}

impl Eq for Component {}

impl Component {
    /// The component name.
    pub fn name(&self, dataset: &Dataset) -> Result<Arc<crate::entities::AsciiString>> {
        dataset.string(self.name_index)
    }

    /// The component's default profile.
    pub fn default_profile(&self, dataset: &Dataset) -> Result<Arc<crate::entities::Profile>> {
        dataset.profiles()?.get(self.default_profile_offset)
    }

    /// HTTP header names relevant to this component.
    ///
    /// For 3.1 data the list is computed from the component name on first
    /// access and published once; concurrent first calls may compute
    /// redundantly and the first publication wins. For 3.2 data the stored
    /// string indexes are resolved on every call.
    pub fn http_headers(&self, dataset: &Dataset) -> Result<Vec<String>> {
        match &self.http_headers {
            HttpHeaders::Derived(cell) => {
                if let Some(headers) = cell.get() {
                    return Ok(headers.clone());
                }

                let name = self.name(dataset)?;
                let computed = if USER_AGENT_COMPONENTS.iter().any(|c| name.as_str() == *c) {
                    vec!["User-Agent".to_string()]
                } else {
                    vec![]
                };

                Ok(cell.get_or_init(|| computed).clone())
            }
            HttpHeaders::Stored(indexes) => indexes
                .iter()
                .map(|index| Ok(dataset.string(*index)?.as_str().into_owned()))
                .collect(),
        }
    }

    /// Stored HTTP header string indexes (3.2 records only).
    pub fn http_header_indexes(&self) -> Option<&[u32]> {
        match &self.http_headers {
            HttpHeaders::Derived(_) => None,
            HttpHeaders::Stored(indexes) => Some(indexes),
        }
    }
}

/// Version-selected factory for [Component] records.
pub enum ComponentFactory {
    V31,
    V32,
}

impl ComponentFactory {
    /// Serialized size of the fixed record prefix.
    const PREFIX_SIZE: u32 = 12;
}

impl RecordFactory for ComponentFactory {
    type Record = Component;

    fn record_length(&self) -> Result<u32> {
        match self {
            Self::V31 => Ok(Self::PREFIX_SIZE),
            Self::V32 => Err(Error::VariableLength),
        }
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<Component> {
        let component_id = reader.read_u32()?;
        let name_index = reader.read_u32()?;
        let default_profile_offset = reader.read_u32()?;

        let http_headers = match self {
            Self::V31 => HttpHeaders::Derived(Arc::new(OnceLock::new())),
            Self::V32 => {
                let count = reader.read_u16()?;
                let indexes = (0..count)
                    .map(|_| reader.read_u32())
                    .collect::<Result<Vec<_>>>()?;

                HttpHeaders::Stored(indexes)
            }
        };

        Ok(Component {
            index: key,
            component_id,
            name_index,
            default_profile_offset,
            http_headers,
        })
    }

    fn entity_length(&self, record: &Component) -> u32 {
        match &record.http_headers {
            HttpHeaders::Derived(_) => Self::PREFIX_SIZE,
            HttpHeaders::Stored(indexes) => Self::PREFIX_SIZE + 2 + 4 * indexes.len() as u32,
        }
    }
}
