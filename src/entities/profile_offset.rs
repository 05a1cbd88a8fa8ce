// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Profile offset records: the profile-id to byte-offset index.

use crate::{
    dataset::Dataset,
    error::Result,
    factory::RecordFactory,
    reader::Reader,
};
use std::sync::Arc;

/// Maps a stable profile id to the profile's record offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProfileOffset {
    /// Record number inside the profile offsets section.
    pub index: u32,

    /// Stable identifier of the profile.
    pub profile_id: u32,

    /// Byte offset of the profile record inside the profiles section.
    pub offset: u32,
}

impl ProfileOffset {
    pub fn profile(&self, dataset: &Dataset) -> Result<Arc<crate::entities::Profile>> {
        dataset.profiles()?.get(self.offset)
    }
}

/// Factory for [ProfileOffset] records.
pub struct ProfileOffsetFactory;

impl ProfileOffsetFactory {
    const RECORD_SIZE: u32 = 8;
}

impl RecordFactory for ProfileOffsetFactory {
    type Record = ProfileOffset;

    fn record_length(&self) -> Result<u32> {
        Ok(Self::RECORD_SIZE)
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<ProfileOffset> {
        let profile_id = reader.read_u32()?;
        let offset = reader.read_u32()?;

        Ok(ProfileOffset {
            index: key,
            profile_id,
            offset,
        })
    }

    fn entity_length(&self, _record: &ProfileOffset) -> u32 {
        Self::RECORD_SIZE
    }
}
