// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Root node records: entry points into the node tree.

use crate::{
    dataset::Dataset,
    error::Result,
    factory::RecordFactory,
    reader::Reader,
};
use std::sync::Arc;

/// An entry point into the node tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RootNode {
    /// Record number inside the root nodes section.
    pub index: u32,

    /// Byte offset of the node inside the nodes section.
    pub node_offset: u32,
}

impl RootNode {
    pub fn node(&self, dataset: &Dataset) -> Result<Arc<crate::entities::Node>> {
        dataset.nodes()?.get(self.node_offset)
    }
}

/// Factory for [RootNode] records.
pub struct RootNodeFactory;

impl RootNodeFactory {
    const RECORD_SIZE: u32 = 4;
}

impl RecordFactory for RootNodeFactory {
    type Record = RootNode;

    fn record_length(&self) -> Result<u32> {
        Ok(Self::RECORD_SIZE)
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<RootNode> {
        let node_offset = reader.read_u32()?;

        Ok(RootNode {
            index: key,
            node_offset,
        })
    }

    fn entity_length(&self, _record: &RootNode) -> u32 {
        Self::RECORD_SIZE
    }
}
