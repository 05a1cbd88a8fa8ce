// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Signature records.
//!
//! A signature is a stored device fingerprint: one profile per component
//! plus the node sequence that matches it. Records are fixed-length in both
//! format versions, sized by the preamble's per-signature slot counts.
//! Unused profile slots are stored as `-1`.
//!
//! 3.1 records inline their node offsets (again `-1` padded). 3.2 records
//! instead store a count and a starting index into the shared
//! `signature_node_offsets` table, plus a rank and a flags byte.

use crate::{
    dataset::Dataset,
    error::{Error, Result},
    factory::RecordFactory,
    reader::Reader,
};
use std::sync::Arc;

/// Version-specific trailing fields of a signature record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignatureDetail {
    /// 3.1: node offsets stored inline, unused slots `-1`.
    V31 { node_offsets: Vec<i32> },

    /// 3.2: node offsets live in the `signature_node_offsets` table.
    V32 {
        node_count: u8,
        first_node_offset_index: i32,
        rank: u32,
        flags: u8,
    },
}

/// A stored device fingerprint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    /// Record number inside the signatures section.
    pub index: u32,

    /// One slot per component, a record number into the profile offsets
    /// section, `-1` for unused slots.
    pub profile_indexes: Vec<i32>,

    pub detail: SignatureDetail,
}

impl Signature {
    /// The profiles referenced by this signature, skipping unused slots.
    pub fn profiles(&self, dataset: &Dataset) -> Result<Vec<Arc<crate::entities::Profile>>> {
        let profile_offsets = dataset.profile_offsets()?;
        let profiles = dataset.profiles()?;

        self.profile_indexes
            .iter()
            .filter(|index| **index >= 0)
            .map(|index| {
                let offset = profile_offsets.get(*index as u32)?;
                profiles.get(offset.offset)
            })
            .collect()
    }

    /// Byte offsets into the nodes section of the nodes forming this
    /// signature, in stored order.
    pub fn node_offsets(&self, dataset: &Dataset) -> Result<Vec<u32>> {
        match &self.detail {
            SignatureDetail::V31 { node_offsets } => Ok(node_offsets
                .iter()
                .filter(|offset| **offset >= 0)
                .map(|offset| *offset as u32)
                .collect()),
            SignatureDetail::V32 {
                node_count,
                first_node_offset_index,
                ..
            } => {
                let table = dataset
                    .signature_node_offsets()?
                    .ok_or_else(|| Error::InvalidFormat(
                        "3.2 signature without a signature node offsets table".to_string(),
                    ))?;

                (0..*node_count as u32)
                    .map(|i| table.get(*first_node_offset_index as u32 + i))
                    .collect()
            }
        }
    }

    /// The nodes forming this signature.
    pub fn nodes(&self, dataset: &Dataset) -> Result<Vec<Arc<crate::entities::Node>>> {
        let nodes = dataset.nodes()?;

        self.node_offsets(dataset)?
            .into_iter()
            .map(|offset| nodes.get(offset))
            .collect()
    }

    /// The signature's rank, where stored (3.2 only).
    pub fn rank(&self) -> Option<u32> {
        match &self.detail {
            SignatureDetail::V31 { .. } => None,
            SignatureDetail::V32 { rank, .. } => Some(*rank),
        }
    }
}

/// Version-selected factory for [Signature] records.
///
/// Carries the preamble slot counts that size every record.
pub enum SignatureFactory {
    V31 {
        profiles_count: u32,
        nodes_count: u32,
    },
    V32 {
        profiles_count: u32,
    },
}

impl RecordFactory for SignatureFactory {
    type Record = Signature;

    fn record_length(&self) -> Result<u32> {
        match self {
            Self::V31 {
                profiles_count,
                nodes_count,
            } => Ok(4 * (profiles_count + nodes_count)),
            Self::V32 { profiles_count } => Ok(4 * profiles_count + 10),
        }
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<Signature> {
        let profiles_count = match self {
            Self::V31 { profiles_count, .. } | Self::V32 { profiles_count } => *profiles_count,
        };

        let profile_indexes = (0..profiles_count)
            .map(|_| reader.read_i32())
            .collect::<Result<Vec<_>>>()?;

        let detail = match self {
            Self::V31 { nodes_count, .. } => {
                let node_offsets = (0..*nodes_count)
                    .map(|_| reader.read_i32())
                    .collect::<Result<Vec<_>>>()?;

                SignatureDetail::V31 { node_offsets }
            }
            Self::V32 { .. } => {
                let node_count = reader.read_u8()?;
                let first_node_offset_index = reader.read_i32()?;
                let rank = reader.read_u32()?;
                let flags = reader.read_u8()?;

                SignatureDetail::V32 {
                    node_count,
                    first_node_offset_index,
                    rank,
                    flags,
                }
            }
        };

        Ok(Signature {
            index: key,
            profile_indexes,
            detail,
        })
    }

    fn entity_length(&self, _record: &Signature) -> u32 {
        match self {
            Self::V31 {
                profiles_count,
                nodes_count,
            } => 4 * (profiles_count + nodes_count),
            Self::V32 { profiles_count } => 4 * profiles_count + 10,
        }
    }
}
