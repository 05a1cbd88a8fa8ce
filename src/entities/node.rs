// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Node records: the user-agent prefix tree.
//!
//! Nodes are the vertices the matching algorithm walks while consuming a
//! user-agent string. Each record stores its character window, its parent,
//! its child edges (string-keyed and numeric) and references to the ranked
//! signatures that pass through it.
//!
//! Records are variable-length; node keys are byte offsets into the nodes
//! section, which is also how parents, children, signatures and root nodes
//! refer to each other.
//!
//! The versions diverge after the child arrays. 3.1 inlines the full list
//! of ranked signature indexes. 3.2 stores a `u16` count plus at most one
//! `u32`: the ranked signature index itself when the count is exactly one,
//! otherwise the starting index into the shared
//! `node_ranked_signature_indexes` table.

use crate::{
    dataset::Dataset,
    error::Result,
    factory::RecordFactory,
    reader::Reader,
};
use std::sync::Arc;

/// A child edge keyed by a character sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeIndex {
    /// Whether `value` is a string offset rather than inline characters.
    pub is_string: bool,

    /// String offset when `is_string`, up to four inline characters
    /// otherwise.
    pub value: i32,

    /// Byte offset of the child node.
    pub related_node_offset: i32,
}

impl NodeIndex {
    /// Serialized size of a child edge.
    pub const SIZE: u32 = 9;
}

/// A child edge keyed by a numeric value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeNumericIndex {
    pub value: i16,

    /// Byte offset of the child node.
    pub related_node_offset: i32,
}

impl NodeNumericIndex {
    /// Serialized size of a numeric child edge.
    pub const SIZE: u32 = 6;
}

/// Version-specific ranked signature references of a node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeDetail {
    /// 3.1: the full index list stored inline.
    V31 { ranked_signature_indexes: Vec<u32> },

    /// 3.2: a count plus either the single index itself or a start index
    /// into the `node_ranked_signature_indexes` table.
    V32 {
        ranked_signature_count: u16,
        ranked_signature_value: Option<u32>,
    },
}

/// A prefix-tree vertex over user-agent characters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    /// Byte offset of this record inside the nodes section.
    pub index: u32,

    /// Start position of this node's characters in the user-agent.
    pub position: i16,

    /// Position of the next character after this node's characters.
    pub next_character_position: i16,

    /// Byte offset of the parent node, `-1` at a root.
    pub parent_offset: i32,

    /// String offset of this node's characters, `-1` when the node matches
    /// at the root without consuming characters.
    pub character_string_offset: i32,

    pub children: Vec<NodeIndex>,
    pub numeric_children: Vec<NodeNumericIndex>,

    pub detail: NodeDetail,
}

impl Node {
    /// Serialized size of the version-independent record prefix.
    const COMMON_PREFIX_SIZE: u32 = 16;

    pub fn is_root(&self) -> bool {
        self.parent_offset < 0
    }

    /// Whether the node carries its own character sequence.
    pub fn has_characters(&self) -> bool {
        self.character_string_offset >= 0
    }

    /// The node's character sequence, when it carries one.
    pub fn characters(&self, dataset: &Dataset) -> Result<Option<Arc<crate::entities::AsciiString>>> {
        dataset.optional_string(self.character_string_offset)
    }

    /// The parent node, [None] at a root.
    pub fn parent(&self, dataset: &Dataset) -> Result<Option<Arc<Node>>> {
        if self.parent_offset < 0 {
            return Ok(None);
        }

        dataset.nodes()?.get(self.parent_offset as u32).map(Some)
    }

    /// Number of ranked signatures that pass through this node.
    pub fn ranked_signature_count(&self) -> u32 {
        match &self.detail {
            NodeDetail::V31 {
                ranked_signature_indexes,
            } => ranked_signature_indexes.len() as u32,
            NodeDetail::V32 {
                ranked_signature_count,
                ..
            } => *ranked_signature_count as u32,
        }
    }

    /// Indexes into the ranked signature indexes table of the signatures
    /// passing through this node.
    pub fn ranked_signature_indexes(&self, dataset: &Dataset) -> Result<Vec<u32>> {
        match &self.detail {
            NodeDetail::V31 {
                ranked_signature_indexes,
            } => Ok(ranked_signature_indexes.clone()),
            NodeDetail::V32 {
                ranked_signature_count,
                ranked_signature_value,
            } => match (*ranked_signature_count, *ranked_signature_value) {
                (0, _) | (_, None) => Ok(vec![]),
                (1, Some(value)) => Ok(vec![value]),
                (count, Some(start)) => {
                    let table = dataset.node_ranked_signature_indexes()?.ok_or_else(|| {
                        crate::error::Error::InvalidFormat(
                            "3.2 node without a node ranked signature indexes table".to_string(),
                        )
                    })?;

                    (0..count as u32).map(|i| table.get(start + i)).collect()
                }
            },
        }
    }

    /// Serialized record size.
    pub fn length(&self) -> u32 {
        let arrays = NodeIndex::SIZE * self.children.len() as u32
            + NodeNumericIndex::SIZE * self.numeric_children.len() as u32;

        match &self.detail {
            NodeDetail::V31 {
                ranked_signature_indexes,
            } => Self::COMMON_PREFIX_SIZE + 4 + arrays + 4 * ranked_signature_indexes.len() as u32,
            NodeDetail::V32 {
                ranked_signature_value,
                ..
            } => {
                Self::COMMON_PREFIX_SIZE
                    + 2
                    + arrays
                    + if ranked_signature_value.is_some() { 4 } else { 0 }
            }
        }
    }
}

fn read_children(reader: &mut Reader, count: u16) -> Result<Vec<NodeIndex>> {
    (0..count)
        .map(|_| {
            let is_string = reader.read_u8()? != 0;
            let value = reader.read_i32()?;
            let related_node_offset = reader.read_i32()?;

            Ok(NodeIndex {
                is_string,
                value,
                related_node_offset,
            })
        })
        .collect()
}

fn read_numeric_children(reader: &mut Reader, count: u16) -> Result<Vec<NodeNumericIndex>> {
    (0..count)
        .map(|_| {
            let value = reader.read_i16()?;
            let related_node_offset = reader.read_i32()?;

            Ok(NodeNumericIndex {
                value,
                related_node_offset,
            })
        })
        .collect()
}

/// Version-selected factory for [Node] records.
pub enum NodeFactory {
    V31,
    V32,
}

impl RecordFactory for NodeFactory {
    type Record = Node;

    fn record_length(&self) -> Result<u32> {
        Err(crate::error::Error::VariableLength)
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<Node> {
        let position = reader.read_i16()?;
        let next_character_position = reader.read_i16()?;
        let parent_offset = reader.read_i32()?;
        let character_string_offset = reader.read_i32()?;
        let children_count = reader.read_u16()?;
        let numeric_children_count = reader.read_u16()?;

        let (children, numeric_children, detail) = match self {
            Self::V31 => {
                let ranked_signature_count = reader.read_u32()?;
                let children = read_children(reader, children_count)?;
                let numeric_children = read_numeric_children(reader, numeric_children_count)?;

                let ranked_signature_indexes = (0..ranked_signature_count)
                    .map(|_| reader.read_u32())
                    .collect::<Result<Vec<_>>>()?;

                (
                    children,
                    numeric_children,
                    NodeDetail::V31 {
                        ranked_signature_indexes,
                    },
                )
            }
            Self::V32 => {
                let ranked_signature_count = reader.read_u16()?;
                let children = read_children(reader, children_count)?;
                let numeric_children = read_numeric_children(reader, numeric_children_count)?;

                let ranked_signature_value = if ranked_signature_count > 0 {
                    Some(reader.read_u32()?)
                } else {
                    None
                };

                (
                    children,
                    numeric_children,
                    NodeDetail::V32 {
                        ranked_signature_count,
                        ranked_signature_value,
                    },
                )
            }
        };

        Ok(Node {
            index: key,
            position,
            next_character_position,
            parent_offset,
            character_string_offset,
            children,
            numeric_children,
            detail,
        })
    }

    fn entity_length(&self, record: &Node) -> u32 {
        record.length()
    }
}
