// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The assembled dataset.
//!
//! A [Dataset] is the immutable aggregate a detection engine queries: the
//! preamble, every section wired as a resident or streamed list, the packed
//! side-tables, and the reader pool they all share. Datasets are created by
//! [crate::open_path] / [crate::open_bytes] and are safe to share across
//! threads.
//!
//! Closing is idempotent and may race outstanding reads: those either
//! complete or fail with [Error::Closed] / [Error::Io]. Every public
//! operation on a closed dataset fails with [Error::Closed]. Dropping a
//! dataset closes it.

use crate::{
    entities::{
        AsciiString, AsciiStringFactory, Component, Map, NodeFactory, ProfileFactory,
        ProfileOffset, RootNode, SignatureFactory, ValueFactory,
    },
    error::{Error, Result},
    list::{MemoryFixedList, PropertiesList},
    preamble::{Preamble, Version},
    reader::ReaderPool,
    stream::StreamList,
    tables::IntegerTable,
};
use chrono::{DateTime, Utc};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

pub type StringsList = StreamList<AsciiStringFactory>;
pub type ValuesList = StreamList<ValueFactory>;
pub type ProfilesList = StreamList<ProfileFactory>;
pub type SignaturesList = StreamList<SignatureFactory>;
pub type NodesList = StreamList<NodeFactory>;

/// A fully opened, read-only Pattern dataset.
pub struct Dataset {
    pub(crate) preamble: Preamble,
    pub(crate) version: Version,
    pub(crate) pool: Arc<ReaderPool>,
    pub(crate) closed: AtomicBool,
    pub(crate) delete_on_close: Option<PathBuf>,
    pub(crate) last_modified: Option<DateTime<Utc>>,

    pub(crate) strings: StringsList,
    pub(crate) components: MemoryFixedList<Component>,
    pub(crate) maps: MemoryFixedList<Map>,
    pub(crate) properties: PropertiesList,
    pub(crate) values: ValuesList,
    pub(crate) profiles: ProfilesList,
    pub(crate) signatures: SignaturesList,
    pub(crate) signature_node_offsets: Option<IntegerTable>,
    pub(crate) node_ranked_signature_indexes: Option<IntegerTable>,
    pub(crate) ranked_signature_indexes: IntegerTable,
    pub(crate) nodes: NodesList,
    pub(crate) root_nodes: MemoryFixedList<RootNode>,
    pub(crate) profile_offsets: MemoryFixedList<ProfileOffset>,
}

impl Dataset {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// The data file version.
    pub fn version(&self) -> Result<Version> {
        self.ensure_open()?;

        Ok(self.version)
    }

    /// The parsed preamble.
    pub fn preamble(&self) -> Result<&Preamble> {
        self.ensure_open()?;

        Ok(&self.preamble)
    }

    /// The copyright notice embedded in the data file.
    pub fn copyright(&self) -> Result<&str> {
        self.ensure_open()?;

        Ok(&self.preamble.copyright)
    }

    /// Publication time of the data file.
    pub fn published(&self) -> Result<Option<DateTime<Utc>>> {
        self.ensure_open()?;

        Ok(self.preamble.published())
    }

    /// Time the next data file is expected to be published.
    pub fn next_update(&self) -> Result<Option<DateTime<Utc>>> {
        self.ensure_open()?;

        Ok(self.preamble.next_update())
    }

    /// Modification time of the source the dataset was opened from.
    pub fn last_modified(&self) -> Result<Option<DateTime<Utc>>> {
        self.ensure_open()?;

        Ok(self.last_modified)
    }

    pub fn strings(&self) -> Result<&StringsList> {
        self.ensure_open()?;

        Ok(&self.strings)
    }

    pub fn components(&self) -> Result<&MemoryFixedList<Component>> {
        self.ensure_open()?;

        Ok(&self.components)
    }

    pub fn maps(&self) -> Result<&MemoryFixedList<Map>> {
        self.ensure_open()?;

        Ok(&self.maps)
    }

    pub fn properties(&self) -> Result<&PropertiesList> {
        self.ensure_open()?;

        Ok(&self.properties)
    }

    pub fn values(&self) -> Result<&ValuesList> {
        self.ensure_open()?;

        Ok(&self.values)
    }

    pub fn profiles(&self) -> Result<&ProfilesList> {
        self.ensure_open()?;

        Ok(&self.profiles)
    }

    pub fn signatures(&self) -> Result<&SignaturesList> {
        self.ensure_open()?;

        Ok(&self.signatures)
    }

    /// The signature node offsets table. [None] for 3.1 data.
    pub fn signature_node_offsets(&self) -> Result<Option<&IntegerTable>> {
        self.ensure_open()?;

        Ok(self.signature_node_offsets.as_ref())
    }

    /// The node ranked signature indexes table. [None] for 3.1 data.
    pub fn node_ranked_signature_indexes(&self) -> Result<Option<&IntegerTable>> {
        self.ensure_open()?;

        Ok(self.node_ranked_signature_indexes.as_ref())
    }

    pub fn ranked_signature_indexes(&self) -> Result<&IntegerTable> {
        self.ensure_open()?;

        Ok(&self.ranked_signature_indexes)
    }

    pub fn nodes(&self) -> Result<&NodesList> {
        self.ensure_open()?;

        Ok(&self.nodes)
    }

    pub fn root_nodes(&self) -> Result<&MemoryFixedList<RootNode>> {
        self.ensure_open()?;

        Ok(&self.root_nodes)
    }

    pub fn profile_offsets(&self) -> Result<&MemoryFixedList<ProfileOffset>> {
        self.ensure_open()?;

        Ok(&self.profile_offsets)
    }

    /// Fetch a string record by its byte offset in the strings section.
    pub fn string(&self, offset: u32) -> Result<Arc<AsciiString>> {
        self.strings()?.get(offset)
    }

    /// Fetch an optional string: a negative offset means "not present".
    pub fn optional_string(&self, offset: i32) -> Result<Option<Arc<AsciiString>>> {
        if offset < 0 {
            return Ok(None);
        }

        self.string(offset as u32).map(Some)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the dataset.
    ///
    /// Idempotent and safe to call concurrently with outstanding reads;
    /// those complete or fail with [Error::Closed]. Closes the reader pool
    /// and, when the dataset was opened with `delete_on_close`, removes the
    /// backing file.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.pool.close();

        if let Some(path) = &self.delete_on_close {
            std::fs::remove_file(path).map_err(|e| Error::Io(e.to_string()))?;
        }

        Ok(())
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
