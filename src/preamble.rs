// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The container preamble.
//!
//! Pattern data files open with a small self-describing preamble: the format
//! version pair, an export tag, the copyright notice, publication timestamps,
//! and the global counts that size fixed records later in the file (notably
//! the per-signature profile and node slot counts).
//!
//! The version pair gates everything else: only 3.1 and 3.2 are understood,
//! and the two differ in section order and in the shape of component,
//! signature and node records.

use crate::error::{Error, ParseResult, Result};
use chrono::{DateTime, Utc};
use nom::{
    bytes::streaming::take,
    error::context,
    number::streaming::{le_i64, le_u16, le_u32, le_u8},
};

/// Supported data file versions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Version {
    V31,
    V32,
}

impl Version {
    /// Resolve a `(major, minor)` pair read from the preamble.
    pub fn from_pair(major: u16, minor: u16) -> Result<Self> {
        match (major, minor) {
            (3, 1) => Ok(Self::V31),
            (3, 2) => Ok(Self::V32),
            _ => Err(Error::UnknownVersion { major, minor }),
        }
    }

    pub fn major(&self) -> u16 {
        3
    }

    pub fn minor(&self) -> u16 {
        match self {
            Self::V31 => 1,
            Self::V32 => 2,
        }
    }
}

/// The parsed preamble of a data file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Preamble {
    pub version_major: u16,
    pub version_minor: u16,

    /// Informational build number of the export.
    pub format_version: u32,

    /// Unique identifier of the export.
    pub tag: [u8; 16],

    /// Copyright notice, without the stored trailing NUL.
    pub copyright: String,

    /// Publication time, unix seconds.
    pub published: i64,

    /// Time the next export is expected, unix seconds.
    pub next_update: i64,

    pub device_combinations: u32,
    pub max_useragent_length: u16,
    pub min_useragent_length: u16,
    pub lowest_character: u8,
    pub highest_character: u8,
    pub max_signatures: u32,

    /// Profile slots in every signature record.
    pub signature_profiles_count: u32,

    /// Inline node offset slots in every 3.1 signature record.
    pub signature_nodes_count: u32,

    pub max_values: u16,
}

impl Preamble {
    /// Parse a preamble from the start of the container.
    ///
    /// Uses streaming parsers so a caller reading from a file can grow its
    /// buffer on [nom::Err::Incomplete] until the variable-length copyright
    /// notice fits.
    pub fn parse(s: &[u8]) -> ParseResult<Self> {
        let (s, version_major) = le_u16(s)?;
        let (s, version_minor) = le_u16(s)?;
        let (s, format_version) = le_u32(s)?;
        let (s, tag_data) = context("reading export tag", take(16usize))(s)?;
        let (s, copyright_len) = le_u16(s)?;
        let (s, copyright_data) =
            context("reading copyright notice", take(copyright_len as usize))(s)?;
        let (s, published) = le_i64(s)?;
        let (s, next_update) = le_i64(s)?;
        let (s, device_combinations) = le_u32(s)?;
        let (s, max_useragent_length) = le_u16(s)?;
        let (s, min_useragent_length) = le_u16(s)?;
        let (s, lowest_character) = le_u8(s)?;
        let (s, highest_character) = le_u8(s)?;
        let (s, max_signatures) = le_u32(s)?;
        let (s, signature_profiles_count) = le_u32(s)?;
        let (s, signature_nodes_count) = le_u32(s)?;
        let (s, max_values) = le_u16(s)?;

        let mut tag = [0u8; 16];
        tag.copy_from_slice(tag_data);

        let copyright_data = match copyright_data {
            [head @ .., 0] => head,
            all => all,
        };
        let copyright = String::from_utf8_lossy(copyright_data).into_owned();

        Ok((
            s,
            Self {
                version_major,
                version_minor,
                format_version,
                tag,
                copyright,
                published,
                next_update,
                device_combinations,
                max_useragent_length,
                min_useragent_length,
                lowest_character,
                highest_character,
                max_signatures,
                signature_profiles_count,
                signature_nodes_count,
                max_values,
            },
        ))
    }

    /// Resolve the version pair. Fails with [Error::UnknownVersion] for
    /// anything other than 3.1 or 3.2.
    pub fn version(&self) -> Result<Version> {
        Version::from_pair(self.version_major, self.version_minor)
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.published, 0)
    }

    pub fn next_update(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.next_update, 0)
    }
}
