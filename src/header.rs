// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Section headers.
//!
//! Each section of the data file begins with a fixed 12 byte header
//! describing where the section body lives and how many logical records it
//! holds. Headers are read contiguously at open time: loading a header and
//! skipping its body drives the stream forward to the next header.

use crate::{
    error::{Error, ParseResult, Result},
    reader::Reader,
};
use nom::{error::context, number::complete::le_u32};

/// Describes one section of the data file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SectionHeader {
    /// Absolute byte offset of the section body.
    pub start: u32,

    /// Length of the section body in bytes.
    pub length: u32,

    /// Number of logical records in the section.
    pub count: u32,
}

impl SectionHeader {
    /// Serialized size of a section header.
    pub const SIZE: u32 = 12;

    pub fn parse(s: &[u8]) -> ParseResult<Self> {
        let (s, start) = le_u32(s)?;
        let (s, length) = le_u32(s)?;
        let (s, count) = le_u32(s)?;

        Ok((
            s,
            Self {
                start,
                length,
                count,
            },
        ))
    }

    /// Read a header from the reader's current position.
    ///
    /// Leaves the reader positioned at the start of the section body.
    pub fn load(reader: &mut Reader) -> Result<Self> {
        let buf = reader.read_bytes(Self::SIZE as usize)?;
        let (_, header) = context("parsing section header", Self::parse)(&buf)?;

        Ok(header)
    }

    /// Structural checks against the source the header was read from.
    ///
    /// `position` is the stream position immediately after the header was
    /// read; the body must start at or after it.
    pub fn validate(&self, section: &'static str, source_len: u64, position: u64) -> Result<()> {
        let start = self.start as u64;
        let end = start + self.length as u64;

        if start < position || end > source_len {
            return Err(Error::InvalidFormat(format!(
                "{} section body {}..{} escapes the file (header at {}, {} byte file)",
                section, start, end, position, source_len
            )));
        }

        if self.count as u64 > self.length as u64 && self.length > 0 {
            return Err(Error::InvalidFormat(format!(
                "{} section declares {} records in {} bytes",
                section, self.count, self.length
            )));
        }

        if self.count > 0 && self.length == 0 {
            return Err(Error::InvalidFormat(format!(
                "{} section declares {} records but an empty body",
                section, self.count
            )));
        }

        Ok(())
    }

    /// Record size for a fixed-length section.
    ///
    /// Fails with [Error::InvalidFormat] when the body length is not an
    /// exact multiple of the expected record size.
    pub fn check_fixed(&self, section: &'static str, record_size: u32) -> Result<()> {
        if self.count as u64 * record_size as u64 != self.length as u64 {
            return Err(Error::InvalidFormat(format!(
                "{} section length {} does not match {} records of {} bytes",
                section, self.length, self.count, record_size
            )));
        }

        Ok(())
    }
}
