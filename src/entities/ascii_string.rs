// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! ASCII string records.
//!
//! The strings section is the dictionary every other section's name and
//! description indexes point into. Records are length-prefixed byte runs:
//! a `u16` length followed by that many bytes. Exports include a trailing
//! NUL byte inside the stored length; the raw bytes preserve it and the
//! string accessor trims it.
//!
//! String keys are byte offsets into the section body, not record numbers.

use crate::{
    error::Result,
    factory::RecordFactory,
    reader::Reader,
};
use std::borrow::Cow;

/// A length-prefixed ASCII string record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AsciiString {
    /// Byte offset of this record inside the strings section.
    pub index: u32,

    /// Stored bytes, trailing NUL included.
    value: Vec<u8>,
}

impl AsciiString {
    pub fn new(index: u32, value: Vec<u8>) -> Self {
        Self { index, value }
    }

    /// The stored bytes, trailing NUL included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// The string content with any trailing NUL trimmed.
    pub fn as_str(&self) -> Cow<'_, str> {
        let bytes = match self.value.as_slice() {
            [head @ .., 0] => head,
            all => all,
        };

        String::from_utf8_lossy(bytes)
    }

    /// Serialized record size: the length prefix plus the stored bytes.
    pub fn length(&self) -> u32 {
        2 + self.value.len() as u32
    }
}

/// Factory for [AsciiString] records.
pub struct AsciiStringFactory;

impl RecordFactory for AsciiStringFactory {
    type Record = AsciiString;

    fn record_length(&self) -> Result<u32> {
        Err(crate::error::Error::VariableLength)
    }

    fn create(&self, reader: &mut Reader, key: u32) -> Result<AsciiString> {
        let len = reader.read_u16()?;
        let value = reader.read_bytes(len as usize)?;

        Ok(AsciiString::new(key, value))
    }

    fn entity_length(&self, record: &AsciiString) -> u32 {
        record.length()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reader::SliceSource;
    use std::sync::Arc;

    #[test]
    fn create_preserves_trailing_nul() -> Result<()> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&8u16.to_le_bytes());
        raw.extend_from_slice(b"IsMobile");

        let mut reader = Reader::for_slice(SliceSource::Memory(Arc::new(raw)));
        let s = AsciiStringFactory.create(&mut reader, 0)?;

        assert_eq!(s.as_str(), "IsMobile");
        assert_eq!(s.length(), 10);
        assert_eq!(reader.position(), 10);

        let mut raw = Vec::new();
        raw.extend_from_slice(&9u16.to_le_bytes());
        raw.extend_from_slice(b"IsMobile\0");

        let mut reader = Reader::for_slice(SliceSource::Memory(Arc::new(raw)));
        let s = AsciiStringFactory.create(&mut reader, 4)?;

        assert_eq!(s.index, 4);
        assert_eq!(s.as_str(), "IsMobile");
        assert_eq!(s.as_bytes(), b"IsMobile\0");
        assert_eq!(s.length(), 11);

        Ok(())
    }
}
