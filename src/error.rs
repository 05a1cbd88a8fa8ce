// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use nom::{
    error::{ContextError, ErrorKind, ParseError},
    IResult,
};
use thiserror::Error;

/// Captures the state of a failed nom parse.
///
/// Holds the input that failed to parse plus the context breadcrumbs
/// accumulated on the way down.
#[derive(Clone, Debug)]
pub struct NomParseError {
    pub input: Vec<u8>,
    pub kind: ErrorKind,
    pub contexts: Vec<&'static str>,
}

impl<'a> ParseError<&'a [u8]> for NomParseError {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        Self {
            input: input.to_vec(),
            kind,
            contexts: vec![],
        }
    }

    fn append(_: &'a [u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> ContextError<&'a [u8]> for NomParseError {
    fn add_context(_input: &'a [u8], ctx: &'static str, mut other: Self) -> Self {
        other.contexts.push(ctx);

        other
    }
}

pub type ParseResult<'a, T> = IResult<&'a [u8], T, NomParseError>;

#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error("insufficient input data for parsing: {0:?}")]
    ParseIncomplete(nom::Needed),

    #[error("parse error: {0:?}")]
    Parse(NomParseError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid data format: {0}")]
    InvalidFormat(String),

    #[error("unsupported data file version {major}.{minor}")]
    UnknownVersion { major: u16, minor: u16 },

    #[error("index {index} out of range for the {section} section")]
    InvalidIndex { section: &'static str, index: u32 },

    #[error("entity records in this section do not have a constant length")]
    VariableLength,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation on a closed dataset")]
    Closed,
}

impl From<nom::Err<NomParseError>> for Error {
    fn from(value: nom::Err<NomParseError>) -> Self {
        match value {
            nom::Err::Incomplete(needed) => Self::ParseIncomplete(needed),
            nom::Err::Error(e) | nom::Err::Failure(e) => Self::Parse(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::InvalidFormat("unexpected end of data".to_string())
        } else {
            Self::Io(e.to_string())
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
