// Copyright 2024 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pattern data file reader.
//!
//! This crate implements a read-only storage engine for 51Degrees Pattern
//! device detection data files, versions 3.1 and 3.2. A data file is a
//! multi-section binary container holding cross-referenced entities - the
//! string dictionary, components, properties, values, profiles, signatures
//! and the user-agent node tree - that a detection algorithm walks to
//! classify HTTP clients.
//!
//! The design goals:
//!
//! * Decode both documented format versions bit-exactly and fail with a
//!   typed error on anything else - no panics on hostile input.
//! * Keep the memory footprint proportional to what the caller touches.
//!   Only the small hot sections are resident; everything else is
//!   materialized on demand through a bounded pool of readers, with an
//!   LRU cache per section absorbing the hot set.
//! * Be safe to share across threads: the dataset is immutable after open
//!   and the pool and caches arbitrate all shared mutation internally.
//!
//! Open a dataset with [open_path] or [open_bytes], pick an access [Mode]
//! (pooled file handles, a memory map, or a heap buffer) and query the
//! entity lists it exposes:
//!
//! ```no_run
//! use pattern_reader::{open_path, OpenOptions};
//!
//! let dataset = open_path("51Degrees-Lite.dat", OpenOptions::default())?;
//!
//! let properties = dataset.properties()?;
//! if let Some(is_mobile) = properties.by_name("IsMobile") {
//!     println!("{}", is_mobile.description(&dataset)?.unwrap().as_str());
//! }
//!
//! for signature in dataset.signatures()?.iter().take(10) {
//!     let signature = signature?;
//!     for node in signature.nodes(&dataset)? {
//!         let _ = node.characters(&dataset)?;
//!     }
//! }
//!
//! dataset.close()?;
//! # Ok::<(), pattern_reader::Error>(())
//! ```
//!
//! Entities are plain records carrying their section index; cross
//! references (a property's name, a signature's nodes) resolve lazily
//! through an explicit `&Dataset` parameter. Lists hand out `Arc`s, so
//! entities can be held, cached or discarded independently of the dataset
//! - but every lookup needs the dataset to still be open.

pub mod cache;
pub mod dataset;
pub mod entities;
pub mod error;
pub mod factory;
pub mod header;
pub mod list;
pub mod open;
pub mod preamble;
pub mod reader;
pub mod stream;
pub mod tables;

pub use crate::{
    cache::{ExternalCache, LruCache},
    dataset::Dataset,
    error::{Error, Result},
    open::{open_bytes, open_path, CacheConfig, CachePolicy, Mode, OpenOptions},
    preamble::{Preamble, Version},
};
