//! A distributed identifier compressor.
//!
//! Issues compact integer handles that stand in for 128-bit version-4 UUIDs
//! and are globally unique within a *document* (a set of collaborating
//! sessions), while preserving synchronous, offline-capable allocation. Each
//! session mints ids locally at O(1); a central total-order broadcast service
//! later delivers *finalization ranges* to every session so that
//! locally-minted ids acquire a compact *final* form shared document-wide.
//!
//! This crate is the allocator's data model and algorithms only: the
//! broadcast transport, the surrounding collaborative-document runtime, and
//! any language-binding glue are the caller's responsibility. This crate
//! consumes a fresh session UUID (or accepts a resumed one) and a
//! caller-driven feed of finalization ranges; it exposes id generation,
//! space normalization, decompress/recompress, range take/finalize, and
//! serialize/deserialize.
//!
//! ```
//! use id_compressor_core::{Compressor, CompressorOptions};
//!
//! let mut local = Compressor::new(CompressorOptions::default()).unwrap();
//! let id = local.generate_compressed_id().unwrap();
//! assert!(id.is_local());
//!
//! // Finalize what was minted so far, as if a broadcast had echoed it back.
//! let range = local.take_next_creation_range();
//! local.finalize_creation_range(&range).unwrap();
//! assert!(local.normalize_to_op_space(id).as_final().is_some());
//! ```

mod cluster;
mod compressor;
mod error;
mod finalizer;
mod normalizer;
mod numeric_uuid;
mod range_buffer;
mod serialize;
mod session;
mod types;

pub use compressor::{Compressor, CompressorOptions, DEFAULT_CLUSTER_CAPACITY, MAX_CLUSTER_CAPACITY};
pub use error::{Error, Result};
pub use types::{IdCreationRange, IdRange, OpSpaceId, SessionId, SessionSpaceId, StableId, MAX_SAFE_INTEGER};
