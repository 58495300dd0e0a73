#![doc = "viewsync-core: decision logic and pipelines for viewsync."]

//! This crate decides when a stored file must be converted into a viewable
//! document and when its search-index entry must be rebuilt, and sequences
//! the calls to the storage, conversion and index services accordingly.
//! Transport details live with the collaborator implementations, not here.
//!
//! # Usage
//! Implement the traits in [`contract`], build a [`config::SyncConfig`] once,
//! and drive requests through [`synchronise::Synchroniser`].

pub mod config;
pub mod contract;
pub mod convert;
pub mod error;
pub mod freshness;
pub mod index_sync;
pub mod lookup;
pub mod memory_index;
pub mod search;
pub mod synchronise;
pub mod upstream;

pub use error::{Operation, Service, ServiceError, ServiceResult, SyncError};
pub use synchronise::{IndexReport, Synchroniser};
