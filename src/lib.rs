#![forbid(unsafe_code)]

//! Shared logic for the ttarchive tool binaries: configuration, filename
//! sanitization, link classification, the CSV ledger, collection-tree
//! reconciliation, and the download/render pipelines. The binaries under
//! `src/bin/` are thin argument-parsing wrappers around these modules.

pub mod archive;
pub mod collection;
pub mod config;
pub mod download;
pub mod exec;
pub mod ledger;
pub mod links;
pub mod sanitize;
pub mod titles;
