//! Data models for the mirrored database.
//!
//! This module contains the index of known modules, the vulnerability entries
//! returned per module, and the batch envelope passed from fetchers to the writer.
pub mod index;
pub mod report;
