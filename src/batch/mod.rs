//! Folder-batch orchestration.
//!
//! A batch is one pass over the stable files in the pending directory:
//! transcribe each in name order, persist the text, archive the source,
//! and report every transition as a [`ProgressEvent`] on a channel the
//! HTTP layer streams to the caller.

mod events;
mod runner;

pub use events::{format_elapsed, ItemResult, ProgressEvent};
pub use runner::{BatchJob, BatchRunner};
