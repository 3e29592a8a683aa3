use serde::{Deserialize, Serialize};

/// One record in the batch status stream.
///
/// Sequence contract: exactly one `Start` first, then for every item (in
/// scan order) either a pair of `Progress` events (announce + finish) or
/// one `Error`, then exactly one `Done` — except for an empty batch, which
/// ends right after `Start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Start {
        total: usize,
    },
    Progress {
        done: usize,
        total: usize,
        file: String,
        /// Wall-clock time as "<m>m <s>s"; absent on the announce event
        elapsed: Option<String>,
    },
    Error {
        file: String,
        message: String,
    },
    Done {
        total: usize,
        succeeded: usize,
        failed: usize,
        results: Vec<ItemResult>,
    },
}

/// Outcome of one successfully transcribed item, carried in `Done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    pub name: String,
    pub text: String,
    pub elapsed: String,
}

/// Render whole seconds as `"<minutes>m <seconds>s"`.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}
