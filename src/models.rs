use serde::{Deserialize, Deserializer, Serialize};

/// History status of a job that finished successfully.
pub const STATUS_COMPLETED: &str = "Completed";

/// History status of a job that failed.
pub const STATUS_FAILED: &str = "Failed";

/// Fields the server sent that have no typed counterpart.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Snapshot of the active download queue, returned by `mode=queue`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Queue {
    /// e.g. "Downloading", "Paused", "Idle".
    #[serde(default, deserialize_with = "null_default")]
    pub status: String,

    #[serde(default, deserialize_with = "null_default")]
    pub paused: bool,

    /// Human readable, e.g. "1.2 M".
    #[serde(default, deserialize_with = "null_default")]
    pub speed: String,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub kbpersec: f64,

    #[serde(default, deserialize_with = "null_default")]
    pub size: String,

    #[serde(default, deserialize_with = "null_default")]
    pub sizeleft: String,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub mb: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub mbleft: f64,

    /// "H:MM:SS".
    #[serde(default, deserialize_with = "null_default")]
    pub timeleft: String,

    /// Number of slots in this (possibly filtered) response.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub noofslots: u64,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub noofslots_total: u64,

    /// Server version string.
    #[serde(default, deserialize_with = "null_default")]
    pub version: String,

    pub slots: Vec<QueueSlot>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Queue {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Find the slot for `nzo_id`, if the job is still active.
    pub fn slot(&self, nzo_id: &str) -> Option<&QueueSlot> {
        self.slots.iter().find(|s| s.nzo_id == nzo_id)
    }
}

/// One active job in the queue.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QueueSlot {
    pub nzo_id: String,

    /// Display name.
    #[serde(default, deserialize_with = "null_default")]
    pub filename: String,

    /// e.g. "Downloading", "Paused", "Queued".
    #[serde(default, deserialize_with = "null_default")]
    pub status: String,

    #[serde(default, deserialize_with = "null_default")]
    pub cat: String,

    #[serde(default, deserialize_with = "null_default")]
    pub script: String,

    /// Priority label, e.g. "Normal".
    #[serde(default, deserialize_with = "null_default")]
    pub priority: String,

    #[serde(default, deserialize_with = "null_default")]
    pub password: String,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub index: u64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub mb: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub mbleft: f64,

    #[serde(default, deserialize_with = "null_default")]
    pub size: String,

    #[serde(default, deserialize_with = "null_default")]
    pub sizeleft: String,

    /// 0-100.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percentage: f64,

    /// "H:MM:SS".
    #[serde(default, deserialize_with = "null_default")]
    pub timeleft: String,

    #[serde(default, deserialize_with = "null_default")]
    pub avg_age: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Snapshot of finished jobs, returned by `mode=history`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct History {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub noofslots: u64,

    #[serde(default, deserialize_with = "null_default")]
    pub day_size: String,

    #[serde(default, deserialize_with = "null_default")]
    pub week_size: String,

    #[serde(default, deserialize_with = "null_default")]
    pub month_size: String,

    #[serde(default, deserialize_with = "null_default")]
    pub total_size: String,

    /// Unix timestamp of the last change.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub last_history_update: u64,

    pub slots: Vec<HistorySlot>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl History {
    pub fn slot(&self, nzo_id: &str) -> Option<&HistorySlot> {
        self.slots.iter().find(|s| s.nzo_id == nzo_id)
    }
}

/// A terminal (or post-processing) record of one job.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistorySlot {
    pub nzo_id: String,

    pub status: String,

    #[serde(default, deserialize_with = "null_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_default")]
    pub nzb_name: String,

    #[serde(default, deserialize_with = "null_default")]
    pub size: String,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub bytes: u64,

    #[serde(default, deserialize_with = "null_default")]
    pub category: String,

    #[serde(default, deserialize_with = "null_default")]
    pub pp: String,

    #[serde(default, deserialize_with = "null_default")]
    pub script: String,

    #[serde(default, deserialize_with = "null_default")]
    pub script_log: String,

    #[serde(default, deserialize_with = "null_default")]
    pub script_line: String,

    #[serde(default, deserialize_with = "null_default")]
    pub action_line: String,

    /// Set when `status` is "Failed".
    #[serde(default, deserialize_with = "null_default")]
    pub fail_message: String,

    #[serde(default, deserialize_with = "null_default")]
    pub stage_log: Vec<StageLog>,

    /// Seconds spent downloading.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub download_time: u64,

    /// Seconds spent post-processing.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub postproc_time: u64,

    /// Unix timestamp.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub completed: u64,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub downloaded: u64,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub completeness: u64,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub retry: u64,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub id: u64,

    #[serde(default, deserialize_with = "null_default")]
    pub loaded: bool,

    #[serde(default, deserialize_with = "null_default")]
    pub has_rating: bool,

    #[serde(default, deserialize_with = "null_default")]
    pub path: String,

    /// Final location on the server's disk.
    #[serde(default, deserialize_with = "null_default")]
    pub storage: String,

    #[serde(default, deserialize_with = "null_default")]
    pub url: String,

    #[serde(default, deserialize_with = "null_default")]
    pub url_info: String,

    #[serde(default, deserialize_with = "null_default")]
    pub md5sum: String,

    #[serde(default, deserialize_with = "null_default")]
    pub password: String,

    #[serde(default, deserialize_with = "null_default")]
    pub report: String,

    #[serde(default, deserialize_with = "null_default")]
    pub series: String,

    #[serde(default, deserialize_with = "null_default")]
    pub show_details: String,

    #[serde(default, deserialize_with = "null_default")]
    pub meta: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl HistorySlot {
    /// Terminal = won't change anymore (Completed or Failed).
    pub fn is_terminal(&self) -> bool {
        self.is_completed() || self.is_failed()
    }

    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED
    }
}

/// Log lines of one post-processing stage ("Download", "Repair", "Unpack", ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StageLog {
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub actions: Vec<String>,
}

/// Where a set of jobs stands, as seen by one completion check.
#[derive(Debug, Clone)]
pub enum Completion {
    /// At least one job is still in the queue.
    Queued(Queue),
    /// Nothing is queued but some history entries are not terminal yet
    /// (verifying, repairing, unpacking), or a job is in neither snapshot.
    Processing(History),
    /// Every job completed successfully.
    Finished(History),
}

impl Completion {
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished(_))
    }
}

/// Polling config for `wait_until_finished` / `add_url_and_wait`.
pub struct WaitOptions {
    /// Default: 1s.
    pub poll_interval: std::time::Duration,
    /// Default: 24h.
    pub timeout: std::time::Duration,
    /// Called after each completion check that did not end the wait.
    #[allow(clippy::type_complexity)]
    pub on_progress: Option<Box<dyn Fn(&Completion) + Send + Sync>>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: std::time::Duration::from_secs(1),
            timeout: std::time::Duration::from_secs(24 * 60 * 60),
            on_progress: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal deserialization helpers (not part of the public API surface)
// ---------------------------------------------------------------------------

/// mode=version response.
#[derive(Deserialize)]
pub(crate) struct VersionResponse {
    pub version: String,
}

/// mode=addurl response.
#[derive(Deserialize)]
pub(crate) struct AddUrlResponse {
    #[serde(default, deserialize_with = "null_default")]
    #[allow(dead_code)]
    pub status: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub nzo_ids: Vec<String>,
}

/// mode=queue response.
#[derive(Deserialize)]
pub(crate) struct QueueResponse {
    pub queue: Queue,
}

/// mode=history response.
#[derive(Deserialize)]
pub(crate) struct HistoryResponse {
    pub history: History,
}

/// SABnzbd sends numbers both as JSON numbers and as strings ("12.5").
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Int(u64),
    Float(f64),
    Str(String),
}

/// Missing and `null` both decode to `T::default()`.
fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    use serde::de::Error;

    match Option::<NumOrStr>::deserialize(d)? {
        None => Ok(0.0),
        Some(NumOrStr::Int(n)) => Ok(n as f64),
        Some(NumOrStr::Float(f)) => Ok(f),
        Some(NumOrStr::Str(s)) if s.trim().is_empty() => Ok(0.0),
        Some(NumOrStr::Str(s)) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected a number, got {s:?}"))),
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let f = lenient_f64(d)?;
    if f < 0.0 {
        return Ok(0);
    }
    Ok(f as u64)
}
