//! # SABnzbd client for Rust
//!
//! Async client for the [SABnzbd](https://sabnzbd.org) HTTP/JSON control API.
//! Submit NZBs by URL, read the queue and history, and wait for jobs to
//! finish -- all with idiomatic async Rust.
//!
//! ## Quick start
//!
//! ```no_run
//! use sabnzbd::{AddUrlOptions, Client, Priority};
//!
//! #[tokio::main]
//! async fn main() -> sabnzbd::Result<()> {
//!     let client = Client::new("127.0.0.1", "8080", "6e961fd677a74326a07f1df4c06e3f38")?;
//!
//!     println!("SABnzbd {}", client.version().await?);
//!
//!     // Submit and wait for the download to finish
//!     let opts = AddUrlOptions::new().category("tv").priority(Priority::High);
//!     let ids = client
//!         .add_url_and_wait("https://example.com/show.nzb", Some(&opts), None)
//!         .await?;
//!
//!     let history = client.history(&ids).await?;
//!     for slot in &history.slots {
//!         println!("{} -> {} ({})", slot.name, slot.storage, slot.status);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Waiting with a deadline
//!
//! ```no_run
//! use sabnzbd::{Client, Completion, WaitOptions};
//! use std::time::Duration;
//!
//! # async fn example(client: Client, ids: Vec<String>) -> sabnzbd::Result<()> {
//! let opts = WaitOptions {
//!     poll_interval: Duration::from_secs(5),
//!     timeout: Duration::from_secs(30 * 60),
//!     on_progress: Some(Box::new(|state: &Completion| {
//!         if let Completion::Queued(q) = state {
//!             println!("{} left at {}", q.sizeleft, q.speed);
//!         }
//!     })),
//! };
//! client.wait_until_finished(&ids, &opts).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod errors;
mod models;
mod params;

pub use client::{Client, ClientBuilder};
pub use errors::{Result, SabnzbdError};
pub use models::{
    Completion, Extra, History, HistorySlot, Queue, QueueSlot, StageLog, WaitOptions,
    STATUS_COMPLETED, STATUS_FAILED,
};
pub use params::{AddUrlOptions, Endpoint, PostProcessing, Priority, QueryParams};
