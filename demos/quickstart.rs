//! Quick-start examples for the SABnzbd Rust client.
//!
//! Run with:
//!   SABNZBD_API_KEY=... cargo run --example quickstart -- https://example.com/file.nzb
//!
//! Set `RUST_LOG=sabnzbd=debug` to see every API call.

use sabnzbd::{AddUrlOptions, ClientBuilder, Completion, PostProcessing, Priority, WaitOptions};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> sabnzbd::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // -----------------------------------------------------------------------
    // 1. Create a client (reads SABNZBD_API_KEY from environment)
    // -----------------------------------------------------------------------
    let client = ClientBuilder::new()
        .host(std::env::var("SABNZBD_HOST").unwrap_or_else(|_| "127.0.0.1".into()))
        .port(std::env::var("SABNZBD_PORT").unwrap_or_else(|_| "8080".into()))
        .build()?;

    println!("SABnzbd version: {}", client.version().await?);

    // -----------------------------------------------------------------------
    // 2. Look at what is currently going on
    // -----------------------------------------------------------------------
    let queue = client.queue::<&str>(&[]).await?;
    println!("Queue: {} ({} jobs, {} left)", queue.status, queue.slots.len(), queue.sizeleft);
    for slot in &queue.slots {
        println!("  {} | {:>5.1}% | {}", slot.nzo_id, slot.percentage, slot.filename);
    }
    println!();

    let Some(nzb_url) = std::env::args().nth(1) else {
        return Ok(());
    };

    // -----------------------------------------------------------------------
    // 3. Submit an NZB and wait for it with a progress callback
    // -----------------------------------------------------------------------
    let opts = AddUrlOptions::new()
        .category("*")
        .priority(Priority::High)
        .post_processing(PostProcessing::RepairUnpackDelete);

    let wait = WaitOptions {
        poll_interval: Duration::from_secs(2),
        timeout: Duration::from_secs(60 * 60),
        on_progress: Some(Box::new(|state: &Completion| match state {
            Completion::Queued(q) => println!("  downloading: {} left ({})", q.sizeleft, q.timeleft),
            Completion::Processing(_) => println!("  post-processing..."),
            Completion::Finished(_) => {}
        })),
    };

    let ids = client.add_url_and_wait(&nzb_url, Some(&opts), Some(wait)).await?;

    // -----------------------------------------------------------------------
    // 4. Read back the history records
    // -----------------------------------------------------------------------
    let history = client.history(&ids).await?;
    for slot in &history.slots {
        println!("{} | {} | {}", slot.nzo_id, slot.status, slot.storage);
        for stage in &slot.stage_log {
            println!("  {}: {}", stage.name, stage.actions.join("; "));
        }
    }

    Ok(())
}
