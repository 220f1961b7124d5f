//! # LogWriter – simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for demos and debugging.
//!
//! ## Example output
//! ```text
//! [created] session="kitchen"
//! [started] session="kitchen"
//! [failed] session="kitchen" err="sensor fault: overheated"
//! [stopped] session="kitchen" samples=42
//! [misuse] duplicate_create session="kitchen" msg="..."
//! [destroyed] session="kitchen"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let session = e.session.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::HandleCreated => println!("[created] session={session}"),
            EventKind::HandleDestroyed => println!("[destroyed] session={session}"),
            EventKind::UpdatesStarted => println!("[started] session={session}"),
            EventKind::UpdatesStopped => println!(
                "[stopped] session={session} samples={}",
                e.samples.unwrap_or(0)
            ),
            EventKind::StreamFailed => println!("[failed] session={session} err={reason:?}"),
            EventKind::SampleDropped => println!("[sample-dropped] session={session}"),
            EventKind::DuplicateStart => println!("[already-streaming] session={session}"),
            EventKind::DuplicateCreate => {
                println!("[misuse] duplicate_create session={session} msg={reason:?}")
            }
            EventKind::HandleNotFound => {
                println!("[misuse] handle_not_found session={session} msg={reason:?}")
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={session} reason={reason}")
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={session} info={reason}")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
