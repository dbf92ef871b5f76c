//! # Events Module
//!
//! Progress and lifecycle events from the pipeline and the dedup cache.
//!
//! ## Design
//! The core library emits events through a channel so a front end (the
//! CLI spinner, a test, a supervisor) can observe a run without the core
//! knowing who is listening. Nobody listening is the common case, and
//! sending then costs almost nothing.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Pipeline(PipelineEvent::Progress(p)) = event {
//!             eprintln!("{} records read", p.records_read);
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(input, output, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
