//! Pipeline execution implementation.

use crate::core::cache::{DedupStore, ExpiringCache};
use crate::core::hasher::{Fingerprinter, Sha256Fingerprinter};
use crate::error::PipelineError;
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelineProgress, PipelineSummary,
};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Result of pipeline execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Lines read, empty ones included
    pub records_read: u64,
    /// Records forwarded to the output
    pub records_written: u64,
    /// Records dropped as duplicates
    pub duplicates_dropped: u64,
    /// Empty lines skipped before fingerprinting
    pub empty_skipped: u64,
    /// The read error that ended the run early, if any
    pub read_error: Option<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Whether all input was consumed
    pub fn completed(&self) -> bool {
        self.read_error.is_none()
    }

    fn progress(&self) -> PipelineProgress {
        PipelineProgress {
            records_read: self.records_read,
            records_written: self.records_written,
            duplicates_dropped: self.duplicates_dropped,
        }
    }

    fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            records_read: self.records_read,
            records_written: self.records_written,
            duplicates_dropped: self.duplicates_dropped,
            empty_skipped: self.empty_skipped,
            duration_ms: self.duration_ms,
        }
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Emit a progress event every this many records (0 disables)
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            progress_interval: 10_000,
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    store: Option<Box<dyn DedupStore>>,
    fingerprinter: Option<Box<dyn Fingerprinter>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            store: None,
            fingerprinter: None,
        }
    }

    /// Set the dedup store
    pub fn store(mut self, store: Box<dyn DedupStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the fingerprint function
    pub fn fingerprinter(mut self, fingerprinter: Box<dyn Fingerprinter>) -> Self {
        self.fingerprinter = Some(fingerprinter);
        self
    }

    /// Set how often progress events are sent
    pub fn progress_interval(mut self, records: u64) -> Self {
        self.config.progress_interval = records;
        self
    }

    /// Build the pipeline
    ///
    /// Without an explicit store the pipeline deduplicates permanently.
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            store: self
                .store
                .unwrap_or_else(|| Box::new(ExpiringCache::permanent())),
            fingerprinter: self
                .fingerprinter
                .unwrap_or_else(|| Box::new(Sha256Fingerprinter)),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The stream deduplication pipeline
pub struct Pipeline {
    config: PipelineConfig,
    store: Box<dyn DedupStore>,
    fingerprinter: Box<dyn Fingerprinter>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The store deciding admit/drop
    pub fn store(&self) -> &dyn DedupStore {
        self.store.as_ref()
    }

    /// Stop the store's background work
    pub fn shutdown(&self) {
        self.store.shutdown();
    }

    /// Run the pipeline without events
    pub fn run<R: BufRead, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<PipelineResult, PipelineError> {
        self.run_with_events(input, output, &null_sender())
    }

    /// Run the pipeline with event reporting
    ///
    /// Reads until end of input. Each admitted record is flushed to `output`
    /// before the next line is read. A read error ends the loop and is
    /// reported in the result; everything written before it stays written.
    /// A write error is returned as an error.
    pub fn run_with_events<R: BufRead, W: Write>(
        &self,
        mut input: R,
        mut output: W,
        events: &EventSender,
    ) -> Result<PipelineResult, PipelineError> {
        let start_time = Instant::now();
        let mut result = PipelineResult::default();
        let mut line = Vec::with_capacity(256);

        debug!(fingerprint = self.fingerprinter.name(), "Pipeline started");
        events.send(Event::Pipeline(PipelineEvent::Started));

        loop {
            line.clear();
            match input.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Error reading input; stopping");
                    events.send(Event::Pipeline(PipelineEvent::ReadError {
                        message: e.to_string(),
                    }));
                    result.read_error = Some(e.to_string());
                    break;
                }
            }

            result.records_read += 1;
            let record = strip_line_ending(&line);

            if record.is_empty() {
                result.empty_skipped += 1;
            } else {
                let key = self.fingerprinter.fingerprint(record);
                if self.store.observe(&key) {
                    trace!(fingerprint = %key, "Duplicate dropped");
                    result.duplicates_dropped += 1;
                } else {
                    // Flushed per record: input may stay open indefinitely
                    output
                        .write_all(record)
                        .and_then(|()| output.write_all(b"\n"))
                        .and_then(|()| output.flush())
                        .map_err(|source| PipelineError::Write { source })?;
                    result.records_written += 1;
                }
            }

            let interval = self.config.progress_interval;
            if interval > 0 && result.records_read % interval == 0 {
                events.send(Event::Pipeline(PipelineEvent::Progress(result.progress())));
            }
        }

        output
            .flush()
            .map_err(|source| PipelineError::Write { source })?;

        result.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            records_read = result.records_read,
            records_written = result.records_written,
            duplicates_dropped = result.duplicates_dropped,
            "Pipeline finished"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: result.summary(),
        }));

        Ok(result)
    }
}

/// Drop a trailing `\n` and, for CRLF input, the `\r` before it.
fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{ManualClock, Retention};
    use crate::events::EventChannel;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::{self, BufReader, Cursor, Read};
    use std::rc::Rc;
    use std::sync::Arc;
    use std::time::Duration;

    fn dedup(input: &str) -> (String, PipelineResult) {
        let pipeline = Pipeline::builder().build();
        let mut output = Vec::new();
        let result = pipeline.run(Cursor::new(input), &mut output).unwrap();
        (String::from_utf8(output).unwrap(), result)
    }

    /// Yields one scripted line per read, advancing a manual clock first.
    struct TimedLines {
        lines: VecDeque<(Duration, &'static [u8])>,
        clock: Arc<ManualClock>,
    }

    impl Read for TimedLines {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.lines.pop_front() {
                Some((delay, line)) => {
                    self.clock.advance(delay);
                    buf[..line.len()].copy_from_slice(line);
                    Ok(line.len())
                }
                None => Ok(0),
            }
        }
    }

    /// Yields its data, then fails.
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::Other, "device unplugged")),
                n => Ok(n),
            }
        }
    }

    /// Holds writes back until flushed, like a block-buffered stdout.
    struct HeldWriter {
        pending: Vec<u8>,
        visible: Rc<RefCell<Vec<u8>>>,
    }

    impl Write for HeldWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.pending.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.visible.borrow_mut().append(&mut self.pending);
            Ok(())
        }
    }

    /// Yields one line per read and notes what downstream could see first.
    struct WatchedLines {
        lines: VecDeque<&'static [u8]>,
        visible: Rc<RefCell<Vec<u8>>>,
        snapshots: Rc<RefCell<Vec<String>>>,
    }

    impl Read for WatchedLines {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let seen = String::from_utf8_lossy(&self.visible.borrow()).into_owned();
            self.snapshots.borrow_mut().push(seen);
            match self.lines.pop_front() {
                Some(line) => {
                    buf[..line.len()].copy_from_slice(line);
                    Ok(line.len())
                }
                None => Ok(0),
            }
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn permanent_mode_keeps_first_occurrences_in_order() {
        let (output, result) = dedup("a\nb\na\nc\nb\n");

        assert_eq!(output, "a\nb\nc\n");
        assert_eq!(result.records_read, 5);
        assert_eq!(result.records_written, 3);
        assert_eq!(result.duplicates_dropped, 2);
        assert!(result.completed());
    }

    #[test]
    fn timed_mode_readmits_after_a_long_gap() {
        let clock = Arc::new(ManualClock::new());
        let cache = ExpiringCache::builder(Retention::Timed(Duration::from_millis(80)))
            .clock(clock.clone())
            .without_reclaimer()
            .build();
        let pipeline = Pipeline::builder().store(Box::new(cache)).build();

        let input = TimedLines {
            lines: VecDeque::from(vec![
                (Duration::ZERO, &b"a\n"[..]),
                (Duration::from_millis(60), &b"b\n"[..]),
                (Duration::from_millis(40), &b"a\n"[..]),
                (Duration::ZERO, &b"c\n"[..]),
                (Duration::from_millis(10), &b"b\n"[..]),
            ]),
            clock,
        };

        let mut output = Vec::new();
        pipeline.run(BufReader::new(input), &mut output).unwrap();

        assert_eq!(output, b"a\nb\na\nc\n");
    }

    #[test]
    fn empty_lines_are_skipped_without_touching_the_store() {
        let pipeline = Pipeline::builder().build();
        let mut output = Vec::new();
        let result = pipeline.run(Cursor::new("\n\na\n\n\r\na\n"), &mut output).unwrap();

        assert_eq!(output, b"a\n");
        assert_eq!(result.empty_skipped, 4);
        assert_eq!(pipeline.store().len(), 1);
        assert_eq!(pipeline.store().stats().observed, 2);
    }

    #[test]
    fn crlf_and_missing_final_newline_are_normalised() {
        let (output, result) = dedup("a\r\nb\na\nb");

        assert_eq!(output, "a\nb\n");
        assert_eq!(result.duplicates_dropped, 2);
    }

    #[test]
    fn records_are_written_verbatim() {
        let pipeline = Pipeline::builder().build();
        let input: &[u8] = b"\xff\xfe raw\n  padded  \n\xff\xfe raw\n";
        let mut output = Vec::new();
        pipeline.run(input, &mut output).unwrap();

        assert_eq!(output, b"\xff\xfe raw\n  padded  \n");
    }

    #[test]
    fn admitted_records_are_delivered_before_the_next_read() {
        let visible = Rc::new(RefCell::new(Vec::new()));
        let snapshots = Rc::new(RefCell::new(Vec::new()));
        let input = BufReader::new(WatchedLines {
            lines: VecDeque::from(vec![&b"a\n"[..], &b"b\n"[..], &b"a\n"[..]]),
            visible: visible.clone(),
            snapshots: snapshots.clone(),
        });
        let output = HeldWriter {
            pending: Vec::new(),
            visible: visible.clone(),
        };

        Pipeline::builder().build().run(input, output).unwrap();

        assert_eq!(*snapshots.borrow(), vec!["", "a\n", "a\nb\n", "a\nb\n"]);
        assert_eq!(*visible.borrow(), b"a\nb\n");
    }

    #[test]
    fn read_error_keeps_earlier_output() {
        let pipeline = Pipeline::builder().build();
        let input = BufReader::new(FailingReader {
            data: Cursor::new(b"x\ny\nx\n".to_vec()),
        });
        let mut output = Vec::new();

        let result = pipeline.run(input, &mut output).unwrap();

        assert_eq!(output, b"x\ny\n");
        assert!(!result.completed());
        assert!(result.read_error.unwrap().contains("device unplugged"));
    }

    #[test]
    fn write_error_is_returned() {
        let pipeline = Pipeline::builder().build();
        let error = pipeline.run(Cursor::new("a\n"), ClosedPipe).unwrap_err();

        match error {
            PipelineError::Write { source } => {
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe)
            }
        }
    }

    #[test]
    fn events_report_progress_and_completion() {
        let pipeline = Pipeline::builder().progress_interval(2).build();
        let (sender, receiver) = EventChannel::new();

        pipeline
            .run_with_events(Cursor::new("a\nb\na\nc\n"), io::sink(), &sender)
            .unwrap();
        drop(sender);

        let events: Vec<Event> = receiver.iter().collect();
        let progress: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                Event::Pipeline(PipelineEvent::Progress(p)) => Some(p.records_read),
                _ => None,
            })
            .collect();

        assert!(matches!(events.first(), Some(Event::Pipeline(PipelineEvent::Started))));
        assert_eq!(progress, vec![2, 4]);
        match events.last() {
            Some(Event::Pipeline(PipelineEvent::Completed { summary })) => {
                assert_eq!(summary.records_written, 3);
                assert_eq!(summary.duplicates_dropped, 1);
            }
            other => panic!("unexpected last event: {:?}", other),
        }
    }

    #[test]
    fn shutdown_stops_the_store_reclaimer() {
        let cache = ExpiringCache::timed(Duration::from_secs(30));
        assert!(cache.is_reclaiming());
        let pipeline = Pipeline::builder().store(Box::new(cache)).build();

        pipeline.run(Cursor::new("a\n"), io::sink()).unwrap();
        pipeline.shutdown();
        pipeline.shutdown();

        assert_eq!(pipeline.store().len(), 1);
    }

    #[test]
    fn strip_line_ending_handles_all_endings() {
        assert_eq!(strip_line_ending(b"a\n"), b"a");
        assert_eq!(strip_line_ending(b"a\r\n"), b"a");
        assert_eq!(strip_line_ending(b"a"), b"a");
        assert_eq!(strip_line_ending(b"a\r"), b"a");
        assert_eq!(strip_line_ending(b"\n"), b"");
    }
}
