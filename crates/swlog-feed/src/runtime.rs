use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use swlog_config::FeedSpec;
use tracing::{debug, warn};

use crate::protocol::{FeedLine, FeedRecord};

/// Item delivered by [`FeedSource::pump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Record(FeedRecord),
    /// A line that was not a valid record. The feed keeps going.
    Malformed(String),
}

/// Feed failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    Spawn(String),
    Open(String),
    Io(String),
    /// The stream reached end of input.
    Closed,
    ProcessExited { code: Option<i32> },
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(msg) => write!(f, "{msg}"),
            Self::Open(msg) => write!(f, "{msg}"),
            Self::Io(msg) => write!(f, "{msg}"),
            Self::Closed => write!(f, "feed closed"),
            Self::ProcessExited { code } => write!(f, "feed process exited (code={code:?})"),
        }
    }
}

impl std::error::Error for FeedError {}

enum ReaderEvent {
    Line(FeedEvent),
    IoError(String),
    Eof,
}

enum StreamState {
    Open,
    /// Input ended; waiting for the child to be reaped before reporting.
    AwaitingExit,
    /// End reported to the caller but not yet returned.
    Ending(FeedError),
    Done,
}

/// A running lifecycle feed.
pub struct FeedSource {
    label: String,
    child: Option<Child>,
    reader_rx: Receiver<ReaderEvent>,
    state: StreamState,
}

impl FeedSource {
    /// Spawn `program` and read records from its stdout. The child is killed
    /// when the source is dropped.
    pub fn spawn_command(program: &str, args: &[String]) -> Result<Self, FeedError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| FeedError::Spawn(format!("failed to spawn feed {program}: {err}")))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            FeedError::Spawn(format!("failed to capture feed {program} stdout pipe"))
        })?;

        debug!(program, pid = child.id(), "feed process spawned");
        Ok(Self {
            label: program.to_string(),
            child: Some(child),
            reader_rx: spawn_reader(stdout),
            state: StreamState::Open,
        })
    }

    /// Replay a recorded JSON-lines session.
    pub fn open_file(path: &Path) -> Result<Self, FeedError> {
        let file = File::open(path).map_err(|err| {
            FeedError::Open(format!("failed to open feed file {}: {err}", path.display()))
        })?;
        Ok(Self::from_reader(path.display().to_string(), file))
    }

    pub fn stdin() -> Self {
        Self::from_reader("stdin", std::io::stdin())
    }

    /// Read records from any byte stream on a background thread.
    pub fn from_reader<R: Read + Send + 'static>(label: impl Into<String>, reader: R) -> Self {
        Self {
            label: label.into(),
            child: None,
            reader_rx: spawn_reader(reader),
            state: StreamState::Open,
        }
    }

    pub fn open(spec: &FeedSpec) -> Result<Self, FeedError> {
        match spec {
            FeedSpec::Command { program, args } => Self::spawn_command(program, args),
            FeedSpec::File(path) => Self::open_file(path),
            FeedSpec::Stdin => Ok(Self::stdin()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `true` once the end of the stream has been returned from [`pump`](Self::pump).
    pub fn is_finished(&self) -> bool {
        matches!(self.state, StreamState::Done)
    }

    /// Drain up to `max` pending items without blocking.
    ///
    /// Records read before the end of input are always returned first. The
    /// end itself (`Closed`, `ProcessExited` or `Io`) is returned exactly once;
    /// later calls yield empty batches.
    pub fn pump(&mut self, max: usize) -> Result<Vec<FeedEvent>, FeedError> {
        let mut events = Vec::new();

        while matches!(self.state, StreamState::Open) && events.len() < max {
            match self.reader_rx.try_recv() {
                Ok(ReaderEvent::Line(event)) => events.push(event),
                Ok(ReaderEvent::IoError(message)) => {
                    self.state = StreamState::Ending(FeedError::Io(format!(
                        "feed {} read error: {message}",
                        self.label
                    )));
                }
                Ok(ReaderEvent::Eof) | Err(TryRecvError::Disconnected) => {
                    self.state = StreamState::AwaitingExit;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        if matches!(self.state, StreamState::AwaitingExit) {
            if let Some(end) = self.end_of_input() {
                self.state = StreamState::Ending(end);
            }
        }

        if !events.is_empty() {
            return Ok(events);
        }

        match std::mem::replace(&mut self.state, StreamState::Done) {
            StreamState::Ending(err) => Err(err),
            other => {
                self.state = other;
                Ok(events)
            }
        }
    }

    /// Stop the child process, if any.
    pub fn shutdown(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(_)) => {}
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
            }
            Err(err) => warn!(feed = %self.label, error = %err, "failed to poll feed process"),
        }
    }

    fn end_of_input(&mut self) -> Option<FeedError> {
        let Some(child) = self.child.as_mut() else {
            return Some(FeedError::Closed);
        };
        match child.try_wait() {
            Ok(Some(status)) => Some(FeedError::ProcessExited {
                code: status.code(),
            }),
            Ok(None) => None,
            Err(err) => Some(FeedError::Io(format!(
                "failed to poll feed {} process status: {err}",
                self.label
            ))),
        }
    }
}

impl Drop for FeedSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: R) -> Receiver<ReaderEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let reader = BufReader::new(source);
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    let event = match serde_json::from_str::<FeedLine>(&line) {
                        Ok(parsed) => {
                            if let Some(delay) = parsed.delay_ms {
                                thread::sleep(Duration::from_millis(delay));
                            }
                            FeedEvent::Record(parsed.record)
                        }
                        Err(err) => {
                            FeedEvent::Malformed(format!("invalid feed record ({err}): {line}"))
                        }
                    };

                    if tx.send(ReaderEvent::Line(event)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let _ = tx.send(ReaderEvent::IoError(err.to_string()));
                    return;
                }
            }
        }

        let _ = tx.send(ReaderEvent::Eof);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Instant;

    use swlog_core::signal::Controller;

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    struct TempFile {
        path: PathBuf,
    }

    impl TempFile {
        fn new(name: &str, contents: &str) -> Self {
            let counter = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "swlog-feed-{name}-{}-{counter}.jsonl",
                std::process::id()
            ));
            fs::write(&path, contents).unwrap();
            Self { path }
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    /// Pump until the feed ends, collecting everything delivered.
    fn collect_until_end(source: &mut FeedSource) -> (Vec<FeedEvent>, FeedError) {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        loop {
            match source.pump(16) {
                Ok(batch) => events.extend(batch),
                Err(err) => return (events, err),
            }
            assert!(Instant::now() < deadline, "feed did not end in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn reader_delivers_records_then_closed_once() {
        let input = concat!(
            "{\"kind\":\"capability\",\"supported\":true}\n",
            "\n",
            "{\"kind\":\"registration\",\"ok\":true,\"controller\":null}\n",
        );
        let mut source = FeedSource::from_reader("test", Cursor::new(input.as_bytes().to_vec()));

        let (events, end) = collect_until_end(&mut source);
        assert_eq!(
            events,
            vec![
                FeedEvent::Record(FeedRecord::Capability { supported: true }),
                FeedEvent::Record(FeedRecord::Registration {
                    ok: true,
                    controller: Some(None),
                    error: None,
                }),
            ]
        );
        assert_eq!(end, FeedError::Closed);
        assert!(source.is_finished());
        assert_eq!(source.pump(16), Ok(Vec::new()));
    }

    #[test]
    fn malformed_lines_are_reported_and_skipped() {
        let input = "not json\n{\"kind\":\"update_found\",\"installing\":false}\n";
        let mut source = FeedSource::from_reader("test", Cursor::new(input.as_bytes().to_vec()));

        let (events, end) = collect_until_end(&mut source);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], FeedEvent::Malformed(msg) if msg.contains("not json")));
        assert_eq!(
            events[1],
            FeedEvent::Record(FeedRecord::UpdateFound { installing: false })
        );
        assert_eq!(end, FeedError::Closed);
    }

    #[test]
    fn pump_respects_batch_limit() {
        let line = "{\"kind\":\"controller\",\"controller\":{\"state\":\"activated\"}}\n";
        let mut source =
            FeedSource::from_reader("test", Cursor::new(line.repeat(5).into_bytes()));

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = 0;
        while seen < 5 {
            let batch = source.pump(2).unwrap();
            assert!(batch.len() <= 2);
            for event in &batch {
                assert_eq!(
                    *event,
                    FeedEvent::Record(FeedRecord::Controller {
                        controller: Some(Some(Controller::activated()))
                    })
                );
            }
            seen += batch.len();
            assert!(Instant::now() < deadline, "records did not arrive");
        }
    }

    #[test]
    fn file_replay_honours_delay() {
        let file = TempFile::new(
            "delay",
            "{\"kind\":\"capability\",\"supported\":false,\"delay_ms\":30}\n",
        );
        let started = Instant::now();
        let mut source = FeedSource::open(&FeedSpec::File(file.path.clone())).unwrap();

        let (events, end) = collect_until_end(&mut source);
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(
            events,
            vec![FeedEvent::Record(FeedRecord::Capability { supported: false })]
        );
        assert_eq!(end, FeedError::Closed);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = FeedSource::open_file(Path::new("/definitely/not/here.jsonl"))
            .err()
            .expect("open must fail");
        assert!(matches!(err, FeedError::Open(msg) if msg.contains("here.jsonl")));
    }

    #[test]
    fn spawn_failure_is_reported() {
        let err = FeedSource::spawn_command("swlog-no-such-binary-xyz", &[])
            .err()
            .expect("spawn must fail");
        assert!(matches!(err, FeedError::Spawn(_)));
    }

    #[cfg(unix)]
    #[test]
    fn child_records_then_exit_code() {
        let script = r#"echo '{"kind":"update_found","installing":true}'; exit 17"#;
        let mut source =
            FeedSource::spawn_command("sh", &["-c".to_string(), script.to_string()]).unwrap();
        assert_eq!(source.label(), "sh");

        let (events, end) = collect_until_end(&mut source);
        assert_eq!(
            events,
            vec![FeedEvent::Record(FeedRecord::UpdateFound { installing: true })]
        );
        assert_eq!(end, FeedError::ProcessExited { code: Some(17) });
    }

    #[cfg(unix)]
    #[test]
    fn drop_kills_long_running_child() {
        let source =
            FeedSource::spawn_command("sh", &["-c".to_string(), "sleep 30".to_string()]).unwrap();
        let started = Instant::now();
        drop(source);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
