//! Trigger-gated reading of the target's output stream
//!
//! A background pump drains the stream into a bounded backlog as soon as the
//! reader exists, so the target never blocks on a full pipe while the oracle
//! is pausing or injecting input. Every wait is bounded by the configured
//! timeout and aborted by the run's cancellation token. Lines that do not
//! satisfy the current wait are discarded for good.

use holecheck_common::{Error, Result, Trigger};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Lines held while nobody is waiting; the oldest go first beyond this
pub const BACKLOG_LINES: usize = 10_000;

enum StreamEnd {
    Eof,
    Failed(std::io::Error),
}

#[derive(Default)]
struct Backlog {
    lines: VecDeque<String>,
    end: Option<StreamEnd>,
    dropped: usize,
}

struct Shared {
    backlog: Mutex<Backlog>,
    notify: Notify,
}

/// Line reader over a process output stream
pub struct OutputReader {
    shared: Arc<Shared>,
    pump: JoinHandle<()>,
    timeout: Duration,
    cancel: CancellationToken,
    consumed: usize,
}

impl OutputReader {
    /// Start draining `stream`. Must be called inside a tokio runtime.
    pub fn new<R>(stream: R, timeout: Duration, cancel: CancellationToken) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let shared = Arc::new(Shared {
            backlog: Mutex::new(Backlog::default()),
            notify: Notify::new(),
        });
        let pump = tokio::spawn(pump(stream, shared.clone()));

        Self {
            shared,
            pump,
            timeout,
            cancel,
            consumed: 0,
        }
    }

    /// Number of lines read so far, matched or not
    pub fn lines_consumed(&self) -> usize {
        self.consumed
    }

    /// Block until a line containing the trigger's pattern is read
    pub async fn wait_for(&mut self, trigger: &Trigger) -> Result<String> {
        let line = self
            .wait_map(&trigger.to_string(), |line| {
                trigger.matches(line).then(|| line.to_string())
            })
            .await?;
        debug!("Observed {}", trigger.meaning);
        Ok(line)
    }

    /// Block until `select` accepts a line, returning what it extracted.
    ///
    /// `waiting_for` names the wait in errors and logs.
    pub async fn wait_map<T, F>(&mut self, waiting_for: &str, mut select: F) -> Result<T>
    where
        F: FnMut(&str) -> Option<T>,
    {
        let deadline = Instant::now() + self.timeout;

        loop {
            let line = self.next_line(waiting_for, deadline).await?;
            if let Some(found) = select(&line) {
                return Ok(found);
            }
            trace!("Discarded: {}", line);
        }
    }

    async fn next_line(&mut self, waiting_for: &str, deadline: Instant) -> Result<String> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            {
                let mut backlog = self.shared.backlog.lock();
                if backlog.dropped > 0 {
                    warn!("Output backlog full, dropped {} lines", backlog.dropped);
                    backlog.dropped = 0;
                }
                if let Some(line) = backlog.lines.pop_front() {
                    self.consumed += 1;
                    return Ok(line);
                }
                match backlog.end.replace(StreamEnd::Eof) {
                    Some(StreamEnd::Failed(e)) => return Err(e.into()),
                    Some(StreamEnd::Eof) => {
                        return Err(Error::StreamClosed {
                            waiting_for: waiting_for.to_string(),
                        })
                    }
                    None => backlog.end = None,
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                woke = tokio::time::timeout_at(deadline, self.shared.notify.notified()) => {
                    if woke.is_err() {
                        return Err(Error::stalled(waiting_for, self.timeout));
                    }
                }
            }
        }
    }
}

impl Drop for OutputReader {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump<R: AsyncRead + Unpin>(stream: R, shared: Arc<Shared>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let end = match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => Some(StreamEnd::Eof),
            Ok(_) => None,
            Err(e) => Some(StreamEnd::Failed(e)),
        };
        let done = end.is_some();

        {
            let mut backlog = shared.backlog.lock();
            match end {
                Some(end) => backlog.end = Some(end),
                None => {
                    let line = String::from_utf8_lossy(&buf);
                    if backlog.lines.len() >= BACKLOG_LINES {
                        backlog.lines.pop_front();
                        backlog.dropped += 1;
                    }
                    backlog
                        .lines
                        .push_back(line.trim_end_matches(['\r', '\n']).to_string());
                }
            }
        }
        shared.notify.notify_one();

        if done {
            return;
        }
    }
}

/// Sleep for a fixed delay unless the run is cancelled first
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::AsyncWriteExt;

    fn reader(text: &str) -> OutputReader {
        OutputReader::new(
            Cursor::new(text.as_bytes().to_vec()),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_waits_past_unrelated_lines() {
        let mut out = reader("Loading compiled script\nInit\nEngine initialized\nafter\n");
        let trigger = Trigger::new("Engine initialized", "engine ready");

        let line = out.wait_for(&trigger).await.unwrap();
        assert_eq!(line, "Engine initialized");
        assert_eq!(out.lines_consumed(), 3);
    }

    #[tokio::test]
    async fn test_matched_line_is_not_reused() {
        let mut out = reader("LOADING BRICKS\n");
        let trigger = Trigger::new("LOADING BRICKS", "bricks loading");

        out.wait_for(&trigger).await.unwrap();
        let err = out.wait_for(&trigger).await.unwrap_err();
        assert!(matches!(err, Error::StreamClosed { .. }));
    }

    #[tokio::test]
    async fn test_strips_carriage_returns() {
        let mut out = reader("noise\r\n42\r\n");
        let count = out
            .wait_map("count", |line| line.parse::<u64>().ok())
            .await
            .unwrap();
        assert_eq!(count, 42);
    }

    #[tokio::test]
    async fn test_end_of_stream_is_a_failure() {
        let mut out = reader("Engine initialized\n");
        let err = out
            .wait_for(&Trigger::new("Linking GLSL program", "renderer ready"))
            .await
            .unwrap_err();
        match err {
            Error::StreamClosed { waiting_for } => assert!(waiting_for.contains("renderer ready")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_partial_last_line_is_still_read() {
        let mut out = reader("first\nDedicated server is now running.");
        out.wait_for(&Trigger::new("Dedicated server", "ready"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_utf8_does_not_abort() {
        let mut bytes = b"\xff\xfe garbage\n".to_vec();
        bytes.extend_from_slice(b"Engine initialized\n");
        let mut out = OutputReader::new(
            Cursor::new(bytes),
            Duration::from_secs(5),
            CancellationToken::new(),
        );
        out.wait_for(&Trigger::new("Engine initialized", "engine ready"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_silent_stream_stalls() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"still booting\n").await.unwrap();

        let mut out = OutputReader::new(rx, Duration::from_millis(50), CancellationToken::new());
        let err = out
            .wait_for(&Trigger::new("Engine initialized", "engine ready"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Stalled { .. }));
        assert_eq!(out.lines_consumed(), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_wait() {
        let (_tx, rx) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let mut out = OutputReader::new(rx, Duration::from_secs(60), cancel.clone());

        cancel.cancel();
        let err = out
            .wait_for(&Trigger::new("Engine initialized", "engine ready"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_output_drained_while_nobody_waits() {
        // Far more output than the pipe holds, written before any wait starts
        let (mut tx, rx) = tokio::io::duplex(64);
        let out = OutputReader::new(rx, Duration::from_secs(5), CancellationToken::new());
        let writer = tokio::spawn(async move {
            for i in 0..2_000 {
                tx.write_all(format!("brick {}\n", i).as_bytes()).await.unwrap();
            }
            tx.write_all(b"LOADING BRICKS\n").await.unwrap();
        });

        tokio::time::timeout(Duration::from_secs(5), writer)
            .await
            .expect("target blocked on a full pipe")
            .unwrap();

        let mut out = out;
        out.wait_for(&Trigger::new("LOADING BRICKS", "bricks loading"))
            .await
            .unwrap();
        assert_eq!(out.lines_consumed(), 2_001);
    }

    #[tokio::test]
    async fn test_backlog_keeps_newest_lines() {
        let mut text = String::new();
        for i in 0..BACKLOG_LINES + 5 {
            text.push_str(&format!("{}\n", i));
        }
        let mut out = reader(&text);

        let first = out.wait_map("any line", |line| Some(line.to_string())).await.unwrap();
        assert_eq!(first, "5");
    }

    #[tokio::test]
    async fn test_pause_is_cancellable() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = pause(Duration::from_secs(60), &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        pause(Duration::ZERO, &CancellationToken::new()).await.unwrap();
    }
}
