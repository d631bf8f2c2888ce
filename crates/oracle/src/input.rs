//! Simulated input delivered to the target
//!
//! The game drops input that arrives faster than a person could produce it,
//! so every event is followed by the configured settle delay. Backends only
//! deliver events; pacing and control lookup live in [`Injector`].

use crate::layout::ControlLocator;
use crate::reader::pause;
use async_trait::async_trait;
use holecheck_common::{Error, Result, ScreenPoint};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Move the pointer and press the primary button
    Click(ScreenPoint),
    /// Press a named key or chord, e.g. `Return` or `alt+Tab`
    Key(String),
    /// Type literal text
    Text(String),
}

impl std::fmt::Display for InputEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputEvent::Click(at) => write!(f, "click {}", at),
            InputEvent::Key(key) => write!(f, "key {}", key),
            InputEvent::Text(text) => write!(f, "type {:?}", text),
        }
    }
}

/// Delivers input events to whatever currently receives them
#[async_trait]
pub trait InputBackend: Send {
    async fn send(&mut self, event: &InputEvent) -> Result<()>;
}

/// Desktop input through an external tool (`xdotool` compatible CLI)
pub struct DesktopBackend {
    tool: PathBuf,
}

impl DesktopBackend {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    /// Tool arguments for an event
    pub fn args(event: &InputEvent) -> Vec<String> {
        match event {
            InputEvent::Click(at) => vec![
                "mousemove".to_string(),
                "--sync".to_string(),
                at.x.to_string(),
                at.y.to_string(),
                "click".to_string(),
                "1".to_string(),
            ],
            InputEvent::Key(key) => vec!["key".to_string(), key.clone()],
            InputEvent::Text(text) => vec![
                "type".to_string(),
                "--".to_string(),
                text.clone(),
            ],
        }
    }
}

#[async_trait]
impl InputBackend for DesktopBackend {
    async fn send(&mut self, event: &InputEvent) -> Result<()> {
        let output = Command::new(&self.tool)
            .args(Self::args(event))
            .output()
            .await
            .map_err(|e| {
                Error::Input(format!("failed to run {}: {}", self.tool.display(), e))
            })?;

        if !output.status.success() {
            return Err(Error::Input(format!(
                "{} rejected '{}': {}",
                self.tool.display(),
                event,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

/// Console input written straight into a dedicated server's stdin
pub struct ConsoleBackend<W> {
    console: W,
    submit_key: String,
}

impl<W: AsyncWrite + Send + Unpin> ConsoleBackend<W> {
    pub fn new(console: W, submit_key: impl Into<String>) -> Self {
        Self {
            console,
            submit_key: submit_key.into(),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Send + Unpin> InputBackend for ConsoleBackend<W> {
    async fn send(&mut self, event: &InputEvent) -> Result<()> {
        let bytes: &[u8] = match event {
            InputEvent::Text(text) => text.as_bytes(),
            InputEvent::Key(key) if *key == self.submit_key => b"\n",
            InputEvent::Key(key) => {
                return Err(Error::Input(format!(
                    "console cannot deliver key '{}'",
                    key
                )))
            }
            InputEvent::Click(at) => {
                return Err(Error::Input(format!("console cannot click at {}", at)))
            }
        };

        self.console.write_all(bytes).await?;
        self.console.flush().await?;
        Ok(())
    }
}

/// Paced input with named-control lookup
pub struct Injector {
    backend: Box<dyn InputBackend>,
    locator: Box<dyn ControlLocator>,
    settle: Duration,
    cancel: CancellationToken,
    focus_chord: Option<String>,
    submit_key: String,
}

impl Injector {
    pub fn new(
        backend: Box<dyn InputBackend>,
        locator: Box<dyn ControlLocator>,
        settle: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            locator,
            settle,
            cancel,
            focus_chord: None,
            submit_key: "Return".to_string(),
        }
    }

    /// Chord pressed to bring the target to the foreground
    pub fn with_focus_chord(mut self, chord: impl Into<String>) -> Self {
        self.focus_chord = Some(chord.into());
        self
    }

    pub fn with_submit_key(mut self, key: impl Into<String>) -> Self {
        self.submit_key = key.into();
        self
    }

    /// Locate a named control and click it. A control that cannot be found
    /// aborts the run; nothing is clicked blind.
    pub async fn click_control(&mut self, control: &str) -> Result<()> {
        let at = self.locator.locate(control)?;
        debug!("Clicking {} at {}", control, at);
        self.send(InputEvent::Click(at)).await
    }

    pub async fn press(&mut self, key: &str) -> Result<()> {
        self.send(InputEvent::Key(key.to_string())).await
    }

    pub async fn type_text(&mut self, text: &str) -> Result<()> {
        self.send(InputEvent::Text(text.to_string())).await
    }

    /// Type a console command and acknowledge it
    pub async fn submit(&mut self, command: &str) -> Result<()> {
        self.type_text(command).await?;
        let key = self.submit_key.clone();
        self.press(&key).await
    }

    /// Switch focus to the target when a focus chord is configured
    pub async fn focus_target(&mut self) -> Result<()> {
        match self.focus_chord.clone() {
            Some(chord) => self.press(&chord).await,
            None => Ok(()),
        }
    }

    async fn send(&mut self, event: InputEvent) -> Result<()> {
        debug!("Injecting {}", event);
        self.backend.send(&event).await?;
        pause(self.settle, &self.cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FixedLayout;
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncReadExt;

    struct Recorder(Arc<Mutex<Vec<InputEvent>>>);

    #[async_trait]
    impl InputBackend for Recorder {
        async fn send(&mut self, event: &InputEvent) -> Result<()> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn injector(events: Arc<Mutex<Vec<InputEvent>>>) -> Injector {
        let layout = FixedLayout::new([("load".to_string(), ScreenPoint::new(10, 20))]);
        Injector::new(
            Box::new(Recorder(events)),
            Box::new(layout),
            Duration::ZERO,
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_submit_types_then_acknowledges() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut input = injector(events.clone()).with_submit_key("KP_Enter");

        input.submit("echo(getBrickCount());").await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                InputEvent::Text("echo(getBrickCount());".to_string()),
                InputEvent::Key("KP_Enter".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_control_sends_nothing() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut input = injector(events.clone());

        let err = input.click_control("start_game").await.unwrap_err();
        assert!(matches!(err, Error::ControlNotFound(_)));
        assert!(events.lock().unwrap().is_empty());

        input.click_control("load").await.unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![InputEvent::Click(ScreenPoint::new(10, 20))]
        );
    }

    #[tokio::test]
    async fn test_focus_without_chord_is_noop() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut input = injector(events.clone());
        input.focus_target().await.unwrap();
        assert!(events.lock().unwrap().is_empty());

        let mut input = injector(events.clone()).with_focus_chord("alt+Tab");
        input.focus_target().await.unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![InputEvent::Key("alt+Tab".to_string())]
        );
    }

    #[tokio::test]
    async fn test_console_writes_command_lines() {
        let (tx, mut rx) = tokio::io::duplex(256);
        let mut console = ConsoleBackend::new(tx, "Return");

        console
            .send(&InputEvent::Text("echo(getBrickCount());".to_string()))
            .await
            .unwrap();
        console
            .send(&InputEvent::Key("Return".to_string()))
            .await
            .unwrap();
        drop(console);

        let mut written = String::new();
        rx.read_to_string(&mut written).await.unwrap();
        assert_eq!(written, "echo(getBrickCount());\n");
    }

    #[tokio::test]
    async fn test_console_rejects_pointer_input() {
        let (tx, _rx) = tokio::io::duplex(64);
        let mut console = ConsoleBackend::new(tx, "Return");

        assert!(console
            .send(&InputEvent::Click(ScreenPoint::new(1, 1)))
            .await
            .is_err());
        assert!(console
            .send(&InputEvent::Key("Escape".to_string()))
            .await
            .is_err());
    }

    #[test]
    fn test_desktop_tool_arguments() {
        assert_eq!(
            DesktopBackend::args(&InputEvent::Click(ScreenPoint::new(697, 502))),
            vec!["mousemove", "--sync", "697", "502", "click", "1"]
        );
        assert_eq!(
            DesktopBackend::args(&InputEvent::Text("-x".to_string())),
            vec!["type", "--", "-x"]
        );
    }

    #[tokio::test]
    async fn test_missing_desktop_tool_is_input_error() {
        let mut desktop = DesktopBackend::new("/nonexistent/holecheck-input-tool");
        let err = desktop
            .send(&InputEvent::Key("Escape".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }
}
