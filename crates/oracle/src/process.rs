//! Target process management - launching the game and tearing it down

use async_trait::async_trait;
use holecheck_common::{Error, LifecycleState, OracleConfig, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Readable output stream of a target
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Writable console of a target
pub type ConsoleStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Everything needed to start one target instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Variables set on the child only
    pub env: Vec<(String, PathBuf)>,
    pub working_dir: Option<PathBuf>,
    /// Pipe the child's stdin so console commands can be written to it
    pub console: bool,
}

impl LaunchPlan {
    /// Build the command line for the configured platform and mode
    pub fn from_config(config: &OracleConfig) -> Self {
        let target = &config.target;
        let mut args = Vec::new();
        let mut env = Vec::new();

        let program = match &target.compat {
            Some(shim) => {
                args.extend(shim.args.iter().cloned());
                args.push(target.executable.to_string_lossy().to_string());
                env.extend(shim.env().into_iter().map(|(k, v)| (k.to_string(), v)));
                shim.program.clone()
            }
            None => target.executable.clone(),
        };

        args.extend(config.mode.launch_args());
        args.extend(target.extra_args.iter().cloned());

        Self {
            program,
            args,
            env,
            working_dir: target.working_dir.clone(),
            console: config.mode.is_dedicated(),
        }
    }
}

/// A running target instance
pub trait TargetProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Hand out the output stream; only the first call returns it
    fn take_output(&mut self) -> Option<OutputStream>;

    /// Hand out the console; only the first call returns it
    fn take_console(&mut self) -> Option<ConsoleStream>;

    /// Ask the process to exit without waiting for it
    fn signal_terminate(&mut self) -> Result<()>;
}

/// Starts target processes
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, plan: &LaunchPlan) -> Result<Box<dyn TargetProcess>>;
}

/// Launches real OS processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

#[async_trait]
impl Launcher for SystemLauncher {
    async fn launch(&self, plan: &LaunchPlan) -> Result<Box<dyn TargetProcess>> {
        info!("Launching {}", plan.program.display());
        debug!("Target command: {} {}", plan.program.display(), plan.args.join(" "));

        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args);

        for (key, value) in &plan.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &plan.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(if plan.console {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

        let child = cmd.spawn().map_err(|e| {
            Error::Launch(format!("failed to spawn {}: {}", plan.program.display(), e))
        })?;

        if let Some(pid) = child.id() {
            info!("Target started with PID {}", pid);
        }

        Ok(Box::new(ChildProcess { child }))
    }
}

struct ChildProcess {
    child: Child,
}

impl TargetProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn take_output(&mut self) -> Option<OutputStream> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as OutputStream)
    }

    fn take_console(&mut self) -> Option<ConsoleStream> {
        self.child
            .stdin
            .take()
            .map(|stdin| Box::new(stdin) as ConsoleStream)
    }

    fn signal_terminate(&mut self) -> Result<()> {
        // Already reaped
        let Some(pid) = self.child.id() else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                return Ok(());
            }
            warn!("SIGTERM to {} failed, killing", pid);
        }

        #[cfg(not(unix))]
        {
            debug!("Killing target {}", pid);
        }

        self.child.start_kill()?;
        Ok(())
    }
}

/// Exclusive handle to the one target of a run.
///
/// The process is signalled exactly once: either by an explicit
/// [`TargetHandle::terminate`] or, failing that, when the handle drops.
pub struct TargetHandle {
    process: Box<dyn TargetProcess>,
    state: LifecycleState,
}

impl TargetHandle {
    pub fn new(process: Box<dyn TargetProcess>) -> Self {
        Self {
            process,
            state: LifecycleState::Starting,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn id(&self) -> Option<u32> {
        self.process.id()
    }

    /// Record lifecycle progress. A terminated handle stays terminated.
    pub fn advance(&mut self, next: LifecycleState) {
        if self.state == LifecycleState::Terminated {
            return;
        }
        debug!("Target {} -> {}", self.state, next);
        self.state = next;
    }

    pub fn take_output(&mut self) -> Result<OutputStream> {
        self.process
            .take_output()
            .ok_or_else(|| Error::Launch("target output is not captured".to_string()))
    }

    pub fn take_console(&mut self) -> Result<ConsoleStream> {
        self.process
            .take_console()
            .ok_or_else(|| Error::Launch("target console is not captured".to_string()))
    }

    /// Signal the target to exit. Later calls do nothing.
    pub fn terminate(&mut self) {
        if self.state == LifecycleState::Terminated {
            return;
        }
        self.state = LifecycleState::Terminated;

        match self.process.id() {
            Some(pid) => info!("Terminating target (pid: {})", pid),
            None => info!("Terminating target"),
        }
        if let Err(e) = self.process.signal_terminate() {
            warn!("Failed to terminate target: {}", e);
        }
    }
}

impl Drop for TargetHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}
