// src/system/launcher.rs

//! Maps a chosen executor to an external invocation (a `docker run` of the
//! harness image, or a local `./mvnw exec:java`), spawns it with stdout and
//! stderr redirected into a per-executor log file, and waits for it —
//! optionally tailing that log from a second thread while it runs.

use crate::CancellationToken;
use crate::constants::{LOG_EXCERPT_LINES, MAVEN_WRAPPER};
use crate::core::properties::{self, PropertiesError};
use crate::core::session::{ActiveRun, AlreadyRunningError, RunSession};
use crate::core::workspace::Workspace;
use crate::models::{CatalogCubePair, Executor, FileAssignments, LaunchRuntime, Settings};
use crate::system::tailer::{self, BoundedLineBuffer, ConsoleSink, LineSink};
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// How often the wait loop polls the child and the cancellation flag.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error(transparent)]
    AlreadyRunning(#[from] AlreadyRunningError),
    #[error(transparent)]
    Properties(#[from] PropertiesError),
    #[error("harness runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("could not spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("executor '{executor}' exited with code {code}; see {}", .log_path.display())]
    ExecutionFailed {
        executor: String,
        code: i32,
        log_path: PathBuf,
        excerpt: Vec<String>,
    },
    #[error("run was cancelled by the operator")]
    Cancelled,
    #[error("filesystem error during launch: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully built external invocation, separated from spawning so it can be
/// inspected and tested without a runtime present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    /// The command as the operator would type it, for display.
    pub fn rendered(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Builds and runs harness invocations against one settings document.
#[derive(Debug)]
pub struct Launcher<'a> {
    settings: &'a Settings,
    workspace: &'a Workspace,
    settings_path: &'a Path,
}

impl<'a> Launcher<'a> {
    pub fn new(settings: &'a Settings, workspace: &'a Workspace, settings_path: &'a Path) -> Self {
        Self {
            settings,
            workspace,
            settings_path,
        }
    }

    /// Runs one executor to completion: regenerates the properties document,
    /// checks the runtime, spawns the process and waits for it, tailing the
    /// log to stdout when `follow` is set.
    pub fn run(
        &self,
        session: &mut RunSession,
        executor: Executor,
        pairs: &[CatalogCubePair],
        assignments: Option<&FileAssignments>,
        follow: bool,
        cancel: &CancellationToken,
    ) -> Result<(), LaunchError> {
        // Precondition first: no side effects while another run is tracked.
        if let Some(active) = session.active_executor() {
            return Err(AlreadyRunningError(active.to_string()).into());
        }

        properties::write(
            &self.workspace.properties_path(),
            pairs,
            self.settings,
            assignments,
        )?;
        self.ensure_runtime()?;

        let invocation = self.build_invocation(executor)?;
        log::info!("launching: {}", invocation.rendered());

        let log_path = self.workspace.run_log_path(executor);
        let log_file = std::fs::File::create(&log_path)?;
        let child = StdCommand::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.envs.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file.try_clone()?))
            .stderr(Stdio::from(log_file))
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                command: invocation.rendered(),
                source,
            })?;
        session.attach(ActiveRun::new(executor, child, log_path.clone()))?;

        // The tailer runs on its own thread and detaches (flag cleared, thread
        // joined) before anyone rewrites the log path.
        let tail_flag = Arc::new(AtomicBool::new(true));
        let tail_handle = follow.then(|| {
            let flag = Arc::clone(&tail_flag);
            let path = log_path.clone();
            let poll = Duration::from_millis(self.settings.tail_poll_interval_ms);
            let scrollback = self.settings.tail_buffer_lines;
            std::thread::spawn(move || {
                let mut sink = ConsoleSink::new(scrollback);
                if let Err(e) = tailer::tail(&path, &mut sink, &flag, poll) {
                    log::warn!("log tailer stopped with an error: {e}");
                }
            })
        });

        let wait_result = wait_for_exit(session, cancel);
        tail_flag.store(false, Ordering::SeqCst);
        if let Some(handle) = tail_handle {
            let _ = handle.join();
        }

        let code = wait_result?;
        if code == 0 {
            Ok(())
        } else {
            Err(LaunchError::ExecutionFailed {
                executor: executor.to_string(),
                code,
                excerpt: read_log_excerpt(&log_path, LOG_EXCERPT_LINES),
                log_path,
            })
        }
    }

    /// Checks that the chosen runtime can actually run the harness, pulling
    /// the container image when it is missing locally.
    fn ensure_runtime(&self) -> Result<(), LaunchError> {
        match self.settings.runtime {
            LaunchRuntime::Docker => {
                let image = self.settings.docker_image();
                let inspect = StdCommand::new("docker")
                    .args(["image", "inspect", image])
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status();
                match inspect {
                    Ok(status) if status.success() => Ok(()),
                    Ok(_) => {
                        println!("Pulling harness image '{image}'...");
                        let pull = StdCommand::new("docker")
                            .args(["pull", image])
                            .status()
                            .map_err(|e| {
                                LaunchError::RuntimeUnavailable(format!(
                                    "docker is not available: {e}"
                                ))
                            })?;
                        if pull.success() {
                            Ok(())
                        } else {
                            Err(LaunchError::RuntimeUnavailable(format!(
                                "failed to pull image '{image}'"
                            )))
                        }
                    }
                    Err(e) => Err(LaunchError::RuntimeUnavailable(format!(
                        "docker is not available: {e}"
                    ))),
                }
            }
            LaunchRuntime::Maven => {
                if Path::new(MAVEN_WRAPPER).exists() {
                    Ok(())
                } else {
                    Err(LaunchError::RuntimeUnavailable(format!(
                        "maven wrapper '{MAVEN_WRAPPER}' not found in the current directory"
                    )))
                }
            }
        }
    }

    /// Builds the argument/environment vector for one executor. Proxy
    /// variables are injected only for the two warehouse-archive executors,
    /// and only when a proxy is configured.
    pub fn build_invocation(&self, executor: Executor) -> Result<Invocation, std::io::Error> {
        let proxy = executor
            .is_archive()
            .then(|| self.settings.proxy_url())
            .flatten();

        match self.settings.runtime {
            LaunchRuntime::Docker => {
                let cwd = std::env::current_dir()?;
                let root = absolute(&cwd, self.workspace.root());
                let settings_path = absolute(&cwd, self.settings_path);

                let mut args = vec![
                    "run".into(),
                    "--rm".into(),
                    "--platform".into(),
                    "linux/amd64".into(),
                    "-v".into(),
                    format!("{}:/app/working_dir", root.display()),
                    "-v".into(),
                    format!("{}:/app/config.json", settings_path.display()),
                ];

                // A local trust store, when present, is handed to the JVM so
                // the harness can verify the deployment's certificates.
                let cacerts = cwd.join("cacerts");
                if cacerts.is_file() {
                    args.push("-v".into());
                    args.push(format!("{}:/app/cacerts", cacerts.display()));
                    args.push("-e".into());
                    args.push(
                        "JAVA_TOOL_OPTIONS=-Djavax.net.ssl.trustStore=/app/cacerts \
                         -Djavax.net.ssl.trustStorePassword=changeit"
                            .into(),
                    );
                }

                if let Some(url) = &proxy {
                    for var in ["HTTP_PROXY", "HTTPS_PROXY", "http_proxy", "https_proxy"] {
                        args.push("-e".into());
                        args.push(format!("{var}={url}"));
                    }
                }

                args.push(self.settings.docker_image().to_string());
                args.push(executor.name().to_string());
                args.push("working_dir/config/systems.properties".into());

                Ok(Invocation {
                    program: "docker".into(),
                    args,
                    envs: Vec::new(),
                })
            }
            LaunchRuntime::Maven => {
                let args = vec![
                    "exec:java".into(),
                    format!("-Dexec.mainClass={}", executor.harness_class()),
                    "-Dexec.classpathScope=test".into(),
                    "-Dexec.includeProjectDependencies=true".into(),
                    "-Dexec.includePluginDependencies=true".into(),
                ];
                let envs = proxy
                    .map(|url| {
                        ["HTTP_PROXY", "HTTPS_PROXY", "http_proxy", "https_proxy"]
                            .into_iter()
                            .map(|var| (var.to_string(), url.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Invocation {
                    program: MAVEN_WRAPPER.into(),
                    args,
                    envs,
                })
            }
        }
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Polls the tracked child until it exits, honoring cooperative cancellation
/// by killing the process. Returns the exit code (-1 when the process was
/// terminated by a signal).
fn wait_for_exit(session: &mut RunSession, cancel: &CancellationToken) -> Result<i32, LaunchError> {
    loop {
        let Some(run) = session.current_mut() else {
            return Err(LaunchError::Cancelled);
        };
        match run.child.try_wait()? {
            Some(status) => {
                session.detach();
                return Ok(status.code().unwrap_or(-1));
            }
            None => {
                if cancel.load(Ordering::SeqCst) {
                    log::debug!("cancellation requested, killing the harness process");
                    session.terminate_immediately()?;
                    return Err(LaunchError::Cancelled);
                }
                std::thread::sleep(WAIT_POLL_INTERVAL);
            }
        }
    }
}

/// The last `max_lines` lines of the run log, for immediate triage.
fn read_log_excerpt(path: &Path, max_lines: usize) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut buffer = BoundedLineBuffer::new(max_lines);
    for line in content.lines() {
        buffer.push_line(line);
    }
    buffer.lines().map(ToString::to_string).collect()
}
