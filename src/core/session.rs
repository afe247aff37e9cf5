// src/core/session.rs

// The single run slot. Owned by the front end and passed into the launcher,
// so "one run at a time" is an explicit precondition on a value the caller
// controls rather than hidden module state.

use crate::models::Executor;
use std::path::PathBuf;
use std::process::Child;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("executor '{0}' is already running; stop it before starting another")]
pub struct AlreadyRunningError(pub String);

/// A spawned harness process and the metadata needed to report on it.
#[derive(Debug)]
pub struct ActiveRun {
    pub executor: Executor,
    pub child: Child,
    pub log_path: PathBuf,
}

impl ActiveRun {
    pub fn new(executor: Executor, child: Child, log_path: PathBuf) -> Self {
        Self {
            executor,
            child,
            log_path,
        }
    }
}

/// Tracks at most one active external process.
#[derive(Debug, Default)]
pub struct RunSession {
    current: Option<ActiveRun>,
}

impl RunSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn active_executor(&self) -> Option<Executor> {
        self.current.as_ref().map(|run| run.executor)
    }

    /// Registers a freshly spawned run. Rejected while another is tracked.
    pub fn attach(&mut self, run: ActiveRun) -> Result<(), AlreadyRunningError> {
        if let Some(active) = &self.current {
            return Err(AlreadyRunningError(active.executor.to_string()));
        }
        self.current = Some(run);
        Ok(())
    }

    pub fn current_mut(&mut self) -> Option<&mut ActiveRun> {
        self.current.as_mut()
    }

    /// Releases the slot, returning the run that occupied it.
    pub fn detach(&mut self) -> Option<ActiveRun> {
        self.current.take()
    }

    /// Kills the tracked process outright. This is forced termination, not
    /// the cooperative stop sentinel; the two are deliberately separate
    /// operations. Returns whether a process was terminated.
    pub fn terminate_immediately(&mut self) -> std::io::Result<bool> {
        match self.current.take() {
            Some(mut run) => {
                run.child.kill()?;
                run.child.wait()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    fn spawn_sleeper() -> Child {
        Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("sleep should spawn")
    }

    #[test]
    fn second_attach_is_rejected() {
        let mut session = RunSession::new();
        assert!(!session.is_active());
        session
            .attach(ActiveRun::new(
                Executor::QueryExtract,
                spawn_sleeper(),
                "a.log".into(),
            ))
            .expect("first attach should succeed");
        assert!(session.is_active());
        assert_eq!(session.active_executor(), Some(Executor::QueryExtract));

        // Reap the second child before handing it over; the rejection happens
        // before the session ever touches the process.
        let mut second_child = spawn_sleeper();
        second_child.kill().expect("kill");
        second_child.wait().expect("wait");
        let second = session.attach(ActiveRun::new(
            Executor::CustomQueryExtract,
            second_child,
            "b.log".into(),
        ));
        let err = second.expect_err("second attach must be rejected");
        assert!(err.to_string().contains("QueryExtractExecutor"));

        assert!(session.terminate_immediately().expect("terminate"));
    }

    #[test]
    fn terminate_clears_the_slot() {
        let mut session = RunSession::new();
        session
            .attach(ActiveRun::new(
                Executor::QueryExtract,
                spawn_sleeper(),
                "a.log".into(),
            ))
            .expect("attach should succeed");
        assert!(session.terminate_immediately().expect("terminate"));
        assert!(!session.is_active());
        assert!(!session.terminate_immediately().expect("second terminate"));
    }
}
