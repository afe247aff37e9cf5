// src/core/workspace.rs

// The on-disk layout everything else writes into:
// working_dir/{config,run_logs,control,ingest}.

use crate::constants::{
    BASE_QUERY_FILENAME, CONFIG_DIR, CONTROL_DIR, INGEST_DIR, PROPERTIES_FILENAME, RUN_LOGS_DIR,
    WORKING_DIR,
};
use crate::models::Executor;
use std::fs;
use std::path::{Path, PathBuf};

/// The seeded extraction query, materialized once so operators can tune it
/// before running the query-extract executors.
const BASE_QUERY_SQL: &str = "\
SELECT
    q.service,
    q.query_language,
    q.query_text AS inbound_text,
    MAX(s.subquery_text) AS outbound_text,
    p.cube_name,
    p.project_id,
    CASE WHEN MAX(s.subquery_text) LIKE '%as_agg_%' THEN TRUE ELSE FALSE END AS used_agg,
    COUNT(*)                             AS num_times,
    AVG(r.finished - p.planning_started) AS elapsed_time_in_seconds,
    AVG(r.result_size)                   AS avg_result_size
FROM
    atscale.queries q
INNER JOIN
    atscale.query_results r ON q.query_id = r.query_id
INNER JOIN
    atscale.queries_planned p ON q.query_id = p.query_id
INNER JOIN
    atscale.subqueries s ON q.query_id = s.query_id
WHERE
    q.query_language = ?
    AND p.planning_started > CURRENT_TIMESTAMP - INTERVAL '60 day'
    AND p.cube_name = ?
    AND q.service = 'user-query'
    AND r.succeeded = TRUE
    AND LENGTH(q.query_text) > 100
    AND q.query_text NOT LIKE '/* Virtual query to get the members of a level */%'
    AND q.query_text NOT LIKE '-- statement does not return rows%'
GROUP BY
    1, 2, 3, 5, 6
ORDER BY 3;
";

/// Path helper over the working directory shared with the external harness.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The conventional `./working_dir` location, relative to the process
    /// working directory so the container bind mounts line up.
    pub fn default_location() -> Self {
        Self::new(WORKING_DIR)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR)
    }

    pub fn run_logs_dir(&self) -> PathBuf {
        self.root.join(RUN_LOGS_DIR)
    }

    pub fn control_dir(&self) -> PathBuf {
        self.root.join(CONTROL_DIR)
    }

    pub fn ingest_dir(&self) -> PathBuf {
        self.root.join(INGEST_DIR)
    }

    pub fn properties_path(&self) -> PathBuf {
        self.config_dir().join(PROPERTIES_FILENAME)
    }

    pub fn base_query_path(&self) -> PathBuf {
        self.config_dir().join(BASE_QUERY_FILENAME)
    }

    pub fn run_log_path(&self, executor: Executor) -> PathBuf {
        self.run_logs_dir().join(format!("{}.log", executor.name()))
    }

    /// Creates the full directory layout. Safe to call repeatedly.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [
            self.config_dir(),
            self.run_logs_dir(),
            self.control_dir(),
            self.ingest_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Seeds `config/base_query.sql` when absent. Returns whether the file
    /// was created; an existing file is never overwritten.
    pub fn write_base_query_file(&self) -> std::io::Result<bool> {
        let path = self.base_query_path();
        if path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(self.config_dir())?;
        fs::write(&path, BASE_QUERY_SQL)?;
        Ok(true)
    }

    /// Run logs left over from earlier sessions.
    pub fn existing_run_logs(&self) -> std::io::Result<Vec<PathBuf>> {
        let dir = self.run_logs_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut logs = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
                logs.push(path);
            }
        }
        logs.sort();
        Ok(logs)
    }

    /// Deletes every `*.log` under the run-logs dir, returning the count.
    /// Files that fail to delete are logged and skipped.
    pub fn clean_run_logs(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for path in self.existing_run_logs()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("could not delete '{}': {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_creates_full_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::new(dir.path().join("working_dir"));
        workspace.ensure().expect("ensure should succeed");
        assert!(workspace.config_dir().is_dir());
        assert!(workspace.run_logs_dir().is_dir());
        assert!(workspace.control_dir().is_dir());
        assert!(workspace.ingest_dir().is_dir());
        // Idempotent.
        workspace.ensure().expect("second ensure should succeed");
    }

    #[test]
    fn base_query_seeded_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::new(dir.path().join("working_dir"));
        workspace.ensure().expect("ensure should succeed");
        assert!(workspace.write_base_query_file().expect("first write"));
        fs::write(workspace.base_query_path(), "SELECT 1;").expect("overwrite fixture");
        assert!(!workspace.write_base_query_file().expect("second write"));
        let kept = fs::read_to_string(workspace.base_query_path()).expect("read back");
        assert_eq!(kept, "SELECT 1;");
    }

    #[test]
    fn run_log_path_uses_executor_name() {
        let workspace = Workspace::new("working_dir");
        assert_eq!(
            workspace.run_log_path(Executor::QueryExtract),
            Path::new("working_dir/run_logs/QueryExtractExecutor.log")
        );
    }

    #[test]
    fn clean_run_logs_removes_only_log_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = Workspace::new(dir.path().join("working_dir"));
        workspace.ensure().expect("ensure should succeed");
        fs::write(workspace.run_logs_dir().join("a.log"), "x").expect("fixture");
        fs::write(workspace.run_logs_dir().join("b.log"), "y").expect("fixture");
        fs::write(workspace.run_logs_dir().join("notes.txt"), "z").expect("fixture");
        assert_eq!(workspace.existing_run_logs().expect("list").len(), 2);
        assert_eq!(workspace.clean_run_logs().expect("clean"), 2);
        assert!(workspace.run_logs_dir().join("notes.txt").exists());
        assert!(workspace.existing_run_logs().expect("list").is_empty());
    }
}
