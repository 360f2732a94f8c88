//! Spotlight metadata source backed by the `mdfind` command.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::{Result, SearchError};
use crate::filter::{spotlight, CompositeFilter};
use crate::hierarchy::TypeHierarchy;
use crate::types::ResultRecord;

use super::MetadataSource;

pub const DEFAULT_MDFIND_TIMEOUT: Duration = Duration::from_secs(3);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `mdfind -onlyin <scope>... <query>` and stats each returned path.
#[derive(Debug, Clone)]
pub struct MdfindSource {
    program: OsString,
    timeout: Duration,
    hierarchy: Arc<TypeHierarchy>,
}

impl Default for MdfindSource {
    fn default() -> Self {
        Self::new(DEFAULT_MDFIND_TIMEOUT)
    }
}

impl MdfindSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: OsString::from("mdfind"),
            timeout,
            hierarchy: TypeHierarchy::shared(),
        }
    }

    /// Overrides the executable, e.g. to point at a wrapper script.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Hierarchy used to derive type trees from result extensions.
    pub fn with_hierarchy(mut self, hierarchy: Arc<TypeHierarchy>) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    fn command(&self, query: &str, scopes: &[PathBuf]) -> Command {
        let mut command = Command::new(&self.program);
        for scope in scopes {
            command.arg("-onlyin").arg(scope);
        }
        command
            .arg(query)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        command
    }

    /// Waits for the child up to the timeout; kills it on expiry.
    fn run(&self, mut child: Child) -> Result<String> {
        let mut stdout = child.stdout.take().ok_or_else(|| {
            SearchError::BackendUnavailable("mdfind stdout was not captured".to_string())
        })?;
        let reader = thread::spawn(move || {
            let mut output = String::new();
            stdout.read_to_string(&mut output).map(|_| output)
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                log::warn!("mdfind timed out timeout={:?}", self.timeout);
                return Err(SearchError::BackendUnavailable(format!(
                    "mdfind did not finish within {:?}",
                    self.timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = reader
            .join()
            .map_err(|_| SearchError::BackendUnavailable("mdfind reader panicked".to_string()))??;
        if !status.success() {
            return Err(SearchError::BackendUnavailable(format!(
                "mdfind exited with {status}"
            )));
        }
        Ok(output)
    }

    fn record_for(&self, path: &str) -> ResultRecord {
        let mut record = ResultRecord::from_path(path);
        if let Some(extension) = record.extension() {
            record.content_type_tree = self.hierarchy.tree_for_extension(&extension);
        }
        match fs::metadata(path) {
            Ok(metadata) => {
                record.modified_at = metadata.modified().ok().map(DateTime::<Utc>::from);
                record.created_at = metadata.created().ok().map(DateTime::<Utc>::from);
                record
                    .metadata
                    .insert("size".to_string(), metadata.len().to_string());
            }
            Err(error) => log::debug!("failed to stat mdfind result path={path} error={error}"),
        }
        record
    }
}

impl MetadataSource for MdfindSource {
    fn name(&self) -> &'static str {
        "mdfind"
    }

    fn query(
        &self,
        filter: &CompositeFilter,
        scopes: &[PathBuf],
        max_results: usize,
    ) -> Result<Vec<ResultRecord>> {
        let query = spotlight::render(filter);
        log::debug!("running mdfind query={query:?} scopes={}", scopes.len());

        let child = self.command(&query, scopes).spawn().map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                SearchError::BackendUnavailable(format!(
                    "{} not found",
                    self.program.to_string_lossy()
                ))
            } else {
                SearchError::Io(error)
            }
        })?;
        let output = self.run(child)?;

        let mut seen = HashSet::new();
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && seen.insert(line.to_string()))
            .take(max_results)
            .map(|path| self.record_for(path))
            .collect())
    }
}
