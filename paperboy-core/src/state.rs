//! Run-state persistence and search-window computation.
//!
//! The state file records where the previous successful run stopped, so
//! consecutive daily runs cover contiguous time with no gap and no overlap.
//! Loading is lenient (a corrupt file is treated as absent); saving is
//! atomic (tmp + rename) and happens exactly once, at the end of a
//! successful non-dry run.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::StateError;
use crate::types::Window;

/// Persisted record of the last completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// End of the last run's window; the next run starts here.
    pub last_run_end: DateTime<Utc>,
    /// Papers fetched by the last run (informational).
    #[serde(default)]
    pub last_run_papers: usize,
    /// Industry papers found by the last run (informational).
    #[serde(default)]
    pub last_run_industry: usize,
}

/// Load run state from `path`. A missing, unreadable, or corrupt file is
/// treated as "no previous run" so a bad state file can never wedge the bot.
pub fn load_state(path: &Path) -> Option<RunState> {
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str::<RunState>(&json) {
            Ok(state) => {
                info!(last_run_end = %state.last_run_end, "Loaded run state");
                Some(state)
            }
            Err(e) => {
                warn!("Failed to parse state file: {}, starting fresh", e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read state file: {}, starting fresh", e);
            None
        }
    }
}

/// Persist run state to `path` atomically.
pub fn save_state(state: &RunState, path: &Path) -> Result<(), StateError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| StateError::WriteFailed {
            path: path.to_path_buf(),
            message: format!("Failed to create state directory: {}", e),
        })?;
    }

    let json = serde_json::to_string_pretty(state).map_err(|e| StateError::WriteFailed {
        path: path.to_path_buf(),
        message: format!("Failed to serialize state: {}", e),
    })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| StateError::WriteFailed {
        path: path.to_path_buf(),
        message: format!("Failed to write state: {}", e),
    })?;
    std::fs::rename(&tmp, path).map_err(|e| StateError::WriteFailed {
        path: path.to_path_buf(),
        message: format!("Failed to rename state file: {}", e),
    })?;

    info!(path = %path.display(), "Run state saved");
    Ok(())
}

/// Compute the search window for this run.
///
/// Priority:
/// 1. An explicit lookback override: `[now - days, now)`, ignoring stored
///    state entirely.
/// 2. Stored state: `[last_run_end, now)` — exact continuity with the
///    previous run, no gap and no overlap.
/// 3. First run: `[now - default_lookback_days, now)`.
pub fn compute_window(
    state: Option<&RunState>,
    override_lookback_days: Option<i64>,
    default_lookback_days: i64,
    now: DateTime<Utc>,
) -> Window {
    if let Some(days) = override_lookback_days {
        let start = now - Duration::days(days);
        info!(days, start = %start, "Using explicit lookback override");
        return Window::new(start, now);
    }

    if let Some(state) = state {
        info!(start = %state.last_run_end, "Resuming from last run");
        return Window::new(state.last_run_end, now);
    }

    let start = now - Duration::days(default_lookback_days);
    info!(days = default_lookback_days, start = %start, "No previous run found, using default lookback");
    Window::new(start, now)
}
