//! Idempotent result-artifact management
//!
//! Each task owns at most one artifact per job kind. Re-initializing a
//! task finds and returns the existing artifact unchanged, which is
//! what makes an interrupted pipeline safe to resume: the directory is
//! ensured and cleaned on first creation only, and merged outputs from
//! a prior run are never discarded by a re-init.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use config::{Artifact, BatchConfig, BatchError, Task, ARTIFACT_RECORD, SESSION_PARAM};

/// find or create the task's artifact for one job kind
///
/// A job without a task yields `Ok(None)`: the caller must treat this
/// as nothing to do, not as an error. This mirrors the defensive check
/// the pipeline engine relies on when it probes jobs that were never
/// attached to a task.
pub fn get_or_create(
    task: Option<&Arc<Task>>,
    kind: &str,
    tags: &[(&'static str, &'static str)],
    cfg: &BatchConfig,
) -> Result<Option<Artifact>, BatchError> {
    let task = match task {
        Some(task) => task,
        None => {
            log::warn!("job has no task, skipping artifact creation");
            return Ok(None);
        }
    };

    if let Some(existing) = task.artifacts.get(kind) {
        log::info!(
            "INFO: reusing artifact for kind {} at {}",
            kind,
            existing.path.display()
        );
        return Ok(Some(existing.clone()));
    }

    let dir = target_dir(task, kind, cfg);

    let artifact = Artifact {
        kind: kind.to_owned(),
        owner: task.owner.clone(),
        path: dir.clone(),
        hidden: false,
        tags: tags
            .iter()
            .map(|(tag, fname)| ((*tag).to_owned(), (*fname).to_owned()))
            .collect(),
    };

    std::fs::create_dir_all(&dir)?;
    clean_dir(&dir)?;
    persist(&artifact)?;

    task.artifacts.insert(kind.to_owned(), artifact.clone());

    log::info!("INFO: created artifact for kind {} at {}", kind, dir.display());

    Ok(Some(artifact))
}

/// where the artifact directory lives
///
/// A task nested inside a larger pipeline nests under its parent's
/// artifact directory, plus the pipeline session name when the task
/// carries one; a standalone task lands under the configured results
/// directory.
fn target_dir(task: &Task, kind: &str, cfg: &BatchConfig) -> PathBuf {
    let dirname = format!("{}_{}", kind, task.id);

    let base = match &task.parent {
        Some(parent) => parent_artifact_dir(parent).unwrap_or_else(|| cfg.results_dir.clone()),
        None => cfg.results_dir.clone(),
    };

    match task.param(SESSION_PARAM) {
        Some(session) if task.parent.is_some() => base.join(session).join(dirname),
        _ => base.join(dirname),
    }
}

/// the parent task's artifact directory, picked deterministically when
/// the parent owns several artifacts
fn parent_artifact_dir(parent: &Task) -> Option<PathBuf> {
    let mut kinds: Vec<String> = parent.artifacts.iter().map(|e| e.key().clone()).collect();
    kinds.sort_unstable();

    kinds
        .first()
        .and_then(|kind| parent.artifacts.get(kind))
        .map(|artifact| artifact.path.clone())
}

/// empty the artifact directory without removing it
fn clean_dir(dir: &PathBuf) -> Result<(), BatchError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// write the artifact record inside its own directory
fn persist(artifact: &Artifact) -> Result<(), BatchError> {
    let record = artifact.path.join(ARTIFACT_RECORD);
    let writer = BufWriter::new(File::create(record)?);

    serde_json::to_writer_pretty(writer, artifact)
        .map_err(|e| BatchError::InvalidInput(format!("cannot persist artifact record: {}", e)))?;

    Ok(())
}
