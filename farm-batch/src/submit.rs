//! Job array submission boundary
//!
//! The scheduler client is an external collaborator behind the
//! [`Scheduler`] trait: one blocking call that either accepts the
//! array or errors, surfaced unchanged. The submitter's own job is the
//! precondition: the array size must equal the number of configuration
//! files physically present in the working directory, re-counted here
//! rather than trusted from memory, because a prior partial run can
//! leave extra numbered files behind.

use std::path::Path;

use config::{BatchError, QueueSpec};

use crate::configfile::count_config_files;

/// everything the external scheduler needs for one array submission
#[derive(Debug)]
pub struct ArrayRequest<'a> {
    /// job-kind name, used by schedulers that label arrays
    pub name: &'a str,
    /// the shared script body
    pub script: &'a str,
    /// working directory: the configuration-file directory
    pub workdir: &'a Path,
    pub queue: &'a QueueSpec,
    /// array size; task K reads `<config_prefix>K` by convention
    pub tasks: usize,
    pub config_prefix: &'a str,
}

/// accepted submission, as reported by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub tasks: usize,
}

/// external scheduler client
///
/// Implementations submit one job array of `request.tasks` independent,
/// identically-scripted tasks and return without polling; completion
/// detection belongs to the caller.
pub trait Scheduler {
    fn submit_array(&self, request: &ArrayRequest<'_>) -> Result<JobHandle, BatchError>;
}

/// submit one job array after re-validating the configuration file count
pub fn submit<S: Scheduler + ?Sized>(
    scheduler: &S,
    request: &ArrayRequest<'_>,
) -> Result<JobHandle, BatchError> {
    if request.tasks == 0 {
        return Err(BatchError::SubmissionFailure(
            "refusing to submit an empty job array".to_owned(),
        ));
    }

    let on_disk = count_config_files(request.workdir, request.config_prefix)?;
    if on_disk != request.tasks {
        return Err(BatchError::SubmissionFailure(format!(
            "configuration file count mismatch in {}: planned {} tasks, found {} files with prefix {}",
            request.workdir.display(),
            request.tasks,
            on_disk,
            request.config_prefix
        )));
    }

    let handle = scheduler.submit_array(request)?;

    log::info!(
        "INFO: submitted {} as array {} with {} tasks on queue {}",
        request.name,
        handle.id,
        handle.tasks,
        request.queue.name
    );

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingScheduler {
        seen: Mutex<Vec<(String, usize, String)>>,
    }

    impl RecordingScheduler {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Scheduler for RecordingScheduler {
        fn submit_array(&self, request: &ArrayRequest<'_>) -> Result<JobHandle, BatchError> {
            self.seen.lock().unwrap().push((
                request.name.to_owned(),
                request.tasks,
                request.queue.name.clone(),
            ));
            Ok(JobHandle {
                id: "array_7".to_owned(),
                tasks: request.tasks,
            })
        }
    }

    struct RejectingScheduler;

    impl Scheduler for RejectingScheduler {
        fn submit_array(&self, _request: &ArrayRequest<'_>) -> Result<JobHandle, BatchError> {
            Err(BatchError::SubmissionFailure("queue is closed".to_owned()))
        }
    }

    fn seed_configs(dir: &Path, prefix: &str, n: usize) {
        for i in 1..=n {
            std::fs::write(dir.join(format!("{}{}", prefix, i)), "in\nout\n").unwrap();
        }
    }

    #[test]
    fn test_submit_passes_recount() {
        let dir = tempfile::tempdir().unwrap();
        seed_configs(dir.path(), "trnascan_config_", 3);

        let queue = QueueSpec::new("medium");
        let scheduler = RecordingScheduler::new();

        let handle = submit(
            &scheduler,
            &ArrayRequest {
                name: "trnascan",
                script: "read input\nread output\n/sw/tRNAscan-SE -o \"$output\" \"$input\"\n",
                workdir: dir.path(),
                queue: &queue,
                tasks: 3,
                config_prefix: "trnascan_config_",
            },
        )
        .unwrap();

        assert_eq!(handle.tasks, 3);
        let seen = scheduler.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("trnascan".to_owned(), 3, "medium".to_owned())]);
    }

    #[test]
    fn test_submit_rejects_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        // a leftover fourth file from a previous partial run
        seed_configs(dir.path(), "trnascan_config_", 4);

        let queue = QueueSpec::new("medium");
        let scheduler = RecordingScheduler::new();

        let err = submit(
            &scheduler,
            &ArrayRequest {
                name: "trnascan",
                script: "read input\n",
                workdir: dir.path(),
                queue: &queue,
                tasks: 3,
                config_prefix: "trnascan_config_",
            },
        )
        .unwrap_err();

        assert!(matches!(err, BatchError::SubmissionFailure(_)));
        assert!(scheduler.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_submit_rejects_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let queue = QueueSpec::new("short");

        let err = submit(
            &RecordingScheduler::new(),
            &ArrayRequest {
                name: "blast",
                script: "read input\n",
                workdir: dir.path(),
                queue: &queue,
                tasks: 0,
                config_prefix: "blast_config_",
            },
        )
        .unwrap_err();

        assert!(matches!(err, BatchError::SubmissionFailure(_)));
    }

    #[test]
    fn test_scheduler_error_surfaces_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        seed_configs(dir.path(), "blast_config_", 1);

        let queue = QueueSpec::new("short");
        let err = submit(
            &RejectingScheduler,
            &ArrayRequest {
                name: "blast",
                script: "read input\n",
                workdir: dir.path(),
                queue: &queue,
                tasks: 1,
                config_prefix: "blast_config_",
            },
        )
        .unwrap_err();

        match err {
            BatchError::SubmissionFailure(msg) => assert_eq!(msg, "queue is closed"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
