use dashmap::DashMap;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::SENTINEL;

/// error taxonomy for the batch engine
///
/// Nothing here is retried internally; every variant propagates to the
/// invoking pipeline engine, which decides whether to mark the task failed.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("missing input: {0:?}")]
    MissingInput(PathBuf),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to write configuration file {path:?}: {source}")]
    ConfigWriteFailure {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("job array submission failed: {0}")]
    SubmissionFailure(String),
    #[error("missing output for shard {shard}: {path:?}")]
    MissingOutput { shard: usize, path: PathBuf },
    #[error("merge failed: {0}")]
    MergeFailure(String),
    #[error("missing required task parameter: {0}")]
    MissingParameter(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// a unit of work tracked by the pipeline engine
///
/// Tasks are created by the caller; the engine only reads their
/// parameter map and attaches artifacts to them. A task nested inside
/// a larger pipeline carries a reference to its parent, which fixes
/// where its artifact directory lives.
#[derive(Debug, Default)]
pub struct Task {
    pub id: u64,
    pub owner: String,
    pub params: HashMap<String, String>,
    pub parent: Option<Arc<Task>>,
    pub artifacts: DashMap<String, Artifact>,
}

impl Task {
    pub fn new(id: u64, owner: &str) -> Self {
        Self {
            id,
            owner: owner.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_parent(id: u64, owner: &str, parent: Arc<Task>) -> Self {
        Self {
            id,
            owner: owner.to_owned(),
            parent: Some(parent),
            ..Default::default()
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|v| v.as_str())
    }

    pub fn set_param(&mut self, key: &str, value: &str) -> &mut Self {
        self.params.insert(key.to_owned(), value.to_owned());
        self
    }
}

/// per-parameter validation policy declared by each job kind
///
/// Required parameters abort planning when absent; lenient ones fall
/// back to the `none` sentinel, which is written into the configuration
/// file as-is and interpreted by the tool wrapper on the cluster side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Required(&'static str),
    Lenient(&'static str),
}

impl Param {
    pub fn key(&self) -> &'static str {
        match self {
            Param::Required(key) | Param::Lenient(key) => key,
        }
    }

    pub fn resolve(&self, task: &Task) -> Result<String, BatchError> {
        match self {
            Param::Required(key) => task
                .param(key)
                .map(str::to_owned)
                .ok_or_else(|| BatchError::MissingParameter((*key).to_owned())),
            Param::Lenient(key) => Ok(task.param(key).unwrap_or(SENTINEL).to_owned()),
        }
    }
}

/// directory-backed output record of exactly one task and one job kind
///
/// Tags map known output kinds to canonical file names inside the
/// artifact directory; collaborators pre-register the tags they expect
/// to read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: String,
    pub owner: String,
    pub path: PathBuf,
    pub hidden: bool,
    pub tags: HashMap<String, String>,
}

impl Artifact {
    pub fn file_path_by_tag(&self, tag: &str) -> Option<PathBuf> {
        self.tags.get(tag).map(|fname| self.path.join(fname))
    }
}

/// one bounded slice of a larger input, processed by one array task
///
/// The index is assigned once at planning time and carried unchanged
/// through the configuration file name, the expected output names and
/// the final merge order.
#[derive(Debug, Clone)]
pub struct Shard {
    pub index: usize,
    pub input: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub params: Vec<(String, String)>,
}

impl Shard {
    pub fn new(index: usize, input: PathBuf) -> Self {
        Self {
            index,
            input,
            outputs: Vec::new(),
            params: Vec::new(),
        }
    }
}

/// a byte region of the input covering a whole number of records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRegion {
    pub start: usize,
    pub end: usize,
}

/// scheduler resource spec for one job array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSpec {
    pub name: String,
    pub resources: Option<String>,
}

impl QueueSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            resources: None,
        }
    }

    pub fn with_resources(name: &str, resources: &str) -> Self {
        Self {
            name: name.to_owned(),
            resources: Some(resources.to_owned()),
        }
    }
}

/// queue names available on the farm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueTable {
    pub short: String,
    pub medium: String,
    pub long: String,
}

impl Default for QueueTable {
    fn default() -> Self {
        Self {
            short: "short".to_owned(),
            medium: "medium".to_owned(),
            long: "long".to_owned(),
        }
    }
}

/// absolute paths of the external tool binaries on the cluster nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPaths {
    pub repeatmasker: PathBuf,
    pub blast: PathBuf,
    pub augustus: PathBuf,
    pub trnascan: PathBuf,
    pub exonerate: PathBuf,
    pub exonerate2gff: PathBuf,
    pub hmmscan: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            repeatmasker: PathBuf::from("/usr/local/bin/RepeatMasker"),
            blast: PathBuf::from("/usr/local/bin/blastall"),
            augustus: PathBuf::from("/usr/local/bin/augustus"),
            trnascan: PathBuf::from("/usr/local/bin/tRNAscan-SE"),
            exonerate: PathBuf::from("/usr/local/bin/exonerate"),
            exonerate2gff: PathBuf::from("/usr/local/bin/exonerate2gff"),
            hmmscan: PathBuf::from("/usr/local/bin/hmmscan"),
        }
    }
}

/// explicit configuration injected into the engine and each plugin
///
/// Loaded by the caller from its own configuration store; each plugin
/// documents the entries it reads in its module docs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub results_dir: PathBuf,
    pub queues: QueueTable,
    pub tools: ToolPaths,
    pub records_per_shard: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            queues: QueueTable::default(),
            tools: ToolPaths::default(),
            records_per_shard: crate::DEFAULT_RECORDS_PER_SHARD,
        }
    }
}

impl BatchConfig {
    pub fn with_results_dir(results_dir: &Path) -> Self {
        Self {
            results_dir: results_dir.to_path_buf(),
            ..Default::default()
        }
    }
}
