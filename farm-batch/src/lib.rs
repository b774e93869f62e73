//! Generic scatter-gather batch engine for cluster job arrays
//!
//! This crate runs one external annotation tool over one large input
//! as a scheduler job array: the input is split into shards, each
//! shard gets a numbered, line-oriented configuration file, a single
//! shared script is generated for the whole array, and the array is
//! submitted to the external scheduler in one call. Once the caller
//! has confirmed the array finished, the per-shard outputs are
//! validated and merged into the task's result artifact.
//!
//! In short, the engine is generic over a [`ToolKind`] capability
//! bundle: each job kind declares its configuration field order, its
//! command lines, its expected per-shard outputs and how those outputs
//! are merged. The engine owns everything else, including the
//! collision-free shard indexing that keeps the configuration file
//! name, the output names and the final merge order in lockstep.

pub mod artifact;
pub mod configfile;
pub mod postprocess;
pub mod script;
pub mod shard;
pub mod submit;

use anyhow::{Context, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{
    validate, Artifact, BatchConfig, BatchError, QueueSpec, Shard, Task, CONFIG_INFIX,
    MIN_RECORDS_PER_SHARD,
};

use crate::configfile::IndexAllocator;
use crate::postprocess::{MergePlan, MergedOutput};
use crate::submit::{ArrayRequest, JobHandle, Scheduler};

/// per-job-kind capability bundle
///
/// One implementation per tool; registered by name in the plugin
/// registry. Everything a job kind is allowed to vary lives here,
/// everything else is engine policy.
pub trait ToolKind: Send + Sync {
    /// job-kind name; also the stem of the shard and configuration
    /// file names
    fn name(&self) -> &'static str;

    /// artifact kind this job writes into
    fn artifact_kind(&self) -> &'static str;

    /// scheduler queue for this kind
    fn queue(&self, cfg: &BatchConfig) -> QueueSpec;

    /// configuration field names, in file order; one `read` statement
    /// per field is generated in the same order
    fn fields(&self) -> &'static [&'static str];

    /// render one shard's configuration fields, in [`fields`] order
    ///
    /// [`fields`]: ToolKind::fields
    fn shard_fields(
        &self,
        task: &Task,
        shard: &Shard,
        cfg: &BatchConfig,
    ) -> Result<Vec<String>, BatchError>;

    /// render the tool command lines with job-kind-level parameters
    /// substituted; shard values are referenced as `$field` variables
    fn command_lines(&self, task: &Task, cfg: &BatchConfig) -> Result<Vec<String>, BatchError>;

    /// the output files one shard task is expected to produce for a
    /// given shard input
    fn expected_outputs(&self, shard_input: &Path) -> Vec<PathBuf>;

    /// how the per-shard outputs become the artifact's merged outputs
    fn merge_plan(&self) -> MergePlan;

    /// artifact tags and their canonical file names, pre-registered at
    /// artifact creation
    fn tags(&self) -> &'static [(&'static str, &'static str)];

    /// shard size bound; kinds override this when the global default
    /// is too coarse for the tool's runtime profile
    fn records_per_shard(&self, cfg: &BatchConfig) -> usize {
        cfg.records_per_shard
    }
}

/// one sharded run of one job kind over one input
///
/// Lifecycle: [`init`] fixes the result artifact, [`plan`] shards the
/// input and writes the configuration files and script, [`submit`]
/// hands the array to the scheduler, and [`post_process`] merges the
/// shard outputs after the caller has confirmed array completion.
///
/// [`init`]: BatchJob::init
/// [`plan`]: BatchJob::plan
/// [`submit`]: BatchJob::submit
/// [`post_process`]: BatchJob::post_process
pub struct BatchJob<'a> {
    kind: &'a dyn ToolKind,
    cfg: &'a BatchConfig,
    task: Option<Arc<Task>>,
    workdir: PathBuf,
    artifact: Option<Artifact>,
    shards: Vec<Shard>,
    script: Option<String>,
}

impl<'a> BatchJob<'a> {
    pub fn new(
        kind: &'a dyn ToolKind,
        cfg: &'a BatchConfig,
        task: Option<Arc<Task>>,
        workdir: &Path,
    ) -> Self {
        Self {
            kind,
            cfg,
            task,
            workdir: workdir.to_path_buf(),
            artifact: None,
            shards: Vec::new(),
            script: None,
        }
    }

    /// find or create the task's result artifact
    ///
    /// `Ok(None)` means the job has no task and there is nothing to
    /// do; callers skip the remaining phases in that case.
    pub fn init(&mut self) -> Result<Option<&Artifact>> {
        self.artifact = artifact::get_or_create(
            self.task.as_ref(),
            self.kind.artifact_kind(),
            self.kind.tags(),
            self.cfg,
        )?;

        Ok(self.artifact.as_ref())
    }

    /// split the input, claim shard indices, write one configuration
    /// file per shard and generate the shared script
    ///
    /// Returns the shard count, which is also the array size.
    pub fn plan(&mut self, input: &Path) -> Result<usize> {
        let task = self.task()?.clone();

        validate(input)?;
        std::fs::create_dir_all(&self.workdir)?;

        let records = shard::count_records(input)?;
        anyhow::ensure!(
            records > 0,
            "ERROR: no records found in {}",
            input.display()
        );

        let per_shard = self.kind.records_per_shard(self.cfg).max(MIN_RECORDS_PER_SHARD);
        let nshards = (records + per_shard - 1) / per_shard;

        let commands = self.kind.command_lines(&task, self.cfg)?;
        let script = script::render_script(self.kind.fields(), &commands)?;

        let prefix = self.config_prefix();
        let mut alloc = IndexAllocator::scan(&self.workdir, &prefix)?;

        let mut shards = Vec::with_capacity(nshards);
        let mut indices = Vec::with_capacity(nshards);

        for _ in 0..nshards {
            let claimed = alloc.claim()?;

            let input_file = self
                .workdir
                .join(shard::shard_file_name(self.kind.name(), claimed.index));

            let mut shard = Shard::new(claimed.index, input_file);
            shard.outputs = self.kind.expected_outputs(&shard.input);

            let fields = self.kind.shard_fields(&task, &shard, self.cfg)?;
            anyhow::ensure!(
                fields.len() == self.kind.fields().len(),
                "ERROR: {} rendered {} fields but declares {}",
                self.kind.name(),
                fields.len(),
                self.kind.fields().len()
            );

            claimed.write_fields(&fields)?;

            indices.push(claimed.index);
            shards.push(shard);
        }

        shard::write_shards(input, &self.workdir, per_shard, self.kind.name(), &indices)
            .with_context(|| format!("while sharding {}", input.display()))?;

        log::info!(
            "INFO: planned {} as {} shards with indices {}..={}",
            self.kind.name(),
            nshards,
            indices.first().copied().unwrap_or_default(),
            indices.last().copied().unwrap_or_default()
        );

        self.shards = shards;
        self.script = Some(script);

        Ok(nshards)
    }

    /// submit the planned array to the external scheduler
    pub fn submit<S: Scheduler + ?Sized>(&self, scheduler: &S) -> Result<JobHandle> {
        let script = self
            .script
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("ERROR: job has not been planned"))?;

        let queue = self.kind.queue(self.cfg);
        let prefix = self.config_prefix();

        let handle = submit::submit(
            scheduler,
            &ArrayRequest {
                name: self.kind.name(),
                script,
                workdir: &self.workdir,
                queue: &queue,
                tasks: self.shards.len(),
                config_prefix: &prefix,
            },
        )?;

        Ok(handle)
    }

    /// validate and merge the shard outputs into the result artifact
    ///
    /// The caller is responsible for having confirmed, through its own
    /// scheduler collaborator, that every array task finished.
    pub fn post_process(&self) -> Result<MergedOutput> {
        let artifact = self
            .artifact
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("ERROR: job has not been initialized"))?;

        anyhow::ensure!(!self.shards.is_empty(), "ERROR: job has not been planned");

        let merged = postprocess::merge(&self.shards, artifact, &self.kind.merge_plan())?;
        Ok(merged)
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    pub fn config_prefix(&self) -> String {
        format!("{}{}", self.kind.name(), CONFIG_INFIX)
    }

    fn task(&self) -> Result<&Arc<Task>> {
        self.task
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("ERROR: job has no task"))
    }
}
