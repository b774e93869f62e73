//! RepeatMasker job kind
//!
//! Masks repetitive elements in each shard and reports them in a
//! table whose first three lines are a column-header banner; merging
//! keeps the first shard's banner and strips it from every other
//! shard. The softmasked sequence is concatenated as-is.
//!
//! Configuration file field order: `[input, outdir, species]`.
//! Task parameters: `species` (required).
//! BatchConfig entries: `tools.repeatmasker`, `queues.long`.

use std::path::{Path, PathBuf};

use config::{
    append_suffix, BatchConfig, BatchError, Param, QueueSpec, Shard, Task, MASKED, REPEATS,
    SPECIES_PARAM, TAG_MASKED, TAG_REPEATS,
};
use farm_batch::postprocess::{HeaderRule, MergePlan, MergeStep};
use farm_batch::ToolKind;

const FIELDS: [&str; 3] = ["input", "outdir", "species"];
const TAGS: [(&str, &str); 2] = [(TAG_REPEATS, REPEATS), (TAG_MASKED, MASKED)];

const SPECIES: Param = Param::Required(SPECIES_PARAM);

// RepeatMasker's .out banner: two column-header lines and a blank one
const OUT_HEADER_LINES: usize = 3;

pub struct RepeatMasker;

impl ToolKind for RepeatMasker {
    fn name(&self) -> &'static str {
        "repeatmasker"
    }

    fn artifact_kind(&self) -> &'static str {
        "repeat_annotation"
    }

    fn queue(&self, cfg: &BatchConfig) -> QueueSpec {
        QueueSpec::new(&cfg.queues.long)
    }

    fn fields(&self) -> &'static [&'static str] {
        &FIELDS
    }

    fn shard_fields(
        &self,
        task: &Task,
        shard: &Shard,
        _cfg: &BatchConfig,
    ) -> Result<Vec<String>, BatchError> {
        let outdir = shard
            .input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .display()
            .to_string();

        Ok(vec![
            shard.input.display().to_string(),
            outdir,
            SPECIES.resolve(task)?,
        ])
    }

    fn command_lines(&self, _task: &Task, cfg: &BatchConfig) -> Result<Vec<String>, BatchError> {
        Ok(vec![format!(
            "{} -species \"$species\" -xsmall -dir \"$outdir\" \"$input\"",
            cfg.tools.repeatmasker.display()
        )])
    }

    fn expected_outputs(&self, shard_input: &Path) -> Vec<PathBuf> {
        vec![
            append_suffix(shard_input, ".out"),
            append_suffix(shard_input, ".masked"),
        ]
    }

    fn merge_plan(&self) -> MergePlan {
        MergePlan {
            steps: vec![
                MergeStep::ConcatFiltered {
                    tag: TAG_REPEATS,
                    output: 0,
                    rule: HeaderRule::FirstLines(OUT_HEADER_LINES),
                },
                MergeStep::Concat {
                    tag: TAG_MASKED,
                    output: 1,
                },
            ],
        }
    }

    fn tags(&self) -> &'static [(&'static str, &'static str)] {
        &TAGS
    }
}
