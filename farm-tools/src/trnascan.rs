//! tRNAscan-SE job kind
//!
//! Scans each shard for tRNA genes. The tabular output opens with a
//! three-line banner [two column-header lines and a dashed rule];
//! merging keeps the first shard's banner only.
//!
//! Configuration file field order: `[input, output]`.
//! Task parameters: none.
//! BatchConfig entries: `tools.trnascan`, `queues.short`.

use std::path::{Path, PathBuf};

use config::{append_suffix, BatchConfig, BatchError, QueueSpec, Shard, Task, TAG_TRNAS, TRNAS};
use farm_batch::postprocess::{HeaderRule, MergePlan, MergeStep};
use farm_batch::ToolKind;

const FIELDS: [&str; 2] = ["input", "output"];
const TAGS: [(&str, &str); 1] = [(TAG_TRNAS, TRNAS)];

const BANNER_LINES: usize = 3;

pub struct TrnaScan;

impl ToolKind for TrnaScan {
    fn name(&self) -> &'static str {
        "trnascan"
    }

    fn artifact_kind(&self) -> &'static str {
        "trna_scan"
    }

    fn queue(&self, cfg: &BatchConfig) -> QueueSpec {
        QueueSpec::new(&cfg.queues.short)
    }

    fn fields(&self) -> &'static [&'static str] {
        &FIELDS
    }

    fn shard_fields(
        &self,
        _task: &Task,
        shard: &Shard,
        _cfg: &BatchConfig,
    ) -> Result<Vec<String>, BatchError> {
        Ok(vec![
            shard.input.display().to_string(),
            shard.outputs[0].display().to_string(),
        ])
    }

    fn command_lines(&self, _task: &Task, cfg: &BatchConfig) -> Result<Vec<String>, BatchError> {
        Ok(vec![format!(
            "{} -q -o \"$output\" \"$input\"",
            cfg.tools.trnascan.display()
        )])
    }

    fn expected_outputs(&self, shard_input: &Path) -> Vec<PathBuf> {
        vec![append_suffix(shard_input, ".trna")]
    }

    fn merge_plan(&self) -> MergePlan {
        MergePlan {
            steps: vec![MergeStep::ConcatFiltered {
                tag: TAG_TRNAS,
                output: 0,
                rule: HeaderRule::FirstLines(BANNER_LINES),
            }],
        }
    }

    fn tags(&self) -> &'static [(&'static str, &'static str)] {
        &TAGS
    }
}
