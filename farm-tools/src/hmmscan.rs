//! hmmscan job kind
//!
//! Searches each shard's translated sequences against a profile
//! database and reports per-domain hits. The domain table is littered
//! with `#` comment lines in every shard; merging keeps the first
//! shard verbatim and drops comment lines from the rest.
//!
//! Configuration file field order: `[input, profiles, output]`.
//! Task parameters: `profiles` (required).
//! BatchConfig entries: `tools.hmmscan`, `queues.medium`.

use std::path::{Path, PathBuf};

use config::{
    append_suffix, BatchConfig, BatchError, Param, QueueSpec, Shard, Task, DOMAINS,
    PROFILES_PARAM, TAG_DOMAINS,
};
use farm_batch::postprocess::{HeaderRule, MergePlan, MergeStep};
use farm_batch::ToolKind;

const FIELDS: [&str; 3] = ["input", "profiles", "output"];
const TAGS: [(&str, &str); 1] = [(TAG_DOMAINS, DOMAINS)];

const PROFILES: Param = Param::Required(PROFILES_PARAM);

pub struct Hmmscan;

impl ToolKind for Hmmscan {
    fn name(&self) -> &'static str {
        "hmmscan"
    }

    fn artifact_kind(&self) -> &'static str {
        "domain_annotation"
    }

    fn queue(&self, cfg: &BatchConfig) -> QueueSpec {
        QueueSpec::new(&cfg.queues.medium)
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
        Ok(vec![
            shard.input.display().to_string(),
            PROFILES.resolve(task)?,
            shard.outputs[0].display().to_string(),
        ])
    }

    fn command_lines(&self, _task: &Task, cfg: &BatchConfig) -> Result<Vec<String>, BatchError> {
        Ok(vec![format!(
            "{} --domtblout \"$output\" \"$profiles\" \"$input\"",
            cfg.tools.hmmscan.display()
        )])
    }

    fn expected_outputs(&self, shard_input: &Path) -> Vec<PathBuf> {
        vec![append_suffix(shard_input, ".dom")]
    }

    fn merge_plan(&self) -> MergePlan {
        MergePlan {
            steps: vec![MergeStep::ConcatFiltered {
                tag: TAG_DOMAINS,
                output: 0,
                rule: HeaderRule::Prefix("#"),
            }],
        }
    }

    fn tags(&self) -> &'static [(&'static str, &'static str)] {
        &TAGS
    }
}
