//! AUGUSTUS job kind
//!
//! Predicts gene models on each shard with a per-genome parameter set
//! selected by genus and species. The GFF output of every shard opens
//! with `#` banner lines; merging keeps the first shard's banner and
//! drops the comment lines from the rest.
//!
//! Configuration file field order: `[input, output, genus, species]`.
//! Task parameters: `genus`, `species` (both required — the predictor
//! cannot run without a parameter set).
//! BatchConfig entries: `tools.augustus`, `queues.long`.

use std::path::{Path, PathBuf};

use config::{
    append_suffix, BatchConfig, BatchError, Param, QueueSpec, Shard, Task, GENE_MODELS,
    GENUS_PARAM, SPECIES_PARAM, TAG_GENES,
};
use farm_batch::postprocess::{HeaderRule, MergePlan, MergeStep};
use farm_batch::ToolKind;

const FIELDS: [&str; 4] = ["input", "output", "genus", "species"];
const TAGS: [(&str, &str); 1] = [(TAG_GENES, GENE_MODELS)];

const GENUS: Param = Param::Required(GENUS_PARAM);
const SPECIES: Param = Param::Required(SPECIES_PARAM);

pub struct Augustus;

impl ToolKind for Augustus {
    fn name(&self) -> &'static str {
        "augustus"
    }

    fn artifact_kind(&self) -> &'static str {
        "gene_prediction"
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
        Ok(vec![
            shard.input.display().to_string(),
            shard.outputs[0].display().to_string(),
            GENUS.resolve(task)?,
            SPECIES.resolve(task)?,
        ])
    }

    fn command_lines(&self, _task: &Task, cfg: &BatchConfig) -> Result<Vec<String>, BatchError> {
        Ok(vec![format!(
            "{} --species=\"${{genus}}_${{species}}\" --gff3=on \"$input\" > \"$output\"",
            cfg.tools.augustus.display()
        )])
    }

    fn expected_outputs(&self, shard_input: &Path) -> Vec<PathBuf> {
        vec![append_suffix(shard_input, ".gff")]
    }

    fn merge_plan(&self) -> MergePlan {
        MergePlan {
            steps: vec![MergeStep::ConcatFiltered {
                tag: TAG_GENES,
                output: 0,
                rule: HeaderRule::Prefix("#"),
            }],
        }
    }

    fn tags(&self) -> &'static [(&'static str, &'static str)] {
        &TAGS
    }
}
