//! Exonerate job kind
//!
//! The long-form, multi-step kind: each shard task first aligns the
//! shard against the target genome, writing a raw alignment file, and
//! then converts the raw alignment into GFF in a second command line.
//! The GFF outputs are merged with comment-line stripping; the raw
//! alignment files are not concatenated — the artifact instead carries
//! a manifest listing their absolute paths, in shard order, for
//! downstream consumers that read alignments one file at a time.
//!
//! Configuration file field order:
//! `[input, target, raw, output, model, bestn, percent, genus,
//! species, softmask, extra]`.
//! Task parameters: `target`, `genus`, `species` (required); `model`,
//! `bestn`, `percent`, `softmask`, `extra` (lenient — the cluster-side
//! wrapper maps the `none` sentinel to the tool defaults).
//! BatchConfig entries: `tools.exonerate`, `tools.exonerate2gff`,
//! `queues.long`.

use std::path::{Path, PathBuf};

use config::{
    append_suffix, BatchConfig, BatchError, Param, QueueSpec, Shard, Task, ALIGNMENTS,
    ALIGNMENT_LIST, GENUS_PARAM, SPECIES_PARAM, TAG_ALIGNMENTS, TAG_ALIGNMENT_LIST,
};
use farm_batch::postprocess::{HeaderRule, MergePlan, MergeStep};
use farm_batch::ToolKind;

const FIELDS: [&str; 11] = [
    "input", "target", "raw", "output", "model", "bestn", "percent", "genus", "species",
    "softmask", "extra",
];
const TAGS: [(&str, &str); 2] = [
    (TAG_ALIGNMENTS, ALIGNMENTS),
    (TAG_ALIGNMENT_LIST, ALIGNMENT_LIST),
];

const TARGET: Param = Param::Required("target");
const GENUS: Param = Param::Required(GENUS_PARAM);
const SPECIES: Param = Param::Required(SPECIES_PARAM);
const MODEL: Param = Param::Lenient("model");
const BESTN: Param = Param::Lenient("bestn");
const PERCENT: Param = Param::Lenient("percent");
const SOFTMASK: Param = Param::Lenient("softmask");
const EXTRA: Param = Param::Lenient("extra");

pub struct Exonerate;

impl ToolKind for Exonerate {
    fn name(&self) -> &'static str {
        "exonerate"
    }

    fn artifact_kind(&self) -> &'static str {
        "spliced_alignment"
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
            TARGET.resolve(task)?,
            shard.outputs[1].display().to_string(),
            shard.outputs[0].display().to_string(),
            MODEL.resolve(task)?,
            BESTN.resolve(task)?,
            PERCENT.resolve(task)?,
            GENUS.resolve(task)?,
            SPECIES.resolve(task)?,
            SOFTMASK.resolve(task)?,
            EXTRA.resolve(task)?,
        ])
    }

    fn command_lines(&self, _task: &Task, cfg: &BatchConfig) -> Result<Vec<String>, BatchError> {
        Ok(vec![
            format!(
                "{} --model \"$model\" --bestn \"$bestn\" --percent \"$percent\" \
                 --softmasktarget \"$softmask\" --query \"$input\" --target \"$target\" \
                 \"$extra\" > \"$raw\"",
                cfg.tools.exonerate.display()
            ),
            format!(
                "{} \"$raw\" \"$genus\" \"$species\" > \"$output\"",
                cfg.tools.exonerate2gff.display()
            ),
        ])
    }

    fn expected_outputs(&self, shard_input: &Path) -> Vec<PathBuf> {
        vec![
            append_suffix(shard_input, ".gff"),
            append_suffix(shard_input, ".exn"),
        ]
    }

    fn merge_plan(&self) -> MergePlan {
        MergePlan {
            steps: vec![
                MergeStep::ConcatFiltered {
                    tag: TAG_ALIGNMENTS,
                    output: 0,
                    rule: HeaderRule::Prefix("#"),
                },
                MergeStep::FileList {
                    tag: TAG_ALIGNMENT_LIST,
                    output: 1,
                },
            ],
        }
    }

    fn tags(&self) -> &'static [(&'static str, &'static str)] {
        &TAGS
    }
}
