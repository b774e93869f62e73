//! BLAST job kind
//!
//! Searches each shard against a preformatted database and reports
//! tabular hits; shard outputs carry no headers, so merging is a plain
//! concatenation. The program name is a job-level parameter and is
//! substituted into the command at script-generation time; the e-value
//! cutoff travels through the configuration file and falls back to the
//! `none` sentinel when the task never set one (the cluster-side
//! wrapper substitutes the tool default for it).
//!
//! Configuration file field order: `[input, database, output, evalue]`.
//! Task parameters: `database`, `program` (required); `evalue`
//! (lenient).
//! BatchConfig entries: `tools.blast`, `queues.medium`.

use std::path::{Path, PathBuf};

use config::{
    append_suffix, BatchConfig, BatchError, Param, QueueSpec, Shard, Task, DATABASE_PARAM, HITS,
    TAG_HITS,
};
use farm_batch::postprocess::{MergePlan, MergeStep};
use farm_batch::ToolKind;

const FIELDS: [&str; 4] = ["input", "database", "output", "evalue"];
const TAGS: [(&str, &str); 1] = [(TAG_HITS, HITS)];

const DATABASE: Param = Param::Required(DATABASE_PARAM);
const PROGRAM: Param = Param::Required("program");
const EVALUE: Param = Param::Lenient("evalue");

pub struct Blast;

impl ToolKind for Blast {
    fn name(&self) -> &'static str {
        "blast"
    }

    fn artifact_kind(&self) -> &'static str {
        "blast_hits"
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
            DATABASE.resolve(task)?,
            shard.outputs[0].display().to_string(),
            EVALUE.resolve(task)?,
        ])
    }

    fn command_lines(&self, task: &Task, cfg: &BatchConfig) -> Result<Vec<String>, BatchError> {
        Ok(vec![format!(
            "{} -p {} -d \"$database\" -i \"$input\" -e \"$evalue\" -m 8 -o \"$output\"",
            cfg.tools.blast.display(),
            PROGRAM.resolve(task)?
        )])
    }

    fn expected_outputs(&self, shard_input: &Path) -> Vec<PathBuf> {
        vec![append_suffix(shard_input, ".hits")]
    }

    fn merge_plan(&self) -> MergePlan {
        MergePlan {
            steps: vec![MergeStep::Concat {
                tag: TAG_HITS,
                output: 0,
            }],
        }
    }

    fn tags(&self) -> &'static [(&'static str, &'static str)] {
        &TAGS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::SENTINEL;

    fn task() -> Task {
        let mut task = Task::new(1, "vlad");
        task.set_param(DATABASE_PARAM, "/db/uniprot.fa");
        task.set_param("program", "blastx");
        task
    }

    #[test]
    fn test_evalue_defaults_to_sentinel() {
        let kind = Blast;
        let mut shard = Shard::new(1, PathBuf::from("/work/blast_1.fa"));
        shard.outputs = kind.expected_outputs(&shard.input);

        let fields = kind
            .shard_fields(&task(), &shard, &BatchConfig::default())
            .unwrap();

        assert_eq!(
            fields,
            vec![
                "/work/blast_1.fa",
                "/db/uniprot.fa",
                "/work/blast_1.fa.hits",
                SENTINEL
            ]
        );
    }

    #[test]
    fn test_evalue_passes_through_when_set() {
        let kind = Blast;
        let mut task = task();
        task.set_param("evalue", "1e-5");

        let mut shard = Shard::new(1, PathBuf::from("/work/blast_1.fa"));
        shard.outputs = kind.expected_outputs(&shard.input);

        let fields = kind
            .shard_fields(&task, &shard, &BatchConfig::default())
            .unwrap();
        assert_eq!(fields[3], "1e-5");
    }

    #[test]
    fn test_program_is_substituted_at_generation_time() {
        let kind = Blast;
        let commands = kind.command_lines(&task(), &BatchConfig::default()).unwrap();

        assert_eq!(commands.len(), 1);
        assert!(commands[0].contains("-p blastx"));
        assert!(commands[0].contains("-d \"$database\""));
    }

    #[test]
    fn test_missing_database_aborts_planning() {
        let kind = Blast;
        let mut task = Task::new(1, "vlad");
        task.set_param("program", "blastx");

        let mut shard = Shard::new(1, PathBuf::from("/work/blast_1.fa"));
        shard.outputs = kind.expected_outputs(&shard.input);

        assert!(matches!(
            kind.shard_fields(&task, &shard, &BatchConfig::default()),
            Err(BatchError::MissingParameter(_))
        ));
    }
}
