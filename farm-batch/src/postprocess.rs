//! Post-processing: validating and merging per-shard outputs
//!
//! Runs once, after the caller has separately confirmed that every
//! array task finished. The cluster may have executed the shards in
//! any order; merging always walks them in ascending shard index, so
//! the consolidated outputs are deterministic. Every expected output
//! of every shard is verified before any destination file is opened,
//! and each merged file is assembled in a temporary sibling and only
//! renamed over the canonical tag path once complete, so a failed
//! merge never replaces the result of an earlier successful one.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use config::{get_progress_bar, Artifact, BatchError, Shard};

/// how one merged output is assembled from the per-shard outputs
///
/// `output` indexes into each shard's expected-output list.
#[derive(Debug, Clone)]
pub enum MergeStep {
    /// plain concatenation in shard-index order
    Concat { tag: &'static str, output: usize },
    /// first shard verbatim, later shards pass the header filter
    ConcatFiltered {
        tag: &'static str,
        output: usize,
        rule: HeaderRule,
    },
    /// manifest of absolute per-shard output paths, one per line
    FileList { tag: &'static str, output: usize },
}

/// in-process line filter applied to every shard after the first
#[derive(Debug, Clone)]
pub enum HeaderRule {
    /// drop the first K lines
    FirstLines(usize),
    /// drop every line starting with the prefix
    Prefix(&'static str),
}

#[derive(Debug, Clone)]
pub struct MergePlan {
    pub steps: Vec<MergeStep>,
}

/// tag -> merged file entries, produced once after all shards validate
#[derive(Debug, Clone)]
pub struct MergedOutput {
    pub entries: Vec<(String, PathBuf)>,
}

/// validate every shard's outputs, then build each merged output
pub fn merge(
    shards: &[Shard],
    artifact: &Artifact,
    plan: &MergePlan,
) -> Result<MergedOutput, BatchError> {
    let mut ordered: Vec<&Shard> = shards.iter().collect();
    ordered.sort_unstable_by_key(|shard| shard.index);

    validate_outputs(&ordered)?;

    let mut entries = Vec::with_capacity(plan.steps.len());

    for step in &plan.steps {
        let (tag, path) = apply_step(&ordered, artifact, step)?;
        entries.push((tag.to_owned(), path));
    }

    log::info!(
        "INFO: merged {} shards into {} outputs under {}",
        ordered.len(),
        entries.len(),
        artifact.path.display()
    );

    Ok(MergedOutput { entries })
}

/// fail fast, naming the first missing shard output
fn validate_outputs(ordered: &[&Shard]) -> Result<(), BatchError> {
    for shard in ordered {
        for output in &shard.outputs {
            if !output.is_file() {
                return Err(BatchError::MissingOutput {
                    shard: shard.index,
                    path: output.clone(),
                });
            }
        }
    }
    Ok(())
}

fn apply_step<'p>(
    ordered: &[&Shard],
    artifact: &Artifact,
    step: &'p MergeStep,
) -> Result<(&'p str, PathBuf), BatchError> {
    let (tag, output, rule) = match step {
        MergeStep::Concat { tag, output } => (*tag, *output, None),
        MergeStep::ConcatFiltered { tag, output, rule } => (*tag, *output, Some(rule)),
        MergeStep::FileList { tag, output } => {
            return write_file_list(ordered, artifact, tag, *output)
        }
    };

    let dest = tag_path(artifact, tag)?;
    let tmp = part_path(&dest);

    let bar = get_progress_bar(ordered.len() as u64, tag);
    let mut writer = BufWriter::new(File::create(&tmp)?);

    for (nth, shard) in ordered.iter().enumerate() {
        let source = shard_output(shard, output)?;
        let reader = BufReader::new(File::open(source)?);

        match rule {
            Some(rule) if nth > 0 => strip_headers(reader, &mut writer, rule)?,
            _ => copy_lines(reader, &mut writer)?,
        }

        bar.inc(1);
    }

    writer
        .flush()
        .map_err(|e| BatchError::MergeFailure(format!("cannot flush {}: {}", tmp.display(), e)))?;
    drop(writer);

    std::fs::rename(&tmp, &dest)?;
    bar.finish_and_clear();

    Ok((tag, dest))
}

fn write_file_list<'p>(
    ordered: &[&Shard],
    artifact: &Artifact,
    tag: &'p str,
    output: usize,
) -> Result<(&'p str, PathBuf), BatchError> {
    let dest = tag_path(artifact, tag)?;
    let tmp = part_path(&dest);

    let mut writer = BufWriter::new(File::create(&tmp)?);

    for shard in ordered {
        let source = shard_output(shard, output)?;
        let absolute = std::path::absolute(source)?;
        writeln!(writer, "{}", absolute.display())?;
    }

    writer.flush()?;
    drop(writer);

    std::fs::rename(&tmp, &dest)?;

    Ok((tag, dest))
}

/// drop the lines the rule matches, keep everything else
pub fn strip_headers<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    rule: &HeaderRule,
) -> Result<(), BatchError> {
    for (nth, line) in reader.lines().enumerate() {
        let line = line?;

        let drop = match rule {
            HeaderRule::FirstLines(k) => nth < *k,
            HeaderRule::Prefix(prefix) => line.starts_with(prefix),
        };

        if !drop {
            writeln!(writer, "{}", line)?;
        }
    }
    Ok(())
}

fn copy_lines<R: BufRead, W: Write>(mut reader: R, writer: &mut W) -> Result<(), BatchError> {
    std::io::copy(&mut reader, writer)?;
    Ok(())
}

fn tag_path(artifact: &Artifact, tag: &str) -> Result<PathBuf, BatchError> {
    artifact.file_path_by_tag(tag).ok_or_else(|| {
        BatchError::MergeFailure(format!(
            "tag {:?} is not registered on artifact {}",
            tag,
            artifact.path.display()
        ))
    })
}

fn shard_output(shard: &Shard, output: usize) -> Result<&PathBuf, BatchError> {
    shard.outputs.get(output).ok_or_else(|| {
        BatchError::MergeFailure(format!(
            "shard {} has no output slot {}",
            shard.index, output
        ))
    })
}

fn part_path(dest: &PathBuf) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
