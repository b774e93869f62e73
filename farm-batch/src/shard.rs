//! Shard planning: splitting one large multi-record input into N
//! bounded slices
//!
//! The planner accepts plain or gzipped FASTA and produces shard input
//! files covering the input exactly once, preserving the original
//! record order across shards. Plain files are scanned with a single
//! memchr pass over a memory map and the shard files are written in
//! parallel; gzipped files are streamed record by record. The original
//! input is never mutated.

use anyhow::Result;
use flate2::read::MultiGzDecoder;
use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::prelude::*;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{validate, ChunkRegion};

const FA_NEEDLE: u8 = b'>';

/// name of the shard input file for a given job-kind stem and index
pub fn shard_file_name(stem: &str, index: usize) -> String {
    format!("{}_{}.fa", stem, index)
}

/// count the records in a FASTA input, dispatching on the file suffix
pub fn count_records(input: &Path) -> Result<usize> {
    validate(input)?;

    let name = input
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or_default();

    if name.ends_with(".fa.gz") || name.ends_with(".fasta.gz") {
        count_records_gz(input)
    } else if name.ends_with(".fa") || name.ends_with(".fasta") {
        let file = File::open(input)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(record_starts(&mmap).len())
    } else {
        anyhow::bail!("ERROR: unrecognized file format: {}", input.display());
    }
}

/// split the input into shard files of at most `per_shard` records each,
/// named from `stem` and the pre-assigned `indices`
///
/// `indices.len()` must equal the shard count implied by the record
/// count; the caller obtains it from [`count_records`] and the index
/// allocator before calling in.
pub fn write_shards(
    input: &Path,
    workdir: &Path,
    per_shard: usize,
    stem: &str,
    indices: &[usize],
) -> Result<Vec<PathBuf>> {
    let name = input
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or_default();

    if name.ends_with(".fa.gz") || name.ends_with(".fasta.gz") {
        write_shards_gz(input, workdir, per_shard, stem, indices)
    } else {
        write_shards_plain(input, workdir, per_shard, stem, indices)
    }
}

/// byte offsets of record starts: `>` at the beginning of a line
fn record_starts(data: &[u8]) -> Vec<usize> {
    memchr_iter(FA_NEEDLE, data)
        .filter(|&pos| pos == 0 || data[pos - 1] == b'\n')
        .collect()
}

/// group record starts into byte regions of at most `per_shard` records
pub fn chunk_records(starts: &[usize], total: usize, per_shard: usize) -> Vec<ChunkRegion> {
    let nchunks = (starts.len() + per_shard - 1) / per_shard;
    let mut chunks = Vec::with_capacity(nchunks);

    for i in 0..nchunks {
        let start = starts[i * per_shard];
        let end = *starts.get((i + 1) * per_shard).unwrap_or(&total);
        chunks.push(ChunkRegion { start, end });
    }

    chunks
}

fn write_shards_plain(
    input: &Path,
    workdir: &Path,
    per_shard: usize,
    stem: &str,
    indices: &[usize],
) -> Result<Vec<PathBuf>> {
    let file = File::open(input)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let data = Arc::new(mmap);

    let starts = record_starts(&data);
    if starts.is_empty() {
        anyhow::bail!("ERROR: no FASTA records found in {}", input.display());
    }

    let chunks = chunk_records(&starts, data.len(), per_shard);
    anyhow::ensure!(
        chunks.len() == indices.len(),
        "ERROR: planned {} shards but {} indices were allocated",
        chunks.len(),
        indices.len()
    );

    let paths: Vec<PathBuf> = indices
        .iter()
        .map(|&idx| workdir.join(shard_file_name(stem, idx)))
        .collect();

    chunks
        .into_par_iter()
        .zip(paths.par_iter())
        .try_for_each(|(chunk, path)| -> Result<()> {
            let mut writer = BufWriter::new(File::create(path)?);
            writer.write_all(&data[chunk.start..chunk.end])?;
            writer.flush()?;
            Ok(())
        })?;

    log::info!(
        "INFO: split {} into {} shards of <= {} records",
        input.display(),
        paths.len(),
        per_shard
    );

    Ok(paths)
}

fn write_shards_gz(
    input: &Path,
    workdir: &Path,
    per_shard: usize,
    stem: &str,
    indices: &[usize],
) -> Result<Vec<PathBuf>> {
    let file = File::open(input)?;
    let reader = BufReader::new(MultiGzDecoder::new(file));

    let paths: Vec<PathBuf> = indices
        .iter()
        .map(|&idx| workdir.join(shard_file_name(stem, idx)))
        .collect();

    let mut shard = 0;
    let mut records = 0;
    let mut seen = 0;
    let mut writer: Option<BufWriter<File>> = None;

    for line in reader.lines() {
        let line = line?;

        if line.starts_with('>') {
            seen += 1;
            if writer.is_none() || records == per_shard {
                if writer.is_some() {
                    shard += 1;
                }
                let path = paths.get(shard).ok_or_else(|| {
                    anyhow::anyhow!(
                        "ERROR: planned {} shards but more records were found",
                        paths.len()
                    )
                })?;
                writer = Some(BufWriter::new(File::create(path)?));
                records = 0;
            }
            records += 1;
        }

        match writer.as_mut() {
            Some(w) => writeln!(w, "{}", line)?,
            None => anyhow::bail!(
                "ERROR: {} does not start with a FASTA record",
                input.display()
            ),
        }
    }

    if seen == 0 {
        anyhow::bail!("ERROR: no FASTA records found in {}", input.display());
    }

    anyhow::ensure!(
        shard + 1 == paths.len(),
        "ERROR: planned {} shards but wrote {}",
        paths.len(),
        shard + 1
    );

    log::info!(
        "INFO: split {} into {} shards of <= {} records",
        input.display(),
        paths.len(),
        per_shard
    );

    Ok(paths)
}

fn count_records_gz(input: &Path) -> Result<usize> {
    let file = File::open(input)?;
    let reader = BufReader::new(MultiGzDecoder::new(file));

    let mut count = 0;
    for line in reader.lines() {
        if line?.starts_with('>') {
            count += 1;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn fasta(records: usize) -> String {
        let mut body = String::new();
        for i in 1..=records {
            body.push_str(&format!(">record_{}\nACGTACGT\n", i));
        }
        body
    }

    #[test]
    fn test_chunk_arithmetic_450_records_limit_200() {
        let body = fasta(450);
        let starts = record_starts(body.as_bytes());
        assert_eq!(starts.len(), 450);

        let chunks = chunk_records(&starts, body.len(), 200);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_write_shards_preserves_order_and_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.fa");
        std::fs::write(&input, fasta(5)).unwrap();

        let paths = write_shards(&input, dir.path(), 2, "blast", &[1, 2, 3]).unwrap();
        assert_eq!(paths.len(), 3);

        let mut merged = String::new();
        for path in &paths {
            merged.push_str(&std::fs::read_to_string(path).unwrap());
        }
        assert_eq!(merged, fasta(5));

        let first = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(first.starts_with(">record_1\n"));
        let last = std::fs::read_to_string(&paths[2]).unwrap();
        assert_eq!(last, ">record_5\nACGTACGT\n");
    }

    #[test]
    fn test_write_shards_gz_matches_plain() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.fa.gz");

        let mut encoder = GzEncoder::new(File::create(&input).unwrap(), Compression::default());
        encoder.write_all(fasta(5).as_bytes()).unwrap();
        encoder.finish().unwrap();

        assert_eq!(count_records(&input).unwrap(), 5);

        let paths = write_shards(&input, dir.path(), 2, "blast", &[1, 2, 3]).unwrap();
        let mut merged = String::new();
        for path in &paths {
            merged.push_str(&std::fs::read_to_string(path).unwrap());
        }
        assert_eq!(merged, fasta(5));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.fa");
        std::fs::write(&input, "no records here\n").unwrap();

        assert!(write_shards(&input, dir.path(), 2, "blast", &[]).is_err());
    }

    #[test]
    fn test_record_starts_ignores_mid_line_needle() {
        let body = ">r1 len>100\nACGT\n>r2\nACGT\n";
        let starts = record_starts(body.as_bytes());
        assert_eq!(starts.len(), 2);
    }

    #[test]
    fn test_count_records_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.bed");
        std::fs::write(&input, ">r1\nACGT\n").unwrap();

        assert!(count_records(&input).is_err());
    }
}
