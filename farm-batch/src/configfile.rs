//! Per-shard configuration files and the index allocator that names them
//!
//! Each shard task on the cluster reads its own numbered configuration
//! file, one positional field per line, through the shared script's
//! input redirection. The binding between array task K and file
//! `<prefix>K` is by filename convention, so index uniqueness inside
//! the target directory is load-bearing: the allocator owns the
//! directory and prefix, scans once for already-numbered files at
//! construction and claims every new slot with `create_new`, so a
//! leftover file from a prior partial run can never be clobbered or
//! double-assigned.
//!
//! No escaping or quoting is applied to the fields; a field value
//! containing a line break would corrupt the format.

use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use config::BatchError;

/// hands out collision-free configuration file indices for one
/// (directory, prefix) pair
#[derive(Debug)]
pub struct IndexAllocator {
    dir: PathBuf,
    prefix: String,
    next: usize,
}

impl IndexAllocator {
    /// scan `dir` for existing `<prefix><n>` files and start allocating
    /// right after the highest index found
    pub fn scan(dir: &Path, prefix: &str) -> Result<Self, BatchError> {
        let mut highest = 0;

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if let Some(index) = parse_index(&name, prefix) {
                highest = highest.max(index);
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_owned(),
            next: highest + 1,
        })
    }

    /// claim the next free index by creating its configuration file
    ///
    /// An `AlreadyExists` race on a slot advances to the next one; any
    /// other I/O failure aborts the planning phase.
    pub fn claim(&mut self) -> Result<ClaimedConfig, BatchError> {
        loop {
            let index = self.next;
            self.next += 1;

            let path = self.dir.join(format!("{}{}", self.prefix, index));

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok(ClaimedConfig { index, path, file }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    log::warn!("configuration file {} already exists, skipping", index);
                    continue;
                }
                Err(e) => return Err(BatchError::ConfigWriteFailure { path, source: e }),
            }
        }
    }

    /// claim the next free index and write one field per line into it,
    /// returning the index actually used
    pub fn write_config<S: AsRef<str>>(
        &mut self,
        fields: &[S],
    ) -> Result<(usize, PathBuf), BatchError> {
        let claimed = self.claim()?;
        let path = claimed.write_fields(fields)?;
        Ok((claimed.index, path))
    }

    /// the index the next claim will try first
    pub fn next_index(&self) -> usize {
        self.next
    }
}

/// an index slot claimed on disk but not yet filled in
#[derive(Debug)]
pub struct ClaimedConfig {
    pub index: usize,
    pub path: PathBuf,
    file: std::fs::File,
}

impl ClaimedConfig {
    /// write one field per line, in order, and seal the file
    pub fn write_fields<S: AsRef<str>>(&self, fields: &[S]) -> Result<PathBuf, BatchError> {
        let mut writer = BufWriter::new(&self.file);

        for field in fields {
            writeln!(writer, "{}", field.as_ref()).map_err(|e| {
                BatchError::ConfigWriteFailure {
                    path: self.path.clone(),
                    source: e,
                }
            })?;
        }

        writer.flush().map_err(|e| BatchError::ConfigWriteFailure {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(self.path.clone())
    }
}

/// count the `<prefix><n>` files physically present in `dir`
///
/// The submitter re-counts just before submission instead of trusting
/// an in-memory counter: leftover files from a prior partial run would
/// otherwise desynchronize the array size from the directory contents.
pub fn count_config_files(dir: &Path, prefix: &str) -> Result<usize, BatchError> {
    let mut count = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if parse_index(&name, prefix).is_some() {
            count += 1;
        }
    }

    Ok(count)
}

fn parse_index(name: &str, prefix: &str) -> Option<usize> {
    name.strip_prefix(prefix)
        .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|rest| rest.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "blast_config_";

    #[test]
    fn test_indices_start_at_one_in_clean_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut alloc = IndexAllocator::scan(dir.path(), PREFIX).unwrap();

        let (first, _) = alloc.write_config(&["in", "out"]).unwrap();
        let (second, _) = alloc.write_config(&["in", "out"]).unwrap();
        let (third, _) = alloc.write_config(&["in", "out"]).unwrap();

        assert_eq!((first, second, third), (1, 2, 3));
    }

    #[test]
    fn test_indices_resume_after_preseeded_files() {
        let dir = tempfile::tempdir().unwrap();
        for i in 1..=3 {
            std::fs::write(dir.path().join(format!("{}{}", PREFIX, i)), "stale\n").unwrap();
        }

        let mut alloc = IndexAllocator::scan(dir.path(), PREFIX).unwrap();
        let (index, path) = alloc.write_config(&["in", "out"]).unwrap();

        assert_eq!(index, 4);
        assert!(path.ends_with(format!("{}4", PREFIX)));

        // the stale files are untouched
        let stale = std::fs::read_to_string(dir.path().join(format!("{}1", PREFIX))).unwrap();
        assert_eq!(stale, "stale\n");
    }

    #[test]
    fn test_claim_skips_file_seeded_after_scan() {
        let dir = tempfile::tempdir().unwrap();
        let mut alloc = IndexAllocator::scan(dir.path(), PREFIX).unwrap();

        // a file appears behind the allocator's back
        std::fs::write(dir.path().join(format!("{}1", PREFIX)), "intruder\n").unwrap();

        let (index, _) = alloc.write_config(&["in", "out"]).unwrap();
        assert_eq!(index, 2);

        let intruder = std::fs::read_to_string(dir.path().join(format!("{}1", PREFIX))).unwrap();
        assert_eq!(intruder, "intruder\n");
    }

    #[test]
    fn test_fields_are_written_one_per_line_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut alloc = IndexAllocator::scan(dir.path(), PREFIX).unwrap();

        let (_, path) = alloc
            .write_config(&["/data/shard_1.fa", "/data/shard_1.hits", "none"])
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "/data/shard_1.fa\n/data/shard_1.hits\nnone\n");
    }

    #[test]
    fn test_count_config_files_ignores_foreign_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut alloc = IndexAllocator::scan(dir.path(), PREFIX).unwrap();
        alloc.write_config(&["a"]).unwrap();
        alloc.write_config(&["b"]).unwrap();

        std::fs::write(dir.path().join("blast_1.fa"), ">r1\nACGT\n").unwrap();
        std::fs::write(dir.path().join(format!("{}x", PREFIX)), "junk\n").unwrap();

        assert_eq!(count_config_files(dir.path(), PREFIX).unwrap(), 2);
    }
}
