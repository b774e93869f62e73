use indicatif::{ProgressBar, ProgressStyle};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mods::BatchError;

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} {pos}/{len} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// input validation: the file must exist, be a regular file and be non-empty
pub fn validate(arg: &Path) -> Result<(), BatchError> {
    if !arg.exists() {
        return Err(BatchError::MissingInput(arg.to_path_buf()));
    }

    if !arg.is_file() {
        return Err(BatchError::InvalidInput(format!(
            "{:?} is not a file",
            arg
        )));
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(BatchError::InvalidInput(format!(
            "file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(BatchError::Io(e)),
    }
}

/// write a collection of lines to a file, one per line
pub fn write_lines<S: AsRef<str>>(lines: &[S], fname: &Path) -> Result<(), BatchError> {
    let f = File::create(fname)?;
    let mut writer = BufWriter::new(f);

    for line in lines.iter() {
        writeln!(writer, "{}", line.as_ref())?;
    }

    writer.flush()?;
    Ok(())
}

/// append a suffix to a full file name, `x.fa` -> `x.fa.out`
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
