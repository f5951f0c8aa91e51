use snafu::{ResultExt, Snafu};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Characters of a deleted line echoed back in the confirmation.
pub const DELETE_PREVIEW_CHARS: usize = 40;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EditError {
    #[snafu(display("line_num {line_num} out of range (valid: 1..={max})"))]
    OutOfRange { line_num: i64, max: usize },

    #[snafu(display("Failed to read file '{}': {}", path.display(), source))]
    ReadFile { source: io::Error, path: PathBuf },

    #[snafu(display("Failed to write file '{}': {}", path.display(), source))]
    WriteFile { source: io::Error, path: PathBuf },

    #[snafu(display("Failed to create directory '{}': {}", path.display(), source))]
    CreateDir { source: io::Error, path: PathBuf },
}

pub type Result<T, E = EditError> = std::result::Result<T, E>;

/// Result of a `str_replace`. Only `Replaced` touches the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    NotFound,
    Ambiguous { occurrences: usize },
    Replaced,
}

impl ReplaceOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReplaceOutcome::Replaced)
    }
}

impl fmt::Display for ReplaceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaceOutcome::NotFound => write!(f, "X no replacements made; string not found"),
            ReplaceOutcome::Ambiguous { .. } => {
                write!(f, "X multiple matches found; aborting to avoid ambiguity")
            }
            ReplaceOutcome::Replaced => write!(f, "✔︎ 1 replacement made"),
        }
    }
}

/// Whole-file read-modify-write operations. Paths are expected to be
/// resolved by the sandbox already.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileEditor;

impl FileEditor {
    pub fn new() -> Self {
        Self
    }

    pub fn str_replace(&self, path: &Path, old: &str, new: &str) -> Result<ReplaceOutcome> {
        let content = read_file(path)?;

        let outcome = match content.matches(old).count() {
            0 => ReplaceOutcome::NotFound,
            1 => {
                let updated = content.replacen(old, new, 1);
                write_file(path, &updated)?;
                ReplaceOutcome::Replaced
            }
            occurrences => ReplaceOutcome::Ambiguous { occurrences },
        };

        debug!(path = %path.display(), ?outcome, "str_replace");
        Ok(outcome)
    }

    /// Insert `text` as a new line before 1-indexed `line_num`.
    /// `line_num == len + 1` appends.
    pub fn insert_line(&self, path: &Path, line_num: i64, text: &str) -> Result<String> {
        let content = read_file(path)?;
        let mut lines: Vec<&str> = content.lines().collect();

        let max = lines.len() + 1;
        let index = checked_index(line_num, max)?;
        lines.insert(index, text);

        write_lines(path, &lines)?;
        info!(path = %path.display(), line_num, "inserted line");
        Ok(format!("✔︎ inserted at line {line_num}"))
    }

    pub fn delete_line(&self, path: &Path, line_num: i64) -> Result<String> {
        let content = read_file(path)?;
        let mut lines: Vec<&str> = content.lines().collect();

        let index = checked_index(line_num, lines.len())?;
        let deleted = lines.remove(index);

        write_lines(path, &lines)?;
        info!(path = %path.display(), line_num, "deleted line");

        let preview: String = deleted.chars().take(DELETE_PREVIEW_CHARS).collect();
        Ok(format!("✔︎ deleted line {line_num}: {preview}..."))
    }

    /// Write `text` verbatim, creating parent directories and replacing any
    /// existing file.
    pub fn create(&self, path: &Path, text: &str) -> Result<String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(CreateDirSnafu { path: parent })?;
        }
        write_file(path, text)?;
        info!(path = %path.display(), bytes = text.len(), "file written");
        Ok("✔︎ file written".to_string())
    }
}

/// Map a 1-indexed line number in `1..=max` to a 0-based index.
fn checked_index(line_num: i64, max: usize) -> Result<usize> {
    match usize::try_from(line_num) {
        Ok(n) if (1..=max).contains(&n) => Ok(n - 1),
        _ => OutOfRangeSnafu { line_num, max }.fail(),
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).context(ReadFileSnafu { path })
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).context(WriteFileSnafu { path })
}

fn write_lines(path: &Path, lines: &[&str]) -> Result<()> {
    let mut content = lines.join("\n");
    content.push('\n');
    write_file(path, &content)
}
