use snafu::{ResultExt, Snafu};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::tokens::{SharedTokenEstimator, WordCountEstimator};

pub const DEFAULT_MAX_TOKENS: usize = 200_000;
pub const DEFAULT_SAFETY_MARGIN: usize = 4_000;
pub const DEFAULT_TRUNCATED_LINE_COUNT: usize = 400;

pub const DIRECTORY_LISTING_HEADER: &str = "Directory listing:\n";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ViewError {
    #[snafu(display("view_range must be [start, end]"))]
    RangeShape { len: usize },

    #[snafu(display("start must be ≥1 (got {start})"))]
    RangeStart { start: i64 },

    #[snafu(display("Failed to list directory '{}': {}", path.display(), source))]
    ReadDir { source: io::Error, path: PathBuf },

    #[snafu(display("Failed to read file '{}': {}", path.display(), source))]
    ReadFile { source: io::Error, path: PathBuf },
}

pub type Result<T, E = ViewError> = std::result::Result<T, E>;

/// A 1-indexed, inclusive line span. `end == None` means "through the last line".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl ViewRange {
    pub const TO_END: i64 = -1;

    /// Validate a caller-supplied `[start, end]` pair. Bounds outside the
    /// file are not errors; they select fewer (or no) lines.
    pub fn parse(raw: &[i64]) -> Result<Self> {
        let [start, end] = raw else {
            return RangeShapeSnafu { len: raw.len() }.fail();
        };
        let (start, end) = (*start, *end);

        if start < 1 {
            return RangeStartSnafu { start }.fail();
        }
        Ok(Self {
            start: start as usize,
            end: (end != Self::TO_END).then_some(end.max(0) as usize),
        })
    }

    pub fn first_lines(count: usize) -> Self {
        Self {
            start: 1,
            end: Some(count.max(1)),
        }
    }
}

/// Renders files and directories as line-numbered text.
#[derive(Clone)]
pub struct FileViewer {
    max_tokens: usize,
    safety_margin: usize,
    truncated_line_count: usize,
    estimator: SharedTokenEstimator,
}

impl FileViewer {
    pub fn new(max_tokens: usize, safety_margin: usize, estimator: SharedTokenEstimator) -> Self {
        Self {
            max_tokens,
            safety_margin,
            truncated_line_count: DEFAULT_TRUNCATED_LINE_COUNT,
            estimator,
        }
    }

    pub fn with_truncated_line_count(mut self, count: usize) -> Self {
        self.truncated_line_count = count;
        self
    }

    /// Files whose estimate exceeds this are truncated when no range is given.
    pub fn token_threshold(&self) -> usize {
        self.max_tokens.saturating_sub(self.safety_margin)
    }

    pub fn view(&self, path: &Path, view_range: Option<&[i64]>) -> Result<String> {
        if path.is_dir() {
            return list_directory(path);
        }

        let text = fs::read_to_string(path).context(ReadFileSnafu { path })?;

        let range = match view_range {
            Some(raw) => Some(ViewRange::parse(raw)?),
            None => {
                let tokens = self.estimator.estimate_tokens(&text);
                if tokens > self.token_threshold() {
                    debug!(
                        path = %path.display(),
                        tokens,
                        threshold = self.token_threshold(),
                        "file over token budget, showing first lines only"
                    );
                    Some(ViewRange::first_lines(self.truncated_line_count))
                } else {
                    None
                }
            }
        };

        let lines: Vec<&str> = text.lines().collect();
        match range {
            Some(range) => Ok(render_range(&lines, range)),
            None => Ok(with_line_numbers(&lines, 1)),
        }
    }
}

impl Default for FileViewer {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_TOKENS,
            DEFAULT_SAFETY_MARGIN,
            Arc::new(WordCountEstimator),
        )
    }
}

impl std::fmt::Debug for FileViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileViewer")
            .field("max_tokens", &self.max_tokens)
            .field("safety_margin", &self.safety_margin)
            .field("truncated_line_count", &self.truncated_line_count)
            .finish_non_exhaustive()
    }
}

fn list_directory(path: &Path) -> Result<String> {
    let mut names = fs::read_dir(path)
        .context(ReadDirSnafu { path })?
        .map(|entry| {
            entry
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .context(ReadDirSnafu { path })
        })
        .collect::<Result<Vec<_>>>()?;
    names.sort();

    Ok(format!("{DIRECTORY_LISTING_HEADER}{}", names.join("\n")))
}

fn render_range(lines: &[&str], range: ViewRange) -> String {
    let total = lines.len();
    let from = (range.start - 1).min(total);
    let to = range.end.map_or(total, |end| end.min(total));
    let snippet = &lines[from..to.max(from)];

    // `start >= 1`, so an empty snippet shows as `start-(start - 1)`.
    let last_shown = range.start + snippet.len() - 1;
    let mut output = format!(
        "# showing lines {}-{} of {} (file truncated)\n",
        range.start, last_shown, total
    );
    output.push_str(&with_line_numbers(snippet, range.start));
    output
}

/// Prefix each line with its number, right-aligned to the widest number shown.
pub fn with_line_numbers(lines: &[&str], start: usize) -> String {
    let last = (start + lines.len()).saturating_sub(1);
    let width = last.to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}| {}", start + i, line, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}
