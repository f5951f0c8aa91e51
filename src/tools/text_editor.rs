use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{OptionExt, Snafu};
use std::fmt;
use tracing::{debug, warn};

use super::edit::{EditError, FileEditor};
use super::sandbox::{Sandbox, SandboxError};
use super::view::{FileViewer, ViewError};
use crate::config::ParsedConfig;

/// Marker prepended to the content of every failed result.
pub const ERROR_PREFIX: &str = "ERROR: ";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TextEditorError {
    #[snafu(display("missing field '{field}'"))]
    MissingField { field: String },

    #[snafu(display("unsupported command: {command}"))]
    UnsupportedCommand { command: String },

    #[snafu(display("field '{field}' must be {expected}"))]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[snafu(display("invalid request: {source}"))]
    InvalidRequest { source: serde_json::Error },

    #[snafu(transparent)]
    Sandbox { source: SandboxError },

    #[snafu(transparent)]
    View { source: ViewError },

    #[snafu(transparent)]
    Edit { source: EditError },
}

pub type Result<T, E = TextEditorError> = std::result::Result<T, E>;

/// One inbound request. `input` carries `command` plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub input: Value,
}

impl CommandRequest {
    pub fn new(id: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            input,
        }
    }
}

/// Reply to a [`CommandRequest`]. Failures are marked by [`ERROR_PREFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub id: String,
    pub content: String,
}

impl ResultEnvelope {
    pub fn ok(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }

    pub fn error(id: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            id: id.into(),
            content: format!("{ERROR_PREFIX}{error}"),
        }
    }

    pub fn is_error(&self) -> bool {
        self.content.starts_with(ERROR_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    View,
    StrReplace,
    InsertLine,
    DeleteLine,
    Create,
}

impl CommandKind {
    pub const ALL: [CommandKind; 5] = [
        CommandKind::View,
        CommandKind::StrReplace,
        CommandKind::InsertLine,
        CommandKind::DeleteLine,
        CommandKind::Create,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::View => "view",
            CommandKind::StrReplace => "str_replace",
            CommandKind::InsertLine => "insert_line",
            CommandKind::DeleteLine => "delete_line",
            CommandKind::Create => "create",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request input after field extraction and type checks.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    View {
        path: String,
        view_range: Option<Vec<i64>>,
    },
    StrReplace {
        path: String,
        old_str: String,
        new_str: String,
    },
    InsertLine {
        path: String,
        line_num: i64,
        text: String,
    },
    DeleteLine {
        path: String,
        line_num: i64,
    },
    Create {
        path: String,
        file_text: String,
    },
}

impl Command {
    pub fn from_args(kind: CommandKind, args: &Value) -> Result<Self> {
        let path = required_str(args, "path")?.to_string();

        let command = match kind {
            CommandKind::View => Command::View {
                path,
                view_range: optional_range(args)?,
            },
            CommandKind::StrReplace => Command::StrReplace {
                path,
                old_str: required_str(args, "old_str")?.to_string(),
                new_str: required_str(args, "new_str")?.to_string(),
            },
            CommandKind::InsertLine => Command::InsertLine {
                path,
                line_num: required_int(args, "line_num")?,
                text: required_str(args, "text")?.to_string(),
            },
            CommandKind::DeleteLine => Command::DeleteLine {
                path,
                line_num: required_int(args, "line_num")?,
            },
            CommandKind::Create => Command::Create {
                path,
                file_text: required_str(args, "file_text")?.to_string(),
            },
        };
        Ok(command)
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::View { .. } => CommandKind::View,
            Command::StrReplace { .. } => CommandKind::StrReplace,
            Command::InsertLine { .. } => CommandKind::InsertLine,
            Command::DeleteLine { .. } => CommandKind::DeleteLine,
            Command::Create { .. } => CommandKind::Create,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Command::View { path, .. }
            | Command::StrReplace { path, .. }
            | Command::InsertLine { path, .. }
            | Command::DeleteLine { path, .. }
            | Command::Create { path, .. } => path,
        }
    }
}

fn field<'a>(args: &'a Value, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    let value = field(args, name).context(MissingFieldSnafu { field: name })?;
    value.as_str().context(InvalidFieldSnafu {
        field: name,
        expected: "a string",
    })
}

fn required_int(args: &Value, name: &str) -> Result<i64> {
    let value = field(args, name).context(MissingFieldSnafu { field: name })?;
    value.as_i64().context(InvalidFieldSnafu {
        field: name,
        expected: "an integer",
    })
}

/// Only the element types are checked here; the viewer validates the shape.
fn optional_range(args: &Value) -> Result<Option<Vec<i64>>> {
    let Some(value) = field(args, "view_range") else {
        return Ok(None);
    };
    let invalid = || TextEditorError::InvalidField {
        field: "view_range".to_string(),
        expected: "an array of integers",
    };

    let items = value.as_array().ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| item.as_i64().ok_or_else(invalid))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Routes commands to the viewer and editor, confined to one sandbox.
///
/// Every failure is turned into an error envelope; nothing escapes
/// [`TextEditor::handle`]. There is no locking between requests.
#[derive(Debug, Clone)]
pub struct TextEditor {
    sandbox: Sandbox,
    viewer: FileViewer,
    editor: FileEditor,
}

impl TextEditor {
    pub fn new(sandbox: Sandbox, viewer: FileViewer) -> Self {
        Self {
            sandbox,
            viewer,
            editor: FileEditor::new(),
        }
    }

    pub fn from_config(config: &ParsedConfig) -> Self {
        Self::new(config.sandbox.clone(), config.viewer.clone())
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn handle(&self, request: &CommandRequest) -> ResultEnvelope {
        match self.execute(&request.input) {
            Ok(content) => {
                debug!(id = %request.id, "request handled");
                ResultEnvelope::ok(request.id.as_str(), content)
            }
            Err(e) => {
                warn!(id = %request.id, error = %e, "request failed");
                ResultEnvelope::error(request.id.as_str(), e)
            }
        }
    }

    /// Handle a raw JSON request. A line that isn't valid JSON still gets an
    /// envelope, echoing whatever id could be recovered.
    pub fn handle_json(&self, line: &str) -> ResultEnvelope {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(source) => {
                let e = TextEditorError::InvalidRequest { source };
                warn!(error = %e, "unparseable request");
                return ResultEnvelope::error("", e);
            }
        };

        let id = match value.get("id") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
        };
        let input = value.get("input").cloned().unwrap_or(Value::Null);

        self.handle(&CommandRequest { id, input })
    }

    /// Parse and run a request input, returning the success text.
    pub fn execute(&self, input: &Value) -> Result<String> {
        let name = required_str(input, "command")?;
        let kind = CommandKind::parse(name).context(UnsupportedCommandSnafu { command: name })?;
        let command = Command::from_args(kind, input)?;
        self.run(command)
    }

    pub fn run(&self, command: Command) -> Result<String> {
        debug!(command = %command.kind(), path = command.path(), "dispatching");

        let output = match command {
            Command::View { path, view_range } => {
                let path = self.sandbox.resolve(&path)?;
                self.viewer.view(&path, view_range.as_deref())?
            }
            Command::StrReplace {
                path,
                old_str,
                new_str,
            } => {
                let path = self.sandbox.resolve(&path)?;
                self.editor
                    .str_replace(&path, &old_str, &new_str)?
                    .to_string()
            }
            Command::InsertLine {
                path,
                line_num,
                text,
            } => {
                let path = self.sandbox.resolve(&path)?;
                self.editor.insert_line(&path, line_num, &text)?
            }
            Command::DeleteLine { path, line_num } => {
                let path = self.sandbox.resolve(&path)?;
                self.editor.delete_line(&path, line_num)?
            }
            Command::Create { path, file_text } => {
                let path = self.sandbox.resolve(&path)?;
                self.editor.create(&path, &file_text)?
            }
        };
        Ok(output)
    }
}
