pub mod edit;
pub mod sandbox;
pub mod text_editor;
pub mod tokens;
pub mod view;

use serde_json::{Value, json};

use text_editor::TextEditor;

pub const TOOL_NAME: &str = "text_editor";
pub const TOOL_DESCRIPTION: &str = "View and edit plain text files inside the sandbox. \
Commands: view (file with line numbers, or directory listing; optional view_range [start, end], \
end = -1 means end of file), str_replace (replace old_str with new_str only if it occurs exactly once), \
insert_line (insert text before 1-indexed line_num), delete_line (remove 1-indexed line_num), \
create (write file_text to path, creating parent directories and overwriting any existing file).";
pub const TOOL_INPUT_SCHEMA: &str = r#"{
    "type": "object",
    "properties": {
        "command": {
            "type": "string",
            "enum": ["view", "str_replace", "insert_line", "delete_line", "create"],
            "description": "The command to run"
        },
        "path": {
            "type": "string",
            "description": "Path relative to the sandbox root"
        },
        "view_range": {
            "type": "array",
            "items": { "type": "integer" },
            "minItems": 2,
            "maxItems": 2,
            "description": "Optional [start, end] line range for view, 1-indexed and inclusive. Use -1 as end to read to the end of the file"
        },
        "old_str": {
            "type": "string",
            "description": "Text to replace (str_replace). Must match exactly once"
        },
        "new_str": {
            "type": "string",
            "description": "Replacement text (str_replace)"
        },
        "line_num": {
            "type": "integer",
            "description": "1-indexed line number (insert_line, delete_line)"
        },
        "text": {
            "type": "string",
            "description": "Line to insert (insert_line)"
        },
        "file_text": {
            "type": "string",
            "description": "Full file contents (create)"
        }
    },
    "required": ["command", "path"]
}"#;

pub trait InternalTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
}

impl InternalTool for TextEditor {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    fn input_schema(&self) -> Value {
        input_schema()
    }
}

pub fn input_schema() -> Value {
    serde_json::from_str(TOOL_INPUT_SCHEMA).unwrap_or_default()
}

/// Name, description and schema in the shape tool-calling APIs expect.
pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": TOOL_DESCRIPTION,
        "input_schema": input_schema(),
    })
}
