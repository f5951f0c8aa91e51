#![allow(dead_code)]

use sandbox_editor::tools::sandbox::Sandbox;
use sandbox_editor::tools::text_editor::{CommandRequest, ResultEnvelope, TextEditor};
use sandbox_editor::tools::tokens::WordCountEstimator;
use sandbox_editor::tools::view::FileViewer;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Once};
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_test_logger() {
    INIT.call_once(|| {
        let path = std::env::temp_dir().join("sandbox_editor_tests/log.txt");
        sandbox_editor::init_logger_with_path(path).unwrap();
    });
}

/// An editor rooted in a fresh temp dir. Keep the `TempDir` alive for the
/// duration of the test.
pub fn create_test_editor() -> (TextEditor, TempDir) {
    init_test_logger();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let sandbox = Sandbox::new(dir.path()).expect("Failed to create sandbox");
    (TextEditor::new(sandbox, FileViewer::default()), dir)
}

/// Like [`create_test_editor`] but with a tiny token budget so truncation
/// kicks in on small files.
pub fn create_test_editor_with_budget(
    max_tokens: usize,
    safety_margin: usize,
) -> (TextEditor, TempDir) {
    init_test_logger();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let sandbox = Sandbox::new(dir.path()).expect("Failed to create sandbox");
    let viewer = FileViewer::new(max_tokens, safety_margin, Arc::new(WordCountEstimator));
    (TextEditor::new(sandbox, viewer), dir)
}

pub fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).expect("Failed to write test file");
    path
}

pub fn numbered_lines(count: usize) -> String {
    (1..=count)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn send(editor: &TextEditor, id: &str, input: Value) -> ResultEnvelope {
    editor.handle(&CommandRequest::new(id, input))
}
