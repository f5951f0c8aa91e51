mod common;

use serde_json::json;
use std::fs;
use tempfile::TempDir;

use common::{create_temp_file, create_test_editor, send};

#[test]
fn test_parent_traversal_touches_nothing() {
    let (editor, dir) = create_test_editor();
    let outside = dir.path().parent().unwrap().join("sandbox_editor_escape.txt");

    for (id, input) in [
        ("1", json!({"command": "create", "path": "../sandbox_editor_escape.txt", "file_text": "x"})),
        ("2", json!({"command": "view", "path": "../../../../etc/passwd"})),
        ("3", json!({"command": "insert_line", "path": "a/../../x.txt", "line_num": 1, "text": "x"})),
        ("4", json!({"command": "delete_line", "path": "..", "line_num": 1})),
    ] {
        let envelope = send(&editor, id, input);
        assert_eq!(envelope.id, id);
        assert!(
            envelope.content.starts_with("ERROR: path escapes sandbox:"),
            "unexpected content: {}",
            envelope.content
        );
    }

    assert!(!outside.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_absolute_paths_are_rooted() {
    let (editor, dir) = create_test_editor();

    let envelope = send(
        &editor,
        "1",
        json!({"command": "create", "path": "/etc/sandbox_editor_test.txt", "file_text": "inside"}),
    );
    assert!(!envelope.is_error());
    assert_eq!(
        fs::read_to_string(dir.path().join("etc/sandbox_editor_test.txt")).unwrap(),
        "inside"
    );
}

#[test]
fn test_sibling_prefix_directory_rejected() {
    let parent = TempDir::new().unwrap();
    let root = parent.path().join("root");
    let sibling = parent.path().join("root2");
    fs::create_dir(&root).unwrap();
    fs::create_dir(&sibling).unwrap();
    fs::write(sibling.join("secret.txt"), "secret").unwrap();

    let sandbox = sandbox_editor::tools::sandbox::Sandbox::new(&root).unwrap();
    let editor = sandbox_editor::tools::text_editor::TextEditor::new(
        sandbox,
        sandbox_editor::tools::view::FileViewer::default(),
    );

    let envelope = send(
        &editor,
        "1",
        json!({"command": "str_replace", "path": "../root2/secret.txt", "old_str": "secret", "new_str": "leaked"}),
    );
    assert!(envelope.is_error());
    assert_eq!(fs::read_to_string(sibling.join("secret.txt")).unwrap(), "secret");
}

#[cfg(unix)]
#[test]
fn test_symlink_escape_rejected() {
    let outside = TempDir::new().unwrap();
    let secret = create_temp_file(&outside, "secret.txt", "do not touch\n");

    let (editor, dir) = create_test_editor();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
    std::os::unix::fs::symlink(&secret, dir.path().join("file_link")).unwrap();

    let envelope = send(
        &editor,
        "1",
        json!({"command": "delete_line", "path": "link/secret.txt", "line_num": 1}),
    );
    assert!(envelope.is_error());

    let envelope = send(
        &editor,
        "2",
        json!({"command": "insert_line", "path": "file_link", "line_num": 1, "text": "pwned"}),
    );
    assert!(envelope.is_error());

    let envelope = send(
        &editor,
        "3",
        json!({"command": "create", "path": "link/new.txt", "file_text": "x"}),
    );
    assert!(envelope.is_error());

    assert_eq!(fs::read_to_string(&secret).unwrap(), "do not touch\n");
    assert!(!outside.path().join("new.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_create_through_dangling_file_link_rejected() {
    let outside = TempDir::new().unwrap();
    let target = outside.path().join("pwned.txt");

    let (editor, dir) = create_test_editor();
    std::os::unix::fs::symlink(&target, dir.path().join("evil")).unwrap();

    let envelope = send(
        &editor,
        "1",
        json!({"command": "create", "path": "evil", "file_text": "owned"}),
    );
    assert_eq!(envelope.content, "ERROR: path escapes sandbox: evil");
    assert!(!target.exists());
}

#[cfg(unix)]
#[test]
fn test_create_through_dangling_dir_link_rejected() {
    let outside = TempDir::new().unwrap();
    let target_dir = outside.path().join("not_yet");

    let (editor, dir) = create_test_editor();
    std::os::unix::fs::symlink(&target_dir, dir.path().join("drop")).unwrap();

    let envelope = send(
        &editor,
        "1",
        json!({"command": "create", "path": "drop/nested/file.txt", "file_text": "owned"}),
    );
    assert!(envelope.is_error());
    assert!(!target_dir.exists());
    assert_eq!(fs::read_dir(outside.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn test_create_through_dangling_link_inside_root() {
    let (editor, dir) = create_test_editor();
    std::os::unix::fs::symlink("real.txt", dir.path().join("alias.txt")).unwrap();

    let envelope = send(
        &editor,
        "1",
        json!({"command": "create", "path": "alias.txt", "file_text": "kept inside"}),
    );
    assert!(!envelope.is_error());
    assert_eq!(
        fs::read_to_string(dir.path().join("real.txt")).unwrap(),
        "kept inside"
    );
}

#[test]
fn test_view_root_directory() {
    let (editor, dir) = create_test_editor();
    create_temp_file(&dir, "src/main.rs", "fn main() {}\n");
    create_temp_file(&dir, "README.md", "# readme\n");

    let envelope = send(&editor, "1", json!({"command": "view", "path": ""}));
    assert_eq!(envelope.content, "Directory listing:\nREADME.md\nsrc");

    let envelope = send(&editor, "2", json!({"command": "view", "path": "/src"}));
    assert_eq!(envelope.content, "Directory listing:\nmain.rs");
}
