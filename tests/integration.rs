use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn archive_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_matrix-archive"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let room_dir = root.join("logs/json/General Chat");
    fs::create_dir_all(&room_dir).unwrap();
    fs::write(
        room_dir.join("2021-01-01.json"),
        r#"[
  {"ts": 1609459200000, "senderName": "Alice (@alice:example.com)", "senderId": "@alice:example.com", "id": "$1",
   "content": {"msgtype": "m.text", "body": "deploying the kubernetes cluster today"}},
  {"ts": 1609459260000, "senderName": "Bob", "senderId": "@bob:example.com", "id": "$2",
   "content": {"msgtype": "m.emote", "body": "cheers"}}
]"#,
    )
    .unwrap();
    fs::write(
        room_dir.join("2021-01-02.json"),
        r#"[
  {"ts": 1609545600000, "senderName": "Bob", "senderId": "@bob:example.com", "id": "$3",
   "content": {"msgtype": "m.text", "body": "rust borrow checker question"}},
  {"ts": 1609545660000, "senderName": "Alice", "senderId": "@alice:example.com", "id": "$4",
   "content": {"msgtype": "m.text", "body": "ask away"}}
]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[paths]
json_root = "{root}/logs/json"
historical_root = "{root}/logs/historical"
docs_root = "{root}/logs/docs"
sql_dir = "{root}/sql"

[[rooms]]
room = "General Chat"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("archive.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_archive(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = archive_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_render_writes_pages() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_archive(&config_path, &["render"]);
    assert!(success, "render failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("days rendered: 2"));

    let docs = tmp.path().join("logs/docs");
    assert!(docs.join("General_Chat/2021-01-01.html").exists());
    assert!(docs.join("General_Chat/2021-01-02.html").exists());
    assert!(docs.join("index.html").exists());
}

#[test]
fn test_index_writes_db_and_marker() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_archive(&config_path, &["index"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files read: 2"));
    assert!(stdout.contains("rows inserted: 4"));

    let sql = tmp.path().join("sql");
    assert!(sql.join("General_Chat.sqlite3").exists());
    let marker = fs::read_to_string(sql.join("General_Chat-last-added.json")).unwrap();
    assert_eq!(marker, r#"{"file":"2021-01-02.json","ids":["$3","$4"]}"#);
}

#[test]
fn test_index_twice_skips_second_pass() {
    let (tmp, config_path) = setup_test_env();

    let (_, _, success) = run_archive(&config_path, &["index"]);
    assert!(success);
    let marker_path = tmp.path().join("sql/General_Chat-last-added.json");
    let before = fs::read_to_string(&marker_path).unwrap();

    let (stdout, _, success) = run_archive(&config_path, &["index"]);
    assert!(success);
    assert!(stdout.contains("skipped: database exists"));
    assert!(!stdout.contains("rows inserted"));
    assert_eq!(fs::read_to_string(&marker_path).unwrap(), before);
}

#[test]
fn test_search_finds_indexed_message() {
    let (_tmp, config_path) = setup_test_env();
    run_archive(&config_path, &["index"]);

    let (stdout, stderr, success) = run_archive(&config_path, &["search", "General Chat", "kub*"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("<Alice (@alice:example.com)>"));
    assert!(stdout.contains("link: General_Chat/2021-01-01.html#L0"));

    let (stdout, _, success) = run_archive(&config_path, &["search", "General Chat", "nonexistentword"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_without_db_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, _, success) = run_archive(&config_path, &["search", "General Chat", "rust"]);
    assert!(!success);
}

#[test]
fn test_unknown_room_exits_nonzero() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_archive(&config_path, &["index", "Nowhere"]);
    assert!(!success);
    assert!(stderr.contains("room not found: Nowhere"));
}

#[test]
fn test_invalid_config_exits_nonzero() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[[modifications]]\nroom = \"x\"\n").unwrap();
    let (_, _, success) = run_archive(&config_path, &["rooms"]);
    assert!(!success);
}

#[test]
fn test_rooms_lists_status() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_archive(&config_path, &["rooms"]);
    assert!(success);
    assert!(stdout.contains("General Chat"));
    assert!(stdout.contains("live"));
}
