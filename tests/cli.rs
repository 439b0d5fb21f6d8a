use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn skills_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("skills");
    path
}

fn setup_test_env(github_section: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("notes.md"),
        "---\ntitle: Release Notes Writer\ndescription: Drafts release notes from merged PRs\ncategory: writing\ntags: [Release, Docs]\n---\n\nCollect merged pull requests and group them by label.\n",
    )
    .unwrap();
    fs::write(
        files_dir.join("rename.md"),
        "---\ntitle: Changelog Writer\n---\n",
    )
    .unwrap();
    fs::write(files_dir.join("short.md"), "---\ntitle: Tiny\ndescription: Far too short body\n---\nHi.\n").unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/skills.sqlite"

[server]
bind = "127.0.0.1:7341"

{}
"#,
        root.display(),
        github_section
    );

    let config_path = config_dir.join("skills.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_skills(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = skills_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run skills binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn field<'a>(stdout: &'a str, label: &str) -> &'a str {
    stdout
        .lines()
        .find_map(|l| l.trim().strip_prefix(label))
        .map(str::trim)
        .unwrap_or_else(|| panic!("no '{}' in output:\n{}", label, stdout))
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_skills(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    let (_, _, success) = run_skills(&config_path, &["init"]);
    assert!(success, "Second init failed (not idempotent)");
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env("[github]\nrepo = \"not-a-repo\"\n");

    let (_, stderr, success) = run_skills(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("owner/name"), "stderr={}", stderr);
}

#[test]
fn test_skill_add_update_show() {
    let (tmp, config_path) = setup_test_env("");
    run_skills(&config_path, &["init"]);

    let notes = tmp.path().join("files/notes.md");
    let (stdout, stderr, success) = run_skills(
        &config_path,
        &["skill", "add", notes.to_str().unwrap(), "--author-email", "dev@example.com"],
    );
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("created release-notes-writer-"));
    let id = field(&stdout, "id:").to_string();

    let rename = tmp.path().join("files/rename.md");
    let (stdout, stderr, success) =
        run_skills(&config_path, &["skill", "update", &id, rename.to_str().unwrap()]);
    assert!(success, "update failed: stdout={}, stderr={}", stdout, stderr);
    let tail = &id[id.len() - 4..];
    assert!(stdout.contains(&format!("updated changelog-writer-{}", tail)));
    assert!(stdout.contains("versions: 2"));

    let (stdout, _, success) = run_skills(&config_path, &["skill", "show", &id]);
    assert!(success);
    assert!(stdout.contains("Changelog Writer"));
    assert!(stdout.contains("release, docs"));
    assert!(stdout.contains("--- Versions (2) ---"));
    assert!(stdout.contains("1.0.1"));
}

#[test]
fn test_trial_author_limit() {
    let (tmp, config_path) = setup_test_env("");
    run_skills(&config_path, &["init"]);

    let notes = tmp.path().join("files/notes.md");
    let args = ["skill", "add", notes.to_str().unwrap(), "--author-email", "new@example.com"];
    for _ in 0..3 {
        let (stdout, stderr, success) = run_skills(&config_path, &args);
        assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    }

    let (_, stderr, success) = run_skills(&config_path, &args);
    assert!(!success);
    assert!(stderr.contains("trial limit reached"), "stderr={}", stderr);
}

#[test]
fn test_invalid_skill_is_not_written() {
    let (tmp, config_path) = setup_test_env("");
    run_skills(&config_path, &["init"]);

    let short = tmp.path().join("files/short.md");
    let (_, stderr, success) = run_skills(&config_path, &["skill", "add", short.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("invalid"), "stderr={}", stderr);

    let (_, stderr, success) = run_skills(&config_path, &["skill", "show", "tiny"]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_unknown_job() {
    let (_tmp, config_path) = setup_test_env("");
    run_skills(&config_path, &["init"]);

    let (_, stderr, success) = run_skills(&config_path, &["job", "no-such-job"]);
    assert!(!success);
    assert!(stderr.contains("sync job not found"));
}
