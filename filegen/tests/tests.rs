use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn check_filegen_help() {
    let mut cmd = Command::cargo_bin("filegen").unwrap();
    cmd.arg("--help").assert().success();
}

#[test]
fn generates_flat_fileset() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("filegen")
        .unwrap()
        .arg(dir.path())
        .args(["4", "10KiB", "--bufsize", "3K"])
        .assert()
        .success();
    let root = dir.path().join("filegen");
    let mut names: Vec<_> = std::fs::read_dir(&root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["file0", "file1", "file2", "file3"]);
    for name in names {
        assert_eq!(std::fs::metadata(root.join(name)).unwrap().len(), 10 * 1024);
    }
}

#[test]
fn existing_root_fails() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("filegen")).unwrap();
    Command::cargo_bin("filegen")
        .unwrap()
        .arg(dir.path())
        .args(["1", "1K"])
        .assert()
        .code(1);
}

#[test]
fn generates_more_files_than_open_files_limit() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("filegen")
        .unwrap()
        .arg(dir.path())
        .args(["200", "1K", "--max-open-files", "2"])
        .assert()
        .success();
    assert_eq!(std::fs::read_dir(dir.path().join("filegen")).unwrap().count(), 200);
}
