use fsutil::mock::{MockFileSystem, MockOperation};
use fsutil::{Encoding, FileSystemError, FsOptions, FsUtil, ReadOptions};
use std::io;
use std::time::{Duration, SystemTime};

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[tokio::test]
async fn test_latest_mtime_scenario() {
    let fs = MockFileSystem::new();
    fs.add_directory("/src");
    fs.add_directory("/src/sub");
    fs.add_file("/src/a.txt", "a", at(100));
    fs.add_file("/src/sub/b.txt", "b", at(200));
    let util = FsUtil::new(fs);

    assert_eq!(util.mtime_r("/src").await.unwrap(), Some(at(200)));
}

#[tokio::test]
async fn test_copy_then_replace_leaves_only_new_tree() {
    let fs = MockFileSystem::new();
    fs.add_directory("/t1");
    fs.add_directory("/t1/nested");
    fs.add_file("/t1/one.txt", "1", SystemTime::now());
    fs.add_file("/t1/nested/deep.txt", "deep", SystemTime::now());
    fs.add_directory("/t2");
    fs.add_file("/t2/two.txt", "2", SystemTime::now());
    let util = FsUtil::new(fs.clone());

    util.cp_r("/t1", "/d").await.unwrap();
    assert!(fs.exists("/d/nested/deep.txt"));

    util.cp_r_replacing("/t2", "/d").await.unwrap();
    let copied: Vec<String> = fs
        .list_all_paths()
        .into_iter()
        .filter(|p| p.starts_with("/d"))
        .collect();
    assert_eq!(copied, vec!["/d".to_string(), "/d/two.txt".to_string()]);
    assert_eq!(fs.get_file_content("/d/two.txt").unwrap(), b"2");
}

#[tokio::test]
async fn test_copy_bumps_latest_mtime() {
    let fs = MockFileSystem::new();
    fs.add_directory("/src");
    fs.add_file("/src/a.txt", "a", at(100));
    fs.add_file("/src/b.txt", "b", at(300));
    let util = FsUtil::new(fs);

    util.cp_r("/src", "/dest").await.unwrap();
    let latest = util.mtime_r("/dest").await.unwrap().unwrap();
    assert!(latest >= at(300));
}

#[tokio::test]
async fn test_remove_missing_paths_is_idempotent() {
    let util = FsUtil::new(MockFileSystem::new());

    util.rm_rf("/does/not/exist").await.unwrap();
    util.rm_rf_many(&["/does/not/exist", "/also/missing"]).await.unwrap();
    let none: [&str; 0] = [];
    util.rm_rf_many(&none).await.unwrap();
}

#[tokio::test]
async fn test_remove_many_reports_failure_after_all_finish() {
    let fs = MockFileSystem::new();
    fs.add_file("/keep-failing", "x", SystemTime::now());
    fs.add_file("/gone", "x", SystemTime::now());
    fs.fail_on(MockOperation::RemoveFile, "/keep-failing", io::ErrorKind::PermissionDenied);
    let util = FsUtil::new(fs.clone());

    let err = util.rm_rf_many(&["/keep-failing", "/gone"]).await.unwrap_err();
    assert!(matches!(err, FileSystemError::Io { ref path, .. } if path == "/keep-failing"));
    assert!(!fs.exists("/gone"));
}

#[tokio::test]
async fn test_mkdir_r_with_existing_prefix() {
    let fs = MockFileSystem::new();
    fs.add_directory("a");
    let util = FsUtil::new(fs.clone());

    util.mkdir_r("a/b/c").await.unwrap();
    assert!(fs.exists("a/b"));
    assert!(fs.exists("a/b/c"));
}

#[tokio::test]
async fn test_mkdir_r_propagates_other_failures() {
    let fs = MockFileSystem::new();
    fs.fail_on(MockOperation::CreateDirectory, "a/b", io::ErrorKind::PermissionDenied);
    let util = FsUtil::new(fs.clone());

    assert!(util.mkdir_r("a/b/c").await.is_err());
    assert!(fs.exists("a"));
    assert!(!fs.exists("a/b/c"));
}

#[tokio::test]
async fn test_read_text_as_bytes_is_type_mismatch() {
    let fs = MockFileSystem::new();
    fs.add_file("/notes.txt", "caf\u{e9}", SystemTime::now());
    let util = FsUtil::new(fs);

    let options = ReadOptions::new().with_encoding(Encoding::Latin1);
    let err = util.read_file_to_bytes("/notes.txt", &options).await.unwrap_err();
    assert!(matches!(err, FileSystemError::TypeMismatch(_)));
}

#[tokio::test]
async fn test_read_dir_missing_is_not_found() {
    let util = FsUtil::new(MockFileSystem::new());
    assert!(util.read_dir("/missing").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_wide_directory_with_small_fan_out() {
    let fs = MockFileSystem::new();
    fs.add_directory("/wide");
    for i in 0..100u64 {
        fs.add_file(&format!("/wide/f{i:03}"), "x", at(1_000 + i));
    }
    let util = FsUtil::with_options(fs.clone(), FsOptions::default().with_max_concurrency(4));

    assert_eq!(util.mtime_r("/wide").await.unwrap(), Some(at(1_099)));
    util.rm_rf("/wide").await.unwrap();
    assert!(fs.list_all_paths().is_empty());
}
