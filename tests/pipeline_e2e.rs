use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log_aggregator_core::storage::{LogQuery, LogStore, SortSpec};
use log_aggregator_core::{MemoryStore, Pipeline, PipelineError, RunStage, Settings};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const SERVICE_LOG: &str = "\
INFO | jvm 1 | 2022/07/11 18:13:47 | AsyncFileSystem | Async | Service started
ERROR | jvm 1 | 2022/07/11 18:20:05 | RequestHandler | Sync | Request failed
    at com.example.RequestHandler.handle(RequestHandler.java:88)
    at java.base/java.lang.Thread.run(Thread.java:829)
WARN | jvm 1 | 2022/07/11 18:15:30 | Disk usage above threshold
";

fn write_archive(dir: &Path, name: &str, members: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    for (member, contents) in members {
        zip.start_file(*member, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

fn settings(root: &TempDir) -> Settings {
    let sourcedir = root.path().join("source");
    std::fs::create_dir_all(&sourcedir).unwrap();
    Settings {
        sourcedir,
        outdir: root.path().join("out"),
        max_concurrent_tasks: 4,
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_single_archive_end_to_end() {
    let root = TempDir::new().unwrap();
    let settings = settings(&root);
    write_archive(
        &settings.sourcedir,
        "GBLogs_node1.example.com_fanapiservice_1657563227839.zip",
        &[
            ("System/fanapiservice.log", SERVICE_LOG),
            ("System/readme.txt", "not a log"),
        ],
    );
    let outdir = settings.outdir.clone();

    let store = Arc::new(MemoryStore::init("logs", "memory://local").unwrap());
    let mut pipeline = Pipeline::new(settings, store.clone());
    let report = pipeline.run().await.unwrap();

    assert_eq!(pipeline.stage(), RunStage::Done);
    assert_eq!(report.archives_processed, 1);
    assert_eq!(report.files_converted, 1);
    assert_eq!(report.records_inserted, 3);
    assert_eq!(store.len(), 3);

    let timestamps: Vec<_> = report.records.iter().map(|r| r.timestamp()).collect();
    assert_eq!(timestamps.len(), 3);
    assert!(timestamps.windows(2).all(|pair| pair[0] >= pair[1]));

    let error = &report.records[0];
    assert_eq!(error.severity.as_deref(), Some("ERROR"));
    assert_eq!(error.node(), "node1");
    assert!(error.message().starts_with("Request failed; at com.example"));

    let warning = &report.records[1];
    assert_eq!(warning.message(), "Disk usage above threshold");
    assert_eq!(warning.module, None);

    let extracted = outdir.join("node1").join("fanapiservice");
    assert!(extracted
        .join("GBLogs_node1.example.com_fanapiservice_1657563227839_fanapiservice.log")
        .is_file());
    assert!(!extracted.join("System").exists());
    assert!(!extracted.join("readme.txt").exists());

    for id in &report.inserted_ids {
        store.get(*id).await.unwrap();
    }
}

#[tokio::test]
async fn test_many_archives_fan_in() {
    let root = TempDir::new().unwrap();
    let settings = settings(&root);
    for node in ["node1", "node2", "node3"] {
        for category in ["fanapiservice", "authservice"] {
            let log = format!(
                "INFO | jvm 1 | 2022/07/11 10:00:00 | {category} | Async | {node} up\n\
                 WARN | jvm 1 | 2022/07/11 11:00:00 | {category} | Async | {node} slow\n"
            );
            let member = format!("System/{category}.log");
            write_archive(
                &settings.sourcedir,
                &format!("GBLogs_{node}.example.com_{category}_1657563227839.zip"),
                &[(member.as_str(), log.as_str())],
            );
        }
    }

    let store = Arc::new(MemoryStore::init("logs", "memory://local").unwrap());
    let report = Pipeline::new(settings, store.clone()).run().await.unwrap();
    assert_eq!(report.archives_processed, 6);
    assert_eq!(report.files_converted, 6);
    assert_eq!(report.records_inserted, 12);

    let node2 = store
        .find(
            &LogQuery::all().node("node2"),
            Some(&SortSpec::timestamp_descending()),
        )
        .await
        .unwrap();
    assert_eq!(node2.len(), 4);
    assert_eq!(node2[0].severity.as_deref(), Some("WARN"));
}

fn single_record(message: &str) -> String {
    format!("INFO | jvm 1 | 2022/07/11 18:13:47 | Src | T | {message}\n")
}

#[tokio::test]
async fn test_same_node_and_category_archives_keep_both_files() {
    for max_concurrent_tasks in [0, 1] {
        let root = TempDir::new().unwrap();
        let settings = Settings {
            max_concurrent_tasks,
            ..settings(&root)
        };
        let run_a = single_record("from run A");
        let run_b = single_record("from run B");
        write_archive(
            &settings.sourcedir,
            "GBLogs_node1_fanapiservice_1657563227839.zip",
            &[("System/fanapiservice.log", run_a.as_str())],
        );
        write_archive(
            &settings.sourcedir,
            "GBLogs_node1_fanapiservice_1657563299999.zip",
            &[("System/fanapiservice.log", run_b.as_str())],
        );

        let store = Arc::new(MemoryStore::init("logs", "memory://local").unwrap());
        let report = Pipeline::new(settings, store.clone()).run().await.unwrap();

        assert_eq!(report.archives_processed, 2);
        assert_eq!(report.files_converted, 2);
        assert_eq!(report.records_inserted, 2);
        let mut messages: Vec<_> = report.records.iter().map(|r| r.message()).collect();
        messages.sort();
        assert_eq!(messages, vec!["from run A", "from run B"]);
    }
}

#[tokio::test]
async fn test_second_run_inserts_only_its_own_records() {
    let root = TempDir::new().unwrap();
    let settings = settings(&root);
    let store = Arc::new(MemoryStore::init("logs", "memory://local").unwrap());

    let run_a = single_record("from run A");
    let first = write_archive(
        &settings.sourcedir,
        "GBLogs_node1_fanapiservice_1657563227839.zip",
        &[("System/fanapiservice.log", run_a.as_str())],
    );
    let report = Pipeline::new(settings.clone(), store.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(report.records_inserted, 1);

    std::fs::remove_file(first).unwrap();
    let run_b = format!(
        "{}{}",
        single_record("from run B"),
        single_record("from run B again")
    );
    write_archive(
        &settings.sourcedir,
        "GBLogs_node1_fanapiservice_1657563299999.zip",
        &[("System/fanapiservice.log", run_b.as_str())],
    );
    let report = Pipeline::new(settings, store.clone()).run().await.unwrap();

    assert_eq!(report.files_converted, 1);
    assert_eq!(report.records_inserted, 2);
    assert_eq!(store.len(), 3);
    for id in &report.inserted_ids {
        assert!(store.get(*id).await.unwrap().message().starts_with("from run B"));
    }
}

#[tokio::test]
async fn test_empty_source_is_configuration_error() {
    let root = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::init("logs", "memory://local").unwrap());
    let mut pipeline = Pipeline::new(settings(&root), store.clone());

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::NoArchives { .. }));
    assert_eq!(pipeline.stage(), RunStage::Aborted);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_corrupt_archive_fails_run() {
    let root = TempDir::new().unwrap();
    let settings = settings(&root);
    std::fs::write(
        settings
            .sourcedir
            .join("GBLogs_node1.example.com_fanapiservice_1657563227839.zip"),
        b"definitely not a zip",
    )
    .unwrap();

    let store = Arc::new(MemoryStore::init("logs", "memory://local").unwrap());
    let err = Pipeline::new(settings, store.clone())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Archive(_)));
    assert!(store.is_empty());
}
