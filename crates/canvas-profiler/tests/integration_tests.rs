//! Integration tests for the profiling engine and job worker.
//!
//! These tests verify end-to-end behavior using generated datasets and the
//! in-memory and local-directory stores.

use canvas_profiler::storage::{InMemoryStores, LocalObjectStore, ObjectStore};
use canvas_profiler::{
    CancellationToken, DataProfiler, DatasetLoader, DatasetVersion, FileType, Job, JobOutcome, JobProcessor,
    JobProgress, JobStage, JobStatus, ProfilerConfig, SemanticType, Severity, VersionStatus,
    WarningCode,
};
use parking_lot::Mutex;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// 100 rows, three fully populated numeric columns with low mutual correlation.
fn uncorrelated_csv() -> Vec<u8> {
    let mut csv = String::from("a,b,c\n");
    for i in 0..100 {
        csv.push_str(&format!("{},{},{}\n", i, (i * 37) % 101, (i * 53) % 89));
    }
    csv.into_bytes()
}

/// 100 rows with 60, 35 and 20 missing values in the three columns.
fn missing_csv() -> Vec<u8> {
    let mut csv = String::from("m60,m35,m20\n");
    let cell = |i: usize, missing: usize, value: usize| {
        if i < missing {
            String::new()
        } else {
            value.to_string()
        }
    };
    for i in 0..100 {
        csv.push_str(&format!(
            "{},{},{}\n",
            cell(i, 60, (i * 37) % 101),
            cell(i, 35, (i * 53) % 89),
            cell(i, 20, (i * 13) % 97)
        ));
    }
    csv.into_bytes()
}

fn profile_csv(bytes: Vec<u8>) -> canvas_profiler::DatasetProfile {
    DataProfiler::new(ProfilerConfig::default())
        .profile_bytes(bytes, FileType::Csv)
        .expect("profiling should succeed")
}

fn seed(stores: &InMemoryStores, job_id: &str, version_id: &str, bytes: Vec<u8>) {
    let path = format!("d1/{version_id}.csv");
    stores.objects.put("datasets", &path, bytes);
    stores
        .versions
        .insert(DatasetVersion::uploaded(version_id, "d1", path, None));
    stores.jobs.insert(Job::queued_profile(job_id, version_id));
}

fn processor(stores: &InMemoryStores) -> JobProcessor {
    JobProcessor::builder()
        .stores(stores.context())
        .build()
        .expect("processor should build")
}

// ============================================================================
// Profiling Tests
// ============================================================================

#[test]
fn test_clean_numeric_dataset_has_no_warnings() {
    let profile = profile_csv(uncorrelated_csv());

    assert_eq!(profile.stats.row_count, 100);
    assert_eq!(profile.stats.column_count, 3);
    assert_eq!(profile.warnings, vec![]);
    assert!(!profile.meta.sampled);
    assert!(!profile.meta.statistics_sampled);

    for column in &profile.columns {
        assert_eq!(column.missing_count, 0);
        let stats = column.numeric_stats().expect("numeric stats");
        assert!(stats.min <= stats.median && stats.median <= stats.max);
    }
}

#[test]
fn test_missing_totals_are_consistent() {
    let profile = profile_csv(missing_csv());

    let sum: usize = profile.columns.iter().map(|c| c.missing_count).sum();
    assert_eq!(sum, profile.missing.total_missing);
    assert_eq!(profile.missing.total_missing, 115);
    assert_eq!(profile.missing.total_missing_percentage, 38.33);

    let order: Vec<&str> = profile
        .missing
        .columns_with_missing
        .iter()
        .map(|c| c.column.as_str())
        .collect();
    assert_eq!(order, vec!["m60", "m35", "m20"]);
}

#[test]
fn test_missing_value_warning_severities() {
    let profile = profile_csv(missing_csv());

    let missing: Vec<(Vec<String>, Severity)> = profile
        .warnings_with_code(WarningCode::HighMissing)
        .map(|w| (w.columns.clone(), w.severity))
        .collect();

    assert_eq!(
        missing,
        vec![
            (vec!["m60".to_string()], Severity::High),
            (vec!["m35".to_string()], Severity::Med),
        ]
    );
}

#[test]
fn test_high_correlation_reported_once() {
    let mut csv = String::from("x,y,z\n");
    for i in 0..100 {
        csv.push_str(&format!("{},{},{}\n", i, 2 * i + 1, (i * 37) % 101));
    }
    let profile = profile_csv(csv.into_bytes());

    let correlated: Vec<_> = profile
        .warnings_with_code(WarningCode::HighCorrelation)
        .collect();
    assert_eq!(correlated.len(), 1);
    assert_eq!(correlated[0].columns, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(correlated[0].severity, Severity::Med);
}

#[test]
fn test_correlation_matrix_is_symmetric_with_unit_diagonal() {
    let profile = profile_csv(uncorrelated_csv());
    let matrix = &profile.correlations;
    let n = matrix.columns.len();
    assert_eq!(n, 3);

    for i in 0..n {
        let diagonal = matrix.get(i, i).expect("diagonal present");
        assert!((diagonal - 1.0).abs() < 1e-6);
        for j in 0..n {
            assert_eq!(matrix.get(i, j), matrix.get(j, i));
        }
    }
}

#[test]
fn test_oversized_file_is_head_sampled() {
    let mut csv = String::from("id,value,label\n");
    for i in 0..80_000 {
        csv.push_str(&format!("{},{},category_{}\n", i, (i * 7919) % 10_007, i % 7));
    }
    let bytes = csv.into_bytes();
    assert!(bytes.len() > 1024 * 1024);

    let config = ProfilerConfig::builder()
        .max_file_size_mb(1)
        .head_sample_size(5_000)
        .build()
        .unwrap();
    let profile = DataProfiler::new(config)
        .profile_bytes(bytes, FileType::Csv)
        .unwrap();

    assert_eq!(profile.stats.row_count, 5_000);
    assert!(profile.meta.sampled);
    assert!(profile.meta.sampling_note.is_some());
    assert_eq!(profile.warnings_with_code(WarningCode::Sampling).count(), 1);
    assert_eq!(
        profile.warnings.last().map(|w| w.code),
        Some(WarningCode::Sampling)
    );
}

#[test]
fn test_small_file_below_threshold_keeps_all_rows() {
    let config = ProfilerConfig::builder()
        .max_file_size_mb(1)
        .head_sample_size(10)
        .build()
        .unwrap();
    let profile = DataProfiler::new(config)
        .profile_bytes(uncorrelated_csv(), FileType::Csv)
        .unwrap();

    assert_eq!(profile.stats.row_count, 100);
    assert_eq!(profile.warnings_with_code(WarningCode::Sampling).count(), 0);
}

#[test]
fn test_statistics_sample_is_reproducible() {
    let config = ProfilerConfig::builder()
        .max_sample_size(30)
        .sample_seed(7)
        .build()
        .unwrap();
    let profiler = DataProfiler::new(config);

    let first = profiler
        .profile_bytes(uncorrelated_csv(), FileType::Csv)
        .unwrap();
    let second = profiler
        .profile_bytes(uncorrelated_csv(), FileType::Csv)
        .unwrap();

    assert!(first.meta.statistics_sampled);
    assert_eq!(first.meta.sample_size, 30);
    assert_eq!(first.stats.row_count, 100);
    assert_eq!(first.columns, second.columns);
}

#[test]
fn test_parquet_and_json_match_csv_shape() {
    let mut df = df! {
        "a" => (0..50i64).collect::<Vec<_>>(),
        "b" => (0..50).map(|i| format!("g{}", i % 3)).collect::<Vec<_>>(),
    }
    .unwrap();

    let mut parquet = Vec::new();
    ParquetWriter::new(&mut parquet).finish(&mut df).unwrap();

    let json: String = (0..50)
        .map(|i| format!("{{\"a\": {}, \"b\": \"g{}\"}}\n", i, i % 3))
        .collect();

    let profiler = DataProfiler::new(ProfilerConfig::default());
    let from_parquet = profiler.profile_bytes(parquet, FileType::Parquet).unwrap();
    let from_json = profiler
        .profile_bytes(json.into_bytes(), FileType::Json)
        .unwrap();

    for profile in [&from_parquet, &from_json] {
        assert_eq!(profile.stats.row_count, 50);
        assert_eq!(profile.stats.column_count, 2);
        let b = profile.column("b").unwrap();
        assert_eq!(b.unique_count, 3);
        assert_eq!(b.top_values().map(|t| t.len()), Some(3));
    }
}

#[test]
fn test_excel_workbook_profile() {
    let bytes = std::fs::read(fixtures_path().join("orders.xlsx")).expect("fixture exists");

    let loaded = DatasetLoader::new(&ProfilerConfig::default())
        .load(bytes, FileType::Excel)
        .unwrap();
    assert_eq!(loaded.df.shape(), (6, 5));
    assert!(!loaded.sampled);

    let profile = DataProfiler::new(ProfilerConfig::default())
        .profile(&loaded)
        .unwrap();
    let types: Vec<(&str, SemanticType)> = profile
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.inferred_type))
        .collect();
    assert_eq!(
        types,
        vec![
            ("order_id", SemanticType::Numeric),
            ("amount", SemanticType::Numeric),
            ("paid", SemanticType::Boolean),
            ("ordered_at", SemanticType::Datetime),
            ("region", SemanticType::Categorical),
        ]
    );
    assert_eq!(profile.column("region").unwrap().unique_count, 3);
}

#[test]
fn test_profile_serializes_with_tagged_stats() {
    let profile = profile_csv(uncorrelated_csv());
    let value = serde_json::to_value(&profile).unwrap();

    assert_eq!(value["columns"][0]["stats"]["kind"], "numeric");
    assert_eq!(value["columns"][0]["inferred_type"], "numeric");
    assert!(value["charts"].as_array().is_some_and(|c| !c.is_empty()));
}

// ============================================================================
// Job Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_successful_job_progress_sequence() {
    let stores = InMemoryStores::new();
    seed(&stores, "j1", "v1", uncorrelated_csv());

    let stages = Arc::new(Mutex::new(Vec::new()));
    let stages_clone = stages.clone();
    let processor = JobProcessor::builder()
        .stores(stores.context())
        .on_progress(move |update: JobProgress| stages_clone.lock().push(update.stage))
        .build()
        .unwrap();

    let outcome = processor.process_job_by_id("j1").await.unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Completed {
            row_count: 100,
            column_count: 3
        }
    );
    assert_eq!(stores.jobs.progress_history("j1"), vec![10, 50, 80, 100]);
    assert_eq!(
        *stages.lock(),
        vec![
            JobStage::Claimed,
            JobStage::Loaded,
            JobStage::Profiled,
            JobStage::Completed
        ]
    );

    let job = stores.jobs.snapshot("j1").unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());

    let version = stores.versions.snapshot("v1").unwrap();
    assert_eq!(version.status, VersionStatus::Ready);
    assert_eq!(version.row_count, Some(100));
    assert_eq!(version.column_count, Some(3));

    let record = stores.profiles.snapshot("v1").unwrap();
    assert_eq!(record.statistics.stats.row_count, 100);
    assert_eq!(record.warnings, vec![]);
}

#[tokio::test]
async fn test_reprofiling_replaces_profile() {
    let stores = InMemoryStores::new();
    seed(&stores, "j1", "v1", uncorrelated_csv());
    let processor = processor(&stores);

    processor.process_job_by_id("j1").await.unwrap();
    assert_eq!(stores.profiles.len(), 1);
    let first = stores.profiles.snapshot("v1").unwrap();

    stores.jobs.insert(Job::queued_profile("j2", "v1"));
    processor.process_job_by_id("j2").await.unwrap();

    assert_eq!(stores.profiles.len(), 1);
    let second = stores.profiles.snapshot("v1").unwrap();
    assert_eq!(first.statistics.columns, second.statistics.columns);
    assert!(second.computed_at >= first.computed_at);
}

#[tokio::test]
async fn test_failed_job_is_isolated() {
    let stores = InMemoryStores::new();
    seed(&stores, "j-good", "v-good", uncorrelated_csv());
    stores.objects.put("datasets", "d1/notes.docx", b"not a table".to_vec());
    stores.versions.insert(DatasetVersion::uploaded(
        "v-bad",
        "d1",
        "d1/notes.docx",
        None,
    ));
    stores.jobs.insert(Job::queued_profile("j-bad", "v-bad"));

    let summary = processor(&stores).run_sweep().await.unwrap();
    assert_eq!(summary.selected, 2);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);

    let bad = stores.jobs.snapshot("j-bad").unwrap();
    assert_eq!(bad.status, JobStatus::Failed);
    assert!(bad.progress < 100);
    assert!(
        bad.error_message
            .as_deref()
            .is_some_and(|m| m.contains("Unsupported file type"))
    );
    assert_eq!(
        stores.versions.snapshot("v-bad").unwrap().status,
        VersionStatus::Error
    );

    assert_eq!(
        stores.jobs.snapshot("j-good").unwrap().status,
        JobStatus::Completed
    );
    assert!(stores.profiles.snapshot("v-bad").is_none());
    assert!(stores.profiles.snapshot("v-good").is_some());
}

#[tokio::test]
async fn test_missing_object_fails_job() {
    let stores = InMemoryStores::new();
    stores.versions.insert(DatasetVersion::uploaded(
        "v1",
        "d1",
        "d1/absent.csv",
        None,
    ));
    stores.jobs.insert(Job::queued_profile("j1", "v1"));

    let outcome = processor(&stores).process_job_by_id("j1").await.unwrap();

    assert!(matches!(outcome, JobOutcome::Failed { .. }));
    assert_eq!(stores.jobs.progress_history("j1").first(), Some(&10));
    assert_eq!(
        stores.jobs.snapshot("j1").unwrap().status,
        JobStatus::Failed
    );
}

#[tokio::test]
async fn test_worker_reads_from_local_directory() {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalObjectStore::new(dir.path());
    local
        .upload("uploads", "sales.csv", uncorrelated_csv(), "text/csv")
        .await
        .unwrap();

    let stores = InMemoryStores::new();
    stores.versions.insert(DatasetVersion::uploaded(
        "v1",
        "d1",
        "sales.csv",
        Some("text/csv".to_string()),
    ));
    stores.jobs.insert(Job::queued_profile("j1", "v1"));

    let processor = JobProcessor::builder()
        .stores(stores.context().with_objects(Arc::new(local)))
        .config(
            ProfilerConfig::builder()
                .datasets_bucket("uploads")
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let outcome = processor.process_job_by_id("j1").await.unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { row_count: 100, .. }));
}

#[tokio::test]
async fn test_poller_drains_queue_and_stops_on_cancel() {
    let stores = InMemoryStores::new();
    for i in 0..4 {
        seed(&stores, &format!("j{i}"), &format!("v{i}"), uncorrelated_csv());
    }

    let token = CancellationToken::new();
    let processor = JobProcessor::builder()
        .stores(stores.context())
        .config(
            ProfilerConfig::builder()
                .poll_interval(Duration::from_millis(20))
                .jobs_per_sweep(2)
                .build()
                .unwrap(),
        )
        .cancellation_token(token.clone())
        .build()
        .unwrap();
    let handle = tokio::spawn(async move { processor.run_poller().await });

    let jobs = stores.jobs.clone();
    tokio::time::timeout(Duration::from_secs(20), async move {
        while !jobs.all_terminal() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("queue should drain");

    token.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("poller should stop promptly")
        .unwrap()
        .unwrap();

    assert_eq!(stores.profiles.len(), 4);
    for i in 0..4 {
        assert_eq!(
            stores.jobs.progress_history(&format!("j{i}")),
            vec![10, 50, 80, 100]
        );
    }
}
