//! Bulk jobs against a populated store: they only touch rows they can match
//! and override officer ownership with the system identity.

use std::io::Write;
use std::sync::Arc;

use chrono::Utc;

use groundcheck::auth::{Officer, OfficerIdentity, Role};
use groundcheck::reconciliation::{JobError, StatusReconciliation};
use groundcheck::storage::InMemoryStore;
use groundcheck::verification::{
    Idsbr, SystemClock, VerificationRecord, VerificationService, VerificationStore,
    VerificationSubmission,
};

fn populated_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::default());
    store.load_records(vec![
        VerificationRecord::unverified("BIZ001", "Warung Sate", "Jl. Satu", "3201010001"),
        VerificationRecord::unverified("BIZ002", "Bengkel Motor", "Jl. Dua", "3201010001"),
    ]);
    store
}

async fn snapshot(store: &InMemoryStore) -> Vec<Option<VerificationRecord>> {
    let mut records = Vec::new();
    for id in ["BIZ001", "BIZ002"] {
        records.push(store.fetch(&Idsbr::new(id)).await.expect("fetch"));
    }
    records
}

#[tokio::test]
async fn absent_identifier_counts_not_found_and_changes_nothing() {
    let store = populated_store();
    let before = snapshot(&store).await;
    let progress_before = store.progress().await.expect("stats");

    let job = StatusReconciliation::new(store.clone(), Arc::new(SystemClock));
    let report = job
        .run("idsbr,status,lat,lng\nBIZ999,active,-6.2,106.8\n".as_bytes())
        .await
        .expect("job runs");

    assert_eq!(report.not_found, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(snapshot(&store).await, before);
    assert_eq!(store.progress().await.expect("stats"), progress_before);
}

#[tokio::test]
async fn bulk_rows_override_officer_ownership() {
    let store = populated_store();
    let service = VerificationService::new(store.clone(), Arc::new(SystemClock));
    let officer = Officer::new(OfficerIdentity::new("Ani", "ani@desa.id"), Role::Officer);
    service
        .submit(
            &officer,
            VerificationSubmission {
                idsbr: Some("BIZ001".to_string()),
                latitude: -6.2,
                longitude: 106.8,
                status: "active".to_string(),
                is_new: false,
                name: None,
                address: None,
                region_code: None,
            },
        )
        .await
        .expect("officer verifies");

    let job = StatusReconciliation::new(store.clone(), Arc::new(SystemClock));
    let report = job
        .run("idsbr,status,lat,lng\nBIZ001,closed,-6.25,106.85\n".as_bytes())
        .await
        .expect("job runs");
    assert_eq!(report.updated, 1);

    let record = store
        .fetch(&Idsbr::new("BIZ001"))
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(record.owner, Some(OfficerIdentity::system()));
    assert_eq!(record.coordinate.map(|c| c.latitude), Some(-6.25));
    assert_eq!(service.completed_count("ani@desa.id").await.expect("count"), 0);
}

#[tokio::test]
async fn jobs_read_from_files_and_fail_on_missing_ones() {
    let store = populated_store();
    let job = StatusReconciliation::new(store.clone(), Arc::new(SystemClock));

    let path = std::env::temp_dir().join(format!(
        "groundcheck-status-{}-{}.csv",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let mut file = std::fs::File::create(&path).expect("temp file");
    writeln!(file, "idsbr,status,lat,lng").expect("write header");
    writeln!(file, "BIZ002,active,,").expect("write row");
    drop(file);

    let report = job.run_path(&path).await.expect("job runs");
    std::fs::remove_file(&path).ok();
    assert_eq!(report.updated, 1);

    assert!(matches!(
        job.run_path(&path).await,
        Err(JobError::Open { .. })
    ));
}
