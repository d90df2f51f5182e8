//! End-to-end sync flows against the in-memory remote store.

use grainlog_sync::db::Database;
use grainlog_sync::sync::{MemoryRemote, SyncOrchestrator, SyncState};
use grainlog_sync::SyncTable;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn session(remote: &Arc<MemoryRemote>) -> SyncOrchestrator {
    SyncOrchestrator::new(
        Database::open_in_memory().unwrap(),
        "user-1",
        Arc::clone(remote) as Arc<dyn grainlog_sync::sync::RemoteStore>,
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_offline_create_syncs_when_connectivity_returns() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = session(&remote);

    let record = orchestrator
        .write(SyncTable::Rolls, None, fields(json!({"film": "HP5+", "frames": 36})))
        .await
        .unwrap();

    let status = orchestrator.current_status();
    assert_eq!(status.state, SyncState::Offline);
    assert_eq!(status.pending, 1);
    assert!(remote.row(SyncTable::Rolls, &record.id.as_str()).is_none());

    orchestrator.set_online(true).await;
    let report = orchestrator.sync_now().await.unwrap();
    assert!(report.ran);
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.upload_failures, 0);

    let uploaded = remote.row(SyncTable::Rolls, &record.id.as_str()).unwrap();
    assert_eq!(uploaded.fields["film"], json!("HP5+"));
    assert_eq!(orchestrator.current_status().state, SyncState::Synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rapid_edits_coalesce_into_one_delivery() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = session(&remote);
    orchestrator.set_online(true).await;

    let record = orchestrator
        .write(SyncTable::Frames, None, fields(json!({"aperture": "f/2"})))
        .await
        .unwrap();
    for aperture in ["f/2.8", "f/4", "f/5.6"] {
        orchestrator
            .write(
                SyncTable::Frames,
                Some(&record.id),
                fields(json!({"aperture": aperture})),
            )
            .await
            .unwrap();
    }
    assert_eq!(orchestrator.current_status().pending, 1);

    let report = orchestrator.sync_now().await.unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(remote.upsert_calls(), 1);

    let row = remote.row(SyncTable::Frames, &record.id.as_str()).unwrap();
    assert_eq!(row.fields["aperture"], json!("f/5.6"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_run_is_idempotent() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = session(&remote);
    orchestrator.set_online(true).await;

    orchestrator
        .write(SyncTable::Cameras, None, fields(json!({"make": "Nikon"})))
        .await
        .unwrap();
    orchestrator.sync_now().await.unwrap();

    let report = orchestrator.sync_now().await.unwrap();
    assert!(report.ran);
    assert_eq!(report.uploaded, 0);
    assert_eq!(remote.upsert_calls(), 1);
    assert_eq!(orchestrator.current_status().state, SyncState::Synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_propagates_tombstone_and_hides_row() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = session(&remote);
    orchestrator.set_online(true).await;

    let record = orchestrator
        .write(SyncTable::Lenses, None, fields(json!({"focal_length": 50})))
        .await
        .unwrap();
    orchestrator.sync_now().await.unwrap();

    orchestrator.delete(SyncTable::Lenses, &record.id).await.unwrap();
    assert!(orchestrator.records(SyncTable::Lenses).await.unwrap().is_empty());

    orchestrator.sync_now().await.unwrap();
    let row = remote.row(SyncTable::Lenses, &record.id.as_str()).unwrap();
    assert!(row.deleted_at.is_some());

    // the local row survives as a tombstone, not a physical delete
    let local = orchestrator
        .record(SyncTable::Lenses, &record.id)
        .await
        .unwrap()
        .unwrap();
    assert!(local.is_deleted());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_permanent_failure_needs_user_action_and_spares_the_rest() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = session(&remote);
    orchestrator.set_online(true).await;

    let bad = orchestrator
        .write(SyncTable::Rolls, None, fields(json!({"film": "bad"})))
        .await
        .unwrap();
    let good = orchestrator
        .write(SyncTable::Rolls, None, fields(json!({"film": "good"})))
        .await
        .unwrap();
    remote.fail_permanently(SyncTable::Rolls, &bad.id.as_str());

    let report = orchestrator.sync_now().await.unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.upload_failures, 1);
    assert!(remote.row(SyncTable::Rolls, &good.id.as_str()).is_some());

    let status = orchestrator.current_status();
    assert_eq!(status.state, SyncState::Error);
    assert_eq!(status.failed, 1);

    let summary = orchestrator.failed_summary().await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].table, SyncTable::Rolls);

    // discarding the entry abandons replication but keeps the local row
    assert_eq!(orchestrator.discard_failed().await.unwrap(), 1);
    assert_eq!(orchestrator.current_status().state, SyncState::Synced);
    assert!(orchestrator
        .record(SyncTable::Rolls, &bad.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transient_outage_retries_on_next_run() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = session(&remote);
    orchestrator.set_online(true).await;

    let record = orchestrator
        .write(SyncTable::Films, None, fields(json!({"name": "Portra 400"})))
        .await
        .unwrap();
    remote.fail_transient_once(SyncTable::Films, &record.id.as_str());

    let report = orchestrator.sync_now().await.unwrap();
    assert_eq!(report.uploaded, 0);
    assert_eq!(report.upload_failures, 1);
    // transient failures retry silently; no user attention needed
    assert_eq!(orchestrator.current_status().state, SyncState::Syncing);

    let report = orchestrator.sync_now().await.unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(orchestrator.current_status().state, SyncState::Synced);
    assert!(remote.row(SyncTable::Films, &record.id.as_str()).is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_conflicting_edit_resolves_server_wins_with_audit() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = session(&remote);
    orchestrator.set_online(true).await;

    let record = orchestrator
        .write(SyncTable::Rolls, None, fields(json!({"film": "HP5+"})))
        .await
        .unwrap();
    orchestrator.sync_now().await.unwrap();

    // another device edits the same roll on the server
    let mut theirs = remote.row(SyncTable::Rolls, &record.id.as_str()).unwrap();
    theirs.replace_fields(fields(json!({"film": "Delta 3200"})), theirs.updated_at + 50);
    remote.insert_row(SyncTable::Rolls, theirs.clone());

    // our own edit stays queued this run because its upload fails
    orchestrator
        .write(
            SyncTable::Rolls,
            Some(&record.id),
            fields(json!({"film": "Tri-X"})),
        )
        .await
        .unwrap();
    remote.fail_transient_once(SyncTable::Rolls, &record.id.as_str());

    let report = orchestrator.sync_now().await.unwrap();
    assert_eq!(report.conflicts, 1);

    // server value won locally
    let local = orchestrator
        .record(SyncTable::Rolls, &record.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(local.fields["film"], json!("Delta 3200"));

    let conflicts = orchestrator.recent_conflicts(10).await.unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].table, SyncTable::Rolls);
    assert_eq!(conflicts[0].entity_id, record.id.as_str());
    assert_eq!(conflicts[0].resolved_by, "server_wins");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_two_devices_converge_through_the_remote() {
    let remote = Arc::new(MemoryRemote::new());
    let device_a = session(&remote);
    let device_b = session(&remote);
    device_a.set_online(true).await;
    device_b.set_online(true).await;

    let record = device_a
        .write(SyncTable::Cameras, None, fields(json!({"make": "Leica", "model": "M6"})))
        .await
        .unwrap();
    device_a.sync_now().await.unwrap();

    let report = device_b.sync_now().await.unwrap();
    assert_eq!(report.downloaded, 1);

    let rows = device_b.records(SyncTable::Cameras).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, record.id);
    assert_eq!(rows[0].fields["make"], json!("Leica"));

    // a delete on one device reaches the other; the pause keeps the
    // tombstone's clock strictly ahead of device B's download cursor
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    device_a.delete(SyncTable::Cameras, &record.id).await.unwrap();
    device_a.sync_now().await.unwrap();
    device_b.sync_now().await.unwrap();
    assert!(device_b.records(SyncTable::Cameras).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_cursor_bounds_repeat_pulls() {
    let remote = Arc::new(MemoryRemote::new());
    let orchestrator = session(&remote);
    orchestrator.set_online(true).await;

    let other = session(&remote);
    other.set_online(true).await;
    other
        .write(SyncTable::Films, None, fields(json!({"name": "Ektar 100"})))
        .await
        .unwrap();
    other.sync_now().await.unwrap();

    let report = orchestrator.sync_now().await.unwrap();
    assert_eq!(report.downloaded, 1);
    let cursors = orchestrator.sync_cursors().await.unwrap();
    assert!(cursors.last_download > 0);

    // nothing new on the server: the next window is empty
    let report = orchestrator.sync_now().await.unwrap();
    assert_eq!(report.downloaded, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_queue_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grainlog.db");
    let remote = Arc::new(MemoryRemote::new());

    let record = {
        let orchestrator = SyncOrchestrator::new(
            Database::open(&path).unwrap(),
            "user-1",
            Arc::clone(&remote) as Arc<dyn grainlog_sync::sync::RemoteStore>,
        )
        .unwrap();
        orchestrator
            .write(SyncTable::Rolls, None, fields(json!({"film": "HP5+"})))
            .await
            .unwrap()
    };

    let orchestrator = SyncOrchestrator::new(
        Database::open(&path).unwrap(),
        "user-1",
        Arc::clone(&remote) as Arc<dyn grainlog_sync::sync::RemoteStore>,
    )
    .unwrap();
    assert_eq!(orchestrator.current_status().pending, 1);

    orchestrator.set_online(true).await;
    orchestrator.sync_now().await.unwrap();
    assert!(remote.row(SyncTable::Rolls, &record.id.as_str()).is_some());
}
