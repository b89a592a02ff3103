mod common;

use std::time::Duration;

use anyhow::Context;
use common::{RESTORE_NAME, harness, restore_owner, stored_request};
use datamover_config::TrackingMode;
use datamover_core::{ObjectKey, Phase, TransferKind, TransferStatus};
use tokio::time::Instant;

fn in_progress() -> TransferStatus {
    TransferStatus {
        phase: Some(Phase::InProgress),
        ..TransferStatus::default()
    }
}

fn restored() -> impl FnOnce(&mut TransferStatus) {
    |status| {
        status.phase = Some(Phase::Completed);
        status.snapshot_handle = Some("snap-restored".into());
    }
}

#[tokio::test(start_paused = true)]
async fn restore_waits_run_to_completion_before_reporting_a_failure() -> anyhow::Result<()> {
    let harness = harness(TrackingMode::Asynchronous)?;
    for (volume, name) in [("db", "vsr-1"), ("cache", "vsr-2"), ("uploads", "vsr-3")] {
        harness
            .store
            .insert(stored_request(&restore_owner(volume), "apps", name, in_progress()));
    }

    let waiter = harness.deps.restore_waiter();
    let started = Instant::now();
    let wait = tokio::spawn(async move { waiter.wait_for_restores(RESTORE_NAME).await });

    tokio::time::sleep(Duration::from_secs(6)).await;
    harness
        .store
        .set_phase(TransferKind::Restore, &ObjectKey::new("apps", "vsr-2"), Phase::Failed);
    harness.store.update_status(
        TransferKind::Restore,
        &ObjectKey::new("apps", "vsr-1"),
        restored(),
    );

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(!wait.is_finished(), "a failure must not cancel the other waits");
    harness.store.update_status(
        TransferKind::Restore,
        &ObjectKey::new("apps", "vsr-3"),
        restored(),
    );

    let err = wait
        .await?
        .err()
        .context("the failed restore is reported")?;
    assert!(err.is_terminal_failure());
    assert_eq!(started.elapsed(), Duration::from_secs(30));

    let snapshot = harness.metrics.snapshot();
    assert_eq!(snapshot.reconcile_terminal_failures, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn restore_waits_count_completed_requests() -> anyhow::Result<()> {
    let harness = harness(TrackingMode::Asynchronous)?;
    let waiter = harness.deps.restore_waiter();
    assert_eq!(waiter.wait_for_restores(RESTORE_NAME).await?, 0);

    for (volume, name) in [("db", "vsr-1"), ("cache", "vsr-2")] {
        let mut status = in_progress();
        restored()(&mut status);
        harness
            .store
            .insert(stored_request(&restore_owner(volume), "apps", name, status));
    }
    assert_eq!(waiter.wait_for_restores(RESTORE_NAME).await?, 2);
    assert_eq!(waiter.wait_for_restores("another-restore").await?, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn restore_status_wait_tracks_one_source_volume() -> anyhow::Result<()> {
    let harness = harness(TrackingMode::Asynchronous)?;
    let waiter = harness.deps.restore_waiter();

    let nothing_yet = waiter
        .wait_for_restore_status_data(RESTORE_NAME, "db")
        .await?;
    assert!(nothing_yet.is_none());

    harness
        .store
        .insert(stored_request(&restore_owner("db"), "apps", "vsr-1", TransferStatus::default()));
    let background = waiter.clone();
    let wait = tokio::spawn(async move {
        background
            .wait_for_restore_status_data(RESTORE_NAME, "db")
            .await
    });

    tokio::time::sleep(Duration::from_secs(3)).await;
    harness.store.update_status(
        TransferKind::Restore,
        &ObjectKey::new("apps", "vsr-1"),
        |status| {
            status.phase = Some(Phase::InProgress);
            status.snapshot_handle = Some("snap-restored".into());
        },
    );

    let request = wait.await??.context("request was listed")?;
    assert_eq!(request.key(), Some(ObjectKey::new("apps", "vsr-1")));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn restore_list_failures_abort_the_wait() -> anyhow::Result<()> {
    let harness = harness(TrackingMode::Asynchronous)?;
    harness
        .store
        .insert(stored_request(&restore_owner("db"), "apps", "vsr-1", in_progress()));
    harness.store.fail_next_lists(1);

    let err = harness
        .deps
        .restore_waiter()
        .wait_for_restores(RESTORE_NAME)
        .await
        .err()
        .context("list failure is surfaced")?;
    assert!(!err.is_not_found());
    assert!(matches!(
        err,
        datamover_coordinator::CoordinatorError::Store { .. }
    ));
    Ok(())
}
