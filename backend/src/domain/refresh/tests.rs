//! Tests for the refresh cycle and its scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rstest::rstest;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::domain::ports::{
    DirectorySourceError, FixtureIdentitySource, LocalIdentity, MockDirectorySource,
};
use crate::domain::{DirectoryRecord, DirectorySnapshot, OrgInfo, StartDate};
use crate::test_support::{
    FixedClock, RecordingTimer, ScriptedDirectorySource, TimerEvent, directory_record,
    resolved_user,
};

fn organization() -> OrgInfo {
    OrgInfo {
        name: "Co".into(),
        subdomain: "co".into(),
    }
}

fn configured() -> DirectoryCredentials {
    DirectoryCredentials::new("client", "secret")
}

fn alice_record() -> DirectoryRecord {
    let mut record = directory_record("1", "Alice@Co.com");
    record.start_date = StartDate::parse("2020-01-15");
    record.phone = "555".into();
    record.job_title = "Eng".into();
    record.department_id = Some("d1".into());
    record
}

fn alice_directory() -> ScriptedDirectorySource {
    ScriptedDirectorySource::new(organization())
        .with_page(vec![alice_record()])
        .with_group("d1", "Engineering")
}

fn local_users() -> Vec<LocalIdentity> {
    vec![LocalIdentity::new("alice", "alice@co.com")]
}

fn prior_snapshot() -> DirectorySnapshot {
    [resolved_user("alice", "old-1"), resolved_user("bob", "old-2")]
        .into_iter()
        .collect()
}

struct Harness {
    synchronizer: Arc<Synchronizer>,
    snapshots: Arc<SnapshotStore>,
}

fn harness(
    directory: Arc<dyn DirectorySource>,
    identities: Vec<LocalIdentity>,
    credentials: DirectoryCredentials,
    timer: Arc<dyn RefreshTimer>,
) -> Harness {
    let snapshots = Arc::new(SnapshotStore::new());
    let clock = FixedClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid time"),
    );
    let synchronizer = Synchronizer::new(
        SynchronizerPorts {
            directory,
            identities: Arc::new(FixtureIdentitySource::new(identities)),
            snapshots: Arc::clone(&snapshots),
            credentials: Arc::new(CredentialsStore::new(credentials)),
            timer,
            clock: Arc::new(clock),
        },
        SynchronizerConfig::default(),
    );
    Harness {
        synchronizer: Arc::new(synchronizer),
        snapshots,
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[rstest]
#[case::missing_client_id(DirectoryCredentials::new("", "secret"))]
#[case::missing_secret(DirectoryCredentials::new("client", ""))]
#[tokio::test]
async fn unconfigured_refresh_is_a_no_op(#[case] credentials: DirectoryCredentials) {
    let timer = Arc::new(RecordingTimer::default());
    let h = harness(
        Arc::new(MockDirectorySource::new()),
        local_users(),
        credentials,
        Arc::clone(&timer) as Arc<dyn RefreshTimer>,
    );
    h.snapshots.publish(prior_snapshot());

    assert_eq!(h.synchronizer.refresh().await, RefreshOutcome::NotConfigured);

    assert!(timer.armed().is_empty());
    assert_eq!(*h.snapshots.current(), prior_snapshot());
    assert_eq!(h.synchronizer.status(), RefreshStatus::default());
}

#[tokio::test]
async fn timer_is_armed_before_any_network_call() {
    let timer = Arc::new(RecordingTimer::default());
    let observed = Arc::clone(&timer);
    let mut directory = MockDirectorySource::new();
    directory
        .expect_request_token()
        .times(1)
        .returning(move |_| {
            assert_eq!(observed.armed(), vec![DEFAULT_REFRESH_INTERVAL]);
            Err(DirectorySourceError::transport("connection refused"))
        });
    let h = harness(
        Arc::new(directory),
        local_users(),
        configured(),
        Arc::clone(&timer) as Arc<dyn RefreshTimer>,
    );

    let outcome = h.synchronizer.refresh().await;

    assert!(matches!(
        outcome,
        RefreshOutcome::Failed(ref error) if error.kind() == SyncErrorKind::Transport
    ));
    assert_eq!(
        timer.events(),
        vec![
            TimerEvent::Disarmed,
            TimerEvent::Armed(DEFAULT_REFRESH_INTERVAL)
        ]
    );
}

#[tokio::test]
async fn publishes_resolved_users() {
    let directory = Arc::new(alice_directory());
    let h = harness(
        Arc::clone(&directory) as Arc<dyn DirectorySource>,
        local_users(),
        configured(),
        Arc::new(RecordingTimer::default()),
    );

    assert_eq!(
        h.synchronizer.refresh().await,
        RefreshOutcome::Published { users: 1 }
    );

    let alice = h.snapshots.lookup("alice").expect("alice should be published");
    assert_eq!(alice.id, "1");
    assert_eq!(
        (alice.start_year, alice.start_month, alice.start_day),
        (2020, 1, 15)
    );
    assert_eq!(alice.phone, "555");
    assert_eq!(alice.job_title, "Eng");
    assert_eq!(alice.department, "Engineering");
    assert_eq!(alice.manager, "");
    assert_eq!(alice.url, "https://co.pingboard.com/users/1");

    let status = h.synchronizer.status();
    assert_eq!(status.phase, RefreshPhase::Idle);
    assert!(status.last_published_at.is_some());
    assert!(status.last_failed_at.is_none());
}

#[tokio::test]
async fn shared_departments_are_looked_up_once() {
    let mut second = directory_record("2", "bob@co.com");
    second.department_id = Some("d1".into());
    let directory = Arc::new(
        ScriptedDirectorySource::new(organization())
            .with_page(vec![alice_record(), second])
            .with_group("d1", "Engineering"),
    );
    let h = harness(
        Arc::clone(&directory) as Arc<dyn DirectorySource>,
        vec![
            LocalIdentity::new("alice", "alice@co.com"),
            LocalIdentity::new("bob", "bob@co.com"),
        ],
        configured(),
        Arc::new(RecordingTimer::default()),
    );

    assert_eq!(
        h.synchronizer.refresh().await,
        RefreshOutcome::Published { users: 2 }
    );
    assert_eq!(directory.group_requests(), 1);
}

#[tokio::test]
async fn ambiguous_directory_keeps_the_prior_snapshot() {
    let directory = Arc::new(
        ScriptedDirectorySource::new(organization())
            .with_page(vec![alice_record(), directory_record("2", "alice@co.com")]),
    );
    let timer = Arc::new(RecordingTimer::default());
    let h = harness(
        Arc::clone(&directory) as Arc<dyn DirectorySource>,
        local_users(),
        configured(),
        Arc::clone(&timer) as Arc<dyn RefreshTimer>,
    );
    h.snapshots.publish(prior_snapshot());

    let outcome = h.synchronizer.refresh().await;

    assert!(matches!(
        outcome,
        RefreshOutcome::Failed(SyncError::Ambiguous {
            side: AmbiguitySide::Directory,
            ..
        })
    ));
    assert_eq!(*h.snapshots.current(), prior_snapshot());
    assert_eq!(timer.armed(), vec![DEFAULT_REFRESH_INTERVAL]);
    let status = h.synchronizer.status();
    assert_eq!(status.phase, RefreshPhase::Idle);
    assert!(status.last_failed_at.is_some());
}

#[tokio::test]
async fn overlapping_refresh_is_dropped() {
    let gate = Arc::new(Semaphore::new(0));
    let directory = Arc::new(alice_directory().gated(Arc::clone(&gate)));
    let h = harness(
        Arc::clone(&directory) as Arc<dyn DirectorySource>,
        local_users(),
        configured(),
        Arc::new(RecordingTimer::default()),
    );

    let running = tokio::spawn({
        let synchronizer = Arc::clone(&h.synchronizer);
        async move { synchronizer.refresh().await }
    });
    wait_until(|| directory.page_requests() == 1).await;
    assert_eq!(
        h.synchronizer.status().phase,
        RefreshPhase::FetchingDirectoryPages
    );

    assert_eq!(h.synchronizer.refresh().await, RefreshOutcome::AlreadyRunning);

    gate.add_permits(1);
    assert_eq!(
        running.await.expect("refresh task should finish"),
        RefreshOutcome::Published { users: 1 }
    );
    assert_eq!(directory.token_requests(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn readers_see_whole_snapshots_during_a_slow_refresh() {
    let gate = Arc::new(Semaphore::new(0));
    let directory = Arc::new(alice_directory().gated(Arc::clone(&gate)));
    let h = harness(
        Arc::clone(&directory) as Arc<dyn DirectorySource>,
        local_users(),
        configured(),
        Arc::new(RecordingTimer::default()),
    );
    let old = prior_snapshot();
    h.snapshots.publish(old.clone());

    let done = Arc::new(AtomicBool::new(false));
    let reader = tokio::spawn({
        let snapshots = Arc::clone(&h.snapshots);
        let done = Arc::clone(&done);
        async move {
            let mut reads = 0_u32;
            loop {
                let seen = snapshots.current();
                let is_old = *seen == old;
                let is_new = seen.len() == 1
                    && seen.get("alice").is_some_and(|alice| alice.id == "1");
                assert!(is_old || is_new, "observed a partial snapshot: {seen:?}");
                reads += 1;
                if done.load(Ordering::SeqCst) {
                    return reads;
                }
                tokio::task::yield_now().await;
            }
        }
    });

    let refresh = tokio::spawn({
        let synchronizer = Arc::clone(&h.synchronizer);
        async move { synchronizer.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        h.snapshots.lookup("alice").map(|alice| alice.id),
        Some("old-1".to_owned())
    );

    gate.add_permits(1);
    assert_eq!(
        refresh.await.expect("refresh task should finish"),
        RefreshOutcome::Published { users: 1 }
    );
    done.store(true, Ordering::SeqCst);
    let reads = reader.await.expect("reader should not observe a mix");

    assert!(reads > 0);
    assert!(h.snapshots.lookup("bob").is_none());
    assert_eq!(
        h.snapshots.lookup("alice").map(|alice| alice.id),
        Some("1".to_owned())
    );
}

#[rstest]
#[case("", false)]
#[case("   ", false)]
#[case("Mozilla/5.0", true)]
fn identity_creation_filter(#[case] user_agent: &str, #[case] expected: bool) {
    let event = IdentityCreatedEvent {
        user_agent: user_agent.to_owned(),
    };
    assert_eq!(event.is_user_originated(), expected);
}

mod scheduling {
    use super::*;

    struct Running {
        directory: Arc<ScriptedDirectorySource>,
        snapshots: Arc<SnapshotStore>,
        timer: TokioRefreshTimer,
        handle: RefreshHandle,
        task: tokio::task::JoinHandle<()>,
    }

    fn start(credentials: DirectoryCredentials) -> Running {
        start_with(Arc::new(alice_directory()), credentials)
    }

    fn start_with(
        directory: Arc<ScriptedDirectorySource>,
        credentials: DirectoryCredentials,
    ) -> Running {
        let timer = TokioRefreshTimer::new();
        let h = harness(
            Arc::clone(&directory) as Arc<dyn DirectorySource>,
            local_users(),
            credentials,
            Arc::new(timer.clone()),
        );
        let (handle, task) =
            RefreshScheduler::spawn(h.synchronizer, timer.clone(), CancellationToken::new());
        Running {
            directory,
            snapshots: h.snapshots,
            timer,
            handle,
            task,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn configuration_change_triggers_a_refresh() {
        let running = start(DirectoryCredentials::default());

        assert!(running.handle.configuration_changed(configured()));
        wait_until(|| running.snapshots.lookup("alice").is_some()).await;

        assert_eq!(running.directory.token_requests(), 1);
        assert!(running.timer.deadline().is_some());
        running.handle.shutdown();
        running.task.await.expect("scheduler should stop");
    }

    #[tokio::test(start_paused = true)]
    async fn configuration_change_during_a_cycle_runs_again() {
        let gate = Arc::new(Semaphore::new(0));
        let running = start_with(
            Arc::new(alice_directory().gated(Arc::clone(&gate))),
            DirectoryCredentials::default(),
        );

        assert!(running
            .handle
            .configuration_changed(DirectoryCredentials::new("client", "old")));
        wait_until(|| running.directory.page_requests() == 1).await;
        assert!(running
            .handle
            .configuration_changed(DirectoryCredentials::new("client", "new")));
        gate.add_permits(2);
        wait_until(|| running.directory.token_requests() == 2).await;

        assert_eq!(running.directory.token_secrets(), vec!["old", "new"]);
        running.handle.shutdown();
        running.task.await.expect("scheduler should stop");
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_configuration_does_not_trigger() {
        let running = start(configured());

        assert!(!running.handle.configuration_changed(configured()));
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }

        assert_eq!(running.directory.token_requests(), 0);
        running.handle.shutdown();
        running.task.await.expect("scheduler should stop");
    }

    #[tokio::test(start_paused = true)]
    async fn armed_timer_triggers_the_next_cycle() {
        let running = start(configured());
        assert!(running.handle.request(RefreshReason::IdentityCreated));
        wait_until(|| running.directory.token_requests() == 1).await;
        wait_until(|| running.timer.deadline().is_some()).await;

        tokio::time::advance(DEFAULT_REFRESH_INTERVAL + Duration::from_secs(1)).await;
        wait_until(|| running.directory.token_requests() == 2).await;

        assert!(running.timer.deadline().is_some());
        running.handle.shutdown();
        running.task.await.expect("scheduler should stop");
    }

    #[tokio::test(start_paused = true)]
    async fn system_identity_creations_are_ignored() {
        let running = start(configured());

        assert!(!running.handle.identity_created(&IdentityCreatedEvent::default()));
        assert!(running.handle.identity_created(&IdentityCreatedEvent {
            user_agent: "Mozilla/5.0".into(),
        }));
        wait_until(|| running.directory.token_requests() == 1).await;

        running.handle.shutdown();
        running.task.await.expect("scheduler should stop");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_scheduler() {
        let running = start(configured());

        running.handle.shutdown();
        running.task.await.expect("scheduler should stop");

        assert!(!running.handle.request(RefreshReason::Timer));
        assert_eq!(running.directory.token_requests(), 0);
    }
}
