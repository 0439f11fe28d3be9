//! The lock session: one owned context per editor session.
//!
//! All state lives here and is only mutated through `&mut self`, which the
//! host calls from its main thread. Lock operations run on the tokio runtime
//! and report back through an unbounded channel that only
//! [`LockSession::pump`] drains, so nothing off the main thread ever touches
//! the caches or the busy gate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alk_cache::{DecoratedSet, Decoration, LockCache, ProjectionRules, StatusCache};
use alk_gate::{BusyGate, BusyState, Eligibility, LockEligibility};
use alk_repo::{PathMapper, Repository, RepositoryEvent};
use alk_types::{AssetGuid, AssetPath, CacheUpdateEvent, Clock, RepoPath, SystemClock};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

use crate::completion::{Completion, LockOp};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::presentation::IconResolver;

/// What a call to [`LockSession::pump`] did.
#[derive(Debug, Default)]
pub struct PumpReport {
    /// Accepted status notifications.
    pub status_updates: usize,
    /// Accepted lock notifications.
    pub lock_updates: usize,
    /// Notifications ignored because their token was already applied.
    pub stale_events: usize,
    /// Notifications the channel dropped before they were read.
    pub lagged_events: u64,
    /// Operations that reported back.
    pub completions: Vec<Completion>,
}

impl PumpReport {
    pub fn is_empty(&self) -> bool {
        self.status_updates == 0
            && self.lock_updates == 0
            && self.stale_events == 0
            && self.lagged_events == 0
            && self.completions.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Completion> {
        self.completions.iter().filter(|c| !c.is_success())
    }

    /// Fold a later report into this one.
    pub fn merge(&mut self, other: PumpReport) {
        self.status_updates += other.status_updates;
        self.lock_updates += other.lock_updates;
        self.stale_events += other.stale_events;
        self.lagged_events += other.lagged_events;
        self.completions.extend(other.completions);
    }
}

/// Owned context for one editor session.
pub struct LockSession {
    repository: Arc<dyn Repository>,
    mapper: Arc<dyn PathMapper>,
    config: SessionConfig,
    rules: ProjectionRules,
    runtime: Handle,
    statuses: StatusCache,
    locks: LockCache,
    decorated: DecoratedSet,
    busy: BusyGate,
    events: Option<broadcast::Receiver<RepositoryEvent>>,
    completions_tx: mpsc::UnboundedSender<(u64, Completion)>,
    completions_rx: mpsc::UnboundedReceiver<(u64, Completion)>,
    in_flight: usize,
    /// Incremented each time the gate goes from idle to busy. Operations are
    /// tagged with the period they were started in.
    busy_period: u64,
    /// Operations of the current busy period that have not reported back.
    period_pending: usize,
    repaint_pending: bool,
}

impl LockSession {
    /// Create a session on the system clock. Lock operations are spawned on
    /// `runtime`.
    pub fn new(
        repository: Arc<dyn Repository>,
        mapper: Arc<dyn PathMapper>,
        config: SessionConfig,
        runtime: Handle,
    ) -> SessionResult<Self> {
        Self::with_clock(repository, mapper, config, runtime, Arc::new(SystemClock))
    }

    /// Create a session whose busy watchdog reads `clock`.
    pub fn with_clock(
        repository: Arc<dyn Repository>,
        mapper: Arc<dyn PathMapper>,
        config: SessionConfig,
        runtime: Handle,
        clock: Arc<dyn Clock>,
    ) -> SessionResult<Self> {
        config.validate()?;
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Ok(Self {
            busy: BusyGate::new(config.gate.busy_timeout(), clock),
            rules: config.gate.projection_rules(),
            repository,
            mapper,
            config,
            runtime,
            statuses: StatusCache::new(),
            locks: LockCache::new(),
            decorated: DecoratedSet::new(),
            events: None,
            completions_tx,
            completions_rx,
            in_flight: 0,
            busy_period: 0,
            period_pending: 0,
            repaint_pending: false,
        })
    }

    /// Subscribe to repository notifications and ask the repository to
    /// re-announce anything newer than what this session has applied.
    /// The announcements are picked up by the next [`pump`](Self::pump).
    pub fn attach(&mut self) {
        debug!(has_remote = self.repository.current_remote().is_some(), "attaching lock session");
        self.events = Some(self.repository.subscribe());
        self.repository.check_status_changed(self.statuses.last_event());
        self.repository.check_locks_changed(self.locks.last_event());
    }

    /// Process pending repository notifications and operation completions.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();

        let lagged = self.drain_events(&mut report);
        if lagged > 0 {
            warn!(missed = lagged, "missed repository notifications, resynchronizing");
            // Re-announce only once the channel has room, then pick the
            // announcements up in this same pump.
            self.repository.check_status_changed(self.statuses.last_event());
            self.repository.check_locks_changed(self.locks.last_event());
            self.drain_events(&mut report);
        }

        while let Ok((period, completion)) = self.completions_rx.try_recv() {
            self.handle_completion(period, &completion);
            report.completions.push(completion);
        }

        report
    }

    /// Apply every queued notification. Returns how many were dropped by the
    /// channel.
    fn drain_events(&mut self, report: &mut PumpReport) -> u64 {
        let mut pending = Vec::new();
        let mut lagged = 0;
        if let Some(rx) = self.events.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(event) => pending.push(event),
                    Err(TryRecvError::Lagged(missed)) => lagged += missed,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }
        for event in pending {
            self.handle_event(event, report);
        }
        report.lagged_events += lagged;
        lagged
    }

    /// Pump until every operation of the current busy period has reported
    /// back, or `timeout` elapses. Operations abandoned by the watchdog are
    /// not waited for.
    pub async fn settle(&mut self, timeout: Duration) -> PumpReport {
        let deadline = Instant::now() + timeout;
        let mut report = self.pump();
        while self.period_pending > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
            report.merge(self.pump());
        }
        report
    }

    fn handle_event(&mut self, event: RepositoryEvent, report: &mut PumpReport) {
        match event {
            RepositoryEvent::TrackingStatusChanged(token) => {
                if self.apply_statuses(token) {
                    report.status_updates += 1;
                } else {
                    report.stale_events += 1;
                }
            }
            RepositoryEvent::LocksChanged(token) => {
                if self.apply_locks(token) {
                    report.lock_updates += 1;
                } else {
                    report.stale_events += 1;
                }
            }
        }
    }

    fn apply_statuses(&mut self, token: CacheUpdateEvent) -> bool {
        if self.statuses.last_event() == Some(token) {
            return false;
        }
        let changes = self.repository.current_changes();
        if !self.statuses.apply(token, changes) {
            return false;
        }
        self.decorated
            .rebuild_statuses(self.statuses.entries(), self.mapper.as_ref(), &self.rules);
        self.repaint_pending = true;
        true
    }

    fn apply_locks(&mut self, token: CacheUpdateEvent) -> bool {
        if self.locks.last_event() == Some(token) {
            return false;
        }
        let locks = self.repository.current_locks();
        if !self.locks.apply(token, locks) {
            return false;
        }
        self.decorated
            .rebuild_locks(self.locks.entries(), self.mapper.as_ref());
        self.repaint_pending = true;
        true
    }

    fn handle_completion(&mut self, period: u64, completion: &Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match &completion.result {
            Ok(()) => info!(op = %completion.op, path = %completion.path, "lock operation completed"),
            Err(e) => error!(op = %completion.op, path = %completion.path, error = %e, "lock operation failed"),
        }
        if period == self.busy_period {
            self.period_pending = self.period_pending.saturating_sub(1);
            if self.period_pending == 0 {
                self.busy.end();
            }
        } else {
            // Started before the watchdog cleared the gate; a newer period
            // owns it now.
            debug!(period, current = self.busy_period, path = %completion.path, "late completion");
        }
        self.repaint_pending = true;
    }

    fn begin_busy(&mut self) {
        if self.busy.begin() {
            self.busy_period += 1;
            self.period_pending = 0;
        }
    }

    // ---- Eligibility ----

    /// Whether "Request Lock" should be enabled for `asset`.
    pub fn can_request_lock(&mut self, asset: &AssetPath) -> Eligibility {
        let path = self.mapper.repository_path_for(asset);
        self.request_eligibility(&path)
    }

    /// Whether "Release Lock" should be enabled for `asset`.
    pub fn can_release_lock(&mut self, asset: &AssetPath) -> Eligibility {
        let path = self.mapper.repository_path_for(asset);
        self.release_eligibility(&path)
    }

    fn request_eligibility(&mut self, path: &RepoPath) -> Eligibility {
        let busy = self.busy.is_busy();
        let remote_configured = self.repository.current_remote().is_some();
        LockEligibility::can_request_lock(path, busy, &self.statuses, &self.locks, remote_configured)
    }

    fn release_eligibility(&mut self, path: &RepoPath) -> Eligibility {
        let busy = self.busy.is_busy();
        LockEligibility::can_release_lock(path, busy, &self.locks)
    }

    // ---- Lock operations ----

    /// Request a lock on `asset`. The result arrives through
    /// [`pump`](Self::pump); the lock itself shows up with the repository's
    /// next lock notification.
    pub fn request_lock(&mut self, asset: &AssetPath) -> SessionResult<()> {
        let path = self.mapper.repository_path_for(asset);
        if let Eligibility::Denied(reason) = self.request_eligibility(&path) {
            return Err(SessionError::Denied {
                action: LockOp::Request,
                path,
                reason,
            });
        }
        trace!(%path, "requesting lock");
        self.begin_busy();
        self.spawn(LockOp::Request, path);
        Ok(())
    }

    /// Release the lock on `asset`, and on its metadata sidecar when that is
    /// recorded as locked too. The two releases are independent operations,
    /// each with its own completion; the gate reopens when both are done.
    pub fn release_lock(&mut self, asset: &AssetPath) -> SessionResult<()> {
        let path = self.mapper.repository_path_for(asset);
        if let Eligibility::Denied(reason) = self.release_eligibility(&path) {
            return Err(SessionError::Denied {
                action: LockOp::Release,
                path,
                reason,
            });
        }
        trace!(%path, "releasing lock");
        self.begin_busy();
        self.spawn(LockOp::Release, path);

        if self.config.release_meta_sidecar {
            let sidecar = asset.with_suffix(&self.config.gate.meta_suffix);
            let sidecar_path = self.mapper.repository_path_for(&sidecar);
            if self.locks.is_locked(&sidecar_path) {
                trace!(path = %sidecar_path, "releasing sidecar lock");
                self.spawn(LockOp::Release, sidecar_path);
            }
        }
        Ok(())
    }

    fn spawn(&mut self, op: LockOp, path: RepoPath) {
        self.in_flight += 1;
        self.period_pending += 1;
        let period = self.busy_period;
        let repository = Arc::clone(&self.repository);
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let target = path.clone();
            // Run the operation in its own task so a panic still produces a
            // completion.
            let task = tokio::spawn(async move {
                match op {
                    LockOp::Request => repository.request_lock(&target).await.map(|_| ()),
                    LockOp::Release => repository.release_lock(&target, false).await,
                }
            });
            let result = match task.await {
                Ok(outcome) => outcome.map_err(SessionError::from),
                Err(e) => Err(SessionError::TaskFailed(e.to_string())),
            };
            if tx.send((period, Completion { op, path, result })).is_err() {
                debug!("lock session dropped before operation completed");
            }
        });
    }

    // ---- Presentation ----

    /// Decoration for one asset row, if it has any.
    pub fn decoration(&self, guid: &AssetGuid) -> Option<Decoration> {
        self.decorated.decoration(guid)
    }

    /// All decorated assets, ordered by path.
    pub fn decorations(&self) -> Vec<Decoration> {
        self.decorated.decorations()
    }

    /// The icon to draw for an asset row. A decorated asset the resolver has
    /// no icon for is logged and left undecorated.
    pub fn icon_for<R: IconResolver>(&self, guid: &AssetGuid, resolver: &R) -> Option<R::Icon> {
        let decoration = self.decorated.decoration(guid)?;
        let icon = resolver.icon_for(decoration.status, decoration.is_locked());
        if icon.is_none() {
            warn!(
                %guid,
                path = %decoration.asset_path,
                status = %decoration.status,
                locked = decoration.is_locked(),
                "no icon for decorated asset"
            );
        }
        icon
    }

    /// Whether the host should repaint; clears the request.
    pub fn take_repaint(&mut self) -> bool {
        std::mem::take(&mut self.repaint_pending)
    }

    // ---- Accessors ----

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn statuses(&self) -> &StatusCache {
        &self.statuses
    }

    pub fn locks(&self) -> &LockCache {
        &self.locks
    }

    pub fn decorated(&self) -> &DecoratedSet {
        &self.decorated
    }

    /// Busy gate state, without running the watchdog.
    pub fn busy_state(&self) -> BusyState {
        self.busy.state()
    }

    /// Number of lock operations that have not reported back yet, including
    /// any abandoned by the watchdog.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Operations started in the current busy period that have not reported
    /// back. The gate reopens when this reaches zero.
    pub fn pending(&self) -> usize {
        self.period_pending
    }
}

impl std::fmt::Debug for LockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockSession")
            .field("statuses", &self.statuses.len())
            .field("locks", &self.locks.len())
            .field("busy", &self.busy)
            .field("in_flight", &self.in_flight)
            .field("busy_period", &self.busy_period)
            .field("pending", &self.period_pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alk_gate::DenyReason;
    use alk_repo::{InMemoryRepository, ProjectPathMapper};
    use alk_types::{FileStatus, LockEntry, LockOwner, ManualClock, RemoteInfo, StatusEntry};

    const SETTLE: Duration = Duration::from_secs(2);

    struct Fixture {
        repo: Arc<InMemoryRepository>,
        clock: ManualClock,
        session: LockSession,
    }

    fn fixture_with(config: SessionConfig, prefix: &str) -> Fixture {
        let repo = Arc::new(InMemoryRepository::new(LockOwner::new("alice")));
        repo.set_remote(Some(RemoteInfo::new("origin", "https://example.com/game.git")));
        let clock = ManualClock::new();
        let mut session = LockSession::with_clock(
            repo.clone(),
            Arc::new(ProjectPathMapper::new(prefix)),
            config,
            Handle::current(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        session.attach();
        session.pump();
        Fixture { repo, clock, session }
    }

    fn fixture() -> Fixture {
        fixture_with(SessionConfig::default(), "")
    }

    fn asset(path: &str) -> AssetPath {
        AssetPath::new(path)
    }

    fn guid(path: &str) -> AssetGuid {
        AssetGuid::from_asset_path(&asset(path))
    }

    #[tokio::test]
    async fn attach_picks_up_existing_state() {
        let repo = Arc::new(InMemoryRepository::new(LockOwner::new("alice")));
        repo.set_changes(vec![StatusEntry::new("Assets/x.png", FileStatus::Modified)]);
        repo.set_locks(vec![LockEntry::new("Assets/y.png")]);

        let mut session = LockSession::new(
            repo.clone(),
            Arc::new(ProjectPathMapper::default()),
            SessionConfig::default(),
            Handle::current(),
        )
        .unwrap();
        assert!(session.pump().is_empty());

        session.attach();
        let report = session.pump();
        assert_eq!(report.status_updates, 1);
        assert_eq!(report.lock_updates, 1);
        assert_eq!(session.statuses().last_event(), Some(repo.status_token()));
        assert!(session.take_repaint());
        assert!(!session.take_repaint());
        assert!(session.decoration(&guid("Assets/x.png")).is_some());
        assert!(session.decoration(&guid("Assets/y.png")).unwrap().is_locked());
    }

    #[tokio::test]
    async fn modified_file_with_remote_is_lockable() {
        let mut f = fixture();
        f.repo.set_changes(vec![StatusEntry::new("Assets/x.png", FileStatus::Modified)]);
        f.session.pump();
        assert_eq!(f.session.can_request_lock(&asset("Assets/x.png")), Eligibility::Allowed);
    }

    #[tokio::test]
    async fn locked_file_can_only_be_released() {
        let mut f = fixture();
        f.repo.set_locks(vec![LockEntry::new("Assets/x.png")]);
        f.session.pump();
        assert_eq!(
            f.session.can_request_lock(&asset("Assets/x.png")),
            Eligibility::Denied(DenyReason::AlreadyLocked)
        );
        assert_eq!(f.session.can_release_lock(&asset("Assets/x.png")), Eligibility::Allowed);
    }

    #[tokio::test]
    async fn untracked_and_ignored_are_not_lockable() {
        let mut f = fixture();
        f.repo.set_changes(vec![
            StatusEntry::new("Assets/new.png", FileStatus::Untracked),
            StatusEntry::new("Assets/cache.bin", FileStatus::Ignored),
        ]);
        f.session.pump();
        assert!(!f.session.can_request_lock(&asset("Assets/new.png")).is_allowed());
        assert!(!f.session.can_request_lock(&asset("Assets/cache.bin")).is_allowed());
    }

    #[tokio::test]
    async fn no_remote_disables_requests() {
        let mut f = fixture();
        f.repo.set_remote(None);
        assert_eq!(
            f.session.can_request_lock(&asset("Assets/x.png")),
            Eligibility::Denied(DenyReason::NoRemote)
        );
        let err = f.session.request_lock(&asset("Assets/x.png")).unwrap_err();
        assert!(matches!(err, SessionError::Denied { reason: DenyReason::NoRemote, .. }));
        assert_eq!(f.session.in_flight(), 0);
    }

    #[tokio::test]
    async fn duplicate_notification_recomputes_once() {
        let mut f = fixture();
        f.repo.set_changes(vec![StatusEntry::new("Assets/x.png", FileStatus::Modified)]);
        let before = f.session.decorated().status_projections();

        // Same token announced again.
        f.repo.check_status_changed(None);
        let report = f.session.pump();

        assert_eq!(report.status_updates, 1);
        assert_eq!(report.stale_events, 1);
        assert_eq!(f.session.decorated().status_projections(), before + 1);
    }

    #[tokio::test]
    async fn request_lock_round_trip() {
        let mut f = fixture();
        f.session.request_lock(&asset("Assets/x.png")).unwrap();

        // Busy until the completion is pumped.
        assert_eq!(
            f.session.can_request_lock(&asset("Assets/other.png")),
            Eligibility::Denied(DenyReason::Busy)
        );
        assert!(matches!(f.session.busy_state(), BusyState::Busy { .. }));

        let report = f.session.settle(SETTLE).await;
        assert_eq!(report.completions.len(), 1);
        assert!(report.completions[0].is_success());
        assert_eq!(report.completions[0].op, LockOp::Request);
        assert_eq!(f.session.busy_state(), BusyState::Idle);

        // The repository's lock notification may land in the same or a later pump.
        f.session.pump();
        assert!(f.session.locks().is_locked(&RepoPath::new("Assets/x.png")));
        let decoration = f.session.decoration(&guid("Assets/x.png")).unwrap();
        assert_eq!(decoration.lock.unwrap().owner, Some(LockOwner::new("alice")));
        assert_eq!(f.session.can_release_lock(&asset("Assets/x.png")), Eligibility::Allowed);
    }

    #[tokio::test]
    async fn busy_gate_blocks_then_reopens_after_completion() {
        let mut f = fixture();
        f.repo.set_locks(vec![LockEntry::new("Assets/held.png").with_owner(LockOwner::new("alice"))]);
        f.session.pump();

        f.session.request_lock(&asset("Assets/x.png")).unwrap();
        assert!(!f.session.can_release_lock(&asset("Assets/held.png")).is_allowed());
        assert!(matches!(
            f.session.request_lock(&asset("Assets/y.png")),
            Err(SessionError::Denied { reason: DenyReason::Busy, .. })
        ));

        f.session.settle(SETTLE).await;
        assert!(f.session.can_release_lock(&asset("Assets/held.png")).is_allowed());
        assert!(f.session.can_request_lock(&asset("Assets/y.png")).is_allowed());
    }

    #[tokio::test]
    async fn failed_operation_still_clears_gate() {
        let mut f = fixture();
        f.repo.fail_next_operation("lock server unreachable");
        f.session.request_lock(&asset("Assets/x.png")).unwrap();

        let report = f.session.settle(SETTLE).await;
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0].result,
            Err(SessionError::Repository(alk_repo::RepoError::Remote(_)))
        ));
        assert_eq!(f.session.busy_state(), BusyState::Idle);
        assert!(f.session.take_repaint());
        assert!(f.session.can_request_lock(&asset("Assets/x.png")).is_allowed());
    }

    #[tokio::test]
    async fn watchdog_clears_gate_without_completion() {
        let mut f = fixture();
        f.session.request_lock(&asset("Assets/x.png")).unwrap();
        assert!(!f.session.can_request_lock(&asset("Assets/y.png")).is_allowed());

        // Do not pump: the completion never reaches the owner.
        f.clock.advance(Duration::from_millis(5_001));
        assert!(f.session.can_request_lock(&asset("Assets/y.png")).is_allowed());
        assert_eq!(f.session.busy_state(), BusyState::Idle);
    }

    #[tokio::test]
    async fn release_also_releases_locked_sidecar() {
        let mut f = fixture();
        f.repo.set_locks(vec![
            LockEntry::new("Assets/x.png").with_owner(LockOwner::new("alice")),
            LockEntry::new("Assets/x.png.meta").with_owner(LockOwner::new("alice")),
        ]);
        f.session.pump();

        f.session.release_lock(&asset("Assets/x.png")).unwrap();
        assert_eq!(f.session.in_flight(), 2);

        let report = f.session.settle(SETTLE).await;
        assert_eq!(report.completions.len(), 2);
        assert!(report.completions.iter().all(Completion::is_success));
        assert_eq!(f.session.busy_state(), BusyState::Idle);
        assert!(f.repo.current_locks().is_empty());
    }

    #[tokio::test]
    async fn sidecar_failure_is_reported_independently() {
        let mut f = fixture();
        f.repo.set_locks(vec![
            LockEntry::new("Assets/x.png").with_owner(LockOwner::new("alice")),
            LockEntry::new("Assets/x.png.meta").with_owner(LockOwner::new("bob")),
        ]);
        f.session.pump();

        f.session.release_lock(&asset("Assets/x.png")).unwrap();
        let report = f.session.settle(SETTLE).await;

        let failed: Vec<_> = report.failures().map(|c| c.path.as_str().to_string()).collect();
        assert_eq!(failed, vec!["Assets/x.png.meta".to_string()]);
        assert_eq!(f.repo.current_locks().len(), 1);
        assert_eq!(f.session.busy_state(), BusyState::Idle);
    }

    #[tokio::test]
    async fn unlocked_sidecar_is_left_alone() {
        let mut f = fixture();
        f.repo.set_locks(vec![LockEntry::new("Assets/x.png").with_owner(LockOwner::new("alice"))]);
        f.session.pump();

        f.session.release_lock(&asset("Assets/x.png")).unwrap();
        assert_eq!(f.session.in_flight(), 1);
        let report = f.session.settle(SETTLE).await;
        assert_eq!(report.failures().count(), 0);
    }

    #[tokio::test]
    async fn project_prefix_maps_asset_paths() {
        let mut f = fixture_with(SessionConfig::default(), "Game");
        f.repo.set_changes(vec![
            StatusEntry::new("Game/Assets/x.png", FileStatus::Modified),
            StatusEntry::new("Docs/notes.md", FileStatus::Modified),
        ]);
        f.session.pump();

        assert_eq!(f.session.decorations().len(), 1);
        f.session.request_lock(&asset("Assets/x.png")).unwrap();
        f.session.settle(SETTLE).await;
        f.session.pump();
        assert!(f.session.locks().is_locked(&RepoPath::new("Game/Assets/x.png")));
    }

    struct Badges;

    impl IconResolver for Badges {
        type Icon = &'static str;

        fn icon_for(&self, status: FileStatus, locked: bool) -> Option<&'static str> {
            match (status, locked) {
                (_, true) => Some("lock"),
                (FileStatus::Modified, false) => Some("modified"),
                _ => None,
            }
        }
    }

    #[tokio::test]
    async fn icon_resolution_degrades_to_none() {
        let mut f = fixture();
        f.repo.set_changes(vec![
            StatusEntry::new("Assets/x.png", FileStatus::Modified),
            StatusEntry::new("Assets/y.png", FileStatus::Renamed),
        ]);
        f.repo.set_locks(vec![LockEntry::new("Assets/z.png")]);
        f.session.pump();

        assert_eq!(f.session.icon_for(&guid("Assets/x.png"), &Badges), Some("modified"));
        assert_eq!(f.session.icon_for(&guid("Assets/z.png"), &Badges), Some("lock"));
        assert_eq!(f.session.icon_for(&guid("Assets/y.png"), &Badges), None);
        assert_eq!(f.session.icon_for(&guid("Assets/none.png"), &Badges), None);
    }

    /// Delegates to an in-memory repository, holding lock requests for
    /// chosen paths until released and panicking on others.
    struct HeldRepository {
        inner: Arc<InMemoryRepository>,
        held: std::sync::Mutex<std::collections::HashMap<RepoPath, Arc<tokio::sync::Notify>>>,
        panic_on: Option<RepoPath>,
    }

    impl HeldRepository {
        fn new(inner: Arc<InMemoryRepository>) -> Self {
            Self { inner, held: Default::default(), panic_on: None }
        }

        fn hold(&self, path: &str) -> Arc<tokio::sync::Notify> {
            let notify = Arc::new(tokio::sync::Notify::new());
            self.held.lock().unwrap().insert(RepoPath::new(path), notify.clone());
            notify
        }
    }

    #[async_trait::async_trait]
    impl Repository for HeldRepository {
        fn current_changes(&self) -> Vec<alk_types::StatusEntry> {
            self.inner.current_changes()
        }

        fn current_locks(&self) -> Vec<LockEntry> {
            self.inner.current_locks()
        }

        fn current_remote(&self) -> Option<RemoteInfo> {
            self.inner.current_remote()
        }

        fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
            self.inner.subscribe()
        }

        fn check_status_changed(&self, last: Option<CacheUpdateEvent>) {
            self.inner.check_status_changed(last)
        }

        fn check_locks_changed(&self, last: Option<CacheUpdateEvent>) {
            self.inner.check_locks_changed(last)
        }

        async fn request_lock(&self, path: &RepoPath) -> alk_repo::RepoResult<LockEntry> {
            if self.panic_on.as_ref() == Some(path) {
                panic!("lock server client crashed");
            }
            let held = self.held.lock().unwrap().get(path).cloned();
            if let Some(notify) = held {
                notify.notified().await;
            }
            self.inner.request_lock(path).await
        }

        async fn release_lock(&self, path: &RepoPath, force: bool) -> alk_repo::RepoResult<()> {
            self.inner.release_lock(path, force).await
        }
    }

    fn held_session(repo: Arc<HeldRepository>, clock: &ManualClock) -> LockSession {
        let mut session = LockSession::with_clock(
            repo,
            Arc::new(ProjectPathMapper::default()),
            SessionConfig::default(),
            Handle::current(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        session.attach();
        session.pump();
        session
    }

    fn remote_repo() -> Arc<InMemoryRepository> {
        let repo = Arc::new(InMemoryRepository::new(LockOwner::new("alice")));
        repo.set_remote(Some(RemoteInfo::new("origin", "https://example.com/game.git")));
        repo
    }

    async fn pump_until_completions(session: &mut LockSession, count: usize) -> PumpReport {
        let deadline = Instant::now() + SETTLE;
        let mut report = session.pump();
        while report.completions.len() < count && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
            report.merge(session.pump());
        }
        report
    }

    #[tokio::test]
    async fn hung_operation_does_not_hold_later_requests() {
        let repo = Arc::new(HeldRepository::new(remote_repo()));
        let _never = repo.hold("Assets/x.png");
        let clock = ManualClock::new();
        let mut session = held_session(repo.clone(), &clock);

        session.request_lock(&asset("Assets/x.png")).unwrap();
        clock.advance(Duration::from_millis(5_001));
        session.request_lock(&asset("Assets/y.png")).unwrap();

        let report = session.settle(SETTLE).await;
        assert_eq!(report.completions.len(), 1);
        assert_eq!(report.completions[0].path, RepoPath::new("Assets/y.png"));
        assert_eq!(session.busy_state(), BusyState::Idle);
        assert_eq!(session.pending(), 0);
        assert_eq!(session.in_flight(), 1);
        assert_eq!(session.can_request_lock(&asset("Assets/z.png")), Eligibility::Allowed);
    }

    #[tokio::test]
    async fn late_completion_leaves_newer_operation_busy() {
        let repo = Arc::new(HeldRepository::new(remote_repo()));
        let x = repo.hold("Assets/x.png");
        let y = repo.hold("Assets/y.png");
        let clock = ManualClock::new();
        let mut session = held_session(repo.clone(), &clock);

        session.request_lock(&asset("Assets/x.png")).unwrap();
        clock.advance(Duration::from_millis(5_001));
        session.request_lock(&asset("Assets/y.png")).unwrap();

        x.notify_one();
        let report = pump_until_completions(&mut session, 1).await;
        assert_eq!(report.completions.len(), 1);
        assert_eq!(report.completions[0].path, RepoPath::new("Assets/x.png"));
        assert!(matches!(session.busy_state(), BusyState::Busy { .. }));
        assert_eq!(session.pending(), 1);

        y.notify_one();
        let report = session.settle(SETTLE).await;
        assert_eq!(report.completions.len(), 1);
        assert_eq!(session.busy_state(), BusyState::Idle);
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test]
    async fn panicking_operation_reports_task_failure() {
        let mut repo = HeldRepository::new(remote_repo());
        repo.panic_on = Some(RepoPath::new("Assets/x.png"));
        let clock = ManualClock::new();
        let mut session = held_session(Arc::new(repo), &clock);

        session.request_lock(&asset("Assets/x.png")).unwrap();
        let report = session.settle(SETTLE).await;

        assert_eq!(report.completions.len(), 1);
        assert!(matches!(report.completions[0].result, Err(SessionError::TaskFailed(_))));
        assert_eq!(session.busy_state(), BusyState::Idle);
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test]
    async fn lagged_notifications_resync_to_latest() {
        let mut f = fixture();
        for i in 0..70 {
            f.repo.set_changes(vec![StatusEntry::new(
                format!("Assets/file{i}.png"),
                FileStatus::Modified,
            )]);
        }

        let report = f.session.pump();
        assert!(report.lagged_events > 0);
        assert_eq!(f.session.statuses().last_event(), Some(f.repo.status_token()));
        assert_eq!(
            f.session.statuses().status_of(&RepoPath::new("Assets/file69.png")),
            FileStatus::Modified
        );
        assert_eq!(f.session.decorations().len(), 1);
    }
}
