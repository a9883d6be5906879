use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{
    model::{GlobalAppState, LoadStatus, Location, LocationLoads},
    observable::Observable,
};
use crate::{
    client::PrivateClient,
    credentials::CredentialStore,
    error::{Error, Result},
    proto::{ItemDescriptor, UserAccountInfo},
    telemetry::ErrorReporter,
};

/// The fetches the engine needs to populate [`GlobalAppState`].
#[async_trait]
pub trait StateSource: Send + Sync {
    /// Item catalog. Mandatory for startup.
    async fn item_descriptors(&self) -> Result<Vec<ItemDescriptor>>;
    /// Account of the logged-in player. Mandatory for startup.
    async fn account_info(&self) -> Result<UserAccountInfo>;
    /// Mine locations, loaded after startup.
    async fn mine_locations(&self) -> Result<Vec<Location>>;
    /// Gamble locations, loaded after startup.
    async fn gamble_locations(&self) -> Result<Vec<Location>>;
}

#[async_trait]
impl StateSource for PrivateClient {
    async fn item_descriptors(&self) -> Result<Vec<ItemDescriptor>> {
        Ok(self.get_item_descriptors().await?.item_descriptors)
    }

    async fn account_info(&self) -> Result<UserAccountInfo> {
        self.get_account().await?.user_account_info.ok_or_else(|| {
            Error::Protocol("GetAccount response is missing user account info".to_string())
        })
    }

    async fn mine_locations(&self) -> Result<Vec<Location>> {
        Ok(Location::from_mine(self.get_mine_locations().await?.mine_locations))
    }

    async fn gamble_locations(&self) -> Result<Vec<Location>> {
        Ok(Location::from_gamble(
            self.get_gamble_locations().await?.gamble_locations,
        ))
    }
}

/// Where the engine is in its startup sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing has been requested since construction or the last reset.
    Uninitialized,
    /// Item catalog and account info are being fetched.
    Initializing,
    /// First-screen data is published.
    Ready,
    /// The last attempt failed; [`SyncEngine::initialize`] may be called again.
    Failed {
        /// Display form of the error that ended the run.
        message: String,
    },
}

/// Result of a call to [`SyncEngine::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call loaded and published the first-screen data.
    Initialized,
    /// Another call is already loading; nothing was issued.
    AlreadyInProgress,
    /// Data is already published; nothing was issued.
    AlreadyReady,
    /// A reset happened while loading, so the results were thrown away.
    Discarded,
}

struct Lifecycle {
    phase: SyncPhase,
    /// Bumped on every reset. Work started under an older generation is stale.
    generation: u64,
}

struct Inner {
    source: Arc<dyn StateSource>,
    credentials: Arc<CredentialStore>,
    reporter: Arc<dyn ErrorReporter>,
    state: Observable<GlobalAppState>,
    ready: Observable<bool>,
    loads: Observable<LocationLoads>,
    lifecycle: Mutex<Lifecycle>,
}

/// Keeps [`GlobalAppState`] synchronised with the backend.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    /// Engine with empty state that fetches through `source`.
    pub fn new(
        source: Arc<dyn StateSource>,
        credentials: Arc<CredentialStore>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                credentials,
                reporter,
                state: Observable::default(),
                ready: Observable::new(false),
                loads: Observable::default(),
                lifecycle: Mutex::new(Lifecycle {
                    phase: SyncPhase::Uninitialized,
                    generation: 0,
                }),
            }),
        }
    }

    /// Observable application state.
    pub fn state(&self) -> &Observable<GlobalAppState> {
        &self.inner.state
    }

    /// Observable readiness flag.
    pub fn readiness(&self) -> &Observable<bool> {
        &self.inner.ready
    }

    /// Observable progress of the background location loads.
    pub fn location_loads(&self) -> &Observable<LocationLoads> {
        &self.inner.loads
    }

    /// Whether the first-screen data is published.
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.get()
    }

    /// Current startup phase.
    pub fn phase(&self) -> SyncPhase {
        self.inner.lifecycle.lock().phase.clone()
    }

    /// Load the first-screen data, publish it, then start the location loads.
    ///
    /// Only one run can be in flight. Calls made while loading or after the
    /// data is published return without issuing any request. After a failed
    /// run the next call starts over.
    pub async fn initialize(&self) -> Result<InitOutcome> {
        let generation = {
            let mut lifecycle = self.inner.lifecycle.lock();
            match lifecycle.phase {
                SyncPhase::Initializing => return Ok(InitOutcome::AlreadyInProgress),
                SyncPhase::Ready => return Ok(InitOutcome::AlreadyReady),
                SyncPhase::Uninitialized | SyncPhase::Failed { .. } => {
                    lifecycle.phase = SyncPhase::Initializing;
                    lifecycle.generation
                }
            }
        };
        debug!(generation, "loading item catalog and account info");

        let source = &self.inner.source;
        let fetched = tokio::try_join!(source.item_descriptors(), source.account_info());
        let (items, account_info) = match fetched {
            Ok(pair) => pair,
            Err(err) => {
                {
                    let mut lifecycle = self.inner.lifecycle.lock();
                    if lifecycle.generation == generation {
                        lifecycle.phase = SyncPhase::Failed {
                            message: err.to_string(),
                        };
                    }
                }
                self.inner
                    .reporter
                    .report("Failed to initialize app state", &err);
                return Err(err);
            }
        };

        {
            let mut lifecycle = self.inner.lifecycle.lock();
            if lifecycle.generation != generation {
                debug!(generation, "state was reset while loading; discarding");
                return Ok(InitOutcome::Discarded);
            }

            let item_count = items.len();
            self.inner
                .state
                .update(|state| state.with_first_screen(items, account_info));
            lifecycle.phase = SyncPhase::Ready;
            self.inner.ready.set(true);
            info!(items = item_count, "app state ready");
        }

        self.spawn_location_loads(generation);
        Ok(InitOutcome::Initialized)
    }

    fn spawn_location_loads(&self, generation: u64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = inner.source.mine_locations().await;
            inner.settle(
                generation,
                "mine locations",
                result,
                GlobalAppState::with_mine_locations,
                |loads, status| loads.mine = status,
            );
        });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = inner.source.gamble_locations().await;
            inner.settle(
                generation,
                "gamble locations",
                result,
                GlobalAppState::with_gamble_locations,
                |loads, status| loads.gamble = status,
            );
        });
    }

    /// Clear the state, drop readiness and forget the session credential.
    ///
    /// Requests still in flight are not aborted; their results are ignored.
    pub fn reset(&self) -> Result<()> {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            lifecycle.generation += 1;
            lifecycle.phase = SyncPhase::Uninitialized;
            self.inner.state.set(GlobalAppState::default());
            self.inner.ready.set(false);
            self.inner.loads.set(LocationLoads::default());
        }
        info!("app state reset");
        self.inner.credentials.clear()
    }

    /// Resolve once the readiness flag is true.
    pub async fn wait_until_ready(&self) {
        let mut readiness = self.inner.ready.subscribe();
        while let Some(ready) = readiness.recv().await {
            if *ready {
                return;
            }
        }
    }

    /// Resolve once both location loads of the current run have finished,
    /// successfully or not.
    ///
    /// Loads only start after a successful [`SyncEngine::initialize`]; until
    /// then this keeps waiting.
    pub async fn wait_for_locations(&self) -> LocationLoads {
        let mut loads = self.inner.loads.subscribe();
        while let Some(current) = loads.recv().await {
            if current.is_settled() {
                return *current;
            }
        }
        // the engine owns the holder, so the feed never closes while `self` lives
        *self.inner.loads.get()
    }
}

impl Inner {
    /// Record the outcome of a location load unless a reset made it stale.
    ///
    /// On success the locations are merged into the current state; on failure
    /// the error is reported and the field stays absent. Either way the load is
    /// marked settled in the same critical section.
    fn settle(
        &self,
        generation: u64,
        what: &str,
        result: Result<Vec<Location>>,
        merge: impl FnOnce(&GlobalAppState, Vec<Location>) -> GlobalAppState,
        mark: impl FnOnce(&mut LocationLoads, LoadStatus),
    ) -> bool {
        let lifecycle = self.lifecycle.lock();
        if lifecycle.generation != generation {
            debug!(generation, "dropping {what} from a previous session");
            return false;
        }

        let status = match result {
            Ok(locations) => {
                self.state.update(|state| merge(state, locations));
                debug!("merged {what}");
                LoadStatus::Loaded
            }
            Err(err) => {
                self.reporter.report(&format!("Failed to load {what}"), &err);
                LoadStatus::Failed
            }
        };
        self.loads.update(|loads| {
            let mut next = *loads;
            mark(&mut next, status);
            next
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Code, proto::LocationDescriptor};
    use std::{
        collections::VecDeque,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio::sync::oneshot;

    struct Endpoint<T> {
        pending: Mutex<VecDeque<oneshot::Receiver<Result<T>>>>,
        calls: AtomicUsize,
        completed: AtomicUsize,
    }

    impl<T> Default for Endpoint<T> {
        fn default() -> Self {
            Self {
                pending: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
            }
        }
    }

    impl<T> Endpoint<T> {
        /// Queue a reply slot for the next call.
        fn expect(&self) -> oneshot::Sender<Result<T>> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().push_back(rx);
            tx
        }

        async fn serve(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let rx = self.pending.lock().pop_front();
            let result = match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(Error::Protocol("reply dropped".to_string()))),
                None => Err(Error::Protocol("unexpected call".to_string())),
            };
            self.completed.fetch_add(1, Ordering::SeqCst);
            result
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct FakeSource {
        items: Endpoint<Vec<ItemDescriptor>>,
        account: Endpoint<UserAccountInfo>,
        mines: Endpoint<Vec<Location>>,
        gambles: Endpoint<Vec<Location>>,
    }

    #[async_trait]
    impl StateSource for FakeSource {
        async fn item_descriptors(&self) -> Result<Vec<ItemDescriptor>> {
            self.items.serve().await
        }

        async fn account_info(&self) -> Result<UserAccountInfo> {
            self.account.serve().await
        }

        async fn mine_locations(&self) -> Result<Vec<Location>> {
            self.mines.serve().await
        }

        async fn gamble_locations(&self) -> Result<Vec<Location>> {
            self.gambles.serve().await
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<String>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, context: &str, err: &Error) {
            self.reports.lock().push(format!("{context}: {err}"));
        }
    }

    struct Harness {
        source: Arc<FakeSource>,
        reporter: Arc<RecordingReporter>,
        credentials: Arc<CredentialStore>,
        engine: SyncEngine,
    }

    fn harness() -> Harness {
        let source = Arc::new(FakeSource::default());
        let reporter = Arc::new(RecordingReporter::default());
        let credentials = Arc::new(CredentialStore::in_memory());
        let engine = SyncEngine::new(source.clone(), credentials.clone(), reporter.clone());
        Harness {
            source,
            reporter,
            credentials,
            engine,
        }
    }

    fn catalog() -> Vec<ItemDescriptor> {
        (1..=3)
            .map(|id| ItemDescriptor {
                id,
                name: format!("item-{id}"),
                description: String::new(),
                rarity_tier: id,
            })
            .collect()
    }

    fn account() -> UserAccountInfo {
        UserAccountInfo {
            id: 42,
            username: "digger".to_string(),
        }
    }

    fn locations(name: &str) -> Vec<Location> {
        vec![Location {
            descriptor: LocationDescriptor {
                id: 1,
                name: name.to_string(),
                description: String::new(),
            },
            is_available: true,
        }]
    }

    async fn settle<T>(endpoint: &Endpoint<T>, completed: usize) {
        for _ in 0..100 {
            if endpoint.completed() >= completed {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("endpoint never completed");
    }

    async fn until(engine: &SyncEngine, check: impl Fn(&GlobalAppState) -> bool) {
        let mut sub = engine.state().subscribe();
        tokio::time::timeout(Duration::from_secs(1), async {
            while let Some(state) = sub.recv().await {
                if check(state.as_ref()) {
                    return;
                }
            }
        })
        .await
        .expect("state never reached expected shape");
    }

    #[tokio::test]
    async fn location_merges_are_order_independent() {
        for gamble_first in [true, false] {
            let h = harness();
            let _ = h.source.items.expect().send(Ok(catalog()));
            let _ = h.source.account.expect().send(Ok(account()));
            let mines = h.source.mines.expect();
            let gambles = h.source.gambles.expect();

            assert_eq!(h.engine.initialize().await.ok(), Some(InitOutcome::Initialized));
            let ready = h.engine.state().get();

            if gamble_first {
                let _ = gambles.send(Ok(locations("casino")));
                settle(&h.source.gambles, 1).await;
                let _ = mines.send(Ok(locations("starter")));
                settle(&h.source.mines, 1).await;
            } else {
                let _ = mines.send(Ok(locations("starter")));
                settle(&h.source.mines, 1).await;
                let _ = gambles.send(Ok(locations("casino")));
                settle(&h.source.gambles, 1).await;
            }

            let state = h.engine.state().get();
            assert_eq!(state.mine_locations(), Some(locations("starter").as_slice()));
            assert_eq!(state.gamble_locations(), Some(locations("casino").as_slice()));
            assert_eq!(state.items(), ready.items());
            assert_eq!(state.account_info(), ready.account_info());
        }
    }

    #[tokio::test]
    async fn overlapping_initialize_issues_one_fetch_pair() {
        let h = harness();
        let items_reply = h.source.items.expect();
        let account_reply = h.source.account.expect();
        h.source.mines.expect();
        h.source.gambles.expect();

        let first = tokio::spawn({
            let engine = h.engine.clone();
            async move { engine.initialize().await }
        });
        while h.source.items.calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(h.engine.phase(), SyncPhase::Initializing);
        assert!(!h.engine.is_ready());

        assert_eq!(
            h.engine.initialize().await.ok(),
            Some(InitOutcome::AlreadyInProgress)
        );

        let _ = items_reply.send(Ok(catalog()));
        let _ = account_reply.send(Ok(account()));
        let outcome = first.await.expect("task panicked");
        assert_eq!(outcome.ok(), Some(InitOutcome::Initialized));
        assert_eq!(
            h.engine.initialize().await.ok(),
            Some(InitOutcome::AlreadyReady)
        );

        assert_eq!(h.source.items.calls(), 1);
        assert_eq!(h.source.account.calls(), 1);
    }

    #[tokio::test]
    async fn failed_initialize_can_be_retried() {
        let h = harness();
        let _ = h.source.items.expect().send(Err(Error::Status {
            code: Code::Unavailable,
            message: "down for maintenance".to_string(),
        }));
        let _ = h.source.account.expect().send(Ok(account()));

        let err = h.engine.initialize().await.unwrap_err();
        assert_eq!(err.code(), Some(Code::Unavailable));
        assert!(matches!(h.engine.phase(), SyncPhase::Failed { .. }));
        assert!(!h.engine.is_ready());
        assert!(!h.engine.state().get().is_loaded());
        assert_eq!(h.reporter.reports.lock().len(), 1);

        let _ = h.source.items.expect().send(Ok(catalog()));
        let _ = h.source.account.expect().send(Ok(account()));
        h.source.mines.expect();
        h.source.gambles.expect();

        assert_eq!(h.engine.initialize().await.ok(), Some(InitOutcome::Initialized));
        assert_eq!(h.engine.phase(), SyncPhase::Ready);
        assert!(h.engine.is_ready());
    }

    #[tokio::test]
    async fn first_screen_is_published_in_one_update() {
        let h = harness();
        let mut sub = h.engine.state().subscribe();
        let _ = h.source.items.expect().send(Ok(catalog()));
        let _ = h.source.account.expect().send(Ok(account()));
        let mines = h.source.mines.expect();
        let _ = h.source.gambles.expect().send(Ok(locations("casino")));

        h.engine.initialize().await.expect("initialize");
        settle(&h.source.gambles, 1).await;
        let _ = mines.send(Ok(locations("starter")));
        settle(&h.source.mines, 1).await;

        let mut published = Vec::new();
        while let Some(state) = sub.try_recv() {
            published.push(state);
        }
        assert_eq!(published.len(), 4);
        assert!(!published[0].is_loaded());
        assert!(published[1].is_loaded() && published[1].mine_locations().is_none());
        assert!(published[2].gamble_locations().is_some());
        assert!(published[3].mine_locations().is_some());
        assert!(published[3].gamble_locations().is_some());
        for state in &published[1..] {
            assert_eq!(state.items_by_id().map(|index| index.len()), Some(3));
        }
    }

    #[tokio::test]
    async fn secondary_failure_keeps_ready_state() {
        let h = harness();
        let _ = h.source.items.expect().send(Ok(catalog()));
        let _ = h.source.account.expect().send(Ok(account()));
        let _ = h.source.mines.expect().send(Err(Error::Network("reset by peer".into())));
        let _ = h.source.gambles.expect().send(Ok(locations("casino")));

        h.engine.initialize().await.expect("initialize");
        until(&h.engine, |state| state.gamble_locations().is_some()).await;
        settle(&h.source.mines, 1).await;

        let state = h.engine.state().get();
        assert!(state.is_loaded());
        assert!(state.mine_locations().is_none());
        assert!(h.engine.is_ready());
        assert_eq!(h.engine.phase(), SyncPhase::Ready);

        let reports = h.reporter.reports.lock();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("Failed to load mine locations"));
    }

    #[tokio::test]
    async fn location_loads_settle_when_a_fetch_fails() {
        let h = harness();
        let _ = h.source.items.expect().send(Ok(catalog()));
        let _ = h.source.account.expect().send(Ok(account()));
        let _ = h.source.mines.expect().send(Ok(locations("starter")));
        let _ = h.source.gambles.expect().send(Err(Error::Status {
            code: Code::Unimplemented,
            message: "Unknown error".to_string(),
        }));

        h.engine.initialize().await.expect("initialize");
        assert!(!h.engine.location_loads().get().is_settled());

        let loads = tokio::time::timeout(Duration::from_secs(1), h.engine.wait_for_locations())
            .await
            .expect("location loads never settled");
        assert_eq!(loads.mine, LoadStatus::Loaded);
        assert_eq!(loads.gamble, LoadStatus::Failed);

        let state = h.engine.state().get();
        assert!(state.mine_locations().is_some());
        assert!(state.gamble_locations().is_none());
        assert_eq!(h.reporter.reports.lock().len(), 1);
    }

    #[tokio::test]
    async fn reset_drops_late_results_and_allows_fresh_run() -> Result<()> {
        let h = harness();
        h.credentials.set("token")?;
        let _ = h.source.items.expect().send(Ok(catalog()));
        let _ = h.source.account.expect().send(Ok(account()));
        let mines = h.source.mines.expect();
        let gambles = h.source.gambles.expect();

        h.engine.initialize().await?;
        assert!(h.engine.is_ready());

        h.engine.reset()?;
        assert!(!h.engine.is_ready());
        assert_eq!(h.engine.phase(), SyncPhase::Uninitialized);
        assert!(!h.engine.state().get().is_loaded());
        assert!(!h.credentials.is_authenticated());

        let _ = mines.send(Ok(locations("starter")));
        let _ = gambles.send(Ok(locations("casino")));
        settle(&h.source.mines, 1).await;
        settle(&h.source.gambles, 1).await;

        let state = h.engine.state().get();
        assert!(state.mine_locations().is_none());
        assert!(state.gamble_locations().is_none());
        assert_eq!(*h.engine.location_loads().get(), LocationLoads::default());

        let _ = h.source.items.expect().send(Ok(catalog()));
        let _ = h.source.account.expect().send(Ok(account()));
        h.source.mines.expect();
        h.source.gambles.expect();
        assert_eq!(h.engine.initialize().await?, InitOutcome::Initialized);
        Ok(())
    }

    #[tokio::test]
    async fn reset_while_loading_discards_first_screen() -> Result<()> {
        let h = harness();
        let items = h.source.items.expect();
        let _ = h.source.account.expect().send(Ok(account()));

        let pending = tokio::spawn({
            let engine = h.engine.clone();
            async move { engine.initialize().await }
        });
        while h.source.items.calls() == 0 {
            tokio::task::yield_now().await;
        }

        h.engine.reset()?;
        let _ = items.send(Ok(catalog()));
        let outcome = pending.await.expect("task panicked")?;

        assert_eq!(outcome, InitOutcome::Discarded);
        assert!(!h.engine.is_ready());
        assert!(!h.engine.state().get().is_loaded());
        assert_eq!(h.source.mines.calls(), 0);
        assert_eq!(h.engine.phase(), SyncPhase::Uninitialized);
        Ok(())
    }

    #[tokio::test]
    async fn wait_until_ready_resolves_after_publish() {
        let h = harness();
        let _ = h.source.items.expect().send(Ok(catalog()));
        let _ = h.source.account.expect().send(Ok(account()));
        h.source.mines.expect();
        h.source.gambles.expect();

        let waiter = tokio::spawn({
            let engine = h.engine.clone();
            async move { engine.wait_until_ready().await }
        });
        h.engine.initialize().await.expect("initialize");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .expect("waiter panicked");
    }
}
