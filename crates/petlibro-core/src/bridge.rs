// ── Bridge facade ──
//
// Full lifecycle of one PETLIBRO account: login, discovery, the polling
// task and the command processor. Consumers read snapshots from the store
// and send commands through `execute`.

use std::sync::Arc;

use petlibro_api::{AuthSession, CloudClient};
use strum::Display;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Ack, Command, CommandDispatcher, CommandEnvelope};
use crate::config::BridgeConfig;
use crate::coordinator::{CoordinatorPhase, CycleReport, PollingCoordinator};
use crate::error::CoreError;
use crate::model::{Account, AccountUpdate, Device, DeviceSerial};
use crate::registry::DeviceRegistry;
use crate::store::{DeviceSnapshot, SnapshotStore};
use crate::stream::Subscription;

const COMMAND_CHANNEL_SIZE: usize = 32;

// ── BridgeState ─────────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BridgeState {
    Disconnected,
    Connecting,
    Ready,
    Failed,
}

// ── Bridge ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. The registry and snapshot
/// store outlive setup/teardown cycles; the session, coordinator and
/// background tasks are rebuilt by every [`setup`](Self::setup).
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    registry: Arc<DeviceRegistry>,
    store: Arc<SnapshotStore>,
    state: watch::Sender<BridgeState>,
    account: watch::Sender<Option<Arc<Account>>>,
    command_tx: Mutex<mpsc::Sender<CommandEnvelope>>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    /// Child token for the current setup; cancelled on teardown, replaced
    /// on the next setup.
    cancel_child: Mutex<CancellationToken>,
    session: Mutex<Option<Arc<AuthSession>>>,
    coordinator: Mutex<Option<Arc<PollingCoordinator>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Create a bridge. Does NOT log in; call [`setup`](Self::setup).
    pub fn new(config: BridgeConfig) -> Self {
        let (state, _) = watch::channel(BridgeState::Disconnected);
        let (account, _) = watch::channel(None);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(BridgeInner {
                config,
                registry: Arc::new(DeviceRegistry::new()),
                store: Arc::new(SnapshotStore::new()),
                state,
                account,
                command_tx: Mutex::new(command_tx),
                command_rx: Mutex::new(Some(command_rx)),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                session: Mutex::new(None),
                coordinator: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Log in, load the account, discover devices, run the first cycle
    /// and start the background tasks.
    ///
    /// A rejected login or a failed discovery aborts setup; a failed
    /// account fetch only logs a warning. Calling this while the bridge
    /// is connecting or ready is a no-op.
    pub async fn setup(&self) -> Result<(), CoreError> {
        let claimed = self.inner.state.send_if_modified(|state| match state {
            BridgeState::Connecting | BridgeState::Ready => false,
            BridgeState::Disconnected | BridgeState::Failed => {
                *state = BridgeState::Connecting;
                true
            }
        });
        if !claimed {
            let current = *self.inner.state.borrow();
            debug!(%current, "bridge already set up");
            return Ok(());
        }

        match self.try_setup().await {
            Ok(()) => {
                self.inner.state.send_replace(BridgeState::Ready);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "bridge setup failed");
                self.inner.state.send_replace(BridgeState::Failed);
                Err(e)
            }
        }
    }

    async fn try_setup(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let base_url = config.resolved_base_url()?;
        let session = Arc::new(
            AuthSession::new(base_url, config.region, &config.transport())?
                .with_session_ttl(config.session_ttl),
        );

        session.login(config.credentials()).await?;
        info!(email = %config.email, region = %config.region, "logged in");

        if let Err(e) = self.start(Arc::clone(&session)).await {
            session.close();
            if let Err(logout) = session.logout().await {
                warn!(error = %logout, "logout after failed setup failed (non-fatal)");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Everything after login. The caller owns the session on failure.
    async fn start(&self, session: Arc<AuthSession>) -> Result<(), CoreError> {
        let config = &self.inner.config;
        let client = CloudClient::new(Arc::clone(&session));

        match load_account(&client, config).await {
            Ok(account) => {
                self.inner.account.send_replace(Some(Arc::new(account)));
            }
            Err(e) => warn!(error = %e, "could not load account details (non-fatal)"),
        }

        let devices = self.inner.registry.discover(&client).await?;
        self.inner
            .store
            .retain_devices(&self.inner.registry.serials());
        info!(devices = devices.len(), "devices discovered");

        let coordinator = Arc::new(
            PollingCoordinator::new(
                client,
                Arc::clone(&self.inner.registry),
                Arc::clone(&self.inner.store),
            )
            .with_period(config.poll_interval)
            .with_rediscovery(config.rediscover_every),
        );
        let report = coordinator.run_cycle().await;
        debug!(status = %report.status, "initial cycle finished");

        // Fresh child token so a previous teardown does not cancel this run.
        let cancel = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = cancel.clone();

        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&coordinator),
            cancel.clone(),
        ));

        let mut handles = self.inner.task_handles.lock().await;
        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            handles.push(tokio::spawn(command_processor_task(
                dispatcher,
                rx,
                cancel.clone(),
            )));
        }
        if !config.poll_interval.is_zero() {
            handles.push(tokio::spawn(Arc::clone(&coordinator).run(cancel)));
        }
        drop(handles);

        *self.inner.session.lock().await = Some(session);
        *self.inner.coordinator.lock().await = Some(coordinator);
        Ok(())
    }

    /// Stop background tasks, reject pending renewals, and log out
    /// (best-effort). Snapshots stay readable.
    pub async fn teardown(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let session = self.inner.session.lock().await.take();
        if let Some(session) = &session {
            session.close();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        if let Some(session) = session {
            if let Err(e) = session.logout().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
        }

        *self.inner.coordinator.lock().await = None;

        // Recreate the command channel; the previous receiver was consumed
        // by the command processor task.
        {
            let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
            *self.inner.command_tx.lock().await = tx;
            *self.inner.command_rx.lock().await = Some(rx);
        }

        self.inner.state.send_replace(BridgeState::Disconnected);
        debug!("bridge torn down");
    }

    /// One-shot: set up without scheduled polling, run `f`, tear down.
    pub async fn oneshot<F, Fut, T>(config: BridgeConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Bridge) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = std::time::Duration::ZERO;

        let bridge = Bridge::new(cfg);
        bridge.setup().await?;
        let result = f(bridge.clone()).await;
        bridge.teardown().await;
        result
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Send a command through the command processor.
    pub async fn execute(&self, command: Command) -> Result<Ack, CoreError> {
        if *self.inner.state.borrow() != BridgeState::Ready {
            return Err(CoreError::NotReady);
        }

        let (tx, rx) = oneshot::channel();
        let command_tx = self.inner.command_tx.lock().await.clone();
        command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::NotReady)?;

        rx.await.map_err(|_| CoreError::NotReady)?
    }

    /// Run a polling cycle now instead of waiting for the next tick.
    pub async fn refresh(&self) -> Result<Arc<CycleReport>, CoreError> {
        Ok(self.coordinator().await?.run_cycle().await)
    }

    // ── Account ──────────────────────────────────────────────────────

    /// The account loaded at setup or by the last refresh.
    pub fn account(&self) -> Option<Arc<Account>> {
        self.inner.account.borrow().clone()
    }

    pub async fn refresh_account(&self) -> Result<Arc<Account>, CoreError> {
        let coordinator = self.coordinator().await?;
        let account = Arc::new(load_account(coordinator.client(), &self.inner.config).await?);
        self.inner.account.send_replace(Some(Arc::clone(&account)));
        Ok(account)
    }

    /// Apply profile and unit changes, then re-read the account. Fields
    /// that already hold the requested value are not sent.
    pub async fn update_account(&self, update: &AccountUpdate) -> Result<Arc<Account>, CoreError> {
        let current = match self.account() {
            Some(account) => account,
            None => self.refresh_account().await?,
        };

        let (info_fields, setting_fields) = update.diff(&current);
        if info_fields.is_empty() && setting_fields.is_empty() {
            debug!("account update has no changes");
            return Ok(current);
        }

        let coordinator = self.coordinator().await?;
        let client = coordinator.client();
        if !info_fields.is_empty() {
            client.member_update_info(info_fields).await?;
        }
        if !setting_fields.is_empty() {
            client.member_update_setting(setting_fields).await?;
        }
        info!("account updated");
        self.refresh_account().await
    }

    // ── State observation ────────────────────────────────────────────

    pub fn state(&self) -> watch::Receiver<BridgeState> {
        self.inner.state.subscribe()
    }

    pub fn account_updates(&self) -> watch::Receiver<Option<Arc<Account>>> {
        self.inner.account.subscribe()
    }

    /// Reports of the running coordinator, one per completed cycle.
    pub async fn cycle_reports(&self) -> Result<watch::Receiver<Option<Arc<CycleReport>>>, CoreError> {
        Ok(self.coordinator().await?.reports())
    }

    pub async fn phase(&self) -> Result<watch::Receiver<CoordinatorPhase>, CoreError> {
        Ok(self.coordinator().await?.phase())
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }

    pub fn snapshots(&self) -> Arc<Vec<Arc<DeviceSnapshot>>> {
        self.inner.store.snapshot()
    }

    pub fn snapshot(&self, serial: &DeviceSerial) -> Option<Arc<DeviceSnapshot>> {
        self.inner.store.get(serial)
    }

    pub fn subscribe(&self) -> Subscription<DeviceSnapshot> {
        self.inner.store.subscribe()
    }

    pub fn devices(&self) -> Arc<Vec<Arc<Device>>> {
        self.inner.registry.snapshot()
    }

    pub fn device(&self, serial: &DeviceSerial) -> Option<Arc<Device>> {
        self.inner.registry.get(serial)
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn coordinator(&self) -> Result<Arc<PollingCoordinator>, CoreError> {
        self.inner
            .coordinator
            .lock()
            .await
            .clone()
            .ok_or(CoreError::NotReady)
    }
}

async fn load_account(client: &CloudClient, config: &BridgeConfig) -> Result<Account, CoreError> {
    let data = client.member_info().await?;
    Ok(Account::from_member_info(&data, config.region, &config.email)?)
}

// ── Background tasks ────────────────────────────────────────────────

/// Process commands from the mpsc channel one at a time.
async fn command_processor_task(
    dispatcher: Arc<CommandDispatcher>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let Command { serial, action } = envelope.command;
                let result = dispatcher.send(&serial, action).await.map_err(CoreError::from);
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}
