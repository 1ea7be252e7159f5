//! Cross-process skin change detection.
//!
//! Processes sharing a [`SettingsStore`] coordinate through two keys:
//! `skin.path`, the active package, and `skin.change.mark`, raised to `"1"`
//! by the process that switched packages and lowered to `"0"` after a
//! debounce. Every other process sees the raised marker on its next poll
//! and either reloads in place or exits, depending on its [`RestartPolicy`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::DefaultPaths;
use crate::coordinator::locale::{current_language, locale_path, Language};
use crate::coordinator::settings::SettingsStore;
use crate::defaults::{self, SKIN_CHANGE_MARK_KEY, SKIN_PATH_KEY};
use crate::error::{Error, Result};
use crate::theme::{Generation, ThemeResolver};

const MARK_RAISED: &str = "1";
const MARK_CLEARED: &str = "0";

/// What a process does when another process switches packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Reload the persisted package in place; the generation advances
    #[default]
    Invalidate,
    /// Terminate the process with `code`; a supervisor restarts it
    ExitProcess { code: i32 },
}

/// Coordinator timing and behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub poll_interval_ms: u64,
    /// How long the marker stays raised after a change
    pub change_debounce_ms: u64,
    pub restart_policy: RestartPolicy,
    /// Locale tag for default package selection; the process locale if unset
    pub language: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::poll_interval_ms(),
            change_debounce_ms: defaults::change_debounce_ms(),
            restart_policy: RestartPolicy::default(),
            language: None,
        }
    }
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Marker not raised
    Idle,
    /// A change made by this process is in progress
    Paused,
    /// Marker still raised from an episode already handled
    AlreadyHandled,
    /// The resolver was asked to reload this path
    Reloading(String),
}

type RestartHook = Box<dyn Fn() + Send + Sync + 'static>;

/// Polls the change marker and drives package switches.
pub struct ReloadCoordinator {
    resolver: Arc<ThemeResolver>,
    store: Arc<dyn SettingsStore>,
    config: CoordinatorConfig,
    default_paths: DefaultPaths,
    runtime: tokio::runtime::Handle,
    shutdown: CancellationToken,
    debounce: Mutex<Option<CancellationToken>>,
    on_restart: Mutex<Option<RestartHook>>,
    started: AtomicBool,
    /// Set while this process is switching packages itself
    paused: AtomicBool,
    /// Set once the current raised-marker episode has been handled
    episode_handled: AtomicBool,
}

impl ReloadCoordinator {
    /// Create a coordinator. Must be called from within a Tokio runtime.
    pub fn new(
        resolver: Arc<ThemeResolver>,
        store: Arc<dyn SettingsStore>,
        config: CoordinatorConfig,
    ) -> Result<Arc<Self>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::NoRuntime(e.to_string()))?;
        let default_paths = resolver.config().default_paths.clone();

        Ok(Arc::new(Self {
            resolver,
            store,
            config,
            default_paths,
            runtime,
            shutdown: CancellationToken::new(),
            debounce: Mutex::new(None),
            on_restart: Mutex::new(None),
            started: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            episode_handled: AtomicBool::new(false),
        }))
    }

    pub fn resolver(&self) -> &Arc<ThemeResolver> {
        &self.resolver
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Register the hook run right before an external change is acted on.
    pub fn on_restart(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_restart.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
    }

    /// Persisted package path; empty when unset.
    pub fn persisted_path(&self) -> Result<String> {
        Ok(self.store.get(SKIN_PATH_KEY)?.unwrap_or_default())
    }

    /// Rewrite the persisted path to the default matching the locale.
    ///
    /// Returns the new path if one was written.
    pub fn check_locale_path(&self) -> Result<Option<String>> {
        let language = match &self.config.language {
            Some(tag) => Language::from_tag(tag),
            None => current_language(),
        };
        let current = self.persisted_path()?;
        let Some(path) = locale_path(language, &current, &self.default_paths) else {
            return Ok(None);
        };

        log::info!("Locale {:?} selects skin package {}", language, path);
        self.store.set(SKIN_PATH_KEY, &path)?;
        Ok(Some(path))
    }

    /// Load the persisted package into the resolver.
    pub fn attach(&self, on_ready: impl FnOnce(Result<Generation>) + Send + 'static) -> Result<()> {
        let path = self.persisted_path()?;
        self.resolver.load(&path, on_ready);
        Ok(())
    }

    /// Start polling the change marker. Calling it again has no effect.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let weak = Arc::downgrade(self);
        let token = self.shutdown.child_token();
        let period = Duration::from_millis(self.config.poll_interval_ms.max(1));
        log::debug!("Polling skin change marker every {:?}", period);

        self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let Some(this) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = tokio::task::spawn_blocking(move || this.tick()).await {
                    log::error!("Skin change poll failed: {}", e);
                }
            }
            log::debug!("Skin change polling stopped");
        });
    }

    /// Stop polling. A change still inside its debounce is settled now,
    /// so the marker is not left raised.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(token) = self.take_debounce() {
            token.cancel();
            self.finish_change();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Poll once.
    pub fn tick(&self) -> TickOutcome {
        if self.paused.load(Ordering::SeqCst) {
            return TickOutcome::Paused;
        }

        let marker = match self.store.get(SKIN_CHANGE_MARK_KEY) {
            Ok(marker) => marker,
            Err(e) => {
                log::warn!("Failed to read skin change marker: {}", e);
                return TickOutcome::Idle;
            }
        };
        if marker.as_deref() != Some(MARK_RAISED) {
            self.episode_handled.store(false, Ordering::SeqCst);
            return TickOutcome::Idle;
        }
        if self.episode_handled.swap(true, Ordering::SeqCst) {
            return TickOutcome::AlreadyHandled;
        }

        let path = match self.persisted_path() {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Failed to read skin path: {}", e);
                String::new()
            }
        };
        log::info!("Skin changed by another process to '{}'", path);

        if let Some(hook) = self
            .on_restart
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            hook();
        }

        match self.config.restart_policy {
            RestartPolicy::ExitProcess { code } => {
                log::info!("Exiting for skin change (code {})", code);
                std::process::exit(code);
            }
            RestartPolicy::Invalidate => {
                self.resolver.reload(&path, |result| match result {
                    Ok(generation) => log::info!("Skin reloaded ({})", generation),
                    Err(e) => log::error!("Skin reload failed: {}", e),
                });
                TickOutcome::Reloading(path)
            }
        }
    }

    /// Switch to the package at `path` and announce it to other processes.
    ///
    /// `listener` runs once the reload settles. The marker is raised only
    /// after a successful reload and lowered again after the debounce.
    pub fn change_skin(
        self: &Arc<Self>,
        path: &str,
        listener: impl FnOnce(Result<Generation>) + Send + 'static,
    ) -> Result<()> {
        self.store.set(SKIN_PATH_KEY, path)?;
        self.paused.store(true, Ordering::SeqCst);
        self.cancel_debounce();
        log::info!("Changing skin to '{}'", path);

        let weak = Arc::downgrade(self);
        self.resolver.reload(path, move |result| {
            let Some(this) = weak.upgrade() else {
                listener(result);
                return;
            };
            match result {
                Ok(generation) => {
                    if let Err(e) = this.store.set(SKIN_CHANGE_MARK_KEY, MARK_RAISED) {
                        log::warn!("Failed to raise skin change marker: {}", e);
                    }
                    this.schedule_debounce();
                    // The listener may release the last reference
                    drop(this);
                    listener(Ok(generation));
                }
                Err(e) => {
                    listener(Err(e));
                    this.paused.store(false, Ordering::SeqCst);
                }
            }
        });
        Ok(())
    }

    /// [`change_skin`](Self::change_skin) as a future.
    pub async fn change_skin_async(self: &Arc<Self>, path: &str) -> Result<Generation> {
        let (tx, rx) = oneshot::channel();
        self.change_skin(path, move |result| {
            let _ = tx.send(result);
        })?;
        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    fn schedule_debounce(self: &Arc<Self>) {
        let token = self.shutdown.child_token();
        {
            let mut slot = self.debounce.lock().unwrap_or_else(PoisonError::into_inner);
            if self.shutdown.is_cancelled() {
                drop(slot);
                self.finish_change();
                return;
            }
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
            }
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let delay = Duration::from_millis(self.config.change_debounce_ms);
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let Some(this) = weak.upgrade() else {
                return;
            };
            // Whoever takes the slot settles the change
            if token.is_cancelled() || this.take_debounce().is_none() {
                return;
            }
            if let Err(e) = tokio::task::spawn_blocking(move || this.finish_change()).await {
                log::error!("Skin change debounce failed: {}", e);
            }
        });
    }

    fn finish_change(&self) {
        if let Err(e) = self.store.set(SKIN_CHANGE_MARK_KEY, MARK_CLEARED) {
            log::warn!("Failed to clear skin change marker: {}", e);
        }
        self.paused.store(false, Ordering::SeqCst);
        log::debug!("Skin change settled, polling resumed");
    }

    fn take_debounce(&self) -> Option<CancellationToken> {
        self.debounce
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn cancel_debounce(&self) {
        if let Some(token) = self.take_debounce() {
            token.cancel();
        }
    }
}

impl Drop for ReloadCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("config", &self.config)
            .field("paused", &self.paused.load(Ordering::Relaxed))
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish()
    }
}
