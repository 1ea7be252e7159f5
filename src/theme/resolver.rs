//! The theme resolver: package load lifecycle and request routing.
//!
//! Provides a state machine for the loaded theme:
//! UNLOADED -> LOADING -> READY, READY -> LOADING on reload,
//! LOADING -> FAILED when the load pipeline itself breaks.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::package::{Category, Color, PackageLoader, PackageOpener, ResourcePackage};
use crate::resolve::{DecodeQuality, Drawable, FallbackResolver, Font, ImageKind, ResolvedAsset};
use crate::theme::apply::{ApplyDispatcher, ApplyJob, Notification, ThemeSink};
use crate::theme::pending::{
    LineOrientation, PendingRequest, PendingRequestQueue, TargetId, TextColorVariant, ThemeOp,
};
use crate::theme::snapshot::{CommonValues, Generation, LoadedTheme};

/// Theme load state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    /// Nothing requested yet
    Unloaded,
    /// A load is in flight
    Loading,
    /// A theme is installed; mutations apply directly
    Ready,
    /// The last load broke before completing
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => write!(f, "UNLOADED"),
            Self::Loading => write!(f, "LOADING"),
            Self::Ready => write!(f, "READY"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Callback invoked once a load settles.
pub type OnReady = Box<dyn FnOnce(Result<Generation>) + Send + 'static>;

struct ResolverState {
    phase: LoadState,
    current: Arc<LoadedTheme>,
    default_package: Option<Arc<dyn ResourcePackage>>,
    pending: PendingRequestQueue,
    waiters: Vec<OnReady>,
    /// Bumped by every load start; completions carrying an older epoch are stale
    load_epoch: u64,
    generation: u64,
}

/// Output of the blocking half of a load.
struct PreparedTheme {
    path: String,
    resolver: FallbackResolver,
    common: CommonValues,
    default_package: Option<Arc<dyn ResourcePackage>>,
}

/// Resolves theme resources and routes mutations to a [`ThemeSink`].
///
/// Owned by the application's composition root and shared as
/// `Arc<ThemeResolver>`. Construction captures the current Tokio runtime;
/// all later calls may come from any thread.
pub struct ThemeResolver {
    config: ResolverConfig,
    loader: PackageLoader,
    runtime: tokio::runtime::Handle,
    dispatcher: ApplyDispatcher,
    state: Mutex<ResolverState>,
    default_folder: RwLock<String>,
    quality: RwLock<DecodeQuality>,
}

impl ThemeResolver {
    /// Create a resolver. Must be called from within a Tokio runtime.
    pub fn new(
        config: ResolverConfig,
        opener: Arc<dyn PackageOpener>,
        sink: Arc<dyn ThemeSink>,
    ) -> Result<Arc<Self>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::NoRuntime(e.to_string()))?;
        let dispatcher = ApplyDispatcher::spawn(&runtime, sink);
        let loader = PackageLoader::new(opener, config.default_paths.base.clone());
        let unloaded = LoadedTheme::unloaded(
            Generation(0),
            FallbackResolver::empty(config.namespace.clone(), config.diagnostic),
        );

        Ok(Arc::new(Self {
            default_folder: RwLock::new(config.default_folder.clone()),
            quality: RwLock::new(config.decode_quality),
            config,
            loader,
            runtime,
            dispatcher,
            state: Mutex::new(ResolverState {
                phase: LoadState::Unloaded,
                current: Arc::new(unloaded),
                default_package: None,
                pending: PendingRequestQueue::new(),
                waiters: Vec::new(),
                load_epoch: 0,
                generation: 0,
            }),
        }))
    }

    fn lock_state(&self) -> MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.lock_state().phase
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LoadState::Ready
    }

    /// Generation of the installed theme; `Generation(0)` before any load.
    pub fn generation(&self) -> Generation {
        self.lock_state().current.generation()
    }

    /// Whether values taken at `generation` are outdated.
    pub fn is_stale(&self, generation: Generation) -> bool {
        self.generation() != generation
    }

    /// The installed theme.
    pub fn theme(&self) -> Arc<LoadedTheme> {
        Arc::clone(&self.lock_state().current)
    }

    /// Number of buffered mutation requests.
    pub fn pending_len(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Load the package at `path` unless a theme is already installed.
    ///
    /// When ready, `on_ready` runs immediately on the calling thread. While
    /// a load is in flight, `on_ready` joins it and no second load starts.
    /// Otherwise a load starts; `on_ready` runs on the apply context after
    /// buffered requests have been handed to the sink.
    pub fn load(
        self: &Arc<Self>,
        path: &str,
        on_ready: impl FnOnce(Result<Generation>) + Send + 'static,
    ) {
        let mut state = self.lock_state();
        match state.phase {
            LoadState::Ready => {
                let generation = state.current.generation();
                drop(state);
                on_ready(Ok(generation));
            }
            LoadState::Loading => {
                log::debug!("Load of {} joins the load in flight", path);
                state.waiters.push(Box::new(on_ready));
            }
            LoadState::Unloaded | LoadState::Failed => {
                state.waiters.push(Box::new(on_ready));
                self.begin_load(&mut state, path);
            }
        }
    }

    /// Discard the installed theme and load `path`.
    ///
    /// Callbacks still waiting on an earlier load are completed by this one.
    /// The default package is kept unless `path` resolves to it.
    pub fn reload(
        self: &Arc<Self>,
        path: &str,
        on_ready: impl FnOnce(Result<Generation>) + Send + 'static,
    ) {
        let mut state = self.lock_state();
        let generation = state.current.generation();
        state.current = Arc::new(LoadedTheme::unloaded(
            generation,
            FallbackResolver::empty(self.config.namespace.clone(), self.config.diagnostic),
        ));
        state.waiters.push(Box::new(on_ready));
        self.begin_load(&mut state, path);
    }

    /// [`load`](Self::load) as a future.
    pub async fn load_async(self: &Arc<Self>, path: &str) -> Result<Generation> {
        let (tx, rx) = oneshot::channel();
        self.load(path, move |result| {
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    /// [`reload`](Self::reload) as a future.
    pub async fn reload_async(self: &Arc<Self>, path: &str) -> Result<Generation> {
        let (tx, rx) = oneshot::channel();
        self.reload(path, move |result| {
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    fn begin_load(self: &Arc<Self>, state: &mut ResolverState, path: &str) {
        state.phase = LoadState::Loading;
        state.load_epoch += 1;
        let epoch = state.load_epoch;

        // The worker decides whether the cached default applies
        let cached_default = state.default_package.clone();

        log::info!("Loading skin package '{}' (epoch {})", path, epoch);

        let this = Arc::clone(self);
        let path = path.to_string();
        self.runtime.spawn(async move {
            let worker = Arc::clone(&this);
            let outcome =
                tokio::task::spawn_blocking(move || worker.prepare(&path, cached_default)).await;
            this.finish_load(epoch, outcome.map_err(|e| e.to_string()));
        });
    }

    fn prepare(&self, path: &str, cached_default: Option<Arc<dyn ResourcePackage>>) -> PreparedTheme {
        let packages = self.loader.load(path, cached_default);
        let resolver = FallbackResolver::new(
            packages.primary,
            packages.default.clone(),
            self.config.namespace.clone(),
            self.config.compatible_namespaces.clone(),
            self.config.diagnostic,
        );
        let common = CommonValues::compute(&resolver, self.decode_quality());

        PreparedTheme {
            path: packages.effective_path,
            resolver,
            common,
            default_package: packages.default,
        }
    }

    fn finish_load(&self, epoch: u64, outcome: std::result::Result<PreparedTheme, String>) {
        let mut deferred: Vec<Notification> = Vec::new();
        {
            let mut state = self.lock_state();
            if state.load_epoch != epoch {
                log::debug!(
                    "Discarding stale load (epoch {}, current {})",
                    epoch,
                    state.load_epoch
                );
                return;
            }

            let waiters = std::mem::take(&mut state.waiters);
            let notification: Notification = match outcome {
                Ok(prepared) => {
                    state.generation += 1;
                    let generation = Generation(state.generation);
                    let theme = Arc::new(LoadedTheme::new(
                        generation,
                        Some(prepared.path),
                        prepared.resolver,
                        prepared.common,
                    ));
                    state.default_package = prepared.default_package;
                    state.current = Arc::clone(&theme);
                    state.phase = LoadState::Ready;

                    let requests = state.pending.drain();
                    log::info!(
                        "Skin ready ({}, {} buffered requests)",
                        generation,
                        requests.len()
                    );

                    let quality = self.decode_quality();
                    for request in requests {
                        self.dispatch(request, Arc::clone(&theme), quality);
                    }

                    Box::new(move || {
                        for waiter in waiters {
                            waiter(Ok(generation));
                        }
                    })
                }
                Err(e) => {
                    log::error!("Skin load pipeline failed: {}", e);
                    state.phase = LoadState::Failed;
                    Box::new(move || {
                        for waiter in waiters {
                            waiter(Err(Error::LoadFailed(e.clone())));
                        }
                    })
                }
            };

            if let Err(job) = self.dispatcher.send(ApplyJob::Notify(notification)) {
                if let ApplyJob::Notify(notification) = job {
                    deferred.push(notification);
                }
            }
        }

        for notification in deferred {
            notification();
        }
    }

    /// Route `request` to the sink now if ready, otherwise buffer it.
    pub fn submit(&self, request: PendingRequest) {
        let mut state = self.lock_state();
        if state.phase == LoadState::Ready {
            let theme = Arc::clone(&state.current);
            self.dispatch(request, theme, self.decode_quality());
        } else {
            log::debug!("Buffering {:?} for {} until ready", request.op, request.target);
            state.pending.enqueue(request);
        }
    }

    fn dispatch(&self, request: PendingRequest, theme: Arc<LoadedTheme>, quality: DecodeQuality) {
        let job = ApplyJob::Request {
            request,
            theme,
            quality,
        };
        if let Err(job) = self.dispatcher.send(job) {
            log::warn!("Apply context closed, dropping {:?}", job);
        }
    }

    /// Drop buffered requests for a target that no longer exists.
    pub fn forget(&self, target: TargetId) -> usize {
        self.lock_state().pending.forget(target)
    }

    // Mutations

    pub fn set_background(&self, target: TargetId, name: &str) {
        self.set_background_in(target, name, &self.default_folder());
    }

    pub fn set_background_in(&self, target: TargetId, name: &str, folder: &str) {
        self.submit(PendingRequest::new(
            target,
            ThemeOp::Background {
                name: name.to_string(),
                folder: folder.to_string(),
            },
        ));
    }

    pub fn set_hd_background(&self, target: TargetId, name: &str) {
        self.set_hd_background_in(target, name, &self.default_folder());
    }

    pub fn set_hd_background_in(&self, target: TargetId, name: &str, folder: &str) {
        self.submit(PendingRequest::new(
            target,
            ThemeOp::HdBackground {
                name: name.to_string(),
                folder: folder.to_string(),
            },
        ));
    }

    pub fn set_selector(&self, target: TargetId, normal: &str, pressed: &str) {
        self.set_selector_in(target, normal, pressed, &self.default_folder());
    }

    pub fn set_selector_in(&self, target: TargetId, normal: &str, pressed: &str, folder: &str) {
        self.submit(PendingRequest::new(
            target,
            ThemeOp::Selector {
                normal: normal.to_string(),
                pressed: pressed.to_string(),
                folder: folder.to_string(),
            },
        ));
    }

    pub fn set_progress_drawable(&self, target: TargetId, background: &str, progress: &str) {
        self.set_progress_drawable_in(target, background, progress, &self.default_folder());
    }

    pub fn set_progress_drawable_in(
        &self,
        target: TargetId,
        background: &str,
        progress: &str,
        folder: &str,
    ) {
        self.submit(PendingRequest::new(
            target,
            ThemeOp::ProgressDrawable {
                background: background.to_string(),
                progress: progress.to_string(),
                folder: folder.to_string(),
            },
        ));
    }

    pub fn set_typeface(&self, target: TargetId, name: &str) {
        self.submit(PendingRequest::new(
            target,
            ThemeOp::Typeface {
                name: name.to_string(),
            },
        ));
    }

    /// Images around a text element: left, top, right, bottom.
    pub fn set_compound_drawables(&self, target: TargetId, sides: [Option<&str>; 4]) {
        self.set_compound_drawables_in(target, sides, &self.default_folder());
    }

    pub fn set_compound_drawables_in(&self, target: TargetId, sides: [Option<&str>; 4], folder: &str) {
        let [left, top, right, bottom] = sides.map(|side| side.map(str::to_string));
        self.submit(PendingRequest::new(
            target,
            ThemeOp::CompoundDrawables {
                left,
                top,
                right,
                bottom,
                folder: folder.to_string(),
            },
        ));
    }

    pub fn set_text_color(&self, target: TargetId, variant: TextColorVariant) {
        self.submit(PendingRequest::new(target, ThemeOp::TextColor { variant }));
    }

    pub fn set_dialog_background(&self, target: TargetId) {
        self.submit(PendingRequest::new(target, ThemeOp::DialogBackground));
    }

    pub fn set_line(&self, target: TargetId, orientation: LineOrientation) {
        self.submit(PendingRequest::new(target, ThemeOp::Line { orientation }));
    }

    pub fn set_res_background(&self, target: TargetId, name: &str) {
        self.submit(PendingRequest::new(
            target,
            ThemeOp::ResBackground {
                name: name.to_string(),
            },
        ));
    }

    // Settings

    pub fn default_folder(&self) -> String {
        self.default_folder
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Folder used by image operations that do not name one. Takes effect
    /// for requests submitted afterwards.
    pub fn set_default_folder(&self, folder: &str) {
        *self
            .default_folder
            .write()
            .unwrap_or_else(PoisonError::into_inner) = folder.to_string();
    }

    pub fn decode_quality(&self) -> DecodeQuality {
        *self.quality.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pixel depth for images decoded without an explicit quality.
    pub fn set_decode_quality(&self, quality: DecodeQuality) {
        *self.quality.write().unwrap_or_else(PoisonError::into_inner) = quality;
    }

    // Lookups against the installed theme

    pub fn resolve(&self, category: Category, name: &str) -> ResolvedAsset {
        self.theme().resolver().resolve(category, name)
    }

    pub fn color(&self, name: &str) -> Color {
        self.theme().resolver().color(name)
    }

    pub fn color_with_result(&self, name: &str) -> (bool, Color) {
        self.theme().resolver().color_with_result(name)
    }

    /// Color `name`, falling back to the older name `compatible`.
    pub fn color_or(&self, name: &str, compatible: &str) -> Color {
        self.theme().resolver().color_or(name, compatible)
    }

    pub fn common(&self) -> CommonValues {
        self.theme().common().clone()
    }

    /// `<default folder>/<name>.png` at the configured depth.
    pub fn drawable(&self, name: &str) -> Drawable {
        self.drawable_in(name, &self.default_folder())
    }

    pub fn drawable_in(&self, name: &str, folder: &str) -> Drawable {
        self.image(name, folder, ImageKind::Png, self.decode_quality())
    }

    pub fn hd_drawable(&self, name: &str) -> Drawable {
        self.image(name, &self.default_folder(), ImageKind::Png, DecodeQuality::High)
    }

    pub fn jpg_drawable(&self, name: &str) -> Drawable {
        self.image(name, &self.default_folder(), ImageKind::Jpg, self.decode_quality())
    }

    pub fn jpg_hd_drawable(&self, name: &str) -> Drawable {
        self.image(name, &self.default_folder(), ImageKind::Jpg, DecodeQuality::High)
    }

    pub fn image(&self, name: &str, folder: &str, kind: ImageKind, quality: DecodeQuality) -> Drawable {
        self.theme().resolver().image(name, folder, kind, quality)
    }

    pub fn res_drawable(&self, name: &str) -> Drawable {
        self.theme().resolver().res_drawable(name)
    }

    /// Normal and pressed images of a selector from the default folder.
    pub fn selector(&self, normal: &str, pressed: &str) -> (Drawable, Drawable) {
        let theme = self.theme();
        let folder = self.default_folder();
        let quality = self.decode_quality();
        (
            theme.resolver().image(normal, &folder, ImageKind::Png, quality),
            theme.resolver().image(pressed, &folder, ImageKind::Png, quality),
        )
    }

    pub fn font(&self, name: &str) -> Option<Font> {
        self.theme().font(name)
    }
}

impl fmt::Debug for ThemeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("ThemeResolver")
            .field("state", &state.phase)
            .field("generation", &state.current.generation())
            .field("pending", &state.pending.len())
            .finish()
    }
}
