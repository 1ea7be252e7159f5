//! The apply context.
//!
//! Every resolved mutation and every ready notification passes through one
//! dispatcher task, so the sink never sees two applications at once and
//! sees them in submission order.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::package::Color;
use crate::resolve::{DecodeQuality, Drawable, Font};
use crate::theme::pending::PendingRequest;
use crate::theme::snapshot::LoadedTheme;

/// A resolved value ready to be applied to a target.
#[derive(Debug, Clone, PartialEq)]
pub enum ThemeUpdate {
    Background(Drawable),
    /// Drawable resource; the sink keeps the target's padding
    ResBackground(Drawable),
    Selector {
        normal: Drawable,
        pressed: Drawable,
    },
    ProgressDrawable {
        background: Drawable,
        progress: Drawable,
    },
    /// `None` when the font was found in neither package
    Typeface(Option<Font>),
    /// Left, top, right, bottom
    CompoundDrawables([Option<Drawable>; 4]),
    TextColor(Color),
    TextColorState {
        normal: Color,
        pressed: Color,
    },
}

/// Receives resolved values. Implemented by the UI layer.
pub trait ThemeSink: Send + Sync + 'static {
    fn apply(&self, target: crate::TargetId, update: ThemeUpdate);
}

impl<F> ThemeSink for F
where
    F: Fn(crate::TargetId, ThemeUpdate) + Send + Sync + 'static,
{
    fn apply(&self, target: crate::TargetId, update: ThemeUpdate) {
        self(target, update)
    }
}

pub(crate) type Notification = Box<dyn FnOnce() + Send + 'static>;

pub(crate) enum ApplyJob {
    Request {
        request: PendingRequest,
        theme: Arc<LoadedTheme>,
        quality: DecodeQuality,
    },
    Notify(Notification),
}

impl fmt::Debug for ApplyJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { request, theme, .. } => f
                .debug_struct("Request")
                .field("request", request)
                .field("generation", &theme.generation())
                .finish(),
            Self::Notify(_) => write!(f, "Notify"),
        }
    }
}

/// Handle for queueing work on the apply context.
#[derive(Clone)]
pub(crate) struct ApplyDispatcher {
    tx: mpsc::UnboundedSender<ApplyJob>,
}

impl ApplyDispatcher {
    /// Spawn the dispatcher task on `runtime`.
    pub(crate) fn spawn(runtime: &tokio::runtime::Handle, sink: Arc<dyn ThemeSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_dispatcher(rx, sink));
        Self { tx }
    }

    /// Queue a job. Returns the job back if the dispatcher is gone.
    pub(crate) fn send(&self, job: ApplyJob) -> Result<(), ApplyJob> {
        self.tx.send(job).map_err(|e| e.0)
    }
}

async fn run_dispatcher(mut rx: mpsc::UnboundedReceiver<ApplyJob>, sink: Arc<dyn ThemeSink>) {
    while let Some(job) = rx.recv().await {
        match job {
            ApplyJob::Request {
                request,
                theme,
                quality,
            } => {
                let target = request.target;
                let resolved =
                    tokio::task::spawn_blocking(move || theme.resolve_op(&request.op, quality))
                        .await;
                match resolved {
                    Ok(update) => sink.apply(target, update),
                    Err(e) => log::error!("Resolving request for {} failed: {}", target, e),
                }
            }
            ApplyJob::Notify(notify) => notify(),
        }
    }
    log::debug!("Apply dispatcher stopped");
}
