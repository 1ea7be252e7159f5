//! Buffered mutation requests.
//!
//! Requests made before the resolver is ready are parked here and replayed
//! once when it becomes ready. The buffer keeps at most one request per
//! target property: a later request for the same `(target, class)` replaces
//! the earlier one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a UI element theme values are applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl TargetId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which shared text color a text element takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextColorVariant {
    Primary,
    Text,
    Light,
    Dim,
    Dark,
    /// Normal text color, primary color while pressed
    PrimaryState,
}

/// Orientation of a shared divider line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOrientation {
    Horizontal,
    Vertical,
}

/// A theme mutation with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ThemeOp {
    /// `<folder>/<name>.png` as background
    Background { name: String, folder: String },
    /// Same as `Background`, decoded at full depth
    HdBackground { name: String, folder: String },
    /// Two folder images combined into a pressed-state selector
    Selector {
        normal: String,
        pressed: String,
        folder: String,
    },
    /// Track and fill images of a progress bar
    ProgressDrawable {
        background: String,
        progress: String,
        folder: String,
    },
    /// Font file from the `Typeface` folder
    Typeface { name: String },
    /// Images around a text element; `None` leaves that side empty
    CompoundDrawables {
        left: Option<String>,
        top: Option<String>,
        right: Option<String>,
        bottom: Option<String>,
        folder: String,
    },
    /// One of the shared text colors
    TextColor { variant: TextColorVariant },
    /// The shared dialog background
    DialogBackground,
    /// One of the shared divider lines
    Line { orientation: LineOrientation },
    /// Drawable resource by symbolic name, padding preserved by the sink
    ResBackground { name: String },
}

/// The target property an operation writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpClass {
    Background,
    ProgressDrawable,
    Typeface,
    CompoundDrawables,
    TextColor,
}

impl ThemeOp {
    pub fn class(&self) -> OpClass {
        match self {
            Self::Background { .. }
            | Self::HdBackground { .. }
            | Self::Selector { .. }
            | Self::DialogBackground
            | Self::Line { .. }
            | Self::ResBackground { .. } => OpClass::Background,
            Self::ProgressDrawable { .. } => OpClass::ProgressDrawable,
            Self::Typeface { .. } => OpClass::Typeface,
            Self::CompoundDrawables { .. } => OpClass::CompoundDrawables,
            Self::TextColor { .. } => OpClass::TextColor,
        }
    }
}

/// A mutation addressed to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub target: TargetId,
    pub op: ThemeOp,
}

impl PendingRequest {
    pub fn new(target: TargetId, op: ThemeOp) -> Self {
        Self { target, op }
    }
}

/// Last-write-wins buffer of [`PendingRequest`]s.
///
/// Iteration follows the order of the latest write per `(target, class)`.
/// The queue itself is not synchronized; the resolver keeps it under the
/// same lock as its load state.
#[derive(Debug, Default)]
pub struct PendingRequestQueue {
    requests: IndexMap<(TargetId, OpClass), ThemeOp>,
}

impl PendingRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `request`, replacing any unflushed request for the same
    /// target and class. Returns the replaced operation.
    pub fn enqueue(&mut self, request: PendingRequest) -> Option<ThemeOp> {
        let key = (request.target, request.op.class());
        let replaced = self.requests.shift_remove(&key);
        self.requests.insert(key, request.op);
        replaced
    }

    /// Remove and return every buffered request.
    pub fn drain(&mut self) -> Vec<PendingRequest> {
        self.requests
            .drain(..)
            .map(|((target, _), op)| PendingRequest { target, op })
            .collect()
    }

    /// Drop every buffered request for `target`, e.g. when it is destroyed.
    pub fn forget(&mut self, target: TargetId) -> usize {
        let before = self.requests.len();
        self.requests.retain(|(t, _), _| *t != target);
        before - self.requests.len()
    }

    pub fn get(&self, target: TargetId, class: OpClass) -> Option<&ThemeOp> {
        self.requests.get(&(target, class))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
