//! Theme state: loading, buffering and applying resolved values.

pub mod apply;
pub mod pending;
pub mod resolver;
pub mod snapshot;

pub use apply::{ThemeSink, ThemeUpdate};
pub use pending::{
    LineOrientation, OpClass, PendingRequest, PendingRequestQueue, TargetId, TextColorVariant,
    ThemeOp,
};
pub use resolver::{LoadState, OnReady, ThemeResolver};
pub use snapshot::{CommonValues, Generation, LoadedTheme};
