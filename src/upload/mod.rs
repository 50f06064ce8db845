//! Floor-plan upload: file acceptance, encoding, simulated progress and hand-off.

mod file;
mod progress;
mod session;
mod widget;

pub use file::{FileMeta, FileSource, PickedFile};
pub use progress::{ProgressSource, SimulatedProgress};
pub use session::{Effect, Interaction, OnComplete, Status, Uploader};
pub use widget::UploadWidget;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("could not read {name}: {reason}")]
    Read { name: String, reason: String },
    #[error("{name} is too large ({size} bytes, limit {limit} bytes)")]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("reading {0} was interrupted")]
    Interrupted(String),
}
