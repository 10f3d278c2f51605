//! Image hosts that turn downloaded bytes into durable public URLs.

pub mod backend;
pub mod catbox;
pub mod imgbb;
pub mod pacing;
pub mod retry;

pub use backend::{upload_with_deadline, DeadlineOutcome, UploadBackend, UploaderFactory};
pub use catbox::CatboxUploader;
pub use imgbb::ImgbbUploader;
pub use pacing::{Pacing, PauseFn};
pub use retry::RetryPolicy;
