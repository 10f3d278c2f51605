//! Download, verification and preparation of images between search and upload.
//!
//! Stages:
//! 1. Fetch - stream the body under a hard byte cap
//! 2. Validate - content type, magic bytes, decodability
//! 3. Normalize - re-encode oversize or WEBP images to JPEG
//!
//! Local saving and name helpers live alongside.

pub mod fetch;
pub mod local;
pub mod naming;
pub mod normalize;
pub mod validate;

pub use fetch::{FetchImage, ImageFetcher};
pub use local::save_local;
pub use naming::{guess_ext_and_type, safe_name};
pub use normalize::Normalizer;
pub use validate::Validator;
