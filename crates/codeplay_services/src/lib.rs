//! CodePlay Services Layer
//!
//! Everything that touches the outside world on behalf of the editor:
//! settings, snapshot storage, share links and ZIP export.

pub mod error;
pub mod export;
pub mod settings;
pub mod share;
pub mod storage;

pub use error::{ServiceError, ShareError};
pub use export::{export_bytes, export_to_path, export_zip, EXPORT_FILE_NAME};
pub use settings::Settings;
pub use share::{build_share_url, decode_payload, encode_payload, load_from_url, ShareLoad, SharePayload};
pub use storage::{
    autosave, autosave_under, clear_autosave, load_autosave, load_autosave_under, FileStore,
    KeyValueStore, MemoryStore, AUTOSAVE_KEY,
};
