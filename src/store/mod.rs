pub mod filters;
pub mod records;

pub use filters::FilterStore;
pub use records::RecordStore;

use crate::db::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads and decodes one keyed blob. Storage and decode failures are logged
/// and reported as `None` so callers can fall back to their defaults.
fn load_json<T: DeserializeOwned>(storage: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(key, error = %error, "failed to read persisted state");
            return None;
        }
    };

    match serde_json::from_str::<T>(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, error = %error, "persisted state is not valid JSON");
            None
        }
    }
}

fn persist_json<T: Serialize + ?Sized>(storage: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(error) => {
            tracing::warn!(key, error = %error, "failed to encode state for persistence");
            return false;
        }
    };

    match storage.set(key, &encoded) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(key, error = %error, "failed to persist state");
            false
        }
    }
}
