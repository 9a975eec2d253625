use thiserror::Error;

/// Errors from hierarchical location loading.
///
/// "Nothing exists at this location" is not an error: the loader returns
/// `Ok(None)` for that. These variants cover genuine faults talking to the
/// backing store.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("backing store error: {0}")]
    Store(String),
}
