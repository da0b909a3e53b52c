/// Errors the view-state reports to its caller directly.
///
/// Store failures never surface here; they are captured into the view's
/// error message and phase instead.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// `initialize` was called without a usable entity id.
    #[error("an entity id is required to load audit history")]
    MissingEntity,
}
