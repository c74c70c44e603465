mod backend_kind;
mod reference;
mod revision_id;

pub use backend_kind::{BackendKind, UnsupportedBackendError};
pub use reference::{InvalidReferenceError, RefKind, Reference};
pub use revision_id::{InvalidRevisionIdError, RevisionId};
