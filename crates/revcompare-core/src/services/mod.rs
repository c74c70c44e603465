pub mod backend;
pub mod compare;
pub mod diff;
pub mod highlight;
pub mod range;
pub mod registry;
pub mod resolver;
pub mod revset;
pub mod status;
pub mod word_diff;

pub use compare::Comparator;
pub use registry::{DirectoryRegistry, RepositoryRegistry};
pub use revset::Revset;
pub use status::{ChangesetStatus, StatusStore};
