mod changeset;
mod compare;
mod diff;

pub(crate) use changeset::split_message;
pub use changeset::{Changeset, ChangesetRange};
pub use compare::{ChangesetComparison, ComparisonRequest, ComparisonResult, Warning};
pub use diff::{
    DiffHunk, DiffLine, DiffLineType, FileDiff, FileOperation, FileStats, HighlightToken,
    ProcessedDiff, RenderedFile,
};
