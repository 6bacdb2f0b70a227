pub mod confirmation;
pub mod edits;
pub mod ports;
pub mod proposal;
pub mod session;
pub mod store;
pub mod view;

pub use confirmation::{BatchKind, ConfirmationBatch};
pub use ports::{ConfirmError, ConfirmationSink, ProposalSource, SourceError};
pub use proposal::{ConfidenceBand, ConfirmationRecord, FileDetail, Proposal};
pub use session::{ActiveSplit, ReviewSession};
pub use store::ProposalStore;
pub use view::{FileRow, GroupCard, PageView, UngroupedFile, PAGE_SIZE};
