pub mod confirmation_sink;
pub mod proposal_source;

pub use confirmation_sink::SqliteConfirmationSink;
pub use proposal_source::JsonProposalSource;
