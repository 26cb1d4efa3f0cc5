//! Ledger operations over an open connection.
//!
//! Mutating calls take an explicit [`Actor`](crate::actor::Actor); reads
//! never do. Every operation returns [`crate::error::Result`].

pub mod append;
pub mod link;
pub mod query;
pub mod timeline;
pub mod void;

pub use append::{ChainTail, append, append_with_clock, chain_tail};
pub use link::{dependencies_of, link, link_with_clock};
pub use query::{
    PageCursor, RecordDetail, RecordFilter, RecordPage, get_record, get_record_detail,
    list_records, records_for_target,
};
pub use timeline::{DependencyEdge, TimelineEvent, timeline};
pub use void::{void_record, void_record_with_clock};
