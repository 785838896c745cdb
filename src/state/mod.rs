pub mod record_store;

pub use record_store::{rank_order, AggregateQuery, GroupSums, MemoryRecordStore, RecordStore};
