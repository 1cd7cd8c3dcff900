pub mod filter;
mod orchestrator;
mod record;
mod store;

pub use filter::{FilterConfig, PolicyFilter};
pub use orchestrator::{Orchestrator, PassReport};
pub use record::{Fingerprint, NewRecord, ProcessingState, Record, RecordId};
pub use store::{Admission, RecordStore, StoreStats};

pub use sieve_crawler;
