pub mod aggregator;
pub mod error;
pub mod http_store;
pub mod manager;
pub mod memory_store;
pub mod projection;
pub mod store;
pub mod transition;

pub use aggregator::{BucketAggregator, PartialFailure, RefreshOutcome, Snapshot};
pub use error::{ErrorKind, InvalidTransition, WorkflowError};
pub use http_store::HttpRegistrationStore;
pub use manager::{WorkflowEvent, WorkflowManager};
pub use memory_store::InMemoryRegistrationStore;
pub use projection::{BucketCounts, Projection};
pub use store::RegistrationStore;
pub use transition::{
    check_request, validate_transition, CommittedTransition, FailedTransition,
    TransitionController, TransitionOutcome,
};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
