pub mod remote;
pub use remote::{InMemoryRemote, RemoteError, RemoteStore};
pub mod rest_remote;
pub use rest_remote::RestRemoteStore;
pub mod outbox;
pub use outbox::{Outbox, Reconcile, RetryPolicy, WriteOp};
pub mod entity_store;
pub use entity_store::{EntityStore, PageResult, StoreEntity};
