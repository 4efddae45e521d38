pub mod cas_fs;
pub mod email_api_client;
pub mod in_memory_run_store;
pub mod session_store;
pub mod sqlite_run_store;

pub use cas_fs::CasFsStore;
pub use email_api_client::HttpDeliverabilityClient;
pub use in_memory_run_store::InMemoryRunStore;
pub use session_store::InMemorySessionStore;
pub use sqlite_run_store::SqliteRunStore;
