pub mod file_store;
pub mod notifier;
pub mod pg_store;
pub mod tab_store;

pub use file_store::JsonFileStore;
pub use notifier::LogNotifier;
pub use pg_store::PgStore;
pub use tab_store::TabStore;
