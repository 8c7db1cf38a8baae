// Moderation storage - warn ledger backends and the global keyword file.

pub mod bad_words_file;
pub mod sqlite_warn_store;

pub use bad_words_file::load_global_bad_words;
pub use sqlite_warn_store::SqliteWarnStore;
