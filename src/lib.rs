// MoMo Ledger - Core Library
// Exposes all modules for use in the import CLI, API server, and tests

pub mod classifier;
pub mod db;
pub mod extract;
pub mod model;
pub mod xml;

// Re-export commonly used types
pub use classifier::{Classifier, CATEGORY_CHAIN};
pub use db::{
    get_transaction, insert_record, list_transactions, monthly_stats, overall_stats,
    search_transactions, setup_database, type_stats, verify_count, MonthlyStat, OverallStats,
    TransactionFilter, TypeStat,
};
pub use extract::Patterns;
pub use model::{Category, StoredTransaction, TransactionDetails, TransactionRecord};
pub use xml::{parse_sms_export, read_sms_export, MessageBatch};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
