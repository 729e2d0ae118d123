mod sqlite;

pub use sqlite::DbRegistry;
