pub mod character_sets;
pub mod learned;

pub use character_sets::*;
pub use learned::*;

/// True when `err` is a UNIQUE constraint violation on `table.column`.
pub fn is_unique_violation_on(err: &sqlx::Error, table: &str, column: &str) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };
    if !db_err.is_unique_violation() {
        return false;
    }
    let target = format!("{table}.{column}");
    db_err.message().contains(&target)
}
