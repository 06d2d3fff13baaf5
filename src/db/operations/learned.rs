use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::db::{now_iso, Database};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedCharacter {
    pub id: String,
    #[serde(rename = "char")]
    pub glyph: String,
    pub created_at: String,
}

pub async fn find_learned_character(
    db: &Database,
    glyph: &str,
) -> Result<Option<LearnedCharacter>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "learned_characters" WHERE "char" = ? LIMIT 1"#)
        .bind(glyph)
        .fetch_optional(db.pool())
        .await?;
    Ok(row.map(|r| LearnedCharacter {
        id: r.try_get("id").unwrap_or_default(),
        glyph: r.try_get("char").unwrap_or_default(),
        created_at: r.try_get("createdAt").unwrap_or_default(),
    }))
}

/// Inserts the mark unless it already exists; the original timestamp is kept.
pub async fn upsert_learned_character(db: &Database, glyph: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "learned_characters" ("id", "char", "createdAt")
        VALUES (?, ?, ?)
        ON CONFLICT ("char") DO NOTHING
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(glyph)
    .bind(now_iso())
    .execute(db.pool())
    .await?;
    Ok(())
}

/// Returns whether a row was removed. Deleting an absent glyph is not an error.
pub async fn delete_learned_character(db: &Database, glyph: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "learned_characters" WHERE "char" = ?"#)
        .bind(glyph)
        .execute(db.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_learned_glyphs(db: &Database) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT "char" FROM "learned_characters" ORDER BY "createdAt" ASC, rowid ASC"#)
        .fetch_all(db.pool())
        .await
}
