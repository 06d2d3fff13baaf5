use thiserror::Error;

use crate::db::operations;
use crate::db::Database;
use crate::services::pinyin::single_code_point;

#[derive(Debug, Error)]
pub enum LearnedError {
    #[error("char 必须是单个汉字。")]
    InvalidGlyph,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Trims `input` and accepts it only if exactly one code point remains.
pub fn validate_glyph(input: &str) -> Result<String, LearnedError> {
    let trimmed = input.trim();
    single_code_point(trimmed)
        .map(|_| trimmed.to_string())
        .ok_or(LearnedError::InvalidGlyph)
}

pub async fn is_learned(db: &Database, input: &str) -> Result<bool, LearnedError> {
    let glyph = validate_glyph(input)?;
    Ok(operations::find_learned_character(db, &glyph).await?.is_some())
}

pub async fn mark_learned(db: &Database, input: &str) -> Result<(), LearnedError> {
    let glyph = validate_glyph(input)?;
    operations::upsert_learned_character(db, &glyph).await?;
    tracing::debug!(%glyph, "marked learned");
    Ok(())
}

pub async fn unmark_learned(db: &Database, input: &str) -> Result<(), LearnedError> {
    let glyph = validate_glyph(input)?;
    let removed = operations::delete_learned_character(db, &glyph).await?;
    tracing::debug!(%glyph, removed, "unmarked learned");
    Ok(())
}

/// All learned glyphs, oldest first, one per line.
pub async fn export_learned(db: &Database) -> Result<String, LearnedError> {
    let glyphs = operations::list_learned_glyphs(db).await?;
    Ok(glyphs.join("\n"))
}
