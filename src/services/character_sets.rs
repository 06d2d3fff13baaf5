use serde::Deserialize;
use thiserror::Error;

use crate::cache::keys::{character_set_list_key, CHARACTER_SET_LIST_TTL};
use crate::cache::{ListingInvalidator, RedisCache};
use crate::db::operations::{self, Character, CharacterSet, CharacterSetSummary, CharacterSetWithCharacters};
use crate::db::Database;
use crate::services::encoding::extract_unique_glyphs;
use crate::services::ingestion::{persist_set, resolve_characters, ImportedSet};
use crate::services::pinyin::{is_valid_syllable, PinyinResolver};

const MAX_NAME_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCharacterSet {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub characters: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CreateSetError {
    #[error("字库名称不能为空。")]
    EmptyName,
    #[error("字库名称不能超过100个字符。")]
    NameTooLong,
    #[error("字库描述不能超过500个字符。")]
    DescriptionTooLong,
    #[error("字库中至少需要一个有效汉字。")]
    NoCharacters,
    #[error("已存在名为 \"{0}\" 的字库。")]
    DuplicateName(String),
    #[error("数据库错误: {0}")]
    Persistence(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum UpdatePinyinError {
    #[error("未找到指定ID的汉字。")]
    NotFound,
    #[error("拼音 \"{0}\" 格式不正确。")]
    InvalidSyllable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Set listing, newest first. Served from Redis when a cache is configured.
pub async fn list_character_sets(
    db: &Database,
    cache: Option<&RedisCache>,
) -> Result<Vec<CharacterSetSummary>, sqlx::Error> {
    if let Some(cache) = cache {
        if let Some(cached) = cache
            .get::<Vec<CharacterSetSummary>>(character_set_list_key())
            .await
        {
            tracing::debug!(count = cached.len(), "character set listing cache hit");
            return Ok(cached);
        }
    }

    let sets = operations::list_character_sets(db).await?;

    if let Some(cache) = cache {
        cache
            .set(character_set_list_key(), &sets, CHARACTER_SET_LIST_TTL)
            .await;
    }
    Ok(sets)
}

pub async fn get_character_set_with_characters(
    db: &Database,
    id: &str,
) -> Result<Option<CharacterSetWithCharacters>, sqlx::Error> {
    operations::get_character_set(db, id).await
}

/// Creates a set from an explicit glyph list. The default flag is left alone
/// and a taken name is reported instead of suffixed.
pub async fn create_character_set(
    db: &Database,
    resolver: &PinyinResolver,
    invalidator: &dyn ListingInvalidator,
    input: NewCharacterSet,
) -> Result<ImportedSet, CreateSetError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(CreateSetError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(CreateSetError::NameTooLong);
    }
    let description = input
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
    {
        return Err(CreateSetError::DescriptionTooLong);
    }

    let glyphs = extract_unique_glyphs(&input.characters.concat());
    if glyphs.is_empty() {
        return Err(CreateSetError::NoCharacters);
    }

    let characters = resolve_characters(resolver, &glyphs);
    let set = CharacterSet::new(name, description, false);

    if let Err(err) = persist_set(db, &set, &characters, false).await {
        if operations::is_unique_violation_on(&err, "character_sets", "name") {
            return Err(CreateSetError::DuplicateName(set.name));
        }
        return Err(CreateSetError::Persistence(err));
    }

    invalidator.invalidate_listing();
    tracing::info!(set_id = %set.id, name = %set.name, count = characters.len(), "character set created");

    Ok(ImportedSet {
        id: set.id,
        name: set.name,
        character_count: characters.len(),
    })
}

/// Returns `false` when no set with `id` existed.
pub async fn delete_character_set(
    db: &Database,
    invalidator: &dyn ListingInvalidator,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let deleted = operations::delete_character_set(db, id).await?;
    if deleted {
        invalidator.invalidate_listing();
        tracing::info!(set_id = id, "character set deleted");
    }
    Ok(deleted)
}

/// Replaces the reading list of one character. Syllables are trimmed and
/// empty entries dropped before validation.
pub async fn update_character_pinyin(
    db: &Database,
    character_id: &str,
    pinyin: &[String],
) -> Result<Character, UpdatePinyinError> {
    let cleaned: Vec<String> = pinyin
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(bad) = cleaned.iter().find(|s| !is_valid_syllable(s)) {
        return Err(UpdatePinyinError::InvalidSyllable(bad.clone()));
    }

    operations::update_character_pinyin(db, character_id, &cleaned)
        .await?
        .ok_or(UpdatePinyinError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character_set_defaults() {
        let input: NewCharacterSet = serde_json::from_str(r#"{"name":"课一"}"#).unwrap();
        assert_eq!(input.name, "课一");
        assert!(input.description.is_none());
        assert!(input.characters.is_empty());
    }
}
