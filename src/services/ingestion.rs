//! Turns an uploaded character list into a stored, default character set.

use serde::Serialize;
use thiserror::Error;

use crate::cache::ListingInvalidator;
use crate::db::operations::{self, CharacterSet, NewCharacter};
use crate::db::Database;
use crate::services::encoding::{self, extract_unique_glyphs, EncodingError};
use crate::services::pinyin::PinyinResolver;

pub const FALLBACK_SET_NAME: &str = "新字库";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedSet {
    pub id: String,
    pub name: String,
    pub character_count: usize,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("请选择一个文件上传。")]
    NoFile,
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("文件中未找到有效汉字。请确保每行一个汉字。")]
    NoValidCharacters,
    #[error("已存在名为 \"{0}\" 的字库，请重新导入。")]
    DuplicateName(String),
    #[error("数据库错误: {0}")]
    Persistence(#[source] sqlx::Error),
}

impl ImportError {
    fn from_storage(err: sqlx::Error, name: &str) -> Self {
        if operations::is_unique_violation_on(&err, "character_sets", "name") {
            ImportError::DuplicateName(name.to_string())
        } else {
            ImportError::Persistence(err)
        }
    }
}

pub async fn import_character_file(
    db: &Database,
    resolver: &PinyinResolver,
    invalidator: &dyn ListingInvalidator,
    raw: &[u8],
    filename: &str,
) -> Result<ImportedSet, ImportError> {
    if raw.is_empty() {
        return Err(ImportError::NoFile);
    }

    let decoded = encoding::decode(raw, filename)?;
    let glyphs = extract_unique_glyphs(&decoded.text);
    if glyphs.is_empty() {
        return Err(ImportError::NoValidCharacters);
    }

    let base_name = base_set_name(&decoded.filename);
    let name = unique_set_name(db, &base_name)
        .await
        .map_err(ImportError::Persistence)?;

    let description = format!(
        "从文件 \"{}\" 导入，包含 {} 个汉字。",
        decoded.filename,
        glyphs.len()
    );
    let characters = resolve_characters(resolver, &glyphs);
    let set = CharacterSet::new(name, Some(description), true);

    persist_set(db, &set, &characters, true)
        .await
        .map_err(|err| ImportError::from_storage(err, &set.name))?;

    invalidator.invalidate_listing();
    tracing::info!(
        set_id = %set.id,
        name = %set.name,
        count = characters.len(),
        encoding = decoded.encoding.as_str(),
        "character set imported"
    );

    Ok(ImportedSet {
        id: set.id,
        name: set.name,
        character_count: characters.len(),
    })
}

/// Inserts `set` and its characters in one transaction. With `make_default`
/// every other set loses its default flag first.
pub(crate) async fn persist_set(
    db: &Database,
    set: &CharacterSet,
    characters: &[NewCharacter],
    make_default: bool,
) -> Result<(), sqlx::Error> {
    let mut tx = db.pool().begin().await?;
    if make_default {
        let cleared = operations::clear_default_flag(&mut *tx).await?;
        tracing::debug!(cleared, "cleared previous default set");
    }
    operations::insert_character_set(&mut *tx, set).await?;
    operations::insert_characters(&mut *tx, &set.id, characters).await?;
    tx.commit().await
}

pub(crate) fn resolve_characters(resolver: &PinyinResolver, glyphs: &[char]) -> Vec<NewCharacter> {
    glyphs
        .iter()
        .map(|glyph| {
            let glyph = glyph.to_string();
            NewCharacter {
                pinyin: resolver.resolve(&glyph),
                glyph,
            }
        })
        .collect()
}

/// File name without directories and without its final extension. A name
/// with no dot at all is kept whole rather than collapsing to
/// [`FALLBACK_SET_NAME`]; only an empty stem falls back.
pub fn base_set_name(filename: &str) -> String {
    let file = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let stem = match file.rfind('.') {
        Some(idx) => &file[..idx],
        None => file,
    };
    let stem = stem.trim();
    if stem.is_empty() {
        FALLBACK_SET_NAME.to_string()
    } else {
        stem.to_string()
    }
}

/// First of `base`, `base (2)`, `base (3)`, … not taken by an existing set.
pub async fn unique_set_name(db: &Database, base: &str) -> Result<String, sqlx::Error> {
    let mut candidate = base.to_string();
    let mut counter = 2;
    while operations::find_character_set_by_name(db, &candidate)
        .await?
        .is_some()
    {
        candidate = format!("{base} ({counter})");
        counter += 1;
    }
    Ok(candidate)
}
