use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use crate::db::{now_iso, Database};

const INSERT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSet {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl CharacterSet {
    pub fn new(name: impl Into<String>, description: Option<String>, is_default: bool) -> Self {
        let now = now_iso();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description,
            is_default,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSetSummary {
    pub id: String,
    pub name: String,
    pub character_count: i64,
    pub is_default: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    #[serde(rename = "char")]
    pub glyph: String,
    pub pinyin: Vec<String>,
    pub character_set_id: String,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSetWithCharacters {
    #[serde(flatten)]
    pub set: CharacterSet,
    pub characters: Vec<Character>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCharacter {
    pub glyph: String,
    pub pinyin: Vec<String>,
}

pub async fn list_character_sets(db: &Database) -> Result<Vec<CharacterSetSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT s."id", s."name", s."isDefault", s."createdAt",
               COUNT(c."id") AS "characterCount"
        FROM "character_sets" s
        LEFT JOIN "characters" c ON c."characterSetId" = s."id"
        GROUP BY s."id"
        ORDER BY s."createdAt" DESC, s.rowid DESC
        "#,
    )
    .fetch_all(db.pool())
    .await?;

    Ok(rows
        .iter()
        .map(|r| CharacterSetSummary {
            id: r.try_get("id").unwrap_or_default(),
            name: r.try_get("name").unwrap_or_default(),
            character_count: r.try_get("characterCount").unwrap_or(0),
            is_default: r.try_get("isDefault").unwrap_or(false),
            created_at: r.try_get("createdAt").unwrap_or_default(),
        })
        .collect())
}

pub async fn get_character_set(
    db: &Database,
    id: &str,
) -> Result<Option<CharacterSetWithCharacters>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "character_sets" WHERE "id" = ? LIMIT 1"#)
        .bind(id)
        .fetch_optional(db.pool())
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let characters = get_characters_by_set(db, id).await?;
    Ok(Some(CharacterSetWithCharacters {
        set: map_character_set(&row),
        characters,
    }))
}

pub async fn get_characters_by_set(
    db: &Database,
    set_id: &str,
) -> Result<Vec<Character>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM "characters"
        WHERE "characterSetId" = ?
        ORDER BY "createdAt" ASC, "position" ASC
        "#,
    )
    .bind(set_id)
    .fetch_all(db.pool())
    .await?;
    Ok(rows.iter().map(map_character).collect())
}

pub async fn find_character_set_by_name(
    db: &Database,
    name: &str,
) -> Result<Option<CharacterSet>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "character_sets" WHERE "name" = ? LIMIT 1"#)
        .bind(name)
        .fetch_optional(db.pool())
        .await?;
    Ok(row.map(|r| map_character_set(&r)))
}

pub async fn get_default_character_set(db: &Database) -> Result<Option<CharacterSet>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "character_sets" WHERE "isDefault" = 1 LIMIT 1"#)
        .fetch_optional(db.pool())
        .await?;
    Ok(row.map(|r| map_character_set(&r)))
}

/// Returns `false` when no set with `id` existed.
pub async fn delete_character_set(db: &Database, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "character_sets" WHERE "id" = ?"#)
        .bind(id)
        .execute(db.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear_default_flag(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE "character_sets" SET "isDefault" = 0, "updatedAt" = ? WHERE "isDefault" = 1"#,
    )
    .bind(now_iso())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn insert_character_set(
    conn: &mut SqliteConnection,
    set: &CharacterSet,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "character_sets" (
            "id", "name", "description", "isDefault", "createdAt", "updatedAt"
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&set.id)
    .bind(&set.name)
    .bind(&set.description)
    .bind(set.is_default)
    .bind(&set.created_at)
    .bind(&set.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Inserts `characters` in order; `position` records the index in the slice.
pub async fn insert_characters(
    conn: &mut SqliteConnection,
    set_id: &str,
    characters: &[NewCharacter],
) -> Result<u64, sqlx::Error> {
    let created_at = now_iso();
    let mut inserted = 0;

    for (batch_index, chunk) in characters.chunks(INSERT_BATCH_SIZE).enumerate() {
        let offset = batch_index * INSERT_BATCH_SIZE;
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"INSERT INTO "characters" ("id", "char", "pinyin", "position", "characterSetId", "createdAt") "#,
        );
        qb.push_values(chunk.iter().enumerate(), |mut b, (i, character)| {
            b.push_bind(uuid::Uuid::new_v4().to_string())
                .push_bind(character.glyph.clone())
                .push_bind(encode_pinyin(&character.pinyin))
                .push_bind((offset + i) as i64)
                .push_bind(set_id.to_string())
                .push_bind(created_at.clone());
        });
        let result = qb.build().execute(&mut *conn).await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

pub async fn get_character(db: &Database, id: &str) -> Result<Option<Character>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "characters" WHERE "id" = ? LIMIT 1"#)
        .bind(id)
        .fetch_optional(db.pool())
        .await?;
    Ok(row.map(|r| map_character(&r)))
}

pub async fn update_character_pinyin(
    db: &Database,
    id: &str,
    pinyin: &[String],
) -> Result<Option<Character>, sqlx::Error> {
    let result = sqlx::query(r#"UPDATE "characters" SET "pinyin" = ? WHERE "id" = ?"#)
        .bind(encode_pinyin(pinyin))
        .bind(id)
        .execute(db.pool())
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_character(db, id).await
}

fn encode_pinyin(pinyin: &[String]) -> String {
    serde_json::to_string(pinyin).unwrap_or_else(|_| "[]".to_string())
}

fn decode_pinyin(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn map_character_set(row: &SqliteRow) -> CharacterSet {
    CharacterSet {
        id: row.try_get("id").unwrap_or_default(),
        name: row.try_get("name").unwrap_or_default(),
        description: row.try_get("description").ok().flatten(),
        is_default: row.try_get("isDefault").unwrap_or(false),
        created_at: row.try_get("createdAt").unwrap_or_default(),
        updated_at: row.try_get("updatedAt").unwrap_or_default(),
    }
}

fn map_character(row: &SqliteRow) -> Character {
    let raw_pinyin: String = row.try_get("pinyin").unwrap_or_default();
    Character {
        id: row.try_get("id").unwrap_or_default(),
        glyph: row.try_get("char").unwrap_or_default(),
        pinyin: decode_pinyin(&raw_pinyin),
        character_set_id: row.try_get("characterSetId").unwrap_or_default(),
        position: row.try_get("position").unwrap_or(0),
        created_at: row.try_get("createdAt").unwrap_or_default(),
    }
}
