use hanzi_cards::cache::NoopInvalidator;
use hanzi_cards::db::migrate::run_migrations;
use hanzi_cards::db::operations;
use hanzi_cards::services::character_sets::{self, UpdatePinyinError};
use hanzi_cards::services::ingestion::import_character_file;
use hanzi_cards::services::learned::{self, LearnedError};

mod common;

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let (_dir, db) = common::create_test_db().await;

    run_migrations(db.pool()).await.unwrap();
    run_migrations(db.pool()).await.unwrap();

    let applied: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "_migrations""#)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn test_core_tables_exist() {
    let (_dir, db) = common::create_test_db().await;

    for table in ["character_sets", "characters", "learned_characters"] {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(count, 1, "missing table {table}");
    }
}

#[tokio::test]
async fn test_delete_cascades_but_keeps_learned_marks() {
    let ctx = common::create_test_context().await;
    let imported = import_character_file(&ctx.db, &ctx.resolver, &NoopInvalidator, "你好".as_bytes(), "a.txt")
        .await
        .unwrap();
    learned::mark_learned(&ctx.db, "你").await.unwrap();

    let deleted = character_sets::delete_character_set(&ctx.db, &NoopInvalidator, &imported.id)
        .await
        .unwrap();
    assert!(deleted);

    let orphans: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "characters" WHERE "characterSetId" = ?"#)
        .bind(&imported.id)
        .fetch_one(ctx.db.pool())
        .await
        .unwrap();
    assert_eq!(orphans, 0);
    assert!(learned::is_learned(&ctx.db, "你").await.unwrap());

    let again = character_sets::delete_character_set(&ctx.db, &NoopInvalidator, &imported.id)
        .await
        .unwrap();
    assert!(!again);
}

#[tokio::test]
async fn test_listing_counts_and_orders_newest_first() {
    let ctx = common::create_test_context().await;
    let older = import_character_file(&ctx.db, &ctx.resolver, &NoopInvalidator, "一二".as_bytes(), "a.txt")
        .await
        .unwrap();
    let newer = import_character_file(&ctx.db, &ctx.resolver, &NoopInvalidator, "三".as_bytes(), "b.txt")
        .await
        .unwrap();

    let sets = character_sets::list_character_sets(&ctx.db, None).await.unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].id, newer.id);
    assert_eq!(sets[0].character_count, 1);
    assert_eq!(sets[1].id, older.id);
    assert_eq!(sets[1].character_count, 2);
}

#[tokio::test]
async fn test_learned_marks_are_idempotent() {
    let (_dir, db) = common::create_test_db().await;

    assert!(!learned::is_learned(&db, "学").await.unwrap());
    learned::mark_learned(&db, "学").await.unwrap();
    learned::mark_learned(&db, " 学 ").await.unwrap();
    assert!(learned::is_learned(&db, "学").await.unwrap());
    assert_eq!(operations::list_learned_glyphs(&db).await.unwrap().len(), 1);

    learned::unmark_learned(&db, "学").await.unwrap();
    learned::unmark_learned(&db, "学").await.unwrap();
    assert!(!learned::is_learned(&db, "学").await.unwrap());

    let err = learned::mark_learned(&db, "学习").await.unwrap_err();
    assert!(matches!(err, LearnedError::InvalidGlyph));
}

#[tokio::test]
async fn test_export_in_mark_order() {
    let (_dir, db) = common::create_test_db().await;

    for glyph in ["中", "文", "字"] {
        learned::mark_learned(&db, glyph).await.unwrap();
    }
    learned::mark_learned(&db, "中").await.unwrap();

    assert_eq!(learned::export_learned(&db).await.unwrap(), "中\n文\n字");
}

#[tokio::test]
async fn test_update_character_pinyin() {
    let ctx = common::create_test_context().await;
    let imported = import_character_file(&ctx.db, &ctx.resolver, &NoopInvalidator, "乐".as_bytes(), "a.txt")
        .await
        .unwrap();
    let set = operations::get_character_set(&ctx.db, &imported.id)
        .await
        .unwrap()
        .unwrap();
    let character_id = set.characters[0].id.clone();

    let updated = character_sets::update_character_pinyin(
        &ctx.db,
        &character_id,
        &["yuè".to_string(), " lè ".to_string()],
    )
    .await
    .unwrap();
    assert_eq!(updated.pinyin, vec!["yuè".to_string(), "lè".to_string()]);

    let err = character_sets::update_character_pinyin(&ctx.db, &character_id, &["乐".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, UpdatePinyinError::InvalidSyllable(_)));

    let err = character_sets::update_character_pinyin(&ctx.db, "missing", &["le".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, UpdatePinyinError::NotFound));
}
