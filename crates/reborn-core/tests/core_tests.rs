use figment::Jail;
use serde_json::json;

use reborn_core::config::{expand_path, Config, SearchSettings};
use reborn_core::types::effective_k;
use reborn_core::{IndexedRecord, RecordClass};

fn record(value: serde_json::Value) -> IndexedRecord {
    serde_json::from_value(value).expect("record")
}

#[test]
fn article_validation_requires_id_and_title() {
    let ok = record(json!({"article_id": "A1", "title": "Graph Neural Networks"}));
    assert_eq!(RecordClass::Article.validate(&ok), Some("A1"));

    let no_id = record(json!({"title": "Graph Neural Networks"}));
    assert_eq!(RecordClass::Article.validate(&no_id), None);

    let empty_id = record(json!({"article_id": "", "title": "x"}));
    assert_eq!(RecordClass::Article.validate(&empty_id), None);

    let no_title = record(json!({"article_id": "A2", "abstract": "only an abstract"}));
    assert_eq!(RecordClass::Article.validate(&no_title), None);
}

#[test]
fn statement_abstract_is_optional_in_composite_text() {
    let s = record(json!({"statement_id": "S1", "text": "Aspirin reduces fever"}));
    assert_eq!(RecordClass::Statement.validate(&s), Some("S1"));
    assert_eq!(RecordClass::Statement.composite_text(&s), "Aspirin reduces fever ");

    let with_abstract = record(json!({"statement_id": "S2", "text": "T", "abstract": "A"}));
    assert_eq!(RecordClass::Statement.composite_text(&with_abstract), "T A");
}

#[test]
fn select_valid_keeps_order_and_drops_invalid() {
    let records = vec![
        record(json!({"article_id": "A1", "title": "first"})),
        record(json!({"title": "missing id"})),
        record(json!({"article_id": "A3", "title": "third", "extra": 42})),
    ];
    let valid = RecordClass::Article.select_valid(&records);
    let ids: Vec<_> = valid.iter().map(|r| r.get_str("article_id").unwrap_or("")).collect();
    assert_eq!(ids, vec!["A1", "A3"]);
}

#[test]
fn class_constants_and_parsing() {
    assert_eq!(RecordClass::Article.hybrid_threshold(), 0.6);
    assert_eq!(RecordClass::Statement.hybrid_threshold(), 0.3);
    assert_eq!(RecordClass::Statement.quality_field(), "text");
    assert_eq!("articles".parse::<RecordClass>().ok(), Some(RecordClass::Article));
    assert_eq!("Statement".parse::<RecordClass>().ok(), Some(RecordClass::Statement));
    assert!("authors".parse::<RecordClass>().is_err());
}

#[test]
fn zero_k_uses_default() {
    assert_eq!(effective_k(0, 5), 5);
    assert_eq!(effective_k(3, 5), 3);
}

#[test]
fn search_settings_defaults_without_any_source() {
    Jail::expect_with(|_jail| {
        let settings = Config::load().expect("load").search_settings().expect("settings");
        assert_eq!(settings, SearchSettings::default());
        assert!(!settings.use_vector_db);
        assert_eq!(settings.default_k, 5);
        Ok(())
    });
}

#[test]
fn environment_overrides_file_settings() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
                keyword_url = "/srv/keyword"
                [embedding]
                batch_size = 8
            "#,
        )?;
        jail.set_env("APP_USE_VECTOR_DB", "true");
        jail.set_env("APP_VECTOR_DB_URL", "s3://bucket/reborn");
        jail.set_env("APP_EMBEDDING__MAX_LEN", "128");

        let settings = Config::load().expect("load").search_settings().expect("settings");
        assert!(settings.use_vector_db);
        assert_eq!(settings.keyword_url, "/srv/keyword");
        assert_eq!(settings.vector_db_uri(), "s3://bucket/reborn");
        assert_eq!(settings.embedding.batch_size, 8);
        assert_eq!(settings.embedding.max_len, 128);
        Ok(())
    });
}

#[test]
fn legacy_fake_embedding_switch_is_honoured() {
    Jail::expect_with(|jail| {
        jail.set_env("APP_USE_FAKE_EMBEDDINGS", "1");
        let settings = Config::load().expect("load").search_settings().expect("settings");
        assert!(settings.embedding.use_fake);
        Ok(())
    });
}

#[test]
fn negative_weights_are_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("APP_WEIGHT_KEYWORD", "-1.0");
        assert!(Config::load().is_err());
        Ok(())
    });
}

#[test]
fn expand_path_expands_env_vars() {
    Jail::expect_with(|jail| {
        jail.set_env("REBORN_TEST_ROOT", "/tmp/reborn");
        assert_eq!(
            expand_path("$REBORN_TEST_ROOT/index"),
            std::path::PathBuf::from("/tmp/reborn/index")
        );
        Ok(())
    });
}
