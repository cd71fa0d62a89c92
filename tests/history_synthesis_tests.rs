use revised::core::{DbError, Result, Value};
use revised::{Database, DatabaseConfig, FieldKind, ModelBuilder, RevisedModelBuilder};
use serde_json::json;

#[test]
fn test_default_settings() -> Result<()> {
    let db = Database::new();
    let page = RevisedModelBuilder::new("WikiPage")
        .module("wiki")
        .field("title", FieldKind::CharField, json!({"max_length": 80}))
        .register(&db)?;

    let settings = page.meta().revised_settings().unwrap();
    assert_eq!(settings.foreign_key_field_name, "wikipage");
    assert_eq!(settings.related_name, "revisions");
    assert_eq!(settings.revision_field_name, "revision");
    assert_eq!(settings.revision_model_name, "WikiPageRevision");

    let history = db.model("wiki", "WikiPageRevision")?;
    assert_eq!(history.meta().db_table, "wiki_wikipage_revision");
    assert_eq!(history.meta().field_names(), vec!["id", "title", "wikipage", "revision"]);
    let fk = history.meta().field("wikipage").unwrap().relation().unwrap();
    assert_eq!(fk.to, "wiki.WikiPage");
    assert_eq!(fk.related_name.as_deref(), Some("revisions"));
    Ok(())
}

#[test]
fn test_custom_settings() -> Result<()> {
    let db = Database::with_config(DatabaseConfig::new().revision_table_suffix("_history"));
    let page = RevisedModelBuilder::new("Page")
        .field("body", FieldKind::TextField, json!({}))
        .meta_option("foreign_key_field_name", json!("owner"))
        .meta_option("related_name", json!("history"))
        .meta_option("revision_field_name", json!("version"))
        .meta_option("revision_model_name", json!("PageHistory"))
        .meta_option("db_table", json!("pages"))
        .register(&db)?;

    let history = db.model("app", "PageHistory")?;
    assert_eq!(history.meta().db_table, "pages_history");
    assert_eq!(history.meta().field_names(), vec!["id", "body", "owner", "version"]);
    assert_eq!(history.meta().ordering[0].to_string(), "-version");

    // 1. The renamed fields drive the whole protocol
    let mut record = db.instantiate(&page, [("body", "one")])?;
    assert_eq!(record.get("version")?, Value::Integer(1));
    db.save(&mut record)?;
    record.set("body", "two")?;
    db.save(&mut record)?;

    let archived = db.related(&record, "history")?;
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].get("owner")?, Value::Integer(record.pk().unwrap()));
    assert_eq!(archived[0].get("version")?, Value::Integer(1));
    assert_eq!(record.get("version")?, Value::Integer(2));
    Ok(())
}

#[test]
fn test_falsy_settings_fall_back() -> Result<()> {
    let db = Database::new();
    let page = RevisedModelBuilder::new("Page")
        .field("body", FieldKind::TextField, json!({}))
        .meta_option("related_name", json!(""))
        .meta_option("revision_model_name", json!(null))
        .meta_option("register_with_admin_site", json!(false))
        .register(&db)?;
    let settings = page.meta().revised_settings().unwrap();
    assert_eq!(settings.related_name, "revisions");
    assert_eq!(settings.revision_model_name, "PageRevision");
    Ok(())
}

#[test]
fn test_uniqueness_is_not_copied() -> Result<()> {
    let db = Database::new();
    let tag = RevisedModelBuilder::new("Tag")
        .field("slug", FieldKind::SlugField, json!({"unique": true, "max_length": 30}))
        .register(&db)?;
    let history = db.model("app", "TagRevision")?;
    assert!(tag.meta().field("slug").unwrap().is_unique());
    assert!(!history.meta().field("slug").unwrap().is_unique());

    // Successive revisions may share a value of a unique tracked field
    let mut record = db.instantiate(&tag, [("slug", "rust")])?;
    db.save(&mut record)?;
    for slug in ["go", "rust", "go"] {
        record.set("slug", slug)?;
        db.save(&mut record)?;
    }
    assert_eq!(db.revisions(&record)?.len(), 3);
    Ok(())
}

#[test]
fn test_history_unique_together() -> Result<()> {
    let db = Database::new();
    RevisedModelBuilder::new("Doc")
        .field("body", FieldKind::TextField, json!({}))
        .register(&db)?;
    let history = db.model("app", "DocRevision")?;
    assert_eq!(
        history.meta().unique_together,
        vec![vec!["doc".to_string(), "revision".to_string()]]
    );
    Ok(())
}

#[test]
fn test_foreign_keys_are_copied_without_accessor() -> Result<()> {
    let db = Database::new();
    let author = db.define(ModelBuilder::new("Author").field("name", FieldKind::CharField, json!({})))?;
    let post = RevisedModelBuilder::new("Post")
        .field("title", FieldKind::CharField, json!({"max_length": 50}))
        .field("author", FieldKind::ForeignKey, json!({"to": "Author", "related_name": "posts"}))
        .register(&db)?;

    let history = db.model("app", "PostRevision")?;
    let copied = history.meta().field("author").unwrap().relation().unwrap();
    assert_eq!(copied.to, "Author");
    assert_eq!(copied.related_name, None);

    let mut ann = db.instantiate(&author, [("name", "Ann")])?;
    db.save(&mut ann)?;
    let mut record = db.instantiate(&post, [("title", Value::from("Hi")), ("author", Value::Integer(ann.pk().unwrap()))])?;
    db.save(&mut record)?;
    record.set("title", "Hello")?;
    db.save(&mut record)?;

    // Only the tracked type answers to the declared accessor
    assert_eq!(db.related(&ann, "posts")?.len(), 1);
    assert_eq!(db.related(&ann, "postrevision_set")?.len(), 1);
    Ok(())
}

#[test]
fn test_plain_types_are_not_tracked() -> Result<()> {
    let db = Database::new();
    let note = db.define(ModelBuilder::new("Note").field("body", FieldKind::TextField, json!({})))?;
    assert!(!note.is_revised());
    assert!(!note.meta().has_field("revision"));
    assert!(!db.modules().contains("app", "NoteRevision"));

    let mut record = db.instantiate(&note, [("body", "x")])?;
    db.save(&mut record)?;
    assert!(matches!(db.revisions(&record), Err(DbError::ExecutionError(_))));
    Ok(())
}

#[test]
fn test_definition_errors_register_nothing() -> Result<()> {
    let db = Database::new();

    // 1. User field clashes with the revision field
    let res = RevisedModelBuilder::new("Page")
        .field("revision", FieldKind::IntegerField, json!({}))
        .register(&db);
    assert!(matches!(res, Err(DbError::DuplicateField(..))));

    // 2. Unknown constructor argument on a user field
    let res = RevisedModelBuilder::new("Page")
        .field("title", FieldKind::CharField, json!({"max_digits": 3}))
        .register(&db);
    assert!(matches!(res, Err(DbError::InvalidFieldArgument { .. })));

    // 3. History type name already taken
    db.define(ModelBuilder::new("PageRevision"))?;
    let res = RevisedModelBuilder::new("Page")
        .field("title", FieldKind::CharField, json!({}))
        .register(&db);
    assert!(matches!(res, Err(DbError::ModelExists(_))));

    // 4. Unknown framework meta option
    let res = RevisedModelBuilder::new("Page")
        .meta_option("abstract", json!(true))
        .register(&db);
    assert!(matches!(res, Err(DbError::InvalidMetaOption(_))));

    assert!(!db.modules().contains("app", "Page"));
    assert!(!db.storage().table_exists("app_page"));
    Ok(())
}

#[test]
fn test_same_name_in_two_modules() -> Result<()> {
    let db = Database::new();
    for module in ["blog", "wiki"] {
        RevisedModelBuilder::new("Page")
            .module(module)
            .field("title", FieldKind::CharField, json!({}))
            .register(&db)?;
    }
    assert!(db.modules().contains("blog", "PageRevision"));
    assert!(db.modules().contains("wiki", "PageRevision"));
    assert_eq!(
        db.model("wiki", "PageRevision")?.meta().field("page").unwrap().relation().unwrap().to,
        "wiki.Page"
    );
    Ok(())
}
