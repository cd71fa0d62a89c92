use revised::core::{DbError, Result, Value};
use revised::{Database, FieldKind, ModelType, Record, RevisedModelBuilder};
use serde_json::json;
use std::sync::Arc;

fn setup() -> Result<(Database, Arc<ModelType>)> {
    let db = Database::new();
    let item = RevisedModelBuilder::new("Item")
        .module("shop")
        .field("name", FieldKind::CharField, json!({"max_length": 40}))
        .field("price", FieldKind::FloatField, json!({"default": 0.0}))
        .field("views", FieldKind::PositiveIntegerField, json!({"default": 0}))
        .meta_option("unrevised_fields", json!(["views"]))
        .method("display", |r| r.get("name"))
        .register(&db)?;
    Ok((db, item))
}

fn revision(record: &Record) -> i64 {
    record.get("revision").unwrap().as_i64().unwrap()
}

fn history(db: &Database, record: &Record) -> Result<Vec<(Value, i64)>> {
    Ok(db
        .revisions(record)?
        .iter()
        .map(|r| (r.get("name").unwrap(), revision(r)))
        .collect())
}

/// History of a record by key, usable after the record is deleted.
fn archived_for(db: &Database, pk: i64) -> Result<Vec<(Value, i64)>> {
    let history = db.model("shop", "ItemRevision")?;
    Ok(db
        .filter(&history, "item", pk)?
        .iter()
        .map(|r| (r.get("name").unwrap(), revision(r)))
        .collect())
}

#[test]
fn test_small_float_change_is_archived() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", Value::from("Dust")), ("price", Value::Float(1e-18))])?;
    db.save(&mut record)?;

    record.set("price", 2e-18)?;
    db.save(&mut record)?;
    let archived = db.revisions(&record)?;
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].get("price")?, Value::Float(1e-18));
    assert_eq!(revision(&record), 2);
    Ok(())
}

#[test]
fn test_save_archives_previous_state() -> Result<()> {
    let (db, item) = setup()?;

    // 1. First save assigns a key and archives nothing
    let mut record = db.instantiate(&item, [("name", "A")])?;
    assert_eq!(revision(&record), 1);
    db.save(&mut record)?;
    assert!(record.pk().is_some());
    assert!(db.revisions(&record)?.is_empty());

    // 2. A changed save archives the loaded state
    record.set("name", "B")?;
    db.save(&mut record)?;
    assert_eq!(history(&db, &record)?, vec![(Value::from("A"), 1)]);
    assert_eq!(record.get("name")?, Value::from("B"));
    assert_eq!(revision(&record), 2);

    // 3. The stored row matches the live record
    let stored = db.get(&item, record.pk().unwrap())?.unwrap();
    assert_eq!(stored.get("name")?, Value::from("B"));
    assert_eq!(revision(&stored), 2);
    Ok(())
}

#[test]
fn test_revert_then_save() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "A")])?;
    db.save(&mut record)?;
    record.set("name", "B")?;
    db.save(&mut record)?;

    // 1. Revert is in memory only
    db.revert_to_revision(&mut record, 1)?;
    assert_eq!(record.get("name")?, Value::from("A"));
    assert_eq!(revision(&record), 2);
    let stored = db.get(&item, record.pk().unwrap())?.unwrap();
    assert_eq!(stored.get("name")?, Value::from("B"));

    // 2. Saving archives the state that was reverted from
    db.save(&mut record)?;
    assert_eq!(
        history(&db, &record)?,
        vec![(Value::from("B"), 2), (Value::from("A"), 1)]
    );
    assert_eq!(record.get("name")?, Value::from("A"));
    assert_eq!(revision(&record), 3);
    Ok(())
}

#[test]
fn test_round_trip_for_every_revised_field() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", Value::from("A")), ("price", Value::Float(2.5))])?;
    db.save(&mut record)?;
    record.set("name", "B")?;
    record.set("price", 9.0)?;
    record.set("views", 42)?;
    db.save(&mut record)?;

    db.revert_to_revision(&mut record, 1)?;
    let archived = db
        .revisions(&record)?
        .into_iter()
        .find(|r| revision(r) == 1)
        .unwrap();
    for name in ["name", "price"] {
        assert_eq!(record.get(name)?, archived.get(name)?);
    }
    assert_eq!(record.get("views")?, Value::Integer(42));
    Ok(())
}

#[test]
fn test_unchanged_save_is_idempotent() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "A")])?;
    db.save(&mut record)?;
    record.set("name", "B")?;
    db.save(&mut record)?;
    db.save(&mut record)?;
    db.save(&mut record)?;
    assert_eq!(db.revisions(&record)?.len(), 1);
    assert_eq!(revision(&record), 2);
    Ok(())
}

#[test]
fn test_revision_numbers_are_consecutive() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "v0")])?;
    db.save(&mut record)?;
    for i in 1..=5 {
        record.set("name", format!("v{}", i))?;
        db.save(&mut record)?;
    }

    let mut numbers: Vec<i64> = db.revisions(&record)?.iter().map(revision).collect();
    assert_eq!(numbers, vec![5, 4, 3, 2, 1]);
    numbers.reverse();
    assert!(numbers.windows(2).all(|w| w[1] == w[0] + 1));
    assert_eq!(revision(&record), 6);
    Ok(())
}

#[test]
fn test_unrevised_fields_do_not_trigger_archive() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "A")])?;
    db.save(&mut record)?;
    record.set("views", 100)?;
    db.save(&mut record)?;
    assert!(db.revisions(&record)?.is_empty());

    let stored = db.get(&item, record.pk().unwrap())?.unwrap();
    assert_eq!(stored.get("views")?, Value::Integer(100));
    Ok(())
}

#[test]
fn test_reloaded_record_archives_stored_state() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "A")])?;
    db.save(&mut record)?;

    let mut loaded = db.filter(&item, "name", "A")?.remove(0);
    loaded.set("name", "Z")?;
    db.save(&mut loaded)?;
    assert_eq!(history(&db, &loaded)?, vec![(Value::from("A"), 1)]);
    Ok(())
}

#[test]
fn test_shallow_delete_keeps_final_revision() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "A")])?;
    db.save(&mut record)?;
    record.set("name", "B")?;
    db.save(&mut record)?;

    let pk = record.pk().unwrap();
    db.delete(&mut record, false)?;
    assert_eq!(db.count(&item)?, 0);
    assert_eq!(record.pk(), None);
    assert_eq!(
        archived_for(&db, pk)?,
        vec![(Value::from("B"), 2), (Value::from("A"), 1)]
    );
    Ok(())
}

#[test]
fn test_save_after_shallow_delete_starts_a_new_row() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "A")])?;
    db.save(&mut record)?;
    let old_pk = record.pk().unwrap();

    // 1. Delete archives revision 1 and clears the key
    db.delete(&mut record, false)?;
    assert_eq!(archived_for(&db, old_pk)?, vec![(Value::from("A"), 1)]);

    // 2. Saving again inserts a fresh row without archiving
    db.save(&mut record)?;
    let new_pk = record.pk().unwrap();
    assert_ne!(new_pk, old_pk);
    assert!(db.revisions(&record)?.is_empty());

    // 3. Later changes are archived under the new row
    record.set("name", "B")?;
    db.save(&mut record)?;
    assert_eq!(history(&db, &record)?, vec![(Value::from("A"), 1)]);
    assert_eq!(revision(&record), 2);
    assert_eq!(archived_for(&db, old_pk)?.len(), 1);
    Ok(())
}

#[test]
fn test_deep_delete_erases_history() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "A")])?;
    db.save(&mut record)?;
    record.set("name", "B")?;
    db.save(&mut record)?;

    let pk = record.pk().unwrap();
    db.delete(&mut record, true)?;
    assert_eq!(db.count(&item)?, 0);
    assert!(archived_for(&db, pk)?.is_empty());
    Ok(())
}

#[test]
fn test_delete_unsaved_record() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "A")])?;
    let res = db.delete(&mut record, false);
    match res {
        Err(DbError::ExecutionError(msg)) => assert!(msg.contains("primary key is not set")),
        _ => panic!("Expected ExecutionError, got {:?}", res),
    }
    Ok(())
}

#[test]
fn test_revert_to_unknown_revision() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "Lamp")])?;
    db.save(&mut record)?;
    let res = db.revert_to_revision(&mut record, 3);
    match res {
        Err(DbError::NoSuchRevision { revision, record }) => {
            assert_eq!(revision, 3);
            assert_eq!(record, "Lamp");
        }
        _ => panic!("Expected NoSuchRevision, got {:?}", res),
    }
    Ok(())
}

#[test]
fn test_history_records_are_write_once() -> Result<()> {
    let (db, item) = setup()?;
    let mut record = db.instantiate(&item, [("name", "Lamp")])?;
    db.save(&mut record)?;
    record.set("name", "Desk")?;
    db.save(&mut record)?;

    let mut archived = db.revisions(&record)?.remove(0);
    archived.set("name", "Forged")?;
    let res = db.save(&mut archived);
    match res {
        Err(DbError::RevisionExists { revision, record }) => {
            assert_eq!(revision, 1);
            assert_eq!(record, "Forged");
        }
        _ => panic!("Expected RevisionExists, got {:?}", res),
    }
    assert_eq!(history(&db, &record)?, vec![(Value::from("Lamp"), 1)]);
    Ok(())
}

#[test]
fn test_histories_are_per_record() -> Result<()> {
    let (db, item) = setup()?;
    let mut a = db.instantiate(&item, [("name", "a1")])?;
    let mut b = db.instantiate(&item, [("name", "b1")])?;
    db.save(&mut a)?;
    db.save(&mut b)?;
    a.set("name", "a2")?;
    db.save(&mut a)?;

    assert_eq!(db.revisions(&a)?.len(), 1);
    assert!(db.revisions(&b)?.is_empty());
    Ok(())
}

#[test]
fn test_concurrent_saves_on_shared_database() -> Result<()> {
    let (db, item) = setup()?;
    std::thread::scope(|s| {
        for t in 0..4 {
            let db = &db;
            let item = &item;
            s.spawn(move || {
                let mut record = db.instantiate(item, [("name", format!("t{}", t))]).unwrap();
                db.save(&mut record).unwrap();
                for i in 0..3 {
                    record.set("name", format!("t{}-{}", t, i)).unwrap();
                    db.save(&mut record).unwrap();
                }
                assert_eq!(db.revisions(&record).unwrap().len(), 3);
            });
        }
    });
    assert_eq!(db.count(&item)?, 4);
    Ok(())
}
