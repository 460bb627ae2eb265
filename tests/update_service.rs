use ontodb::catalog::ColumnType;
use ontodb::storage::EncodedKey;
use ontodb::{
    ColumnInfo, Container, DefaultUpdateService, InsertOption, MemPropertyStore, MemTableStore,
    OntodbError, PropertyDescriptor, QueryUpdateService, Row, TableInfo, UpdateConfig, User,
    Value,
};
use std::sync::Arc;

fn specimen_table() -> TableInfo {
    TableInfo::new(
        "specimens",
        vec![
            ColumnInfo::new("RowId", ColumnType::Integer).auto_increment(),
            ColumnInfo::new("Label", ColumnType::Text)
                .required()
                .with_alias("Specimen Label"),
            ColumnInfo::new("Container", ColumnType::Text),
            ColumnInfo::new("ObjectUri", ColumnType::Text),
            ColumnInfo::new("Volume", ColumnType::Float),
            ColumnInfo::new("Created", ColumnType::Timestamp),
        ],
        vec!["RowId".into()],
    )
    .with_container_column("Container")
    .with_column_alias("SpecimenVolume", "Volume")
    .with_domain(
        "ObjectUri",
        vec![
            PropertyDescriptor::new("Hemoglobin", ColumnType::Float),
            PropertyDescriptor::new("HemoglobinOORIndicator", ColumnType::Text),
            PropertyDescriptor::new("Notes", ColumnType::Text),
        ],
    )
}

fn service_with_stores(
    table: TableInfo,
) -> (DefaultUpdateService, Arc<MemTableStore>, Arc<MemPropertyStore>) {
    let store = Arc::new(MemTableStore::new());
    let props = Arc::new(MemPropertyStore::new());
    let svc = DefaultUpdateService::new(table, store.clone(), props.clone());
    (svc, store, props)
}

fn service(table: TableInfo) -> DefaultUpdateService {
    service_with_stores(table).0
}

fn user() -> User {
    User::new("u1", "Test User")
}

fn home() -> Container {
    Container::new("c1", "/home")
}

fn key_row(row_id: i64) -> Row {
    Row::new().with("RowId", Value::Integer(row_id))
}

#[test]
fn insert_then_get_round_trips_table_and_properties() {
    let svc = service(specimen_table());
    let inserted = svc
        .insert_row(
            &user(),
            &home(),
            &Row::new()
                .with("Label", Value::text("s1"))
                .with("Volume", Value::Float(4.5))
                .with("Hemoglobin", Value::Float(12.5))
                .with("Notes", Value::text("baseline draw")),
            &UpdateConfig::default(),
        )
        .expect("insert");

    assert_eq!(inserted.get_table("RowId"), Some(&Value::Integer(1)));
    let uri = inserted
        .get_table("ObjectUri")
        .and_then(Value::as_text)
        .expect("generated object uri");
    assert!(uri.starts_with("urn:lsid:ontodb:specimens:"), "uri: {uri}");

    let fetched = svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .expect("row exists");
    assert_eq!(fetched.get("Label"), Some(&Value::text("s1")));
    assert_eq!(fetched.get("Volume"), Some(&Value::Float(4.5)));
    assert_eq!(fetched.get_property("Hemoglobin"), Some(&Value::Float(12.5)));
    assert_eq!(
        fetched.get_property("Notes"),
        Some(&Value::text("baseline draw"))
    );
}

#[test]
fn get_row_with_unparseable_key_is_invalid_key() {
    let svc = service(specimen_table());
    let err = svc
        .get_row(
            &user(),
            &home(),
            &Row::new().with("RowId", Value::text("not-a-number")),
        )
        .unwrap_err();
    assert_eq!(err.code_str(), "invalid_key");
}

#[test]
fn get_rows_yields_none_for_unmatched_keys() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new().with("Label", Value::text("s1")),
        &UpdateConfig::default(),
    )
    .expect("insert");

    let fetched = svc
        .get_rows(&user(), &home(), &[key_row(1), key_row(99)])
        .expect("get_rows");
    assert!(fetched[0].is_some());
    assert!(fetched[1].is_none());
}

#[test]
fn ambient_container_is_stamped_and_foreign_targets_are_overridden() {
    let svc = service(specimen_table());
    let config = UpdateConfig::default();

    let plain = svc
        .insert_row(
            &user(),
            &home(),
            &Row::new().with("Label", Value::text("s1")),
            &config,
        )
        .expect("insert");
    assert_eq!(plain.get_table("Container"), Some(&Value::text("c1")));

    // A target container the ambient policy does not admit is replaced
    // silently, not rejected.
    let foreign = svc
        .insert_row(
            &user(),
            &home(),
            &Row::new()
                .with("Label", Value::text("s2"))
                .with("Container", Value::text("elsewhere")),
            &config,
        )
        .expect("insert");
    assert_eq!(foreign.get_table("Container"), Some(&Value::text("c1")));
}

#[test]
fn workbook_may_place_rows_into_its_parent() {
    let svc = service(specimen_table());
    let workbook = Container::workbook("wb1", "/home/wb1", "c1");
    let inserted = svc
        .insert_row(
            &user(),
            &workbook,
            &Row::new()
                .with("Label", Value::text("s1"))
                .with("Container", Value::text("c1")),
            &UpdateConfig::default(),
        )
        .expect("insert");
    assert_eq!(inserted.get_table("Container"), Some(&Value::text("c1")));
}

#[test]
fn missing_required_column_is_field_scoped() {
    let svc = service(specimen_table());
    let err = svc
        .insert_row(
            &user(),
            &home(),
            &Row::new().with("Volume", Value::Float(1.0)),
            &UpdateConfig::default(),
        )
        .unwrap_err();
    match err {
        OntodbError::Validation(v) => assert_eq!(v.field.as_deref(), Some("Label")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn supplied_identity_values_are_ignored_unless_identity_insert() {
    let svc = service(specimen_table());
    let inserted = svc
        .insert_row(
            &user(),
            &home(),
            &Row::new()
                .with("RowId", Value::Integer(50))
                .with("Label", Value::text("s1")),
            &UpdateConfig::default(),
        )
        .expect("insert");
    assert_eq!(inserted.get_table("RowId"), Some(&Value::Integer(1)));

    let honored = svc
        .insert_row(
            &user(),
            &home(),
            &Row::new()
                .with("RowId", Value::Integer(50))
                .with("Label", Value::text("s2")),
            &UpdateConfig::default().with_insert_option(InsertOption::ImportIdentity),
        )
        .expect("insert");
    assert_eq!(honored.get_table("RowId"), Some(&Value::Integer(50)));
}

#[test]
fn import_aliases_re_home_only_on_import_paths() {
    let svc = service(specimen_table());

    // Row-at-a-time insert does not consult import aliases, so the only
    // supplied spelling of Label is dropped as unknown.
    let err = svc
        .insert_row(
            &user(),
            &home(),
            &Row::new().with("Specimen Label", Value::text("s1")),
            &UpdateConfig::default(),
        )
        .unwrap_err();
    match err {
        OntodbError::Validation(v) => assert_eq!(v.field.as_deref(), Some("Label")),
        other => panic!("unexpected error: {other:?}"),
    }

    let imported = svc
        .insert_row(
            &user(),
            &home(),
            &Row::new().with("Specimen Label", Value::text("s1")),
            &UpdateConfig::default().with_insert_option(InsertOption::Import),
        )
        .expect("import");
    assert_eq!(imported.get_table("Label"), Some(&Value::text("s1")));
}

#[test]
fn property_names_match_with_spaces_stripped() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new()
            .with("Label", Value::text("s1"))
            .with("Hemo Globin", Value::text("12.5")),
        &UpdateConfig::default(),
    )
    .expect("insert");

    let fetched = svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .expect("row");
    assert_eq!(fetched.get_property("Hemoglobin"), Some(&Value::Float(12.5)));
}

#[test]
fn synthesized_group_columns_are_not_writable() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new()
            .with("Label", Value::text("s1"))
            .with("HemoglobinNumber", Value::Float(9.0))
            .with("HemoglobinInRange", Value::Float(9.0)),
        &UpdateConfig::default(),
    )
    .expect("insert");

    let fetched = svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .expect("row");
    assert_eq!(fetched.get_property("HemoglobinNumber"), None);
    assert_eq!(fetched.get_property("HemoglobinInRange"), None);
}

#[test]
fn update_applies_changes_and_returns_caller_row_overlaid() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new()
            .with("Label", Value::text("s1"))
            .with("Volume", Value::Float(1.0)),
        &UpdateConfig::default(),
    )
    .expect("insert");

    let updated = svc
        .update_row(
            &user(),
            &home(),
            &key_row(1).with("Volume", Value::Float(2.0)),
            None,
            &UpdateConfig::default(),
        )
        .expect("update");
    assert_eq!(updated.get_table("Volume"), Some(&Value::Float(2.0)));

    let fetched = svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .expect("row");
    assert_eq!(fetched.get("Volume"), Some(&Value::Float(2.0)));
    assert_eq!(fetched.get("Label"), Some(&Value::text("s1")));
}

#[test]
fn conflicting_aliases_fail_before_any_write() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new()
            .with("Label", Value::text("s1"))
            .with("Volume", Value::Float(1.0)),
        &UpdateConfig::default(),
    )
    .expect("insert");

    let err = svc
        .update_row(
            &user(),
            &home(),
            &key_row(1)
                .with("Volume", Value::Float(2.0))
                .with("SpecimenVolume", Value::Float(3.0)),
            None,
            &UpdateConfig::default(),
        )
        .unwrap_err();
    match err {
        OntodbError::Validation(v) => {
            assert!(v.field.is_none());
            assert!(v.message.contains("Volume"), "message: {}", v.message);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let fetched = svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .expect("row");
    assert_eq!(fetched.get("Volume"), Some(&Value::Float(1.0)));
}

#[test]
fn equal_alias_values_deduplicate_after_coercion() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new().with("Label", Value::text("s1")),
        &UpdateConfig::default(),
    )
    .expect("insert");

    let updated = svc
        .update_row(
            &user(),
            &home(),
            &key_row(1)
                .with("Volume", Value::Float(2.0))
                .with("SpecimenVolume", Value::text("2.0")),
            None,
            &UpdateConfig::default(),
        )
        .expect("update");
    assert_eq!(updated.get_table("Volume"), Some(&Value::Float(2.0)));
}

#[test]
fn update_consults_import_aliases_only_on_import_paths() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new().with("Label", Value::text("s1")),
        &UpdateConfig::default(),
    )
    .expect("insert");

    // Row-at-a-time update: the import-alias spelling is unknown and
    // silently dropped.
    svc.update_row(
        &user(),
        &home(),
        &key_row(1).with("Specimen Label", Value::text("renamed")),
        None,
        &UpdateConfig::default(),
    )
    .expect("update");
    let fetched = svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .expect("row");
    assert_eq!(fetched.get("Label"), Some(&Value::text("s1")));

    svc.update_row(
        &user(),
        &home(),
        &key_row(1).with("Specimen Label", Value::text("renamed")),
        None,
        &UpdateConfig::default().with_insert_option(InsertOption::Import),
    )
    .expect("update");
    let fetched = svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .expect("row");
    assert_eq!(fetched.get("Label"), Some(&Value::text("renamed")));
}

#[test]
fn update_of_unknown_row_is_not_found() {
    let svc = service(specimen_table());
    let err = svc
        .update_row(
            &user(),
            &home(),
            &key_row(99).with("Volume", Value::Float(2.0)),
            None,
            &UpdateConfig::default(),
        )
        .unwrap_err();
    assert_eq!(err.code_str(), "row_not_found");
}

#[test]
fn update_without_key_is_invalid_key() {
    let svc = service(specimen_table());
    let err = svc
        .update_row(
            &user(),
            &home(),
            &Row::new().with("Volume", Value::Float(2.0)),
            None,
            &UpdateConfig::default(),
        )
        .unwrap_err();
    assert_eq!(err.code_str(), "invalid_key");
}

#[test]
fn creation_columns_are_protected_unless_retained() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new()
            .with("Label", Value::text("s1"))
            .with("Created", Value::Timestamp(100)),
        &UpdateConfig::default(),
    )
    .expect("insert");

    svc.update_row(
        &user(),
        &home(),
        &key_row(1).with("Created", Value::Timestamp(999)),
        None,
        &UpdateConfig::default(),
    )
    .expect("update");
    let fetched = svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .expect("row");
    assert_eq!(fetched.get("Created"), Some(&Value::Timestamp(100)));

    svc.update_row(
        &user(),
        &home(),
        &key_row(1).with("Created", Value::Timestamp(999)),
        None,
        &UpdateConfig::default().with_retain_creation(true),
    )
    .expect("update");
    let fetched = svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .expect("row");
    assert_eq!(fetched.get("Created"), Some(&Value::Timestamp(999)));
}

#[test]
fn update_cannot_move_a_row_between_containers() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new().with("Label", Value::text("s1")),
        &UpdateConfig::default(),
    )
    .expect("insert");

    let elsewhere = Container::new("c2", "/elsewhere");
    let old = key_row(1).with("Container", Value::text("c1"));
    let err = svc
        .update_row(
            &user(),
            &elsewhere,
            &key_row(1).with("Volume", Value::Float(2.0)),
            Some(&old),
            &UpdateConfig::default(),
        )
        .unwrap_err();
    assert_eq!(err.code_str(), "unauthorized");
}

#[test]
fn delete_cascades_property_values() {
    let (svc, store, props) = service_with_stores(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new()
            .with("Label", Value::text("s1"))
            .with("Hemoglobin", Value::Float(12.5)),
        &UpdateConfig::default(),
    )
    .expect("insert");
    assert_eq!(props.object_count(), 1);

    svc.delete_row(&user(), &home(), &key_row(1)).expect("delete");
    assert!(store.is_empty());
    assert_eq!(props.object_count(), 0);
    assert!(svc
        .get_row(&user(), &home(), &key_row(1))
        .expect("get")
        .is_none());
}

#[test]
fn deleting_a_missing_row_is_a_silent_noop() {
    let svc = service(specimen_table());
    let echoed = svc
        .delete_row(&user(), &home(), &key_row(5))
        .expect("delete");
    assert_eq!(echoed.get_table("RowId"), Some(&Value::Integer(5)));
}

#[test]
fn cross_container_delete_is_unauthorized() {
    let svc = service(specimen_table());
    svc.insert_row(
        &user(),
        &home(),
        &Row::new().with("Label", Value::text("s1")),
        &UpdateConfig::default(),
    )
    .expect("insert");

    let elsewhere = Container::new("c2", "/elsewhere");
    let err = svc
        .delete_row(&user(), &elsewhere, &key_row(1))
        .unwrap_err();
    assert_eq!(err.code_str(), "unauthorized");
}

#[test]
fn truncate_is_scoped_to_the_ambient_container() {
    let (svc, store, props) = service_with_stores(specimen_table());
    let config = UpdateConfig::default();
    let elsewhere = Container::new("c2", "/elsewhere");

    for label in ["s1", "s2"] {
        svc.insert_row(
            &user(),
            &home(),
            &Row::new()
                .with("Label", Value::text(label))
                .with("Hemoglobin", Value::Float(1.0)),
            &config,
        )
        .expect("insert");
    }
    svc.insert_row(
        &user(),
        &elsewhere,
        &Row::new()
            .with("Label", Value::text("s3"))
            .with("Hemoglobin", Value::Float(1.0)),
        &config,
    )
    .expect("insert");

    let removed = svc.truncate_rows(&user(), &home()).expect("truncate");
    assert_eq!(removed, 2);
    assert_eq!(store.len(), 1);
    assert_eq!(props.object_count(), 1);
    assert!(svc
        .get_row(&user(), &home(), &key_row(3))
        .expect("get")
        .is_some());
}

#[test]
fn domain_row_without_object_uri_is_an_integrity_error() {
    let (svc, store, _) = service_with_stores(specimen_table());
    // A row written behind the service's back, missing its object URI.
    use ontodb::storage::TableStore;
    store
        .insert(
            EncodedKey::from_single(&Value::Integer(7)),
            Row::new()
                .with("RowId", Value::Integer(7))
                .with("Label", Value::text("orphan")),
        )
        .expect("raw insert");

    let err = svc.get_row(&user(), &home(), &key_row(7)).unwrap_err();
    assert_eq!(err.code_str(), "integrity_error");
}
