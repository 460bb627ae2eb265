//! Reference implementation of [`QueryUpdateService`] over the dual-storage
//! table: fixed columns in a [`TableStore`], domain property values in a
//! [`PropertyStore`] keyed by the row's object URI.

use crate::catalog::row::Row;
use crate::catalog::schema::{PropertyDescriptor, TableInfo};
use crate::catalog::types::{coerce, Value};
use crate::config::OntodbConfig;
use crate::error::{
    BatchValidationError, OntodbError, ResourceType, ValidationError,
};
use crate::groups::{ColumnGroups, SuffixConvention};
use crate::service::{QueryUpdateService, UpdateConfig};
use crate::storage::{EncodedKey, PropertyStore, StorageError, TableStore};
use crate::tenancy::{Container, User};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct DefaultUpdateService {
    table: TableInfo,
    groups: ColumnGroups,
    store: Arc<dyn TableStore>,
    props: Arc<dyn PropertyStore>,
    config: OntodbConfig,
    // Identity source for the reference backend; a real database would own
    // this through its identity column.
    next_identity: AtomicI64,
}

impl DefaultUpdateService {
    pub fn new(table: TableInfo, store: Arc<dyn TableStore>, props: Arc<dyn PropertyStore>) -> Self {
        let groups = ColumnGroups::resolve(&table.domain, SuffixConvention::default());
        Self {
            table,
            groups,
            store,
            props,
            config: OntodbConfig::default(),
            next_identity: AtomicI64::new(1),
        }
    }

    pub fn with_config(mut self, config: OntodbConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_convention(mut self, convention: SuffixConvention) -> Self {
        self.groups = ColumnGroups::resolve(&self.table.domain, convention);
        self
    }

    pub fn table(&self) -> &TableInfo {
        &self.table
    }

    pub fn groups(&self) -> &ColumnGroups {
        &self.groups
    }

    fn storage_err(&self, err: StorageError) -> OntodbError {
        match err {
            StorageError::DuplicateKey { key } => OntodbError::DuplicateKey {
                table: self.table.name.clone(),
                key,
            },
            StorageError::Other(message) => OntodbError::Storage(message),
        }
    }

    /// Removes property values written under an object URI generated earlier
    /// in the same call. Nothing in this layer opens a transaction, so a
    /// failed table write must undo its own property writes; no row would
    /// reference the object and no delete path would ever reach it.
    fn discard_object(&self, uri: &Option<String>) -> Result<(), OntodbError> {
        if let Some(uri) = uri {
            self.props
                .delete_object(uri)
                .map_err(|e| self.storage_err(e))?;
        }
        Ok(())
    }

    fn new_object_uri(&self) -> String {
        format!(
            "{}:{}:{}",
            self.config.object_uri_prefix,
            self.table.name,
            Uuid::new_v4()
        )
    }

    /// Resolves and type-coerces the primary key values out of `row`.
    fn pk_key(&self, row: &Row) -> Result<EncodedKey, OntodbError> {
        let mut values = Vec::with_capacity(self.table.primary_key.len());
        for name in &self.table.primary_key {
            let col = self.table.column(name).ok_or_else(|| {
                OntodbError::invalid_key(format!("primary key column '{name}' is not defined"))
            })?;
            let supplied = row.get(&col.name).ok_or_else(|| {
                OntodbError::invalid_key(format!("missing value for primary key '{}'", col.name))
            })?;
            let coerced = coerce(supplied, col.col_type).map_err(|msg| {
                OntodbError::invalid_key(format!("primary key '{}': {msg}", col.name))
            })?;
            if coerced.is_null() {
                return Err(OntodbError::invalid_key(format!(
                    "missing value for primary key '{}'",
                    col.name
                )));
            }
            values.push(coerced);
        }
        Ok(EncodedKey::from_values(&values))
    }

    fn key_display(&self, row: &Row) -> String {
        self.table
            .primary_key
            .iter()
            .map(|name| {
                row.get(name)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "?".into())
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Columns whose supplied values are always (or conditionally) ignored
    /// on update.
    fn dropped_on_update(&self, physical: &str, config: &UpdateConfig) -> bool {
        if physical.eq_ignore_ascii_case("EntityId") {
            return true;
        }
        if !config.retain_creation
            && (physical.eq_ignore_ascii_case("Created")
                || physical.eq_ignore_ascii_case("CreatedBy"))
        {
            return true;
        }
        !config.allow_owner && physical.eq_ignore_ascii_case("Owner")
    }

    /// Resolves a supplied non-column field name to a domain or vocabulary
    /// property descriptor, or `None` when the name matches nothing editable.
    fn resolve_property(&self, name: &str) -> Option<PropertyDescriptor> {
        if let Some(vcol) = self.groups.find(name) {
            if !vcol.editable {
                debug!(field = name, "ignoring non-editable derived column");
                return None;
            }
            return vcol.descriptor.clone();
        }
        self.table.vocabulary_property(name).cloned()
    }

    pub fn get_row(
        &self,
        _user: &User,
        _container: &Container,
        keys: &Row,
    ) -> Result<Option<Row>, OntodbError> {
        let key = self.pk_key(keys)?;
        let stored = match self.store.select(&key).map_err(|e| self.storage_err(e))? {
            Some(stored) => stored,
            None => return Ok(None),
        };

        let mut result = Row::new();
        for (name, value) in stored.table_fields() {
            result.set_table(name, value.clone());
        }

        if let Some(uri_col) = self.table.object_uri_column.as_deref() {
            match stored.get_table(uri_col) {
                Some(Value::Text(uri)) => {
                    for (name, value) in
                        self.props.values(uri).map_err(|e| self.storage_err(e))?
                    {
                        result.set_property(name, value);
                    }
                }
                // A row in a domain table must carry its object URI.
                _ if self.table.has_domain() => {
                    warn!(
                        table = %self.table.name,
                        key = %self.key_display(keys),
                        "domain table row has no object URI"
                    );
                    return Err(OntodbError::IntegrityError {
                        message: format!(
                            "row in '{}' is missing its object URI",
                            self.table.name
                        ),
                    });
                }
                _ => {}
            }
        }
        Ok(Some(result))
    }

    pub fn insert_row(
        &self,
        _user: &User,
        container: &Container,
        row: &Row,
        config: &UpdateConfig,
    ) -> Result<Row, OntodbError> {
        let use_aliases = config.insert_option.use_import_aliases();
        let mut table_row = Row::new();
        let mut prop_values: Vec<(PropertyDescriptor, Value)> = Vec::new();

        for (name, value) in row.table_fields().chain(row.property_fields()) {
            if let Some(col) = self.table.to_physical(name, use_aliases) {
                if col.auto_increment && !config.insert_option.identity_insert() {
                    debug!(field = name, "ignoring supplied identity value");
                    continue;
                }
                let converted = col
                    .convert(value)
                    .map_err(|msg| ValidationError::field(name, msg))?;
                table_row.set_table(col.name.clone(), converted);
            } else if let Some(prop) = self.resolve_property(name) {
                let converted = prop
                    .convert(value)
                    .map_err(|msg| ValidationError::field(name, msg))?;
                prop_values.push((prop, converted));
            } else {
                debug!(field = name, table = %self.table.name, "ignoring unknown field");
            }
        }

        // Special-column stamping: the ambient container wins silently
        // unless its policy admits the supplied target.
        if let Some(cc) = self.table.container_column.clone() {
            let target = match table_row.get_table(&cc) {
                Some(Value::Text(t)) => t.to_string(),
                _ => container.id.clone(),
            };
            let effective = if container.allows_row_placement(&target) {
                target
            } else {
                container.id.clone()
            };
            table_row.set_table(cc, Value::text(effective));
        }

        self.validate_required(&table_row, &prop_values)?;

        let pk_cols = self.table.pk_columns();
        if pk_cols.len() == 1
            && pk_cols[0].auto_increment
            && table_row.get_table(&pk_cols[0].name).is_none()
        {
            let id = self.next_identity.fetch_add(1, Ordering::SeqCst);
            table_row.set_table(pk_cols[0].name.clone(), Value::Integer(id));
        }

        let mut written_object: Option<String> = None;
        if let Some(uri_col) = self.table.object_uri_column.clone() {
            let (uri, generated) = match table_row.get_table(&uri_col) {
                Some(Value::Text(u)) => (u.to_string(), false),
                _ => (self.new_object_uri(), true),
            };
            if !prop_values.is_empty() {
                self.props
                    .insert_values(&uri, &prop_values)
                    .map_err(|e| self.storage_err(e))?;
                if generated {
                    written_object = Some(uri.clone());
                }
            }
            table_row.set_table(uri_col, Value::text(uri));
        }

        let key = match self.pk_key(&table_row) {
            Ok(key) => key,
            Err(err) => {
                self.discard_object(&written_object)?;
                return Err(err);
            }
        };
        if let Err(err) = self.store.insert(key, table_row.clone()) {
            self.discard_object(&written_object)?;
            return Err(self.storage_err(err));
        }

        let mut result = table_row;
        for (prop, value) in &prop_values {
            result.set_property(prop.name.clone(), value.clone());
        }
        Ok(result)
    }

    fn validate_required(
        &self,
        table_row: &Row,
        prop_values: &[(PropertyDescriptor, Value)],
    ) -> Result<(), OntodbError> {
        for col in &self.table.columns {
            if !col.required || col.auto_increment || col.has_default {
                continue;
            }
            // container and object-URI columns are auto-populated
            if Some(col.name.as_str()) == self.table.container_column.as_deref()
                || Some(col.name.as_str()) == self.table.object_uri_column.as_deref()
            {
                continue;
            }
            let missing = table_row
                .get_table(&col.name)
                .map_or(true, |value| value.is_missing());
            if missing {
                return Err(
                    ValidationError::field(&col.name, "required value is missing").into(),
                );
            }
        }
        for prop in &self.table.domain {
            if !prop.required {
                continue;
            }
            let present = prop_values
                .iter()
                .any(|(p, v)| p.name == prop.name && !v.is_missing());
            if !present {
                return Err(
                    ValidationError::field(&prop.name, "required value is missing").into(),
                );
            }
        }
        Ok(())
    }

    pub fn update_row(
        &self,
        _user: &User,
        container: &Container,
        row: &Row,
        old_row: Option<&Row>,
        config: &UpdateConfig,
    ) -> Result<Row, OntodbError> {
        let key = match old_row {
            Some(old) => self.pk_key(old).or_else(|_| self.pk_key(row))?,
            None => self.pk_key(row)?,
        };
        let existing = self
            .store
            .select(&key)
            .map_err(|e| self.storage_err(e))?
            .ok_or_else(|| OntodbError::NotFound {
                resource_type: ResourceType::Row,
                resource_id: format!(
                    "{}:{}",
                    self.table.name,
                    self.key_display(old_row.unwrap_or(row))
                ),
            })?;

        // Re-home every supplied field to its physical column, dropping
        // read-only and protected columns, and reject two different supplied
        // keys that disagree about one physical column's value.
        let use_aliases = config.insert_option.use_import_aliases();
        let mut changes: Vec<(String, String, Value)> = Vec::new();
        let mut prop_updates: Vec<(PropertyDescriptor, Value)> = Vec::new();
        let mut vocab_updates: Vec<(PropertyDescriptor, Value)> = Vec::new();

        for (name, value) in row.table_fields().chain(row.property_fields()) {
            if let Some(col) = self.table.to_physical(name, use_aliases) {
                if col.read_only || col.calculated {
                    debug!(field = name, "dropping read-only column from update");
                    continue;
                }
                if self.dropped_on_update(&col.name, config) {
                    debug!(field = name, "dropping protected column from update");
                    continue;
                }
                let converted = col
                    .convert(value)
                    .map_err(|msg| ValidationError::field(name, msg))?;
                match changes.iter().find(|(physical, _, _)| *physical == col.name) {
                    Some((physical, first, prior)) if *prior != converted => {
                        return Err(ValidationError::row(format!(
                            "fields '{first}' and '{name}' both map to column \
                             '{physical}' with different values"
                        ))
                        .into());
                    }
                    Some(_) => {} // equal values after coercion de-duplicate
                    None => changes.push((col.name.clone(), name.to_string(), converted)),
                }
            } else if let Some(vp) = self.table.vocabulary_property(name) {
                let converted = vp
                    .convert(value)
                    .map_err(|msg| ValidationError::field(name, msg))?;
                vocab_updates.push((vp.clone(), converted));
            } else if let Some(prop) = self.resolve_property(name) {
                let converted = prop
                    .convert(value)
                    .map_err(|msg| ValidationError::field(name, msg))?;
                prop_updates.push((prop, converted));
            } else {
                debug!(field = name, table = %self.table.name, "ignoring unknown field");
            }
        }

        let mut changes_row = Row::new();
        for (physical, _, value) in &changes {
            changes_row.set_table(physical.clone(), value.clone());
        }

        if let Some(cc) = self.table.container_column.clone() {
            let target = changes_row
                .get_table(&cc)
                .or_else(|| existing.get_table(&cc))
                .and_then(|v| v.as_text().map(str::to_string))
                .unwrap_or_else(|| container.id.clone());
            let effective = if container.allows_row_placement(&target) {
                target
            } else {
                container.id.clone()
            };
            if let Some(old) = old_row {
                if let Some(Value::Text(old_container)) = old.get_table(&cc) {
                    if old_container.as_str() != effective {
                        return Err(OntodbError::Unauthorized {
                            message: format!(
                                "cannot move row from container '{old_container}' to \
                                 '{effective}'"
                            ),
                        });
                    }
                }
            }
            changes_row.set_table(cc, Value::text(effective));
        }

        // EAV updates happen before the table write so a generated URI lands
        // in the same update.
        let mut written_object: Option<String> = None;
        if let Some(uri_col) = self.table.object_uri_column.clone() {
            let uri = match existing.get_table(&uri_col) {
                Some(Value::Text(u)) => u.to_string(),
                _ => {
                    let fresh = self.new_object_uri();
                    changes_row.set_table(uri_col, Value::text(fresh.clone()));
                    written_object = Some(fresh.clone());
                    fresh
                }
            };
            if self.table.has_domain() {
                if let Some(old) = old_row {
                    for (name, _) in old.property_fields() {
                        if let Some(prop) = self.table.property(name) {
                            self.props
                                .delete_value(&uri, &prop.name)
                                .map_err(|e| self.storage_err(e))?;
                        }
                    }
                }
                if !prop_updates.is_empty() {
                    self.props
                        .insert_values(&uri, &prop_updates)
                        .map_err(|e| self.storage_err(e))?;
                }
            }
            for (prop, value) in &vocab_updates {
                self.props
                    .replace_value(&uri, prop, value)
                    .map_err(|e| self.storage_err(e))?;
            }
        }

        let changed = match self.store.update(&key, &changes_row) {
            Ok(changed) => changed,
            Err(err) => {
                self.discard_object(&written_object)?;
                return Err(self.storage_err(err));
            }
        };

        // The caller's row overlaid with what the table write reports as
        // changed; never a full re-select.
        let mut result = row.clone();
        result.overlay_table(&changed);
        for (prop, value) in prop_updates.iter().chain(vocab_updates.iter()) {
            result.set_property(prop.name.clone(), value.clone());
        }
        Ok(result)
    }

    pub fn delete_row(
        &self,
        _user: &User,
        container: &Container,
        old_row: &Row,
    ) -> Result<Row, OntodbError> {
        let key = self.pk_key(old_row)?;
        let existing = match self.store.select(&key).map_err(|e| self.storage_err(e))? {
            Some(existing) => existing,
            // Deleting a row that is already gone is a silent no-op.
            None => return Ok(old_row.clone()),
        };

        if let Some(cc) = self.table.container_column.as_deref() {
            if let Some(Value::Text(row_container)) = existing.get_table(cc) {
                if !container.allows_row_placement(row_container) {
                    return Err(OntodbError::Unauthorized {
                        message: format!(
                            "cannot delete row in container '{row_container}' from \
                             '{}'",
                            container.id
                        ),
                    });
                }
            }
        }

        if let Some(uri_col) = self.table.object_uri_column.as_deref() {
            if let Some(Value::Text(uri)) = existing.get_table(uri_col) {
                self.props
                    .delete_object(uri)
                    .map_err(|e| self.storage_err(e))?;
            }
        }

        self.store.delete(&key).map_err(|e| self.storage_err(e))?;
        Ok(old_row.clone())
    }

    fn check_batch_size(&self, len: usize) -> Result<(), OntodbError> {
        if len > self.config.max_batch_rows {
            return Err(OntodbError::Service(format!(
                "batch of {len} rows exceeds the configured maximum of {}",
                self.config.max_batch_rows
            )));
        }
        Ok(())
    }

    /// Downgrades per-row failures that batch callers should survive;
    /// anything else aborts the batch.
    fn downgrade(err: OntodbError) -> Result<ValidationError, OntodbError> {
        match err {
            OntodbError::Validation(e) => Ok(e),
            // Constraint violations become row-scoped so the batch continues.
            OntodbError::DuplicateKey { table, key } => Ok(ValidationError::row(format!(
                "duplicate key in table '{table}': {key}"
            ))),
            other => Err(other),
        }
    }
}

impl QueryUpdateService for DefaultUpdateService {
    fn get_rows(
        &self,
        user: &User,
        container: &Container,
        keys: &[Row],
    ) -> Result<Vec<Option<Row>>, OntodbError> {
        keys.iter()
            .map(|key_row| self.get_row(user, container, key_row))
            .collect()
    }

    fn insert_rows(
        &self,
        user: &User,
        container: &Container,
        rows: Vec<Row>,
        config: &UpdateConfig,
    ) -> Result<Vec<Row>, OntodbError> {
        self.check_batch_size(rows.len())?;
        let mut results = Vec::with_capacity(rows.len());
        let mut batch = BatchValidationError::default();
        for (idx, row) in rows.iter().enumerate() {
            let merge_target = if config.insert_option.merge_rows() {
                match self.pk_key(row) {
                    Ok(key) => self
                        .store
                        .select(&key)
                        .map_err(|e| self.storage_err(e))?,
                    // No addressable key means nothing to merge into; the
                    // insert path reports whatever is actually missing.
                    Err(_) => None,
                }
            } else {
                None
            };
            let outcome = if merge_target.is_some() {
                self.update_row(user, container, row, None, config)
            } else {
                self.insert_row(user, container, row, config)
            };
            match outcome {
                Ok(result) => results.push(result),
                Err(err) => batch.push(idx, Self::downgrade(err)?),
            }
        }
        if !batch.is_empty() {
            return Err(batch.into());
        }
        Ok(results)
    }

    fn update_rows(
        &self,
        user: &User,
        container: &Container,
        rows: Vec<Row>,
        old_rows: Option<Vec<Row>>,
        config: &UpdateConfig,
    ) -> Result<Vec<Row>, OntodbError> {
        self.check_batch_size(rows.len())?;
        if let Some(old) = &old_rows {
            if old.len() != rows.len() {
                return Err(OntodbError::Service(format!(
                    "old_rows length {} does not match rows length {}",
                    old.len(),
                    rows.len()
                )));
            }
        }
        let mut results = Vec::with_capacity(rows.len());
        let mut batch = BatchValidationError::default();
        for (idx, row) in rows.iter().enumerate() {
            let old = old_rows.as_ref().map(|list| &list[idx]);
            match self.update_row(user, container, row, old, config) {
                Ok(result) => results.push(result),
                Err(err) => batch.push(idx, Self::downgrade(err)?),
            }
        }
        if !batch.is_empty() {
            return Err(batch.into());
        }
        Ok(results)
    }

    fn delete_rows(
        &self,
        user: &User,
        container: &Container,
        old_rows: Vec<Row>,
    ) -> Result<Vec<Row>, OntodbError> {
        self.check_batch_size(old_rows.len())?;
        let mut results = Vec::with_capacity(old_rows.len());
        for old_row in &old_rows {
            results.push(self.delete_row(user, container, old_row)?);
        }
        Ok(results)
    }

    fn truncate_rows(&self, _user: &User, container: &Container) -> Result<usize, OntodbError> {
        let all = self.store.scan().map_err(|e| self.storage_err(e))?;
        let mut count = 0usize;
        for (key, row) in all {
            if let Some(cc) = self.table.container_column.as_deref() {
                match row.get_table(cc) {
                    Some(Value::Text(c)) if c.as_str() == container.id => {}
                    _ => continue,
                }
            }
            if let Some(uri_col) = self.table.object_uri_column.as_deref() {
                if let Some(Value::Text(uri)) = row.get_table(uri_col) {
                    self.props
                        .delete_object(uri)
                        .map_err(|e| self.storage_err(e))?;
                }
            }
            self.store.delete(&key).map_err(|e| self.storage_err(e))?;
            count += 1;
        }
        info!(table = %self.table.name, container = %container.id, count, "truncated rows");
        Ok(count)
    }
}
