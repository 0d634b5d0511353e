// src/services/provisioning/strategy.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    db::table_store::{Credential, StoreError, TableStore},
    models::{
        teable::{FieldInfo, LookupOptions, NewField},
        tenant::TableKey,
    },
};

use super::catalog::{
    Derivation, DerivedField, LinkRef, SchemaCatalog, formula_field, formula_references,
    lookup_field, render_formula, rollup_field,
};

/// Identifiers produced by a strategy inside a freshly created space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionedSchema {
    pub base_id: String,
    pub tables: BTreeMap<TableKey, String>,
}

/// How the tables of a new workspace come into existence.
#[async_trait]
pub trait ProvisioningStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn build(
        &self,
        store: &dyn TableStore,
        cred: &Credential,
        space_id: &str,
        business_name: &str,
    ) -> Result<ProvisionedSchema, AppError>;
}

fn step_failed(step: impl Into<String>) -> impl FnOnce(StoreError) -> AppError {
    let step = step.into();
    move |source| AppError::Provisioning { step, source }
}

// =============================================================================
//  TEMPLATE: one call instantiates the whole base
// =============================================================================

pub struct TemplateStrategy {
    template_id: String,
}

impl TemplateStrategy {
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
        }
    }
}

#[async_trait]
impl ProvisioningStrategy for TemplateStrategy {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn build(
        &self,
        store: &dyn TableStore,
        cred: &Credential,
        space_id: &str,
        _business_name: &str,
    ) -> Result<ProvisionedSchema, AppError> {
        let base_id = store
            .create_base_from_template(cred, space_id, &self.template_id)
            .await
            .map_err(step_failed("create_base_from_template"))?;
        tracing::info!("Base {} created from template {}", base_id, self.template_id);

        let listed = store
            .list_tables(cred, &base_id)
            .await
            .map_err(step_failed("list_tables"))?;

        let mut tables = BTreeMap::new();
        for table in listed {
            match TableKey::from_template_name(&table.name) {
                Some(key) => {
                    tables.insert(key, table.id);
                }
                None => tracing::debug!("Template table '{}' is not tracked", table.name),
            }
        }
        for key in TableKey::ALL {
            if !tables.contains_key(&key) {
                tracing::warn!("Template has no table named '{}'", key.template_name());
            }
        }

        Ok(ProvisionedSchema { base_id, tables })
    }
}

// =============================================================================
//  CATALOG: tables and computed fields built one by one
// =============================================================================

pub struct CatalogStrategy {
    catalog: SchemaCatalog,
}

impl CatalogStrategy {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self { catalog }
    }
}

/// Field ids by table, listed once per table and kept current as fields are added.
struct FieldIndex<'a> {
    store: &'a dyn TableStore,
    cred: &'a Credential,
    tables: &'a BTreeMap<TableKey, String>,
    cache: HashMap<TableKey, Vec<FieldInfo>>,
}

impl<'a> FieldIndex<'a> {
    fn new(
        store: &'a dyn TableStore,
        cred: &'a Credential,
        tables: &'a BTreeMap<TableKey, String>,
    ) -> Self {
        Self {
            store,
            cred,
            tables,
            cache: HashMap::new(),
        }
    }

    fn table_id(&self, key: TableKey) -> Result<&'a str, StoreError> {
        let tables: &'a BTreeMap<TableKey, String> = self.tables;
        tables
            .get(&key)
            .map(String::as_str)
            .ok_or_else(|| StoreError::Decode(format!("table {key:?} was not created")))
    }

    async fn fields(&mut self, key: TableKey) -> Result<&[FieldInfo], StoreError> {
        if !self.cache.contains_key(&key) {
            let listed = self.store.list_fields(self.cred, self.table_id(key)?).await?;
            self.cache.insert(key, listed);
        }
        Ok(self.cache.get(&key).map(Vec::as_slice).unwrap_or_default())
    }

    async fn field_id(&mut self, key: TableKey, db_name: &str) -> Result<String, StoreError> {
        self.fields(key)
            .await?
            .iter()
            .find(|f| f.db_field_name.as_deref() == Some(db_name))
            .map(|f| f.id.clone())
            .ok_or_else(|| StoreError::Decode(format!("field '{db_name}' not found on {key:?}")))
    }

    async fn link_id(&mut self, key: TableKey, link: LinkRef) -> Result<String, StoreError> {
        match link {
            LinkRef::Field(db_name) => self.field_id(key, db_name).await,
            LinkRef::ReverseOf(from) => {
                let from_id = self.table_id(from)?;
                self.fields(key)
                    .await?
                    .iter()
                    .find(|f| f.link_target() == Some(from_id))
                    .map(|f| f.id.clone())
                    .ok_or_else(|| {
                        StoreError::Decode(format!("no link from {from:?} found on {key:?}"))
                    })
            }
        }
    }

    fn remember(&mut self, key: TableKey, field: &NewField, id: String) {
        if let Some(fields) = self.cache.get_mut(&key) {
            fields.push(FieldInfo {
                id,
                name: field.name.clone(),
                db_field_name: Some(field.db_field_name.clone()),
                kind: field.kind.to_string(),
                options: field.options.clone(),
            });
        }
    }

    async fn derived_field(&mut self, derived: &DerivedField) -> Result<NewField, StoreError> {
        match &derived.derivation {
            Derivation::Formula(expression) => {
                let expression: &'static str = *expression;
                let mut ids = HashMap::new();
                for name in formula_references(expression) {
                    ids.insert(name, self.field_id(derived.table, name).await?);
                }
                let rendered = render_formula(expression, |name| ids.get(name).cloned())
                    .map_err(|name| {
                        StoreError::Decode(format!("unresolved formula input '{name}'"))
                    })?;
                Ok(formula_field(derived.name, derived.db_name, rendered))
            }
            Derivation::Lookup {
                link,
                foreign,
                field,
                value_type,
            } => {
                let lookup = LookupOptions {
                    foreign_table_id: self.table_id(*foreign)?.to_string(),
                    link_field_id: self.field_id(derived.table, link).await?,
                    lookup_field_id: self.field_id(*foreign, field).await?,
                };
                Ok(lookup_field(derived.name, derived.db_name, *value_type, lookup))
            }
            Derivation::Rollup {
                link,
                foreign,
                field,
            } => {
                let lookup = LookupOptions {
                    foreign_table_id: self.table_id(*foreign)?.to_string(),
                    link_field_id: self.link_id(derived.table, *link).await?,
                    lookup_field_id: self.field_id(*foreign, field).await?,
                };
                Ok(rollup_field(derived.name, derived.db_name, lookup))
            }
        }
    }
}

#[async_trait]
impl ProvisioningStrategy for CatalogStrategy {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn build(
        &self,
        store: &dyn TableStore,
        cred: &Credential,
        space_id: &str,
        business_name: &str,
    ) -> Result<ProvisionedSchema, AppError> {
        let table_order = self
            .catalog
            .table_order()
            .map_err(|e| AppError::Internal(e.into()))?;
        let derived_order = self
            .catalog
            .derived_order()
            .map_err(|e| AppError::Internal(e.into()))?;

        let base_name = format!("{business_name}_base");
        let base_id = store
            .create_base(cred, space_id, &base_name, "🏪")
            .await
            .map_err(step_failed("create_base"))?;
        tracing::info!("Base {} created in space {}", base_id, space_id);

        let mut tables = BTreeMap::new();
        for def in table_order {
            let payload = def.to_new_table(&tables).map_err(|missing| {
                AppError::Internal(anyhow::anyhow!("{:?} built before {:?}", def.key, missing))
            })?;
            let id = store
                .create_table(cred, &base_id, &payload)
                .await
                .map_err(step_failed(format!("create_table:{}", def.name)))?;
            tracing::info!("Table '{}' created: {}", def.name, id);
            tables.insert(def.key, id);
        }

        let mut index = FieldIndex::new(store, cred, &tables);
        for derived in derived_order {
            let step = format!("add_field:{:?}.{}", derived.table, derived.db_name);
            let field = index
                .derived_field(derived)
                .await
                .map_err(step_failed(step.clone()))?;
            let table_id = index.table_id(derived.table).map_err(step_failed(step.clone()))?;
            let id = store
                .add_field(cred, table_id, &field)
                .await
                .map_err(step_failed(step))?;
            tracing::info!("Computed field '{}' added to {:?}", derived.db_name, derived.table);
            index.remember(derived.table, &field, id);
        }

        for (table, from) in &self.catalog.hidden_reverse_links {
            if let Err(e) = hide_reverse_link(&mut index, *table, *from).await {
                tracing::warn!("Could not hide link from {:?} on {:?}: {}", from, table, e);
            }
        }

        Ok(ProvisionedSchema { base_id, tables })
    }
}

async fn hide_reverse_link(
    index: &mut FieldIndex<'_>,
    table: TableKey,
    from: TableKey,
) -> Result<(), StoreError> {
    let field_id = index.link_id(table, LinkRef::ReverseOf(from)).await?;
    let table_id = index.table_id(table)?;
    let views = index.store.list_views(index.cred, table_id).await?;
    let Some(view) = views.first() else {
        return Ok(());
    };
    index
        .store
        .hide_columns(index.cred, table_id, &view.id, &[field_id])
        .await
}
