// src/services/testing.rs
//
// In-memory table store for unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    db::table_store::{Credential, RecordQuery, StoreError, TableStore},
    models::{
        teable::{
            AccessTokenRequest, Attachment, FieldInfo, Fields, NewField, NewTable, Record,
            TableInfo, ViewInfo,
        },
        tenant::{TableKey, TenantRow},
    },
};

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    records: BTreeMap<String, Vec<Record>>,
    bases: BTreeMap<String, Vec<TableInfo>>,
    tables: BTreeSet<String>,
    fields: BTreeMap<String, Vec<FieldInfo>>,
    added: BTreeMap<String, Vec<NewField>>,
    hidden: Vec<(String, String)>,
    deletions: Vec<String>,
    failing: BTreeSet<String>,
    token_requests: Vec<AccessTokenRequest>,
    uploads: Vec<(String, String, String, String)>,
    writes: usize,
}

impl State {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }

    fn check(&self, op: &str, table: Option<&str>) -> Result<(), StoreError> {
        let scoped = table.map(|t| format!("{op}:{t}"));
        if self.failing.contains(op) || scoped.is_some_and(|s| self.failing.contains(&s)) {
            return Err(StoreError::Remote {
                status: 500,
                message: format!("API call failed with status 500: {op} failed"),
                body: Value::Null,
            });
        }
        Ok(())
    }

    fn add_table(&mut self, base_id: &str, name: &str) -> String {
        let id = self.id("tbl");
        self.tables.insert(id.clone());
        self.fields.insert(id.clone(), Vec::new());
        self.bases.entry(base_id.to_string()).or_default().push(TableInfo {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    fn add_field_info(&mut self, table_id: &str, field: &NewField) -> String {
        let id = self.id("fld");
        self.fields.entry(table_id.to_string()).or_default().push(FieldInfo {
            id: id.clone(),
            name: field.name.clone(),
            db_field_name: Some(field.db_field_name.clone()),
            kind: field.kind.to_string(),
            options: field.options.clone(),
        });
        id
    }

    fn not_found(what: &str) -> StoreError {
        StoreError::Remote {
            status: 404,
            message: format!("API call failed with status 404: {what} not found"),
            body: Value::Null,
        }
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches(record: &Record, filter: &Value) -> bool {
    let Some(set) = filter.get("filterSet").and_then(Value::as_array) else {
        return true;
    };
    set.iter().all(|cond| {
        let field = cond["fieldId"].as_str().unwrap_or_default();
        let wanted = as_text(&cond["value"]);
        let Some(actual) = record.fields.get(field).map(as_text) else {
            return false;
        };
        match cond["operator"].as_str() {
            Some("contains") => actual.to_lowercase().contains(&wanted.to_lowercase()),
            _ => actual == wanted,
        }
    })
}

impl FakeStore {
    /// Makes every call of `op` fail, or only calls on one table with `op:table_id`.
    pub fn fail_on(&self, op: &str) {
        self.state.lock().unwrap().failing.insert(op.to_string());
    }

    /// Inserts a record directly, outside the write counter.
    pub fn seed(&self, table_id: &str, fields: Value) -> Record {
        let mut state = self.state.lock().unwrap();
        let id = state.id("rec");
        let fields = fields.as_object().cloned().unwrap_or_default();
        let record = Record {
            id,
            fields,
            ..Record::default()
        };
        state
            .records
            .entry(table_id.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    pub fn records(&self, table_id: &str) -> Vec<Record> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(table_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn record(&self, table_id: &str, record_id: &str) -> Option<Record> {
        self.records(table_id).into_iter().find(|r| r.id == record_id)
    }

    pub fn deletions(&self) -> Vec<String> {
        self.state.lock().unwrap().deletions.clone()
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn table_exists(&self, table_id: &str) -> bool {
        self.state.lock().unwrap().tables.contains(table_id)
    }

    pub fn field_by_db_name(&self, table_id: &str, db_name: &str) -> Option<FieldInfo> {
        let state = self.state.lock().unwrap();
        state
            .fields
            .get(table_id)?
            .iter()
            .find(|f| f.db_field_name.as_deref() == Some(db_name))
            .cloned()
    }

    pub fn field_by_id(&self, table_id: &str, field_id: &str) -> Option<FieldInfo> {
        let state = self.state.lock().unwrap();
        state.fields.get(table_id)?.iter().find(|f| f.id == field_id).cloned()
    }

    /// A computed field added after table creation.
    pub fn added_field(&self, table_id: &str, db_name: &str) -> Option<NewField> {
        let state = self.state.lock().unwrap();
        state
            .added
            .get(table_id)?
            .iter()
            .find(|f| f.db_field_name == db_name)
            .cloned()
    }

    pub fn hidden_columns(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().hidden.clone()
    }

    pub fn last_token_request(&self) -> Option<AccessTokenRequest> {
        self.state.lock().unwrap().token_requests.last().cloned()
    }

    /// `(table, record, field, file name)` of every uploaded attachment.
    pub fn uploads(&self) -> Vec<(String, String, String, String)> {
        self.state.lock().unwrap().uploads.clone()
    }

    /// A provisioned tenant: every table is `tbl<Key>`, plan credit lives in `PLAN_TABLE`.
    pub fn tenant(&self, credit: i64) -> TenantRow {
        let tables: BTreeMap<TableKey, String> =
            TableKey::ALL.into_iter().map(|key| (key, table_of(key))).collect();
        self.tenant_with_tables(credit, &tables)
    }

    /// A tenant whose registry row points at already-built tables.
    pub fn tenant_with_tables(
        &self,
        credit: i64,
        tables: &BTreeMap<TableKey, String>,
    ) -> TenantRow {
        let plan = self.seed(PLAN_TABLE, json!({ "credit_value": credit, "name_plan": "Basic" }));
        let mut fields = json!({
            "username": "0316316874",
            "business_name": "Shop_0316316874",
            "access_token": "teable_ws_token",
            "invoice_token": "MDMxNjMxNjg3NDpjdWJhYmxlMjAyNQ==",
            "upload_file_id": "fldInvoiceFile",
            "current_plan": [{ "id": plan.id, "title": "Basic" }],
        });
        for (key, id) in tables {
            fields[key.registry_field()] = json!(id);
        }
        TenantRow::from(self.seed(TENANT_TABLE, fields))
    }

    pub fn credit(&self) -> Option<f64> {
        self.records(PLAN_TABLE).first()?.number("credit_value")
    }
}

pub const TENANT_TABLE: &str = "tblUsers";
pub const PLAN_TABLE: &str = "tblPlans";

/// Table id a [`FakeStore::tenant`] uses for `key`.
pub fn table_of(key: TableKey) -> String {
    format!("tbl{key:?}")
}

#[async_trait]
impl TableStore for FakeStore {
    async fn query_records(
        &self,
        _cred: &Credential,
        table_id: &str,
        query: &RecordQuery,
    ) -> Result<Vec<Record>, StoreError> {
        let state = self.state.lock().unwrap();
        state.check("query_records", Some(table_id))?;
        let params = query.to_params();
        let filter = params
            .iter()
            .find(|(k, _)| *k == "filter")
            .and_then(|(_, v)| serde_json::from_str::<Value>(v).ok())
            .unwrap_or(Value::Null);
        let take = params
            .iter()
            .find(|(k, _)| *k == "take")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        Ok(state
            .records
            .get(table_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| matches(r, &filter))
                    .take(take)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_record(
        &self,
        _cred: &Credential,
        table_id: &str,
        record_id: &str,
    ) -> Result<Record, StoreError> {
        let state = self.state.lock().unwrap();
        state.check("get_record", Some(table_id))?;
        state
            .records
            .get(table_id)
            .and_then(|rs| rs.iter().find(|r| r.id == record_id))
            .cloned()
            .ok_or_else(|| State::not_found(record_id))
    }

    async fn create_records(
        &self,
        _cred: &Credential,
        table_id: &str,
        records: Vec<Fields>,
    ) -> Result<Vec<Record>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("create_records", Some(table_id))?;
        state.writes += 1;
        let mut created = Vec::with_capacity(records.len());
        for fields in records {
            let id = state.id("rec");
            created.push(Record {
                id,
                fields,
                ..Record::default()
            });
        }
        state
            .records
            .entry(table_id.to_string())
            .or_default()
            .extend(created.iter().cloned());
        Ok(created)
    }

    async fn update_record(
        &self,
        _cred: &Credential,
        table_id: &str,
        record_id: &str,
        fields: Fields,
    ) -> Result<Record, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("update_record", Some(table_id))?;
        state.writes += 1;
        let record = state
            .records
            .get_mut(table_id)
            .and_then(|rs| rs.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| State::not_found(record_id))?;
        record.fields.extend(fields);
        Ok(record.clone())
    }

    async fn delete_record(
        &self,
        _cred: &Credential,
        table_id: &str,
        record_id: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("delete_record", Some(table_id))?;
        state.writes += 1;
        if let Some(records) = state.records.get_mut(table_id) {
            records.retain(|r| r.id != record_id);
        }
        state.deletions.push(format!("record:{table_id}/{record_id}"));
        Ok(())
    }

    async fn create_space(&self, _cred: &Credential, _name: &str) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("create_space", None)?;
        state.writes += 1;
        Ok(state.id("spc"))
    }

    async fn delete_space(&self, _cred: &Credential, space_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("delete_space", None)?;
        state.writes += 1;
        state.deletions.push(format!("space:{space_id}"));
        Ok(())
    }

    async fn create_base(
        &self,
        _cred: &Credential,
        _space_id: &str,
        _name: &str,
        _icon: &str,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("create_base", None)?;
        state.writes += 1;
        let id = state.id("bse");
        state.bases.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn create_base_from_template(
        &self,
        _cred: &Credential,
        _space_id: &str,
        _template_id: &str,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("create_base_from_template", None)?;
        state.writes += 1;
        let base_id = state.id("bse");
        for key in TableKey::ALL {
            let table_id = state.add_table(&base_id, key.template_name());
            if key == TableKey::Order {
                let invoice_file = NewField {
                    kind: "attachment",
                    name: "File hoá đơn".into(),
                    db_field_name: "invoice_file".into(),
                    unique: None,
                    is_lookup: None,
                    options: None,
                    lookup_options: None,
                };
                state.add_field_info(&table_id, &invoice_file);
            }
        }
        // an extra table the service does not track
        state.add_table(&base_id, "Bảng Nháp");
        Ok(base_id)
    }

    async fn list_tables(
        &self,
        _cred: &Credential,
        base_id: &str,
    ) -> Result<Vec<TableInfo>, StoreError> {
        let state = self.state.lock().unwrap();
        state.check("list_tables", None)?;
        state
            .bases
            .get(base_id)
            .cloned()
            .ok_or_else(|| State::not_found(base_id))
    }

    async fn create_table(
        &self,
        _cred: &Credential,
        base_id: &str,
        table: &NewTable,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("create_table", None)?;
        state.writes += 1;
        let table_id = state.add_table(base_id, &table.name);
        for field in &table.fields {
            state.add_field_info(&table_id, field);
            let Some(options) = &field.options else { continue };
            if field.kind != "link" || options.get("isOneWay") == Some(&json!(true)) {
                continue;
            }
            let Some(foreign) = options["foreignTableId"].as_str().map(str::to_string) else {
                continue;
            };
            let reverse = NewField {
                kind: "link",
                name: table.name.clone(),
                db_field_name: table.name.replace(' ', "_"),
                unique: None,
                is_lookup: None,
                options: Some(json!({ "foreignTableId": table_id })),
                lookup_options: None,
            };
            state.add_field_info(&foreign, &reverse);
        }
        Ok(table_id)
    }

    async fn add_field(
        &self,
        _cred: &Credential,
        table_id: &str,
        field: &NewField,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("add_field", Some(table_id))?;
        if !state.tables.contains(table_id) {
            return Err(State::not_found(table_id));
        }
        state.writes += 1;
        state
            .added
            .entry(table_id.to_string())
            .or_default()
            .push(field.clone());
        Ok(state.add_field_info(table_id, field))
    }

    async fn list_fields(
        &self,
        _cred: &Credential,
        table_id: &str,
    ) -> Result<Vec<FieldInfo>, StoreError> {
        let state = self.state.lock().unwrap();
        state.check("list_fields", Some(table_id))?;
        state
            .fields
            .get(table_id)
            .cloned()
            .ok_or_else(|| State::not_found(table_id))
    }

    async fn list_views(
        &self,
        _cred: &Credential,
        table_id: &str,
    ) -> Result<Vec<ViewInfo>, StoreError> {
        let state = self.state.lock().unwrap();
        state.check("list_views", Some(table_id))?;
        Ok(vec![ViewInfo {
            id: format!("viw_{table_id}"),
            name: "Grid view".into(),
        }])
    }

    async fn hide_columns(
        &self,
        _cred: &Credential,
        table_id: &str,
        _view_id: &str,
        field_ids: &[String],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("hide_columns", Some(table_id))?;
        for id in field_ids {
            state.hidden.push((table_id.to_string(), id.clone()));
        }
        Ok(())
    }

    async fn admin_session(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<Option<String>, StoreError> {
        let state = self.state.lock().unwrap();
        state.check("admin_session", None)?;
        Ok(Some("auth_session=fake".into()))
    }

    async fn create_access_token(
        &self,
        _session: Option<&str>,
        request: &AccessTokenRequest,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("create_access_token", None)?;
        state.writes += 1;
        state.token_requests.push(request.clone());
        let id = state.id("");
        Ok(format!("teable_workspace_token_{id}"))
    }

    async fn upload_attachment(
        &self,
        _cred: &Credential,
        table_id: &str,
        record_id: &str,
        field_id: &str,
        file: Attachment,
    ) -> Result<Record, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.check("upload_attachment", Some(table_id))?;
        state.writes += 1;
        state.uploads.push((
            table_id.to_string(),
            record_id.to_string(),
            field_id.to_string(),
            file.file_name.clone(),
        ));
        let record = state
            .records
            .get_mut(table_id)
            .and_then(|rs| rs.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| State::not_found(record_id))?;
        let attachment = json!([{ "name": file.file_name, "size": file.bytes.len() }]);
        record.fields.insert(field_id.to_string(), attachment);
        Ok(record.clone())
    }
}
