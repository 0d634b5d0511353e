// src/db/token_repo.rs

use std::sync::Arc;

use serde_json::json;

use crate::db::table_store::{Credential, RecordQuery, StoreError, TableStore};

/// username <-> workspace token pairs, used to resolve bearer tokens.
#[derive(Clone)]
pub struct TokenRegistryRepository {
    store: Arc<dyn TableStore>,
    table_id: String,
}

impl TokenRegistryRepository {
    pub fn new(store: Arc<dyn TableStore>, table_id: String) -> Self {
        Self { store, table_id }
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    /// Returns the id of the new registry row.
    pub async fn register(&self, username: &str, token: &str) -> Result<String, StoreError> {
        let mut fields = serde_json::Map::new();
        fields.insert("username".into(), json!(username));
        fields.insert("token".into(), json!(token));
        let created = self
            .store
            .create_records(&Credential::Service, &self.table_id, vec![fields])
            .await?;
        created
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| StoreError::Decode("no record returned for token registry".into()))
    }

    pub async fn username_for(&self, token: &str) -> Result<Option<String>, StoreError> {
        let query = RecordQuery::new().is("token", token);
        let records = self
            .store
            .query_records(&Credential::Service, &self.table_id, &query)
            .await?;
        Ok(records
            .first()
            .and_then(|r| r.text("username"))
            .map(str::to_string))
    }

    pub async fn token_for(&self, username: &str) -> Result<Option<String>, StoreError> {
        let query = RecordQuery::new().is("username", username);
        let records = self
            .store
            .query_records(&Credential::Service, &self.table_id, &query)
            .await?;
        Ok(records
            .first()
            .and_then(|r| r.text("token"))
            .map(str::to_string))
    }
}
