// src/db/plan_repo.rs

use std::sync::Arc;

use serde_json::json;

use crate::{
    db::table_store::{Credential, StoreError, TableStore},
    models::teable::Record,
};

#[derive(Clone)]
pub struct PlanStatusRepository {
    store: Arc<dyn TableStore>,
    table_id: String,
}

impl PlanStatusRepository {
    pub fn new(store: Arc<dyn TableStore>, table_id: String) -> Self {
        Self { store, table_id }
    }

    /// `None` when the store answers 404.
    pub async fn get(&self, plan_status_id: &str) -> Result<Option<Record>, StoreError> {
        match self
            .store
            .get_record(&Credential::Service, &self.table_id, plan_status_id)
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(err) if err.remote_status() == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn set_credit(&self, plan_status_id: &str, credit: i64) -> Result<(), StoreError> {
        let mut fields = serde_json::Map::new();
        fields.insert("credit_value".into(), json!(credit));
        self.store
            .update_record(&Credential::Service, &self.table_id, plan_status_id, fields)
            .await?;
        Ok(())
    }
}
