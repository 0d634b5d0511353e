// src/db/tenant_repo.rs

use std::sync::Arc;

use crate::{
    db::table_store::{Credential, RecordQuery, StoreError, TableStore},
    models::{
        teable::{Fields, Record},
        tenant::TenantRow,
    },
};

// Registry of tenants: one row per business, read and written with the service token.
#[derive(Clone)]
pub struct TenantRepository {
    store: Arc<dyn TableStore>,
    table_id: String,
    view_id: Option<String>,
}

impl TenantRepository {
    pub fn new(store: Arc<dyn TableStore>, table_id: String, view_id: Option<String>) -> Self {
        Self {
            store,
            table_id,
            view_id,
        }
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    async fn find_one(&self, query: RecordQuery) -> Result<Option<TenantRow>, StoreError> {
        let records = self
            .store
            .query_records(&Credential::Service, &self.table_id, &query)
            .await?;
        Ok(records.into_iter().next().map(TenantRow::from))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<TenantRow>, StoreError> {
        let query = RecordQuery::new()
            .is("username", username)
            .view(self.view_id.as_deref());
        self.find_one(query).await
    }

    pub async fn find_by_credentials(
        &self,
        username: &str,
        encoded_password: &str,
    ) -> Result<Option<TenantRow>, StoreError> {
        let query = RecordQuery::new()
            .is("username", username)
            .is("password", encoded_password)
            .view(self.view_id.as_deref());
        self.find_one(query).await
    }

    pub async fn find_by_id(&self, record_id: &str) -> Result<TenantRow, StoreError> {
        let record = self
            .store
            .get_record(&Credential::Service, &self.table_id, record_id)
            .await?;
        Ok(record.into())
    }

    pub async fn create(&self, fields: Fields) -> Result<Record, StoreError> {
        let mut created = self
            .store
            .create_records(&Credential::Service, &self.table_id, vec![fields])
            .await?;
        created
            .pop()
            .ok_or_else(|| StoreError::Decode("no record returned for new tenant".into()))
    }

    pub async fn update_fields(
        &self,
        record_id: &str,
        fields: Fields,
    ) -> Result<TenantRow, StoreError> {
        let record = self
            .store
            .update_record(&Credential::Service, &self.table_id, record_id, fields)
            .await?;
        Ok(record.into())
    }
}
