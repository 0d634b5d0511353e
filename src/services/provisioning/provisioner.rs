// src/services/provisioning/provisioner.rs

use std::{collections::BTreeMap, sync::Arc};

use chrono::{Days, Utc};

use crate::{
    common::error::AppError,
    db::{
        TokenRegistryRepository,
        table_store::{Credential, TableStore},
    },
    models::{teable::AccessTokenRequest, tenant::TableKey},
    services::saga::{Compensation, Saga},
};

use super::strategy::ProvisioningStrategy;

const WORKSPACE_SCOPES: &[&str] = &[
    "space|create",
    "space|delete",
    "space|read",
    "space|update",
    "space|invite_email",
    "space|invite_link",
    "space|grant_role",
    "base|create",
    "base|delete",
    "base|read",
    "base|read_all",
    "base|update",
    "base|invite_email",
    "base|invite_link",
    "base|table_import",
    "base|table_export",
    "base|authority_matrix_config",
    "base|db_connection",
    "base|query_data",
    "table|create",
    "table|delete",
    "table|read",
    "table|update",
    "table|import",
    "table|export",
    "table|trash_read",
    "table|trash_update",
    "table|trash_reset",
    "view|create",
    "view|delete",
    "view|read",
    "view|update",
    "view|share",
    "record|create",
    "record|delete",
    "record|read",
    "record|update",
    "record|comment",
    "field|create",
    "field|delete",
    "field|read",
    "field|update",
    "automation|create",
    "automation|delete",
    "automation|read",
    "automation|update",
    "user|email_read",
    "table_record_history|read",
];

/// Field on the order table that receives invoice PDFs.
const INVOICE_FILE_FIELD: &str = "invoice_file";

/// First characters of a secret, for logs and responses.
pub fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(20).collect();
    format!("{prefix}...")
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedWorkspace {
    pub space_id: String,
    pub base_id: String,
    pub access_token: String,
    pub tables: BTreeMap<TableKey, String>,
    pub upload_file_id: Option<String>,
}

/// Creates a space, its scoped token and its tables for a new tenant.
#[derive(Clone)]
pub struct WorkspaceProvisioner {
    store: Arc<dyn TableStore>,
    strategy: Arc<dyn ProvisioningStrategy>,
    tokens: TokenRegistryRepository,
    admin: Option<AdminCredentials>,
    token_ttl_days: u64,
}

impl WorkspaceProvisioner {
    pub fn new(
        store: Arc<dyn TableStore>,
        strategy: Arc<dyn ProvisioningStrategy>,
        tokens: TokenRegistryRepository,
        admin: Option<AdminCredentials>,
        token_ttl_days: u64,
    ) -> Self {
        Self {
            store,
            strategy,
            tokens,
            admin,
            token_ttl_days,
        }
    }

    /// Every remote write is recorded on `saga` so the caller can undo a partial workspace.
    pub async fn provision(
        &self,
        username: &str,
        business_name: &str,
        saga: &mut Saga,
    ) -> Result<ProvisionedWorkspace, AppError> {
        let space_name = format!("{business_name}_workspace");
        let space_id = self
            .store
            .create_space(&Credential::Service, &space_name)
            .await
            .map_err(|source| AppError::Provisioning {
                step: "create_space".into(),
                source,
            })?;
        saga.record(Compensation::DeleteSpace {
            space_id: space_id.clone(),
        });
        tracing::info!("Space '{}' created: {}", space_name, space_id);

        let access_token = self.generate_access_token(&space_name, &space_id).await?;
        tracing::info!("Workspace token issued: {}", token_prefix(&access_token));

        let registry_id = self
            .tokens
            .register(username, &access_token)
            .await
            .map_err(|source| AppError::Provisioning {
                step: "register_token".into(),
                source,
            })?;
        saga.record(Compensation::delete_record(
            &Credential::Service,
            self.tokens.table_id(),
            &registry_id,
        ));

        let workspace = Credential::Workspace(access_token.clone());
        tracing::info!("Building tables with the {} strategy", self.strategy.name());
        let schema = self
            .strategy
            .build(self.store.as_ref(), &workspace, &space_id, business_name)
            .await?;

        let upload_file_id = match schema.tables.get(&TableKey::Order) {
            Some(order_table) => self.invoice_file_field(&workspace, order_table).await,
            None => None,
        };

        Ok(ProvisionedWorkspace {
            space_id,
            base_id: schema.base_id,
            access_token,
            tables: schema.tables,
            upload_file_id,
        })
    }

    async fn generate_access_token(
        &self,
        space_name: &str,
        space_id: &str,
    ) -> Result<String, AppError> {
        let session = match &self.admin {
            Some(admin) => match self.store.admin_session(&admin.email, &admin.password).await {
                Ok(cookie) => cookie,
                Err(e) => {
                    tracing::warn!("Admin sign-in failed, requesting token without session: {}", e);
                    None
                }
            },
            None => None,
        };

        let expires = Utc::now().date_naive() + Days::new(self.token_ttl_days);
        let request = AccessTokenRequest {
            name: format!("token_{space_name}"),
            description: format!("Access token for space {space_name}"),
            scopes: WORKSPACE_SCOPES.to_vec(),
            expired_time: expires.format("%Y-%m-%d").to_string(),
            space_ids: vec![space_id.to_string()],
            base_ids: None,
            has_full_access: true,
        };

        let token = self
            .store
            .create_access_token(session.as_deref(), &request)
            .await
            .map_err(|source| AppError::Provisioning {
                step: "create_access_token".into(),
                source,
            })?;
        if token.is_empty() {
            return Err(AppError::Provisioning {
                step: "create_access_token".into(),
                source: crate::db::StoreError::Decode("empty token".into()),
            });
        }
        Ok(token)
    }

    async fn invoice_file_field(&self, cred: &Credential, order_table: &str) -> Option<String> {
        match self.store.list_fields(cred, order_table).await {
            Ok(fields) => {
                let id = fields
                    .into_iter()
                    .find(|f| f.db_field_name.as_deref() == Some(INVOICE_FILE_FIELD))
                    .map(|f| f.id);
                if id.is_none() {
                    tracing::warn!(
                        "Order table {} has no '{}' field",
                        order_table,
                        INVOICE_FILE_FIELD
                    );
                }
                id
            }
            Err(e) => {
                tracing::warn!("Could not list order table fields: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        provisioning::{CatalogStrategy, SchemaCatalog, TemplateStrategy},
        testing::FakeStore,
    };

    fn provisioner(
        store: Arc<FakeStore>,
        strategy: Arc<dyn ProvisioningStrategy>,
    ) -> WorkspaceProvisioner {
        let tokens = TokenRegistryRepository::new(store.clone(), "tblTokens".into());
        WorkspaceProvisioner::new(store, strategy, tokens, None, 365)
    }

    #[tokio::test]
    async fn provisions_space_token_and_tables() {
        let store = Arc::new(FakeStore::default());
        let p = provisioner(store.clone(), Arc::new(TemplateStrategy::new("tplRetail")));
        let mut saga = Saga::new("signup");

        let ws = p.provision("0316316874", "Shop_0316316874", &mut saga).await.unwrap();

        assert!(ws.access_token.starts_with("teable_"));
        assert_eq!(ws.tables.len(), TableKey::ALL.len());
        assert!(ws.upload_file_id.is_some());
        assert_eq!(saga.len(), 2);

        let registry = store.records("tblTokens");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry[0].text("username"), Some("0316316874"));
        assert_eq!(registry[0].text("token"), Some(ws.access_token.as_str()));

        let request = store.last_token_request().unwrap();
        assert_eq!(request.name, "token_Shop_0316316874_workspace");
        assert_eq!(request.space_ids, vec![ws.space_id.clone()]);
        assert!(request.scopes.contains(&"record|create"));
    }

    #[tokio::test]
    async fn catalog_strategy_records_every_catalog_table() {
        let store = Arc::new(FakeStore::default());
        let p = provisioner(store.clone(), Arc::new(CatalogStrategy::new(SchemaCatalog::retail())));
        let mut saga = Saga::new("signup");

        let ws = p.provision("u1", "Shop_u1", &mut saga).await.unwrap();

        for def in SchemaCatalog::retail().tables {
            assert!(store.table_exists(&ws.tables[&def.key]));
        }
        assert!(ws.upload_file_id.is_some());
    }

    #[tokio::test]
    async fn token_failure_leaves_only_the_space_to_undo() {
        let store = Arc::new(FakeStore::default());
        store.fail_on("create_access_token");
        let p = provisioner(store.clone(), Arc::new(TemplateStrategy::new("tplRetail")));
        let mut saga = Saga::new("signup");

        let err = p.provision("u1", "Shop_u1", &mut saga).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Provisioning { ref step, .. } if step == "create_access_token"
        ));
        assert_eq!(saga.len(), 1);

        saga.compensate(store.as_ref()).await;
        assert_eq!(store.deletions().len(), 1);
        assert!(store.deletions()[0].starts_with("space:"));
    }

    #[test]
    fn token_prefix_keeps_twenty_chars() {
        assert_eq!(token_prefix("teable_abcdefghijklmnopqrstuvwxyz"), "teable_abcdefghijklm...");
        assert_eq!(token_prefix("short"), "short...");
    }
}
