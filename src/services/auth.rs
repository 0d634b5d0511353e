// src/services/auth.rs

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{
        TenantRepository, TokenRegistryRepository,
        table_store::{Credential, TableStore},
    },
    models::{
        auth::{
            ChangePasswordPayload, ChangePasswordResponse, SigninPayload, SigninResponse,
            SignupPayload, SignupResponse, WorkspaceSummary,
        },
        teable::Fields,
        tenant::TenantRow,
    },
    services::{
        password::{PasswordEncoder, invoice_token},
        provisioning::{ProvisionedWorkspace, WorkspaceProvisioner, token_prefix},
        saga::{Compensation, Saga},
    },
};

const SIGNUP_SUCCESS: &str =
    "Tài khoản, không gian, cơ sở dữ liệu và tất cả các bảng đã được tạo thành công";
const SIGNIN_SUCCESS: &str = "Xác thực thành công";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn TableStore>,
    tenants: TenantRepository,
    tokens: TokenRegistryRepository,
    provisioner: WorkspaceProvisioner,
    encoder: PasswordEncoder,
    service_token: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn TableStore>,
        tenants: TenantRepository,
        tokens: TokenRegistryRepository,
        provisioner: WorkspaceProvisioner,
        encoder: PasswordEncoder,
        service_token: String,
    ) -> Self {
        Self {
            store,
            tenants,
            tokens,
            provisioner,
            encoder,
            service_token: service_token.trim().trim_start_matches("Bearer ").to_string(),
        }
    }

    // =========================================================================
    //  SIGN-UP
    // =========================================================================

    pub async fn signup(&self, payload: SignupPayload) -> Result<SignupResponse, AppError> {
        payload.validate()?;
        let username = payload.username.trim().to_string();

        let existing = self
            .tenants
            .find_by_username(&username)
            .await
            .map_err(|e| AppError::store("Không thể kiểm tra tài khoản", e))?;
        if existing.is_some() {
            return Err(AppError::UsernameTaken);
        }

        let business_name = payload
            .business_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Shop_{username}"));
        let invoice_token = invoice_token(&username, &payload.password);

        let mut fields = Fields::new();
        fields.insert("username".into(), json!(username));
        fields.insert("password".into(), json!(self.encoder.encode(&payload.password, &username)));
        fields.insert("business_name".into(), json!(business_name));
        fields.insert("invoice_token".into(), json!(invoice_token));

        let tenant = self
            .tenants
            .create(fields)
            .await
            .map_err(|e| AppError::store("Không thể tạo tài khoản người dùng", e))?;
        tracing::info!("Tenant row {} created for {}", tenant.id, username);

        let mut saga = Saga::new("signup");
        saga.record(Compensation::delete_record(
            &Credential::Service,
            self.tenants.table_id(),
            &tenant.id,
        ));

        match self
            .provision_tenant(&tenant.id, &username, &business_name, &invoice_token, &mut saga)
            .await
        {
            Ok(workspace) => {
                saga.complete();
                let tables: BTreeMap<String, String> = workspace
                    .tables
                    .iter()
                    .map(|(key, id)| (key.registry_field().to_string(), id.clone()))
                    .collect();
                Ok(SignupResponse {
                    status: "success".into(),
                    detail: SIGNUP_SUCCESS.into(),
                    account_id: tenant.id,
                    business_name,
                    taxcode: username,
                    workspace: WorkspaceSummary {
                        space_id: workspace.space_id,
                        base_id: workspace.base_id,
                        access_token: token_prefix(&workspace.access_token),
                    },
                    tables,
                    upload_file_id: workspace.upload_file_id.unwrap_or_default(),
                })
            }
            Err(e) => {
                tracing::error!("Signup for {} failed: {}", username, e);
                saga.compensate(self.store.as_ref()).await;
                Err(e)
            }
        }
    }

    async fn provision_tenant(
        &self,
        tenant_id: &str,
        username: &str,
        business_name: &str,
        invoice_token: &str,
        saga: &mut Saga,
    ) -> Result<ProvisionedWorkspace, AppError> {
        let workspace = self.provisioner.provision(username, business_name, saga).await?;

        let mut fields = Fields::new();
        fields.insert("access_token".into(), json!(workspace.access_token));
        fields.insert("invoice_token".into(), json!(invoice_token));
        fields.insert(
            "upload_file_id".into(),
            json!(workspace.upload_file_id.clone().unwrap_or_default()),
        );
        for (key, id) in &workspace.tables {
            fields.insert(key.registry_field().into(), json!(id));
        }
        self.tenants
            .update_fields(tenant_id, fields)
            .await
            .map_err(|source| AppError::Provisioning {
                step: "update_registry".into(),
                source,
            })?;
        Ok(workspace)
    }

    // =========================================================================
    //  SIGN-IN / PASSWORD
    // =========================================================================

    pub async fn signin(&self, payload: SigninPayload) -> Result<SigninResponse, AppError> {
        payload.validate()?;
        let username = payload.username.trim();
        let encoded = self.encoder.encode(&payload.password, username);

        let tenant = self
            .tenants
            .find_by_credentials(username, &encoded)
            .await
            .map_err(|e| AppError::store("Không thể xác thực người dùng", e))?
            .ok_or(AppError::InvalidCredentials)?;
        let verified = tenant
            .encoded_password()
            .is_some_and(|stored| self.encoder.verify(&payload.password, stored, username));
        if !verified {
            return Err(AppError::InvalidCredentials);
        }

        let mut login = Fields::new();
        login.insert("last_login".into(), json!(Utc::now().to_rfc3339()));
        let tenant = match self.tenants.update_fields(tenant.id(), login).await {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!("Failed to update last_login for {}: {}", username, e);
                tenant
            }
        };

        let access_token = match self.tokens.token_for(username).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::warn!(
                    "No workspace token found for {}, using the service token",
                    username
                );
                self.service_token.clone()
            }
            Err(e) => {
                tracing::warn!("Token registry lookup failed for {}: {}", username, e);
                self.service_token.clone()
            }
        };

        Ok(SigninResponse {
            status: "success".into(),
            access_token,
            detail: SIGNIN_SUCCESS.into(),
            record: vec![tenant.public_record()],
        })
    }

    pub async fn change_password(
        &self,
        payload: ChangePasswordPayload,
    ) -> Result<ChangePasswordResponse, AppError> {
        payload.validate()?;
        let username = payload.username.trim();

        let tenant = self
            .tenants
            .find_by_username(username)
            .await
            .map_err(|e| AppError::store("Không thể lấy thông tin người dùng", e))?
            .ok_or_else(|| AppError::NotFound("Không tìm thấy thông tin người dùng".into()))?;
        let verified = tenant
            .encoded_password()
            .is_some_and(|stored| self.encoder.verify(&payload.old_password, stored, username));
        if !verified {
            return Err(AppError::InvalidCredentials);
        }

        let mut fields = Fields::new();
        fields.insert(
            "password".into(),
            Value::from(self.encoder.encode(&payload.new_password, username)),
        );
        fields.insert(
            "invoice_token".into(),
            Value::from(invoice_token(username, &payload.new_password)),
        );
        self.tenants
            .update_fields(tenant.id(), fields)
            .await
            .map_err(|e| AppError::store("Không thể cập nhật mật khẩu", e))?;
        tracing::info!("Password changed for {}", username);

        Ok(ChangePasswordResponse {
            status: "success".into(),
            detail: "Đổi mật khẩu thành công".into(),
            username: username.to_string(),
        })
    }

    // =========================================================================
    //  BEARER RESOLUTION
    // =========================================================================

    /// Maps a workspace token to its tenant row.
    pub async fn resolve(&self, token: &str) -> Result<TenantRow, AppError> {
        let username = self
            .tokens
            .username_for(token)
            .await
            .map_err(|e| AppError::store("Không thể xác thực token", e))?
            .ok_or(AppError::InvalidToken)?;
        self.tenants
            .find_by_username(&username)
            .await
            .map_err(|e| AppError::store("Không thể lấy thông tin người dùng", e))?
            .ok_or(AppError::InvalidToken)
    }

    pub fn tenants(&self) -> &TenantRepository {
        &self.tenants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::tenant::TableKey,
        services::{provisioning::TemplateStrategy, testing::FakeStore},
    };

    fn service(store: Arc<FakeStore>) -> AuthService {
        let tenants = TenantRepository::new(store.clone(), "tblUsers".into(), None);
        let tokens = TokenRegistryRepository::new(store.clone(), "tblTokens".into());
        let provisioner = WorkspaceProvisioner::new(
            store.clone(),
            Arc::new(TemplateStrategy::new("tplRetail")),
            tokens.clone(),
            None,
            365,
        );
        AuthService::new(
            store,
            tenants,
            tokens,
            provisioner,
            PasswordEncoder::new("test-secret").unwrap(),
            "Bearer teable_service".into(),
        )
    }

    fn signup_payload(username: &str) -> SignupPayload {
        SignupPayload {
            username: username.into(),
            password: "cubable2025".into(),
            business_name: None,
        }
    }

    #[tokio::test]
    async fn signup_records_every_table_on_the_registry_row() {
        let store = Arc::new(FakeStore::default());
        let auth = service(store.clone());

        let response = auth.signup(signup_payload("0316316874")).await.unwrap();

        assert_eq!(response.business_name, "Shop_0316316874");
        assert_eq!(response.tables.len(), TableKey::ALL.len());
        assert!(response.workspace.access_token.ends_with("..."));

        let row = store.record("tblUsers", &response.account_id).unwrap();
        for key in TableKey::ALL {
            let id = row.text(key.registry_field()).expect("table id stored");
            assert!(store.table_exists(id));
        }
        assert!(row.text("access_token").is_some());
        assert!(row.text("upload_file_id").is_some());
        assert_eq!(
            row.text("invoice_token"),
            Some(invoice_token("0316316874", "cubable2025").as_str())
        );
        assert_ne!(row.text("password"), Some("cubable2025"));
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_conflict_without_writes() {
        let store = Arc::new(FakeStore::default());
        let auth = service(store.clone());
        auth.signup(signup_payload("0316316874")).await.unwrap();
        let writes = store.writes();

        let err = auth.signup(signup_payload("0316316874")).await.unwrap_err();

        assert!(matches!(err, AppError::UsernameTaken));
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn failed_provisioning_rolls_back_tenant_token_and_space() {
        let store = Arc::new(FakeStore::default());
        store.fail_on("list_tables");
        let auth = service(store.clone());

        let err = auth.signup(signup_payload("0316316874")).await.unwrap_err();

        assert!(matches!(err, AppError::Provisioning { ref step, .. } if step == "list_tables"));
        assert!(store.records("tblUsers").is_empty());
        assert!(store.records("tblTokens").is_empty());
        let deletions = store.deletions();
        assert_eq!(deletions.len(), 3);
        assert!(deletions[0].starts_with("record:tblTokens/"));
        assert!(deletions[1].starts_with("space:"));
        assert!(deletions[2].starts_with("record:tblUsers/"));
    }

    #[tokio::test]
    async fn signin_returns_the_workspace_token() {
        let store = Arc::new(FakeStore::default());
        let auth = service(store.clone());
        auth.signup(signup_payload("0316316874")).await.unwrap();

        let response = auth
            .signin(SigninPayload {
                username: "0316316874".into(),
                password: "cubable2025".into(),
            })
            .await
            .unwrap();

        let stored = &store.records("tblTokens")[0];
        assert_eq!(Some(response.access_token.as_str()), stored.text("token"));
        assert!(response.record[0]["fields"].get("password").is_none());
        assert!(response.record[0]["fields"]["last_login"].is_string());
    }

    #[tokio::test]
    async fn signin_falls_back_to_the_service_token() {
        let store = Arc::new(FakeStore::default());
        let auth = service(store.clone());
        let encoded = PasswordEncoder::new("test-secret").unwrap().encode("secret1", "legacy");
        store.seed("tblUsers", json!({ "username": "legacy", "password": encoded }));

        let response = auth
            .signin(SigninPayload {
                username: "legacy".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.access_token, "teable_service");
    }

    #[tokio::test]
    async fn wrong_password_or_unknown_user_is_unauthorized() {
        let store = Arc::new(FakeStore::default());
        let auth = service(store.clone());
        auth.signup(signup_payload("0316316874")).await.unwrap();

        for (username, password) in [("0316316874", "wrong-pass"), ("0000000000", "cubable2025")] {
            let err = auth
                .signin(SigninPayload {
                    username: username.into(),
                    password: password.into(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn change_password_rotates_password_and_invoice_token() {
        let store = Arc::new(FakeStore::default());
        let auth = service(store.clone());
        let signup = auth.signup(signup_payload("0316316874")).await.unwrap();

        auth.change_password(ChangePasswordPayload {
            username: "0316316874".into(),
            old_password: "cubable2025".into(),
            new_password: "cubable2026".into(),
        })
        .await
        .unwrap();

        let row = store.record("tblUsers", &signup.account_id).unwrap();
        assert_eq!(
            row.text("invoice_token"),
            Some(invoice_token("0316316874", "cubable2026").as_str())
        );
        assert!(
            auth.signin(SigninPayload {
                username: "0316316874".into(),
                password: "cubable2026".into(),
            })
            .await
            .is_ok()
        );

        let err = auth
            .change_password(ChangePasswordPayload {
                username: "0316316874".into(),
                old_password: "cubable2025".into(),
                new_password: "whatever1".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn resolve_maps_tokens_to_tenants() {
        let store = Arc::new(FakeStore::default());
        let auth = service(store.clone());
        auth.signup(signup_payload("0316316874")).await.unwrap();
        let token = store.records("tblTokens")[0].text_or_default("token");

        let tenant = auth.resolve(&token).await.unwrap();
        assert_eq!(tenant.username(), "0316316874");
        assert!(matches!(auth.resolve("teable_unknown").await, Err(AppError::InvalidToken)));
    }
}
