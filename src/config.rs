// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::{Context, anyhow};
use reqwest::Client;

use crate::{
    db::{PlanStatusRepository, TableStore, TeableClient, TenantRepository, TokenRegistryRepository},
    services::{
        auth::AuthService,
        customer_service::CustomerService,
        invoice_service::{InvoiceProvider, InvoiceService, ViettelInvoiceClient},
        order_service::OrderService,
        password::PasswordEncoder,
        plan_service::PlanService,
        product_service::ProductService,
        profile_service::ProfileService,
        provisioning::{
            AdminCredentials, CatalogStrategy, ProvisioningStrategy, SchemaCatalog,
            TemplateStrategy, WorkspaceProvisioner,
        },
        stock_service::StockService,
        supplier_service::SupplierService,
        transcription_service::{
            LineItemExtractor, OpenRouterExtractor, SpeechToText, TranscriptionService,
            WhisperHttpEngine,
        },
        unit_conversion_service::UnitConversionService,
    },
};

const DEFAULT_TEABLE_BASE_URL: &str = "https://app.teable.vn/api";
const DEFAULT_PLAN_STATUS_TABLE_ID: &str = "tblL2pLkyLQgPzmCVHU";
const DEFAULT_TEMPLATE_ID: &str = "tpl2qOKQjJtcJI3C7R6";
const DEFAULT_CREATE_INVOICE_URL: &str = "https://api-vinvoice.viettel.vn/services/einvoiceapplication/api/InvoiceAPI/InvoiceWS/createInvoice";
const DEFAULT_GET_PDF_URL: &str = "https://api-vinvoice.viettel.vn/services/einvoiceapplication/api/InvoiceAPI/InvoiceUtilsWS/getInvoiceRepresentationFile";
const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_EXTRACTION_MODEL: &str = "deepseek/deepseek-r1-0528-qwen3-8b:free";
const DEFAULT_WHISPER_URL: &str = "http://127.0.0.1:9000/v1/audio/transcriptions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Template,
    Catalog,
}

impl StrategyKind {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "catalog" => Ok(Self::Catalog),
            other => Err(anyhow!(
                "invalid PROVISIONING_STRATEGY '{other}' (expected template or catalog)"
            )),
        }
    }
}

/// Everything read from the environment at start-up.
#[derive(Clone)]
pub struct Settings {
    pub teable_base_url: String,
    pub teable_token: String,
    pub tenant_table_id: String,
    pub user_view_id: Option<String>,
    pub token_table_id: String,
    pub plan_status_table_id: String,
    pub admin: Option<AdminCredentials>,
    pub strategy: StrategyKind,
    pub template_id: String,
    pub token_ttl_days: u64,
    pub create_invoice_url: String,
    pub get_pdf_url: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_url: String,
    pub extraction_model: String,
    pub whisper_url: String,
    pub whisper_model_size: String,
    pub whisper_compute_type: String,
    pub whisper_device: String,
    pub password_secret: String,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub http_timeout: Duration,
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn or_default(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid {key} '{raw}': {e}")),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let admin = match (optional("TEABLE_ADMIN_EMAIL"), optional("TEABLE_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminCredentials { email, password }),
            _ => None,
        };
        let cors_origins = or_default("CORS_ORIGINS", "*")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            teable_base_url: or_default("TEABLE_BASE_URL", DEFAULT_TEABLE_BASE_URL),
            teable_token: required("TEABLE_TOKEN")?
                .trim_start_matches("Bearer ")
                .to_string(),
            tenant_table_id: required("TEABLE_TABLE_ID")?,
            user_view_id: optional("TEABLE_USER_VIEW_ID"),
            token_table_id: required("TEABLE_TOKEN_LIST_TABLE_ID")?,
            plan_status_table_id: or_default(
                "TEABLE_PLAN_STATUS_TABLE_ID",
                DEFAULT_PLAN_STATUS_TABLE_ID,
            ),
            admin,
            strategy: StrategyKind::parse(&or_default("PROVISIONING_STRATEGY", "template"))?,
            template_id: or_default("TEABLE_TEMPLATE_ID", DEFAULT_TEMPLATE_ID),
            token_ttl_days: parsed("ACCESS_TOKEN_TTL_DAYS", 365)?,
            create_invoice_url: or_default("CREATE_INVOICE_URL", DEFAULT_CREATE_INVOICE_URL),
            get_pdf_url: or_default("GET_PDF_URL", DEFAULT_GET_PDF_URL),
            openrouter_api_key: optional("OPENROUTER_API_KEY"),
            openrouter_url: or_default("OPENROUTER_URL", DEFAULT_OPENROUTER_URL),
            extraction_model: or_default("EXTRACTION_MODEL", DEFAULT_EXTRACTION_MODEL),
            whisper_url: or_default("WHISPER_URL", DEFAULT_WHISPER_URL),
            whisper_model_size: or_default("WHISPER_MODEL_SIZE", "small"),
            whisper_compute_type: or_default("WHISPER_COMPUTE_TYPE", "int8"),
            whisper_device: or_default("WHISPER_DEVICE", "cpu"),
            password_secret: required("PASSWORD_SECRET")?,
            cors_origins,
            host: or_default("HOST", "0.0.0.0"),
            port: parsed("PORT", 8000)?,
            http_timeout: Duration::from_secs(parsed("HTTP_TIMEOUT_SECS", 30)?),
        })
    }
}

// =============================================================================
//  APPLICATION STATE
// =============================================================================

/// Shared dependency graph handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub customer_service: CustomerService,
    pub product_service: ProductService,
    pub unit_conversion_service: UnitConversionService,
    pub supplier_service: SupplierService,
    pub stock_service: StockService,
    pub order_service: OrderService,
    pub invoice_service: InvoiceService,
    pub transcription_service: TranscriptionService,
    pub plan_service: PlanService,
    pub profile_service: ProfileService,
    pub cors_origins: Vec<String>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .context("failed to build the HTTP client")?;

        let store: Arc<dyn TableStore> = Arc::new(TeableClient::new(
            http.clone(),
            &settings.teable_base_url,
            &settings.teable_token,
        ));
        let strategy: Arc<dyn ProvisioningStrategy> = match settings.strategy {
            StrategyKind::Template => Arc::new(TemplateStrategy::new(settings.template_id.clone())),
            StrategyKind::Catalog => Arc::new(CatalogStrategy::new(SchemaCatalog::retail())),
        };
        let invoices: Arc<dyn InvoiceProvider> = Arc::new(ViettelInvoiceClient::new(
            http.clone(),
            &settings.create_invoice_url,
            &settings.get_pdf_url,
        ));
        tracing::info!(
            "Speech engine at {} (model {}, {} on {})",
            settings.whisper_url,
            settings.whisper_model_size,
            settings.whisper_compute_type,
            settings.whisper_device
        );
        let speech: Arc<dyn SpeechToText> = Arc::new(
            WhisperHttpEngine::new(
                http.clone(),
                &settings.whisper_url,
                &settings.whisper_model_size,
            )
            .with_runtime(&settings.whisper_compute_type, &settings.whisper_device),
        );
        let extractor: Arc<dyn LineItemExtractor> = Arc::new(OpenRouterExtractor::new(
            http,
            &settings.openrouter_url,
            &settings.extraction_model,
            settings.openrouter_api_key.clone(),
        ));

        Self::from_parts(settings, store, strategy, invoices, speech, extractor)
    }

    /// Assembles the services over the given collaborators.
    pub fn from_parts(
        settings: &Settings,
        store: Arc<dyn TableStore>,
        strategy: Arc<dyn ProvisioningStrategy>,
        invoices: Arc<dyn InvoiceProvider>,
        speech: Arc<dyn SpeechToText>,
        extractor: Arc<dyn LineItemExtractor>,
    ) -> anyhow::Result<Self> {
        let encoder = PasswordEncoder::new(&settings.password_secret)
            .map_err(|e| anyhow!("invalid PASSWORD_SECRET: {e}"))?;

        let tenants = TenantRepository::new(
            store.clone(),
            settings.tenant_table_id.clone(),
            settings.user_view_id.clone(),
        );
        let tokens = TokenRegistryRepository::new(store.clone(), settings.token_table_id.clone());
        let plans = PlanService::new(PlanStatusRepository::new(
            store.clone(),
            settings.plan_status_table_id.clone(),
        ));
        tracing::info!("Provisioning strategy: {}", strategy.name());
        let provisioner = WorkspaceProvisioner::new(
            store.clone(),
            strategy,
            tokens.clone(),
            settings.admin.clone(),
            settings.token_ttl_days,
        );
        let stock_service = StockService::new(store.clone(), plans.clone());

        Ok(Self {
            auth_service: AuthService::new(
                store.clone(),
                tenants.clone(),
                tokens,
                provisioner,
                encoder,
                settings.teable_token.clone(),
            ),
            customer_service: CustomerService::new(store.clone()),
            product_service: ProductService::new(store.clone(), plans.clone()),
            unit_conversion_service: UnitConversionService::new(store.clone()),
            supplier_service: SupplierService::new(store.clone()),
            order_service: OrderService::new(store.clone(), stock_service.clone(), plans.clone()),
            stock_service,
            invoice_service: InvoiceService::new(store, invoices),
            transcription_service: TranscriptionService::new(speech, extractor),
            plan_service: plans,
            profile_service: ProfileService::new(tenants),
            cors_origins: settings.cors_origins.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_are_case_insensitive() {
        assert_eq!(StrategyKind::parse("Template").unwrap(), StrategyKind::Template);
        assert_eq!(StrategyKind::parse(" catalog ").unwrap(), StrategyKind::Catalog);
        assert!(StrategyKind::parse("graph").is_err());
    }
}
