// src/services/invoice_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    common::error::AppError,
    db::table_store::TableStore,
    models::{
        invoices::{GenerateInvoicePayload, InvoiceResponse, IssuedInvoice},
        teable::{Attachment, fields},
        tenant::{TableKey, TenantRow},
    },
};

/// E-invoice provider: issues an invoice and renders it as PDF.
#[async_trait]
pub trait InvoiceProvider: Send + Sync {
    async fn issue(
        &self,
        username: &str,
        invoice_token: &str,
        invoice_payload: &Value,
    ) -> Result<IssuedInvoice, AppError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedInvoice {
    invoice_no: String,
    supplier_tax_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderedFile {
    file_to_bytes: Option<String>,
    file_name: Option<String>,
}

/// Viettel e-invoice API, authenticated with the tenant's Basic token.
#[derive(Clone)]
pub struct ViettelInvoiceClient {
    http: Client,
    create_url: String,
    pdf_url: String,
}

impl ViettelInvoiceClient {
    pub fn new(http: Client, create_url: &str, pdf_url: &str) -> Self {
        Self {
            http,
            create_url: create_url.trim_end_matches('/').to_string(),
            pdf_url: pdf_url.to_string(),
        }
    }

    async fn post(&self, url: &str, invoice_token: &str, body: &Value) -> Result<Value, AppError> {
        let response = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {invoice_token}"))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Invoice provider unreachable: {}", e);
                AppError::Upstream(format!("Invoice generation failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Invoice provider answered {} for {}", status, url);
            return Err(AppError::Upstream(format!("HTTP error: {}", status.as_u16())));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invoice generation failed: {e}")))
    }
}

#[async_trait]
impl InvoiceProvider for ViettelInvoiceClient {
    async fn issue(
        &self,
        username: &str,
        invoice_token: &str,
        invoice_payload: &Value,
    ) -> Result<IssuedInvoice, AppError> {
        let create_url = format!("{}/{}", self.create_url, username);
        let created = self.post(&create_url, invoice_token, invoice_payload).await?;
        let created: CreatedInvoice = created
            .get("result")
            .filter(|r| !r.is_null())
            .and_then(|r| serde_json::from_value(r.clone()).ok())
            .ok_or_else(|| AppError::Upstream("Could not create invoice".into()))?;
        tracing::info!("Invoice {} issued for {}", created.invoice_no, username);

        let template_code = invoice_payload["generalInvoiceInfo"]["templateCode"]
            .as_str()
            .unwrap_or_default();
        let pdf_request = json!({
            "supplierTaxCode": created.supplier_tax_code,
            "invoiceNo": created.invoice_no,
            "templateCode": template_code,
            "fileType": "pdf",
        });
        let rendered: RenderedFile = serde_json::from_value(
            self.post(&self.pdf_url, invoice_token, &pdf_request).await?,
        )
        .map_err(|_| AppError::Upstream("Could not get PDF file".into()))?;

        let encoded = rendered
            .file_to_bytes
            .filter(|b| !b.is_empty())
            .ok_or_else(|| AppError::Upstream("Could not get PDF file".into()))?;
        let pdf = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| AppError::Upstream(format!("Could not decode PDF file: {e}")))?;

        Ok(IssuedInvoice {
            file_name: rendered
                .file_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("{}.pdf", created.invoice_no)),
            invoice_no: created.invoice_no,
            pdf,
        })
    }
}

#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn TableStore>,
    provider: Arc<dyn InvoiceProvider>,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn TableStore>, provider: Arc<dyn InvoiceProvider>) -> Self {
        Self { store, provider }
    }

    /// Issues the invoice, attaches its PDF to the order and marks the order invoiced.
    pub async fn generate(
        &self,
        tenant: &TenantRow,
        payload: GenerateInvoicePayload,
    ) -> Result<InvoiceResponse, AppError> {
        payload.validate()?;
        if payload.username != tenant.username() {
            return Err(AppError::Forbidden(
                "Không thể xuất hóa đơn cho tài khoản khác".into(),
            ));
        }

        let required: &[TableKey] = match payload.order_table_id {
            Some(_) => &[],
            None => &[TableKey::Order],
        };
        let ws = tenant.workspace(required)?;
        let order_table = match payload.order_table_id.as_deref() {
            Some(id) => id,
            None => ws.table(TableKey::Order)?,
        };
        let field_id = payload
            .field_attachment_id
            .as_deref()
            .or(tenant.upload_file_id())
            .ok_or_else(|| AppError::BadRequest("Thiếu upload_file_id cho file hóa đơn".into()))?;
        let invoice_token = tenant
            .invoice_token()
            .ok_or_else(|| AppError::BadRequest("Thiếu invoice_token của tài khoản".into()))?;

        let issued = self
            .provider
            .issue(&payload.username, invoice_token, &payload.invoice_payload)
            .await?;

        self.store
            .upload_attachment(
                &ws.credential,
                order_table,
                &payload.record_order_id,
                field_id,
                Attachment {
                    file_name: issued.file_name.clone(),
                    content_type: "application/pdf".into(),
                    bytes: issued.pdf,
                },
            )
            .await
            .map_err(|e| AppError::store("Không thể tải file hóa đơn lên đơn hàng", e))?;

        self.store
            .update_record(
                &ws.credential,
                order_table,
                &payload.record_order_id,
                fields(json!({ "invoice_state": true, "invoice_code": issued.invoice_no })),
            )
            .await
            .map_err(|e| AppError::store("Không thể cập nhật trạng thái hóa đơn", e))?;

        tracing::info!(
            "Invoice {} attached to order {} for {}",
            issued.invoice_no,
            payload.record_order_id,
            ws.username
        );
        Ok(InvoiceResponse {
            detail: "Xuất hóa đơn thành công".into(),
            invoice_no: issued.invoice_no,
            file_name: issued.file_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{FakeStore, table_of};
    use std::sync::Mutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    #[derive(Default)]
    struct StubProvider {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl InvoiceProvider for StubProvider {
        async fn issue(
            &self,
            username: &str,
            token: &str,
            _payload: &Value,
        ) -> Result<IssuedInvoice, AppError> {
            self.calls.lock().unwrap().push((username.into(), token.into()));
            Ok(IssuedInvoice {
                invoice_no: "K25TAA0000123".into(),
                file_name: "K25TAA0000123.pdf".into(),
                pdf: b"%PDF-1.4".to_vec(),
            })
        }
    }

    fn payload(username: &str) -> GenerateInvoicePayload {
        GenerateInvoicePayload {
            username: username.into(),
            order_table_id: None,
            record_order_id: "recOrder".into(),
            field_attachment_id: None,
            invoice_payload: json!({ "generalInvoiceInfo": { "templateCode": "1/770" } }),
        }
    }

    #[tokio::test]
    async fn pdf_is_attached_and_order_marked_invoiced() {
        let store = Arc::new(FakeStore::default());
        let tenant = store.tenant(1);
        let order_table = table_of(TableKey::Order);
        let order = store.seed(&order_table, json!({ "invoice_state": false }));
        let provider = Arc::new(StubProvider::default());
        let service = InvoiceService::new(store.clone(), provider.clone());

        let mut request = payload("0316316874");
        request.record_order_id = order.id.clone();
        let response = service.generate(&tenant, request).await.unwrap();

        assert_eq!(response.invoice_no, "K25TAA0000123");
        assert_eq!(
            provider.calls.lock().unwrap()[0],
            ("0316316874".to_string(), tenant.invoice_token().unwrap().to_string())
        );
        let uploads = store.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].2, "fldInvoiceFile");
        let order = store.record(&order_table, &order.id).unwrap();
        assert_eq!(order.fields["invoice_state"], json!(true));
        assert_eq!(order.text("invoice_code"), Some("K25TAA0000123"));
    }

    #[tokio::test]
    async fn other_usernames_are_forbidden() {
        let store = Arc::new(FakeStore::default());
        let tenant = store.tenant(1);
        let provider = Arc::new(StubProvider::default());
        let service = InvoiceService::new(store.clone(), provider.clone());

        let err = service.generate(&tenant, payload("0999999999")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn viettel_client_creates_then_renders() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/createInvoice/0316316874"))
            .and(header("authorization", "Basic dG9rZW4="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errorCode": null,
                "result": { "invoiceNo": "K25TAA0000007", "supplierTaxCode": "0316316874" }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/getInvoiceRepresentationFile"))
            .and(body_partial_json(json!({
                "invoiceNo": "K25TAA0000007",
                "templateCode": "1/770",
                "fileType": "pdf"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fileToBytes": STANDARD.encode(b"%PDF-1.4 test"),
                "fileName": "invoice-7.pdf"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ViettelInvoiceClient::new(
            Client::new(),
            &format!("{}/createInvoice", server.uri()),
            &format!("{}/getInvoiceRepresentationFile", server.uri()),
        );
        let issued = client
            .issue("0316316874", "dG9rZW4=", &json!({ "generalInvoiceInfo": { "templateCode": "1/770" } }))
            .await
            .unwrap();

        assert_eq!(issued.invoice_no, "K25TAA0000007");
        assert_eq!(issued.file_name, "invoice-7.pdf");
        assert_eq!(issued.pdf, b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn missing_result_is_a_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
            .mount(&server)
            .await;

        let client = ViettelInvoiceClient::new(Client::new(), &server.uri(), &server.uri());
        let err = client.issue("u", "t", &json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not create invoice");
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
