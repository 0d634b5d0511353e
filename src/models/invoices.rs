// src/models/invoices.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

fn has_template_code(payload: &Value) -> Result<(), ValidationError> {
    let template_code = payload
        .get("generalInvoiceInfo")
        .and_then(|info| info.get("templateCode"))
        .and_then(Value::as_str);
    match template_code {
        Some(code) if !code.is_empty() => Ok(()),
        _ => {
            let mut err = ValidationError::new("template_code");
            err.message = Some("invoice_payload phải chứa generalInvoiceInfo.templateCode".into());
            Err(err)
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GenerateInvoicePayload {
    #[validate(length(min = 1))]
    pub username: String,

    /// Defaults to the caller's order table.
    pub order_table_id: Option<String>,

    #[validate(length(min = 1))]
    pub record_order_id: String,

    /// Defaults to the attachment field recorded at signup.
    pub field_attachment_id: Option<String>,

    /// Forwarded as-is to the e-invoice provider.
    #[validate(custom(function = "has_template_code"))]
    #[schema(value_type = Object)]
    pub invoice_payload: Value,
}

impl GenerateInvoicePayload {
    pub fn template_code(&self) -> &str {
        self.invoice_payload["generalInvoiceInfo"]["templateCode"]
            .as_str()
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceResponse {
    pub detail: String,
    pub invoice_no: String,
    pub file_name: String,
}

/// Output of the provider round trip: invoice number plus the rendered PDF.
#[derive(Debug, Clone)]
pub struct IssuedInvoice {
    pub invoice_no: String,
    pub file_name: String,
    pub pdf: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(invoice_payload: Value) -> GenerateInvoicePayload {
        GenerateInvoicePayload {
            username: "0316316874".into(),
            order_table_id: None,
            record_order_id: "recOrder".into(),
            field_attachment_id: None,
            invoice_payload,
        }
    }

    #[test]
    fn template_code_is_required() {
        assert!(payload(json!({ "generalInvoiceInfo": {} })).validate().is_err());
        assert!(payload(json!({})).validate().is_err());
        let ok = payload(json!({ "generalInvoiceInfo": { "templateCode": "1/770" } }));
        assert!(ok.validate().is_ok());
        assert_eq!(ok.template_code(), "1/770");
    }
}
