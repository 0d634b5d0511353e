// src/db/table_store.rs

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::{Client, Method, RequestBuilder, header};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::teable::{
    AccessTokenRequest, Attachment, FieldInfo, Fields, NewField, NewTable, Record, RecordList,
    TableInfo, ViewInfo,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{message}")]
    Remote {
        status: u16,
        message: String,
        body: Value,
    },

    #[error("Network error during API call: {0}")]
    Network(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Expected status {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },
}

impl StoreError {
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            StoreError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Status surfaced to our own callers.
    pub fn client_status(&self) -> StatusCode {
        match self.remote_status() {
            Some(status @ (400 | 404 | 409 | 422)) => {
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Which bearer token a call runs under.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Service,
    Workspace(String),
}

// tokens only ever show up truncated in logs
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Service => f.write_str("Service"),
            Credential::Workspace(token) => {
                let prefix: String = token.chars().take(8).collect();
                write!(f, "Workspace({prefix}...)")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Is,
    Contains,
}

impl FilterOp {
    fn as_str(self) -> &'static str {
        match self {
            FilterOp::Is => "is",
            FilterOp::Contains => "contains",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    filters: Vec<(String, FilterOp, Value)>,
    view_id: Option<String>,
    take: Option<u32>,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), FilterOp::Is, value.into()));
        self
    }

    pub fn contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters
            .push((field.to_string(), FilterOp::Contains, value.into()));
        self
    }

    pub fn view(mut self, view_id: Option<&str>) -> Self {
        self.view_id = view_id.map(str::to_string);
        self
    }

    pub fn take(mut self, take: u32) -> Self {
        self.take = Some(take);
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("fieldKeyType", "dbFieldName".to_string())];
        if let Some(view_id) = &self.view_id {
            params.push(("viewId", view_id.clone()));
        }
        if !self.filters.is_empty() {
            let filter_set: Vec<Value> = self
                .filters
                .iter()
                .map(|(field, op, value)| {
                    json!({ "fieldId": field, "operator": op.as_str(), "value": value })
                })
                .collect();
            let filter = json!({ "conjunction": "and", "filterSet": filter_set });
            params.push(("filter", filter.to_string()));
        }
        if let Some(take) = self.take {
            params.push(("take", take.to_string()));
        }
        params
    }
}

/// Every remote operation the rest of the crate performs against the table store.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn query_records(
        &self,
        cred: &Credential,
        table_id: &str,
        query: &RecordQuery,
    ) -> Result<Vec<Record>, StoreError>;

    async fn get_record(
        &self,
        cred: &Credential,
        table_id: &str,
        record_id: &str,
    ) -> Result<Record, StoreError>;

    async fn create_records(
        &self,
        cred: &Credential,
        table_id: &str,
        records: Vec<Fields>,
    ) -> Result<Vec<Record>, StoreError>;

    async fn create_record(
        &self,
        cred: &Credential,
        table_id: &str,
        fields: Fields,
    ) -> Result<Record, StoreError> {
        self.create_records(cred, table_id, vec![fields])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("no record returned by table {table_id}")))
    }

    async fn update_record(
        &self,
        cred: &Credential,
        table_id: &str,
        record_id: &str,
        fields: Fields,
    ) -> Result<Record, StoreError>;

    async fn delete_record(
        &self,
        cred: &Credential,
        table_id: &str,
        record_id: &str,
    ) -> Result<(), StoreError>;

    async fn create_space(&self, cred: &Credential, name: &str) -> Result<String, StoreError>;

    async fn delete_space(&self, cred: &Credential, space_id: &str) -> Result<(), StoreError>;

    async fn create_base(
        &self,
        cred: &Credential,
        space_id: &str,
        name: &str,
        icon: &str,
    ) -> Result<String, StoreError>;

    async fn create_base_from_template(
        &self,
        cred: &Credential,
        space_id: &str,
        template_id: &str,
    ) -> Result<String, StoreError>;

    async fn list_tables(&self, cred: &Credential, base_id: &str)
    -> Result<Vec<TableInfo>, StoreError>;

    async fn create_table(
        &self,
        cred: &Credential,
        base_id: &str,
        table: &NewTable,
    ) -> Result<String, StoreError>;

    async fn add_field(
        &self,
        cred: &Credential,
        table_id: &str,
        field: &NewField,
    ) -> Result<String, StoreError>;

    async fn list_fields(&self, cred: &Credential, table_id: &str)
    -> Result<Vec<FieldInfo>, StoreError>;

    async fn list_views(&self, cred: &Credential, table_id: &str)
    -> Result<Vec<ViewInfo>, StoreError>;

    async fn hide_columns(
        &self,
        cred: &Credential,
        table_id: &str,
        view_id: &str,
        field_ids: &[String],
    ) -> Result<(), StoreError>;

    /// Signs the platform admin in and returns the `auth_session` cookie, if any.
    async fn admin_session(&self, email: &str, password: &str)
    -> Result<Option<String>, StoreError>;

    async fn create_access_token(
        &self,
        session: Option<&str>,
        request: &AccessTokenRequest,
    ) -> Result<String, StoreError>;

    async fn upload_attachment(
        &self,
        cred: &Credential,
        table_id: &str,
        record_id: &str,
        field_id: &str,
        file: Attachment,
    ) -> Result<Record, StoreError>;
}

/// Successful response: status in [200, 300) and its decoded body.
#[derive(Debug)]
pub struct Outcome {
    pub status: u16,
    pub data: Value,
    cookies: Vec<String>,
}

impl Outcome {
    fn expect(self, expected: u16) -> Result<Self, StoreError> {
        if self.status == expected {
            Ok(self)
        } else {
            tracing::error!("Expected status {} from Teable, got {}", expected, self.status);
            Err(StoreError::UnexpectedStatus {
                expected,
                actual: self.status,
            })
        }
    }

    fn string_field(&self, key: &str) -> Result<String, StoreError> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Decode(format!("missing '{key}' in {}", self.data)))
    }

    fn decode<T: for<'de> Deserialize<'de>>(self) -> Result<T, StoreError> {
        serde_json::from_value(self.data).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[derive(Clone)]
pub struct TeableClient {
    http: Client,
    base_url: String,
    service_token: String,
}

impl TeableClient {
    pub fn new(http: Client, base_url: &str, service_token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_token: service_token
                .trim()
                .trim_start_matches("Bearer ")
                .to_string(),
        }
    }

    fn request(&self, method: Method, path: &str, cred: &Credential) -> RequestBuilder {
        let token = match cred {
            Credential::Service => self.service_token.as_str(),
            Credential::Workspace(token) => token.as_str(),
        };
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
    }

    /// Issues one call and normalizes the result.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        cred: &Credential,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Outcome, StoreError> {
        let mut builder = self.request(method, path, cred).query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Outcome, StoreError> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!("Network error during Teable call: {}", e);
            StoreError::Network(e.to_string())
        })?;

        let status = response.status().as_u16();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| {
                tracing::warn!("Could not parse JSON response from Teable");
                json!({ "raw_response": text })
            })
        };

        if (200..300).contains(&status) {
            tracing::debug!("Teable responded {}", status);
            return Ok(Outcome {
                status,
                data,
                cookies,
            });
        }

        let mut message = format!("API call failed with status {status}");
        if let Some(detail) = data
            .get("message")
            .or_else(|| data.get("detail"))
            .and_then(Value::as_str)
        {
            message.push_str(": ");
            message.push_str(detail);
        }
        tracing::error!("{}", message);
        Err(StoreError::Remote {
            status,
            message,
            body: data,
        })
    }

    fn records_payload(records: Vec<Fields>) -> Value {
        let records: Vec<Value> = records
            .into_iter()
            .map(|fields| json!({ "fields": fields }))
            .collect();
        json!({ "fieldKeyType": "dbFieldName", "typecast": true, "records": records })
    }
}

fn field_key_type() -> [(&'static str, String); 1] {
    [("fieldKeyType", "dbFieldName".to_string())]
}

#[async_trait]
impl TableStore for TeableClient {
    async fn query_records(
        &self,
        cred: &Credential,
        table_id: &str,
        query: &RecordQuery,
    ) -> Result<Vec<Record>, StoreError> {
        let path = format!("/table/{table_id}/record");
        let list: RecordList = self
            .call(Method::GET, &path, cred, &query.to_params(), None)
            .await?
            .decode()?;
        Ok(list.records)
    }

    async fn get_record(
        &self,
        cred: &Credential,
        table_id: &str,
        record_id: &str,
    ) -> Result<Record, StoreError> {
        let path = format!("/table/{table_id}/record/{record_id}");
        self.call(Method::GET, &path, cred, &field_key_type(), None)
            .await?
            .decode()
    }

    async fn create_records(
        &self,
        cred: &Credential,
        table_id: &str,
        records: Vec<Fields>,
    ) -> Result<Vec<Record>, StoreError> {
        let path = format!("/table/{table_id}/record");
        let body = Self::records_payload(records);
        let list: RecordList = self
            .call(Method::POST, &path, cred, &[], Some(&body))
            .await?
            .expect(201)?
            .decode()?;
        Ok(list.records)
    }

    async fn update_record(
        &self,
        cred: &Credential,
        table_id: &str,
        record_id: &str,
        fields: Fields,
    ) -> Result<Record, StoreError> {
        let path = format!("/table/{table_id}/record/{record_id}");
        let body = json!({
            "fieldKeyType": "dbFieldName",
            "typecast": true,
            "record": { "fields": fields },
        });
        self.call(Method::PATCH, &path, cred, &[], Some(&body))
            .await?
            .expect(200)?
            .decode()
    }

    async fn delete_record(
        &self,
        cred: &Credential,
        table_id: &str,
        record_id: &str,
    ) -> Result<(), StoreError> {
        let path = format!("/table/{table_id}/record/{record_id}");
        self.call(Method::DELETE, &path, cred, &[], None).await?;
        Ok(())
    }

    async fn create_space(&self, cred: &Credential, name: &str) -> Result<String, StoreError> {
        let body = json!({ "name": name });
        self.call(Method::POST, "/space", cred, &[], Some(&body))
            .await?
            .expect(201)?
            .string_field("id")
    }

    async fn delete_space(&self, cred: &Credential, space_id: &str) -> Result<(), StoreError> {
        let path = format!("/space/{space_id}");
        self.call(Method::DELETE, &path, cred, &[], None).await?;
        Ok(())
    }

    async fn create_base(
        &self,
        cred: &Credential,
        space_id: &str,
        name: &str,
        icon: &str,
    ) -> Result<String, StoreError> {
        let body = json!({ "spaceId": space_id, "name": name, "icon": icon });
        self.call(Method::POST, "/base", cred, &[], Some(&body))
            .await?
            .expect(201)?
            .string_field("id")
    }

    async fn create_base_from_template(
        &self,
        cred: &Credential,
        space_id: &str,
        template_id: &str,
    ) -> Result<String, StoreError> {
        let body = json!({
            "spaceId": space_id,
            "templateId": template_id,
            "withRecords": false,
        });
        self.call(Method::POST, "/base/create-from-template", cred, &[], Some(&body))
            .await?
            .expect(201)?
            .string_field("id")
    }

    async fn list_tables(
        &self,
        cred: &Credential,
        base_id: &str,
    ) -> Result<Vec<TableInfo>, StoreError> {
        let path = format!("/base/{base_id}/table");
        self.call(Method::GET, &path, cred, &[], None)
            .await?
            .decode()
    }

    async fn create_table(
        &self,
        cred: &Credential,
        base_id: &str,
        table: &NewTable,
    ) -> Result<String, StoreError> {
        let path = format!("/base/{base_id}/table/");
        let body = serde_json::to_value(table).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.call(Method::POST, &path, cred, &[], Some(&body))
            .await?
            .expect(201)?
            .string_field("id")
    }

    async fn add_field(
        &self,
        cred: &Credential,
        table_id: &str,
        field: &NewField,
    ) -> Result<String, StoreError> {
        let path = format!("/table/{table_id}/field");
        let body = serde_json::to_value(field).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.call(Method::POST, &path, cred, &[], Some(&body))
            .await?
            .expect(201)?
            .string_field("id")
    }

    async fn list_fields(
        &self,
        cred: &Credential,
        table_id: &str,
    ) -> Result<Vec<FieldInfo>, StoreError> {
        let path = format!("/table/{table_id}/field");
        self.call(Method::GET, &path, cred, &[], None)
            .await?
            .decode()
    }

    async fn list_views(
        &self,
        cred: &Credential,
        table_id: &str,
    ) -> Result<Vec<ViewInfo>, StoreError> {
        let path = format!("/table/{table_id}/view");
        self.call(Method::GET, &path, cred, &[], None)
            .await?
            .decode()
    }

    async fn hide_columns(
        &self,
        cred: &Credential,
        table_id: &str,
        view_id: &str,
        field_ids: &[String],
    ) -> Result<(), StoreError> {
        let path = format!("/table/{table_id}/view/{view_id}/column-meta");
        let body: Vec<Value> = field_ids
            .iter()
            .map(|id| json!({ "fieldId": id, "columnMeta": { "hidden": true } }))
            .collect();
        self.call(Method::PUT, &path, cred, &[], Some(&Value::Array(body)))
            .await?;
        Ok(())
    }

    async fn admin_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<String>, StoreError> {
        let body = json!({ "email": email, "password": password });
        let outcome = self
            .call(Method::POST, "/auth/signin", &Credential::Service, &[], Some(&body))
            .await?;
        Ok(outcome.cookies.iter().find_map(|cookie| {
            cookie
                .split(';')
                .next()
                .filter(|pair| pair.trim_start().starts_with("auth_session="))
                .map(|pair| pair.trim().to_string())
        }))
    }

    async fn create_access_token(
        &self,
        session: Option<&str>,
        request: &AccessTokenRequest,
    ) -> Result<String, StoreError> {
        let mut builder = self
            .request(Method::POST, "/access-token", &Credential::Service)
            .json(request);
        if let Some(cookie) = session {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder).await?.expect(201)?.string_field("token")
    }

    async fn upload_attachment(
        &self,
        cred: &Credential,
        table_id: &str,
        record_id: &str,
        field_id: &str,
        file: Attachment,
    ) -> Result<Record, StoreError> {
        let path = format!("/table/{table_id}/record/{record_id}/{field_id}/uploadAttachment");
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let builder = self.request(Method::POST, &path, cred).multipart(form);
        self.send(builder).await?.decode()
    }
}
