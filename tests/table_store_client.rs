// tests/table_store_client.rs

use order_voice_backend::{
    db::{Credential, RecordQuery, StoreError, TableStore, TeableClient},
    models::teable::{AccessTokenRequest, Attachment, fields},
};
use reqwest::Client;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path, query_param},
};

fn client(server: &MockServer) -> TeableClient {
    TeableClient::new(Client::new(), &format!("{}/api", server.uri()), "Bearer svc_token")
}

#[tokio::test]
async fn queries_send_filter_and_service_token() {
    let server = MockServer::start().await;
    let filter = json!({
        "conjunction": "and",
        "filterSet": [{ "fieldId": "username", "operator": "is", "value": "0316316874" }]
    })
    .to_string();
    Mock::given(method("GET"))
        .and(path("/api/table/tblUsers/record"))
        .and(header("authorization", "Bearer svc_token"))
        .and(header("accept", "application/json"))
        .and(query_param("fieldKeyType", "dbFieldName"))
        .and(query_param("filter", filter.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{ "id": "recTenant", "fields": { "username": "0316316874" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server)
        .query_records(
            &Credential::Service,
            "tblUsers",
            &RecordQuery::new().is("username", "0316316874"),
        )
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text("username"), Some("0316316874"));
}

#[tokio::test]
async fn record_writes_use_db_field_names_and_workspace_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/table/tblCustomer/record"))
        .and(header("authorization", "Bearer teable_ws"))
        .and(body_partial_json(json!({
            "fieldKeyType": "dbFieldName",
            "typecast": true,
            "records": [{ "fields": { "fullname": "Nguyễn Văn An" } }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "records": [{ "id": "recCustomer", "fields": { "fullname": "Nguyễn Văn An" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)
        .create_record(
            &Credential::Workspace("teable_ws".into()),
            "tblCustomer",
            fields(json!({ "fullname": "Nguyễn Văn An" })),
        )
        .await
        .unwrap();
    assert_eq!(created.id, "recCustomer");
}

#[tokio::test]
async fn creation_must_answer_201() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/space"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "spcX" })))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_space(&Credential::Service, "Shop_workspace")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnexpectedStatus { expected: 201, actual: 200 }
    ));
}

#[tokio::test]
async fn remote_errors_keep_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/table/tblPlans/record/recMissing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Record not found" })),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .get_record(&Credential::Service, "tblPlans", "recMissing")
        .await
        .unwrap_err();
    assert_eq!(err.remote_status(), Some(404));
    assert_eq!(err.to_string(), "API call failed with status 404: Record not found");
    assert_eq!(err.client_status().as_u16(), 404);
}

#[tokio::test]
async fn server_errors_surface_as_500() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client(&server)
        .list_tables(&Credential::Service, "bseX")
        .await
        .unwrap_err();
    assert_eq!(err.remote_status(), Some(503));
    assert_eq!(err.client_status().as_u16(), 500);
}

#[tokio::test]
async fn access_token_request_forwards_admin_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "auth_session=abc123; Path=/; HttpOnly"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/access-token"))
        .and(header("cookie", "auth_session=abc123"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "token": "teable_new" })))
        .expect(1)
        .mount(&server)
        .await;

    let teable = client(&server);
    let session = teable.admin_session("admin@example.com", "secret").await.unwrap();
    assert_eq!(session.as_deref(), Some("auth_session=abc123"));

    let request = AccessTokenRequest {
        name: "token_Shop_workspace".into(),
        description: "Access token for space Shop_workspace".into(),
        scopes: vec!["record|read"],
        expired_time: "2027-01-01".into(),
        space_ids: vec!["spcShop".into()],
        base_ids: None,
        has_full_access: true,
    };
    let token = teable
        .create_access_token(session.as_deref(), &request)
        .await
        .unwrap();
    assert_eq!(token, "teable_new");
}

#[tokio::test]
async fn attachments_are_uploaded_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/table/tblOrder/record/recOrder/fldInvoiceFile/uploadAttachment"))
        .and(header("authorization", "Bearer teable_ws"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "recOrder",
            "fields": { "invoice_file": [{ "name": "K25TAA0000123.pdf" }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server)
        .upload_attachment(
            &Credential::Workspace("teable_ws".into()),
            "tblOrder",
            "recOrder",
            "fldInvoiceFile",
            Attachment {
                file_name: "K25TAA0000123.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: b"%PDF-1.4".to_vec(),
            },
        )
        .await
        .unwrap();
    assert_eq!(record.id, "recOrder");

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));
}
