// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order Voice Backend API",
        description = "Bán hàng, kho và hóa đơn điện tử trên không gian Teable của từng cửa hàng"
    ),
    paths(
        // --- Auth ---
        handlers::auth::signup,
        handlers::auth::signin,
        handlers::auth::change_password,

        // --- Catalogue ---
        handlers::customers::create_customer,
        handlers::customers::find_customers,
        handlers::products::create_product,
        handlers::products::find_products,
        handlers::products::create_product_with_units,
        handlers::unit_conversions::create_unit_conversion,
        handlers::unit_conversions::list_unit_conversions,
        handlers::suppliers::create_supplier,

        // --- Stock & orders ---
        handlers::stock::create_import_slip,
        handlers::stock::create_delivery_note,
        handlers::orders::create_order,
        handlers::invoices::generate_invoice,

        // --- Misc ---
        handlers::transcription::transcribe,
        handlers::plan_status::get_status_plan,
        handlers::user::get_me,
        handlers::user::update_profile,
    ),
    components(
        schemas(
            models::auth::SignupPayload,
            models::auth::SignupResponse,
            models::auth::WorkspaceSummary,
            models::auth::SigninPayload,
            models::auth::SigninResponse,
            models::auth::ChangePasswordPayload,
            models::auth::ChangePasswordResponse,

            models::customers::CreateCustomerPayload,
            models::customers::CustomerData,
            models::customers::CreateCustomerResponse,
            models::customers::FindCustomersResponse,

            models::products::CreateProductPayload,
            models::products::CreateProductWithUnitsPayload,
            models::products::ProductData,
            models::products::CreateProductResponse,
            models::products::FindProductsResponse,
            models::products::ProductWithUnitsData,
            models::products::CreateProductWithUnitsResponse,

            models::unit_conversions::UnitConversionPayload,
            models::unit_conversions::UnitConversionData,
            models::unit_conversions::CreateUnitConversionResponse,
            models::unit_conversions::ListUnitConversionsResponse,

            models::suppliers::CreateSupplierPayload,
            models::suppliers::CreateSupplierResponse,

            models::stock::ImportType,
            models::stock::DeliveryType,
            models::stock::ImportSlipLine,
            models::stock::CreateImportSlipPayload,
            models::stock::ImportSlipResponse,
            models::stock::DeliveryNoteLine,
            models::stock::CreateDeliveryNotePayload,
            models::stock::DeliveryNoteResponse,

            models::orders::OrderLine,
            models::orders::CreateOrderPayload,
            models::orders::CreateOrderResponse,

            models::invoices::GenerateInvoicePayload,
            models::invoices::InvoiceResponse,

            models::transcription::TranscriptionResponse,
            handlers::transcription::TranscribeUpload,

            models::plan::PlanStatusPayload,
            models::plan::LinkedTitle,
            models::plan::PlanStatusFields,
            models::plan::PlanStatusData,
            models::plan::PlanStatusResponse,

            models::profile::UserProfile,
            models::profile::ProfileResponse,
            models::profile::UpdateProfilePayload,
        )
    ),
    tags(
        (name = "Auth", description = "Đăng ký, đăng nhập và đổi mật khẩu"),
        (name = "Customers", description = "Khách hàng"),
        (name = "Products", description = "Sản phẩm"),
        (name = "Unit conversions", description = "Đơn vị tính"),
        (name = "Suppliers", description = "Nhà cung cấp"),
        (name = "Stock", description = "Phiếu nhập và phiếu xuất"),
        (name = "Orders", description = "Đơn hàng"),
        (name = "Invoices", description = "Hóa đơn điện tử Viettel"),
        (name = "Transcription", description = "Nhận dạng giọng nói thành đơn hàng"),
        (name = "Plan status", description = "Gói đăng ký và credit"),
        (name = "User", description = "Thông tin tài khoản")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_token",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
