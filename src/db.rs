pub mod table_store;
pub use table_store::{Credential, RecordQuery, StoreError, TableStore, TeableClient};
pub mod tenant_repo;
pub use tenant_repo::TenantRepository;
pub mod token_repo;
pub use token_repo::TokenRegistryRepository;
pub mod plan_repo;
pub use plan_repo::PlanStatusRepository;
