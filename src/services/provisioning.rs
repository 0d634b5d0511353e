pub mod catalog;
pub mod graph;
pub mod provisioner;
pub mod strategy;

pub use catalog::SchemaCatalog;
pub use provisioner::{AdminCredentials, ProvisionedWorkspace, WorkspaceProvisioner, token_prefix};
pub use strategy::{CatalogStrategy, ProvisionedSchema, ProvisioningStrategy, TemplateStrategy};
