// src/services/saga.rs

use crate::db::table_store::{Credential, TableStore};

/// Undo action for a completed remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    DeleteRecord {
        credential: Credential,
        table_id: String,
        record_id: String,
    },
    DeleteSpace {
        space_id: String,
    },
}

impl Compensation {
    pub fn delete_record(credential: &Credential, table_id: &str, record_id: &str) -> Self {
        Compensation::DeleteRecord {
            credential: credential.clone(),
            table_id: table_id.to_string(),
            record_id: record_id.to_string(),
        }
    }

    async fn run(&self, store: &dyn TableStore) -> Result<(), crate::db::StoreError> {
        match self {
            Compensation::DeleteRecord {
                credential,
                table_id,
                record_id,
            } => store.delete_record(credential, table_id, record_id).await,
            Compensation::DeleteSpace { space_id } => {
                store.delete_space(&Credential::Service, space_id).await
            }
        }
    }
}

/// Records compensations for a multi-step remote operation.
#[derive(Debug)]
pub struct Saga {
    name: &'static str,
    steps: Vec<Compensation>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every recorded compensation, newest first. Failures are logged and skipped.
    pub async fn compensate(self, store: &dyn TableStore) {
        if self.steps.is_empty() {
            return;
        }
        tracing::warn!(
            "Rolling back '{}': {} step(s) to undo",
            self.name,
            self.steps.len()
        );
        for step in self.steps.iter().rev() {
            match step.run(store).await {
                Ok(()) => tracing::info!("Rolled back {:?}", step),
                Err(e) => tracing::warn!("Could not roll back {:?}: {}", step, e),
            }
        }
    }

    pub fn complete(self) {
        tracing::debug!("'{}' completed with {} recorded step(s)", self.name, self.steps.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeStore;

    #[tokio::test]
    async fn compensations_run_newest_first() {
        let store = FakeStore::default();
        let mut saga = Saga::new("signup");
        saga.record(Compensation::delete_record(&Credential::Service, "tblUsers", "recTenant"));
        saga.record(Compensation::DeleteSpace {
            space_id: "spcNew".into(),
        });
        saga.record(Compensation::delete_record(&Credential::Service, "tblTokens", "recToken"));

        saga.compensate(&store).await;

        assert_eq!(
            store.deletions(),
            vec![
                "record:tblTokens/recToken".to_string(),
                "space:spcNew".to_string(),
                "record:tblUsers/recTenant".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn failing_compensation_does_not_stop_the_rest() {
        let store = FakeStore::default();
        store.fail_on("delete_space");
        let mut saga = Saga::new("signup");
        saga.record(Compensation::delete_record(&Credential::Service, "tblUsers", "recTenant"));
        saga.record(Compensation::DeleteSpace {
            space_id: "spcNew".into(),
        });

        saga.compensate(&store).await;

        assert_eq!(store.deletions(), vec!["record:tblUsers/recTenant".to_string()]);
    }
}
