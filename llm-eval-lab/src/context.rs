//! Execution context shared by the commands

use std::sync::Arc;

use anyhow::{Context as _, Result};
use llm_eval_core::{Dispatcher, JobStore};
use llm_eval_inference::CapabilityRegistry;
use llm_eval_storage::{connect, InMemoryJobStore, PgJobStore, PostgresConfig};
use llm_eval_workflow::{ConfiguredClientFactory, EvaluationService, JobRunner};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::output::OutputWriter;

pub struct AppContext {
    pub config: AppConfig,
    pub output: OutputWriter,
    store: Arc<dyn JobStore>,
    registry: Arc<CapabilityRegistry>,
    persistent: bool,
}

impl AppContext {
    /// Opens the configured store, running migrations when it is Postgres.
    pub async fn new(config: AppConfig, output: OutputWriter) -> Result<Self> {
        let (store, persistent): (Arc<dyn JobStore>, bool) = match &config.database_url {
            Some(url) => {
                let pool = connect(&PostgresConfig::new(url.clone()))
                    .await
                    .context("Failed to open the job database")?;
                info!("Using Postgres job store");
                (Arc::new(PgJobStore::new(pool)), true)
            }
            None => {
                debug!("No database configured, jobs live for this process only");
                (Arc::new(InMemoryJobStore::new()), false)
            }
        };

        Ok(Self {
            config,
            output,
            store,
            registry: Arc::new(CapabilityRegistry::new()),
            persistent,
        })
    }

    /// Whether jobs outlive this process.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn runner(&self) -> JobRunner {
        let factory = ConfiguredClientFactory::new(self.config.inference_config(), self.registry.clone());
        JobRunner::new(self.store.clone(), Arc::new(factory))
    }

    pub fn service(&self, dispatcher: Arc<dyn Dispatcher>) -> EvaluationService {
        EvaluationService::new(self.store.clone(), dispatcher)
    }
}
