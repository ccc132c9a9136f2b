//! Registry of independent per-endpoint writers

use crate::config::{ConfigNode, endpoints_from_config};
use crate::sample::{DatasetResolver, Sample};
use crate::writer::EndpointWriter;
use std::sync::Arc;
use tracing::{info, warn};

/// Owns one [`EndpointWriter`] per valid configured endpoint and fans the
/// host agent's `init`/`write`/`shutdown` callbacks out to all of them.
///
/// Endpoints are fully independent: each has its own buffer, rules and
/// timer, and a failing endpoint never affects the others.
pub struct WriterRegistry {
    writers: Vec<Arc<EndpointWriter>>,
}

impl WriterRegistry {
    /// Build writers for every valid endpoint in the configuration tree.
    /// Invalid endpoints are skipped with a warning.
    pub fn from_config(root: &ConfigNode, resolver: Arc<dyn DatasetResolver>) -> Self {
        let mut writers = Vec::new();

        for endpoint in endpoints_from_config(root) {
            let name = endpoint.name.clone();
            match EndpointWriter::new(endpoint, Arc::clone(&resolver)) {
                Ok(writer) => {
                    info!(endpoint = %name, "Registering init, write and shutdown functions");
                    writers.push(Arc::new(writer));
                }
                Err(err) => {
                    warn!(endpoint = %name, error = %err, "Skipping endpoint");
                }
            }
        }

        Self { writers }
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EndpointWriter>> {
        self.writers.iter().find(|w| w.name() == name)
    }

    /// Arm the flush timer of every endpoint
    pub fn init_all(&self) {
        for writer in &self.writers {
            writer.init();
        }
    }

    /// Dispatch one sample to every endpoint
    pub fn write(&self, sample: &Sample) {
        for writer in &self.writers {
            writer.write(sample);
        }
    }

    /// Drain and stop every endpoint
    pub async fn shutdown_all(&self) {
        for writer in &self.writers {
            writer.shutdown().await;
        }
    }
}
