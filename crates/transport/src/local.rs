//! In-process transport over a shared log store.

use std::sync::Arc;

use serde_json::Value;

use credmesh_store::{LogName, LogStore};

use crate::{Transport, TransportError, TransportHealth};

/// Transport backed by direct reads and appends on a shared
/// [`LogStore`].
///
/// The default choice for single-process topologies and tests; every
/// node in the topology shares one store handle, so a push is simply an
/// append into the target's log.
pub struct LocalTransport {
    store: Arc<LogStore>,
}

impl LocalTransport {
    pub fn new(store: Arc<LogStore>) -> Self {
        Self { store }
    }

    /// The underlying shared store.
    pub fn store(&self) -> &Arc<LogStore> {
        &self.store
    }
}

impl Transport for LocalTransport {
    fn push(
        &self,
        tenant_id: &str,
        target_node_id: &str,
        log: LogName,
        records: &[Value],
    ) -> Result<usize, TransportError> {
        Ok(self.store.append_all(tenant_id, target_node_id, log, records)?)
    }

    fn pull(
        &self,
        tenant_id: &str,
        source_node_id: &str,
        log: LogName,
        since: &str,
    ) -> Result<Vec<Value>, TransportError> {
        Ok(self.store.load_since(tenant_id, source_node_id, log, since)?)
    }

    fn get_status(&self, tenant_id: &str, node_id: &str) -> Option<Value> {
        self.store.read_status(tenant_id, node_id).ok().flatten()
    }

    fn set_status(
        &self,
        tenant_id: &str,
        node_id: &str,
        status: &Value,
    ) -> Result<(), TransportError> {
        Ok(self.store.write_status(tenant_id, node_id, status)?)
    }

    fn health(&self) -> TransportHealth {
        TransportHealth {
            status: "ok".to_string(),
            transport: "local".to_string(),
            http: None,
        }
    }
}
