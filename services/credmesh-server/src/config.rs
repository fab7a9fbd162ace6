use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub tenant_id: String,
    pub node_id: String,
    pub data_dir: String,
    /// Seconds to keep serving after a shutdown signal
    pub drain_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            port: env::var("CREDMESH_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8100),
            tenant_id: env::var("CREDMESH_TENANT").unwrap_or_else(|_| "default".to_string()),
            node_id: env::var("CREDMESH_NODE_ID").unwrap_or_else(|_| "node-001".to_string()),
            data_dir: env::var("CREDMESH_DATA_DIR").unwrap_or_else(|_| "data/mesh".to_string()),
            drain_secs: env::var("CREDMESH_DRAIN_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        }
    }
}
