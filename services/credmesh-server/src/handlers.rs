use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Map, Value};
use tracing::info;

use credmesh_store::{LogName, LogStore};

use crate::state::AppState;

/// POST /mesh/{tenant}/{node}/push: receive replicated records.
pub async fn mesh_push(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, node_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut received = Map::new();
    for log in LogName::ALL {
        let Some(records) = body.get(log.key()).and_then(Value::as_array) else {
            continue;
        };
        if records.is_empty() {
            continue;
        }
        let written = state
            .store
            .append_all(&tenant_id, &node_id, log, records)
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        received.insert(log.key().to_string(), Value::from(written));
    }
    info!(%tenant_id, %node_id, logs = received.len(), "push received");
    Ok(Json(json!({"status": "ok", "received": received})))
}

/// GET /mesh/{tenant}/{node}/pull?since=<ts>: serve this node's logs.
pub async fn mesh_pull(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, node_id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let since = params.get("since").map(String::as_str).unwrap_or("");
    let mut records = Map::new();
    for log in LogName::ALL {
        let loaded = state
            .store
            .load_since(&tenant_id, &node_id, log, since)
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        records.insert(log.key().to_string(), Value::Array(loaded));
    }
    Ok(Json(json!({"status": "ok", "records": records})))
}

/// GET /mesh/{tenant}/{node}/status: last known node status.
pub async fn mesh_node_status(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, node_id)): Path<(String, String)>,
) -> Json<Value> {
    match state.store.read_status(&tenant_id, &node_id) {
        Ok(Some(status)) => Json(status),
        _ => Json(json!({"status": "unknown", "node_id": node_id})),
    }
}

/// GET /mesh/{tenant}/summary: tenant-wide rollup.
pub async fn mesh_summary(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Json<Value> {
    let node_dirs = match state.store.list_node_dirs(&tenant_id) {
        Ok(dirs) if !dirs.is_empty() => dirs,
        Ok(_) => {
            return Json(json!({
                "tenant_id": tenant_id,
                "status": "not_initialized",
                "nodes": [],
            }))
        }
        Err(_) => {
            return Json(json!({
                "tenant_id": tenant_id,
                "status": "invalid_tenant_id",
                "nodes": [],
            }))
        }
    };

    let mut nodes = Vec::new();
    let mut last_aggregate: Option<Value> = None;
    let mut last_seal: Option<Value> = None;
    let mut total_envelopes = 0usize;
    let mut total_validations = 0usize;

    for dir in &node_dirs {
        if let Some(status) = LogStore::read_status_in_dir(dir) {
            nodes.push(status);
        }

        if let Some(agg) = LogStore::read_log_in_dir(dir, LogName::Aggregates).pop() {
            if timestamp_of(&agg) > last_aggregate.as_ref().map(timestamp_of).unwrap_or_default() {
                last_aggregate = Some(agg);
            }
        }
        if let Some(seal) = LogStore::read_log_in_dir(dir, LogName::SealChainMirror).pop() {
            if timestamp_of(&seal) > last_seal.as_ref().map(timestamp_of).unwrap_or_default() {
                last_seal = Some(seal);
            }
        }

        total_envelopes += LogStore::read_log_in_dir(dir, LogName::Envelopes).len();
        total_validations += LogStore::read_log_in_dir(dir, LogName::Validations).len();
    }

    Json(json!({
        "tenant_id": tenant_id,
        "status": if nodes.is_empty() { "empty" } else { "active" },
        "node_count": nodes.len(),
        "nodes": nodes,
        "last_aggregate_timestamp": last_aggregate.as_ref().map(timestamp_of),
        "last_seal_hash": last_seal
            .as_ref()
            .and_then(|s| s.get("seal_hash").cloned()),
        "total_envelopes": total_envelopes,
        "total_validations": total_validations,
    }))
}

/// GET /mesh/{tenant}/topology: node/region layout with replication
/// recency.
pub async fn mesh_topology(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Json<Value> {
    let node_dirs = state.store.list_node_dirs(&tenant_id).unwrap_or_default();

    let mut nodes = Vec::new();
    let mut regions: Map<String, Value> = Map::new();

    for dir in &node_dirs {
        let Some(status) = LogStore::read_status_in_dir(dir) else {
            continue;
        };
        let replication = LogStore::read_log_in_dir(dir, LogName::Replication);
        let last_replication = replication.last().map(timestamp_of).unwrap_or_default();

        let region_id = status
            .get("region_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let offline = status.get("offline").and_then(Value::as_bool).unwrap_or(false);
        let entry = regions
            .entry(region_id.clone())
            .or_insert_with(|| json!({"node_count": 0, "offline_count": 0}));
        entry["node_count"] = Value::from(entry["node_count"].as_u64().unwrap_or(0) + 1);
        if offline {
            entry["offline_count"] = Value::from(entry["offline_count"].as_u64().unwrap_or(0) + 1);
        }

        nodes.push(json!({
            "node_id": status.get("node_id"),
            "region_id": region_id,
            "role": status.get("role"),
            "state": status.get("state"),
            "offline": offline,
            "replication_events": replication.len(),
            "last_replication": last_replication,
        }));
    }

    Json(json!({
        "tenant_id": tenant_id,
        "nodes": nodes,
        "regions": regions,
    }))
}

/// GET /health: liveness, uptime, and drain state.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let draining = state.draining.load(Ordering::SeqCst);
    Json(json!({
        "status": if draining { "draining" } else { "ok" },
        "node_id": state.config.node_id,
        "tenant_id": state.config.tenant_id,
        "uptime_s": state.started_at.elapsed().as_secs(),
    }))
}

fn timestamp_of(record: &Value) -> String {
    record
        .get("timestamp")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}
