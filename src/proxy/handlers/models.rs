// 模型列表 / 健康检查
use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::proxy::common::model_mapping::list_client_models;
use crate::proxy::provider::Provider;
use crate::proxy::server::AppState;

/// GET /v1/models, /{provider}/v1/models
pub async fn handle_list_models(State(state): State<AppState>, uri: Uri) -> impl IntoResponse {
    let provider = Provider::from_path(uri.path());
    let settings = provider.settings(&state.config);
    Json(models_document(provider, list_client_models(&settings)))
}

fn models_document(provider: Provider, ids: Vec<String>) -> Value {
    let data: Vec<Value> = ids
        .into_iter()
        .map(|id| {
            json!({
                "id": id,
                "object": "model",
                "owned_by": provider.id()
            })
        })
        .collect();

    json!({ "object": "list", "data": data })
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "reasoning-gateway" }))
}
