use actix_web::{delete, error::JsonPayloadError, get, post, web, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::AuthUser;
use crate::api::models::{ApiResponse, PaginationQuery};
use crate::config::AppConfig;
use crate::gateway::{
    requests::{AnalysisRequest, AskRequest, SuggestionRequest, TagRequest},
    Gateway, GatewayError,
};

type ApiResult = Result<HttpResponse, ApiError>;

/// Bodies of the entry endpoints may be omitted. Only an empty body falls
/// back to defaults; anything else must parse.
fn optional_body<T: DeserializeOwned + Default>(body: &web::Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::validation("body", e.to_string()))
}

fn api_error(config: &AppConfig) -> impl Fn(GatewayError) -> ApiError {
    let expose = config.server.is_development();
    move |e| ApiError::from_gateway(e, expose)
}

// --- Generation ---

#[post("/ask")]
pub async fn ask(
    gateway: web::Data<Gateway>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    req: web::Json<AskRequest>,
) -> ApiResult {
    let answer = gateway.ask(&user, req.into_inner()).await.map_err(api_error(&config))?;
    Ok(ApiResponse::ok(answer))
}

#[post("/entries/{id}/suggestions")]
pub async fn entry_suggestions(
    gateway: web::Data<Gateway>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Bytes,
) -> ApiResult {
    let req: SuggestionRequest = optional_body(&body)?;
    let suggestions = gateway
        .suggest(&user, id.into_inner(), req)
        .await
        .map_err(api_error(&config))?;
    Ok(ApiResponse::ok(suggestions))
}

#[post("/tags")]
pub async fn generate_tags(
    gateway: web::Data<Gateway>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    req: web::Json<TagRequest>,
) -> ApiResult {
    let tags = gateway
        .generate_tags(&user, req.into_inner())
        .await
        .map_err(api_error(&config))?;
    Ok(ApiResponse::ok(tags))
}

#[post("/entries/{id}/analyze")]
pub async fn analyze_entry(
    gateway: web::Data<Gateway>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Bytes,
) -> ApiResult {
    let req: AnalysisRequest = optional_body(&body)?;
    let analysis = gateway
        .analyze(&user, id.into_inner(), req)
        .await
        .map_err(api_error(&config))?;
    Ok(ApiResponse::ok(analysis))
}

// --- Conversations ---

#[get("/conversations")]
pub async fn list_conversations(
    gateway: web::Data<Gateway>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    query: web::Query<PaginationQuery>,
) -> ApiResult {
    let conversations = gateway
        .list_conversations(&user, query.clamped_limit(), query.offset)
        .map_err(api_error(&config))?;
    Ok(ApiResponse::ok(conversations))
}

#[get("/conversations/{id}")]
pub async fn get_conversation(
    gateway: web::Data<Gateway>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> ApiResult {
    let conversation = gateway
        .get_conversation(&user, id.into_inner())
        .map_err(api_error(&config))?;
    Ok(ApiResponse::ok(conversation))
}

#[get("/conversations/{id}/export")]
pub async fn export_conversation(
    gateway: web::Data<Gateway>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> ApiResult {
    let id = id.into_inner();
    let export = gateway
        .export_conversation(&user, id)
        .map_err(api_error(&config))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"conversation_{}.txt\"", id),
        ))
        .body(export))
}

#[delete("/conversations/{id}")]
pub async fn delete_conversation(
    gateway: web::Data<Gateway>,
    config: web::Data<AppConfig>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> ApiResult {
    gateway
        .delete_conversation(&user, id.into_inner())
        .map_err(api_error(&config))?;
    Ok(ApiResponse::<()>::message("Conversation deleted"))
}

// --- Status ---

/// Unauthenticated liveness probe.
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy"}))
}

#[get("/status")]
pub async fn status(gateway: web::Data<Gateway>, _user: AuthUser) -> ApiResult {
    Ok(ApiResponse::ok(gateway.status()))
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation("body", err.to_string()).into()
}

fn path_error(err: actix_web::error::PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation("id", err.to_string()).into()
}

fn query_error(err: actix_web::error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation("query", err.to_string()).into()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/ai")
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .service(ask)
            .service(entry_suggestions)
            .service(generate_tags)
            .service(analyze_entry)
            .service(list_conversations)
            .service(get_conversation)
            .service(export_conversation)
            .service(delete_conversation)
            .service(status),
    );
}
