//! HTTP API server for the mobile client
//!
//! Serves the REST surface over tiny_http:
//! - POST /api/users - register a user
//! - GET  /api/users/{id}/profile - profile with stats and level
//! - POST /api/users/{id}/logs - record an incident
//! - GET  /api/users/{id}/logs - recent incidents
//! - GET  /api/users/{id}/achievements - catalog with unlock state
//! - POST /api/users/{id}/achievements/unlock - manual badge unlock
//! - GET  /api/users/{id}/level - level standing from unlocked XP
//! - POST /api/users/{id}/streak/increment - daily check-in
//! - GET  /api/users/{id}/analytics/weekly - trailing 7-day rollup
//! - GET  /api/users/{id}/insights - coach pattern insight
//! - POST /api/coach/calories - calorie estimate
//! - POST /api/coach/chat - free-form message to the coach
//! - GET/POST /api/posts plus /api/posts/{id}/like - community feed

pub mod handlers;

use std::io::Read;

use anyhow::{Context, Result};
use tiny_http::{Response, Server};
use tracing::{error, info};

use crate::coach::CoachClient;
use crate::config::Config;
use crate::gamification::GamificationEngine;
use crate::store::LogQuery;

use handlers::{ApiError, ApiResult};

const AUTH_HEADER: &str = "X-Api-Token";
const MAX_BODY_BYTES: usize = 1024 * 1024; // 1 MiB
const DEFAULT_LIST_LIMIT: u32 = 50;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ApiState {
    pub queries: LogQuery,
    pub engine: GamificationEngine,
    pub coach: CoachClient,
}

/// Run the API server. Blocks until the process exits.
pub fn run(config: &Config, state: ApiState) -> Result<()> {
    let bind_addr = config.server.bind.clone();
    let auth_token = config.server.api_token.trim().to_string();
    let server = Server::http(&bind_addr)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Failed to bind API server on {bind_addr}"))?;

    info!(
        "API server listening on http://{} (auth: {})",
        bind_addr,
        if auth_token.is_empty() { "disabled" } else { "enabled" }
    );

    for mut request in server.incoming_requests() {
        let method = request.method().to_string();
        let url = request.url().to_string();
        let path = url.split('?').next().unwrap_or(url.as_str());

        if !is_authorized(&request, &auth_token) {
            respond_json(request, 401, serde_json::json!({ "error": "unauthorized" }));
            continue;
        }

        let body = if method == "POST" {
            match read_request_body(&mut request) {
                Ok(body) => body,
                Err(response) => {
                    let _ = request.respond(response);
                    continue;
                }
            }
        } else {
            String::new()
        };

        let result = route(&state, &method, &url, &body);
        match result {
            Ok((status, value)) => respond_json(request, status, value),
            Err(err) => {
                if err.status() >= 500 {
                    error!("{method} {path} failed: {err:#}");
                }
                respond_json(
                    request,
                    err.status(),
                    serde_json::json!({ "error": err.to_string() }),
                );
            }
        }
    }

    Ok(())
}

fn route(state: &ApiState, method: &str, url: &str, body: &str) -> ApiResult {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    };

    match (method, path) {
        ("GET", "/api/health") => Ok((
            200,
            serde_json::json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
            }),
        )),

        ("POST", "/api/users") => handlers::create_user(state, body),

        ("GET", p) if matches_user_route(p, "profile") => {
            handlers::get_profile(state, parse_user_id(p)?)
        }
        ("POST", p) if matches_user_route(p, "logs") => {
            handlers::create_log(state, parse_user_id(p)?, body)
        }
        ("GET", p) if matches_user_route(p, "logs") => {
            let (limit, offset) = parse_page(query);
            handlers::list_logs(state, parse_user_id(p)?, limit, offset)
        }
        ("GET", p) if matches_user_route(p, "achievements") => {
            handlers::list_achievements(state, parse_user_id(p)?)
        }
        ("GET", p) if matches_user_route(p, "level") => {
            handlers::get_level(state, parse_user_id(p)?)
        }
        ("POST", p) if matches_user_route(p, "achievements/unlock") => {
            handlers::unlock_achievement(state, parse_user_id(p)?, body)
        }
        ("POST", p) if matches_user_route(p, "streak/increment") => {
            handlers::increment_streak(state, parse_user_id(p)?)
        }
        ("GET", p) if matches_user_route(p, "analytics/weekly") => {
            handlers::weekly_analytics(state, parse_user_id(p)?)
        }
        ("GET", p) if matches_user_route(p, "insights") => {
            handlers::daily_insight(state, parse_user_id(p)?)
        }

        ("POST", "/api/coach/calories") => handlers::estimate_calories(state, body),
        ("POST", "/api/coach/chat") => handlers::coach_chat(state, body),

        ("POST", "/api/posts") => handlers::create_post(state, body),
        ("GET", "/api/posts") => handlers::list_posts(state, parse_page(query).0),
        ("POST", p) if p.starts_with("/api/posts/") && p.ends_with("/like") => {
            handlers::like_post(state, parse_post_id(p)?, body)
        }

        _ => Err(ApiError::NotFound),
    }
}

/// Pagination from a query string. Unparseable or absent values fall back
/// to the defaults rather than erroring.
fn parse_page(query: &str) -> (u32, u32) {
    let mut limit = DEFAULT_LIST_LIMIT;
    let mut offset = 0;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("limit", v)) => limit = v.parse().unwrap_or(DEFAULT_LIST_LIMIT),
            Some(("offset", v)) => offset = v.parse().unwrap_or(0),
            _ => {}
        }
    }
    (limit, offset)
}

/// True for paths of the form /api/users/{id}/{suffix}
fn matches_user_route(path: &str, suffix: &str) -> bool {
    let Some(rest) = path.strip_prefix("/api/users/") else {
        return false;
    };
    let Some(id_part) = rest.strip_suffix(&format!("/{suffix}")) else {
        return false;
    };
    !id_part.is_empty() && !id_part.contains('/')
}

fn parse_user_id(path: &str) -> Result<i64, ApiError> {
    let rest = path
        .strip_prefix("/api/users/")
        .ok_or_else(|| ApiError::BadRequest("bad path".to_string()))?;
    let id_str = rest.split('/').next().unwrap_or("");
    id_str
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid user id: {id_str}")))
}

fn parse_post_id(path: &str) -> Result<i64, ApiError> {
    let rest = path
        .strip_prefix("/api/posts/")
        .ok_or_else(|| ApiError::BadRequest("bad path".to_string()))?;
    let id_str = rest.split('/').next().unwrap_or("");
    id_str
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid post id: {id_str}")))
}

fn is_authorized(request: &tiny_http::Request, expected: &str) -> bool {
    if expected.is_empty() {
        return true;
    }

    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(AUTH_HEADER))
        .map(|h| h.value.as_str() == expected)
        .unwrap_or(false)
}

fn json_content_type() -> tiny_http::Header {
    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap()
}

fn read_request_body(
    request: &mut tiny_http::Request,
) -> Result<String, Response<std::io::Cursor<Vec<u8>>>> {
    let mut body = String::new();
    let mut reader = request.as_reader().take((MAX_BODY_BYTES + 1) as u64);
    if let Err(e) = reader.read_to_string(&mut body) {
        error!("Failed to read body: {e}");
        let response = Response::from_string("{\"error\":\"bad_request\"}")
            .with_status_code(400)
            .with_header(json_content_type());
        return Err(response);
    }

    if body.len() > MAX_BODY_BYTES {
        let response = Response::from_string("{\"error\":\"payload_too_large\"}")
            .with_status_code(413)
            .with_header(json_content_type());
        return Err(response);
    }

    Ok(body)
}

fn respond_json(request: tiny_http::Request, status_code: u16, value: serde_json::Value) {
    let body =
        serde_json::to_string(&value).unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response = Response::from_string(body)
        .with_status_code(status_code)
        .with_header(json_content_type());
    let _ = request.respond(response);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoachConfig;
    use crate::store::LogDb;

    fn setup() -> ApiState {
        let db = LogDb::open_in_memory().unwrap();
        ApiState {
            queries: LogQuery::new(db.clone()),
            engine: GamificationEngine::new(db),
            coach: CoachClient::new(&CoachConfig::default()),
        }
    }

    #[test]
    fn test_route_matching() {
        assert!(matches_user_route("/api/users/3/profile", "profile"));
        assert!(matches_user_route("/api/users/3/streak/increment", "streak/increment"));
        assert!(!matches_user_route("/api/users//profile", "profile"));
        assert!(!matches_user_route("/api/users/3/extra/profile", "profile"));
        assert!(!matches_user_route("/api/posts/3/profile", "profile"));
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_user_id("/api/users/42/logs").unwrap(), 42);
        assert!(parse_user_id("/api/users/abc/logs").is_err());
        assert_eq!(parse_post_id("/api/posts/7/like").unwrap(), 7);
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(""), (DEFAULT_LIST_LIMIT, 0));
        assert_eq!(parse_page("limit=10&offset=20"), (10, 20));
        assert_eq!(parse_page("offset=5"), (DEFAULT_LIST_LIMIT, 5));
        assert_eq!(parse_page("limit=junk"), (DEFAULT_LIST_LIMIT, 0));
    }

    #[test]
    fn test_health_route() {
        let state = setup();
        let (status, body) = route(&state, "GET", "/api/health", "").unwrap();
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_unknown_route_is_404() {
        let state = setup();
        let err = route(&state, "GET", "/api/unknown", "").unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_full_route_flow() {
        let state = setup();
        let (_, user) = route(
            &state,
            "POST",
            "/api/users",
            r#"{"email":"a@example.com","username":"alice"}"#,
        )
        .unwrap();
        let id = user["id"].as_i64().unwrap();

        let (status, body) = route(
            &state,
            "POST",
            &format!("/api/users/{id}/logs"),
            r#"{"guilt_rating":5,"regret_rating":5,"estimated_cost":4.0,"estimated_calories":300}"#,
        )
        .unwrap();
        assert_eq!(status, 201);
        assert_eq!(body["streak_count"], 0);

        let (status, body) = route(&state, "GET", &format!("/api/users/{id}/logs"), "").unwrap();
        assert_eq!(status, 200);
        assert_eq!(body["logs"].as_array().unwrap().len(), 1);
    }
}
