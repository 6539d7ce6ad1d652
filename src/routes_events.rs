// --------------------------------------------------
// Handles API endpoints for event CRUD.
//
// Responsibilities:
// - List events, optionally limited to a date window
// - Create / read / update / delete single events
// Validation runs before any store call.
// -------------------------------------------------

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Event, EventPayload, RangeQuery};
use crate::validation;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// An id that does not parse cannot name a stored event
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

fn body(payload: Result<Json<EventPayload>, JsonRejection>) -> Result<EventPayload, ApiError> {
    payload
        .map(|Json(p)| p)
        .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))
}

// -----------------------------
// GET /api
// -----------------------------
async fn api_root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Calendar API",
    })
}

// -----------------------------
// GET /api/events?startDate=&endDate=
// All events, or those overlapping the window, by start time
// -----------------------------
async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let Query(q) = query.map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))?;
    let range = validation::validate_date_range_query(&q)?;
    let events = state.store.list(range).await?;
    Ok(Json(events))
}

// -----------------------------
// GET /api/events/:id
// -----------------------------
async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.get_by_id(id).await?))
}

// -----------------------------
// POST /api/events
// -----------------------------
async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<EventPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = validation::validate_event_payload(&body(payload)?)?;
    let event = state.store.create(draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

// -----------------------------
// PUT /api/events/:id
// Partial or full replace of mutable fields
// -----------------------------
async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EventPayload>, JsonRejection>,
) -> Result<Json<Event>, ApiError> {
    let id = parse_id(&id)?;
    let patch = validation::validate_event_patch(&body(payload)?)?;
    Ok(Json(state.store.update(id, patch).await?))
}

// -----------------------------
// DELETE /api/events/:id
// Removes an event permanently
// -----------------------------
async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    state.store.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Event deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::store::MemoryStore;

    fn app() -> Router {
        let state = AppState {
            store: Arc::new(MemoryStore::new()),
        };
        Router::new().nest("/api", router()).with_state(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &Router, title: &str, start: &str, end: &str) -> Value {
        let (status, v) = send(
            app,
            Method::POST,
            "/api/events",
            Some(json!({ "title": title, "startTime": start, "endTime": end })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        v
    }

    fn titles(v: &Value) -> Vec<&str> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|e| e["title"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn create_then_fetch_returns_submitted_fields() {
        let app = app();
        let submitted = json!({
            "title": "Design review",
            "type": "appointment",
            "description": "Q2 roadmap",
            "startTime": "2025-03-10T14:00:00Z",
            "endTime": "2025-03-10T15:00:00Z",
            "color": "#33AA99",
            "location": "Room 2",
            "isAllDay": false,
            "reminder": 15,
            "availability": "tentative",
            "alternateSlots": [
                { "startTime": "2025-03-11T14:00:00Z", "endTime": "2025-03-11T15:00:00Z" }
            ]
        });
        let (status, created) = send(&app, Method::POST, "/api/events", Some(submitted.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = send(&app, Method::GET, &format!("/api/events/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        for (key, value) in submitted.as_object().unwrap() {
            assert_eq!(&fetched[key], value, "field {key}");
        }
        assert!(fetched["createdAt"].is_string());
        assert!(fetched["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn range_listing_includes_boundary_and_spanning_events() {
        let app = app();
        create(&app, "A", "2025-03-10T09:00:00Z", "2025-03-10T10:00:00Z").await;
        create(&app, "B", "2025-03-10T11:30:00Z", "2025-03-10T12:30:00Z").await;
        create(&app, "C", "2025-03-10T08:00:00Z", "2025-03-10T13:00:00Z").await;
        create(&app, "D", "2025-03-10T06:00:00Z", "2025-03-10T07:00:00Z").await;

        let (status, v) = send(
            &app,
            Method::GET,
            "/api/events?startDate=2025-03-10T10:00:00Z&endDate=2025-03-10T12:00:00Z",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&v), vec!["C", "A", "B"]);

        let (_, all) = send(&app, Method::GET, "/api/events", None).await;
        assert_eq!(titles(&all), vec!["D", "C", "A", "B"]);
    }

    #[tokio::test]
    async fn range_query_errors_are_400() {
        let app = app();
        let (status, v) = send(&app, Method::GET, "/api/events?startDate=2025-03-10", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["code"], "incomplete_range");

        let (status, v) = send(
            &app,
            Method::GET,
            "/api/events?startDate=2025-03-12&endDate=2025-03-10",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["code"], "invalid_range");

        let (status, v) = send(
            &app,
            Method::GET,
            "/api/events?startDate=2025-03-10&startDate=2025-03-11&endDate=2025-03-12",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["code"], "malformed_body");
    }

    #[tokio::test]
    async fn invalid_payload_is_400_and_nothing_is_stored() {
        let app = app();
        let (status, v) = send(&app, Method::POST, "/api/events", Some(json!({ "color": "red" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["code"], "missing_field");
        assert_eq!(v["details"]["title"], "title is required");
        assert_eq!(v["details"]["startTime"], "startTime is required");
        assert_eq!(v["details"]["endTime"], "endTime is required");

        let (status, v) = send(
            &app,
            Method::POST,
            "/api/events",
            Some(json!({
                "title": "Same",
                "startTime": "2025-03-10T09:00:00Z",
                "endTime": "2025-03-10T09:00:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["code"], "invalid_range");

        let (_, all) = send(&app, Method::GET, "/api/events", None).await;
        assert!(all.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let app = app();
        let (status, v) = send(&app, Method::POST, "/api/events", Some(json!({ "title": 7 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["code"], "malformed_body");
    }

    #[tokio::test]
    async fn partial_update_changes_only_status() {
        let app = app();
        let (_, before) = send(
            &app,
            Method::POST,
            "/api/events",
            Some(json!({
                "title": "Taxes",
                "type": "task",
                "startTime": "2025-03-10T09:00:00Z",
                "endTime": "2025-03-10T10:00:00Z",
                "deadline": "2025-04-15T00:00:00Z"
            })),
        )
        .await;
        assert_eq!(before["status"], "pending");

        let id = before["id"].as_str().unwrap();
        let (status, after) = send(
            &app,
            Method::PUT,
            &format!("/api/events/{id}"),
            Some(json!({ "status": "completed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (b, a) = (before.as_object().unwrap(), after.as_object().unwrap());
        assert_eq!(b.len(), a.len());
        for (key, value) in b {
            match key.as_str() {
                "status" => assert_eq!(a[key], "completed"),
                "updatedAt" => {}
                _ => assert_eq!(&a[key], value, "field {key}"),
            }
        }
    }

    #[tokio::test]
    async fn update_rejects_bad_fields_and_unknown_ids() {
        let app = app();
        let e = create(&app, "Gym", "2025-03-10T18:00:00Z", "2025-03-10T19:00:00Z").await;
        let id = e["id"].as_str().unwrap();

        let (status, v) = send(
            &app,
            Method::PUT,
            &format!("/api/events/{id}"),
            Some(json!({ "endTime": "2025-03-10T17:00:00Z" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["code"], "invalid_range");

        let missing = Uuid::new_v4();
        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/events/{missing}"),
            Some(json!({ "title": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_is_not_repeatable() {
        let app = app();
        let e = create(&app, "Once", "2025-03-10T09:00:00Z", "2025-03-10T10:00:00Z").await;
        let uri = format!("/api/events/{}", e["id"].as_str().unwrap());

        let (status, v) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["message"], "Event deleted successfully");

        let (status, v) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(v["error"], "Event not found");

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unparseable_id_is_not_found() {
        let app = app();
        let (status, _) = send(&app, Method::GET, "/api/events/64b7f0c2e1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_root_answers() {
        let (status, v) = send(&app(), Method::GET, "/api", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["message"], "Calendar API");
    }
}
