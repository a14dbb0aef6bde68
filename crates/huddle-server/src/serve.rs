//! HTTP API for huddle.
//!
//! A thin axum layer over the core: it parses and validates request
//! parameters, delegates to `huddle-core` / `huddle-db`, and maps errors to
//! status codes. No pagination, rate limiting, or auth middleware on the
//! plan routes; authorization is an external concern.

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use huddle_core::auth;
use huddle_core::discover::{self, DiscoverError, DiscoverRequest, SortDir};
use huddle_db::models::PlanDraft;
use huddle_db::queries::{friends, plans as plan_db, sessions, users};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl From<DiscoverError> for AppError {
    fn from(err: DiscoverError) -> Self {
        match err {
            DiscoverError::MissingRequester => Self::bad_request(err.to_string()),
            DiscoverError::Db(inner) => Self::internal(inner),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Raw query parameters of the plan listing endpoint. Enum-valued fields
/// arrive as strings and are parsed strictly; empty strings count as absent,
/// matching the original's falsy-parameter handling.
#[derive(Debug, Default, Deserialize)]
pub struct ListPlansParams {
    pub user_id: Option<Uuid>,
    pub filter_by_people: Option<String>,
    pub category: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub timeline: Option<String>,
    pub months_within: Option<u32>,
    pub years_within: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

fn parse_opt<T: FromStr>(value: Option<String>) -> Result<Option<T>, AppError>
where
    T::Err: std::fmt::Display,
{
    match value.as_deref().filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::bad_request(e.to_string())),
    }
}

impl ListPlansParams {
    /// Parse the raw parameters into a typed discovery request.
    fn into_request(self) -> Result<DiscoverRequest, AppError> {
        Ok(DiscoverRequest {
            user_id: self.user_id,
            filter_by_people: parse_opt(self.filter_by_people)?,
            category: parse_opt(self.category)?,
            price_min: self.price_min,
            price_max: self.price_max,
            location: self.location.filter(|s| !s.is_empty()),
            duration: self.duration.filter(|s| !s.is_empty()),
            timeline: parse_opt(self.timeline)?,
            months_within: self.months_within,
            years_within: self.years_within,
            sort_by: parse_opt(self.sort_by)?,
            sort_order: SortDir::parse_lenient(self.sort_order.as_deref()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanBody {
    pub posted_by: Uuid,
    #[serde(flatten)]
    pub draft: PlanDraft,
}

#[derive(Debug, Deserialize)]
pub struct SignupBody {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendBody {
    pub user_id: Uuid,
    pub friend_id: Uuid,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: PgPool) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/plans/list", get(list_plans))
        .route("/api/plans", post(create_plan))
        .route("/api/plans/{id}", put(update_plan))
        .route("/api/plans/{id}", delete(delete_plan))
        .route("/api/users/signup", post(signup))
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout))
        .route("/api/users/add-friend", post(add_friend))
        .route("/api/users/remove-friend", delete(remove_friend))
        .route("/api/users/{id}/friends", get(list_friends))
        .layer(CorsLayer::permissive())
        .with_state(pool)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, bind: &str, port: u16) -> Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("huddle serving on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("huddle server shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers: plans
// ---------------------------------------------------------------------------

async fn index() -> &'static str {
    "Welcome to the Plans API!"
}

async fn list_plans(
    State(pool): State<PgPool>,
    Query(params): Query<ListPlansParams>,
) -> Result<axum::response::Response, AppError> {
    let request = params.into_request()?;
    let plans = discover::discover_plans(&pool, &request).await?;
    Ok(Json(plans).into_response())
}

async fn create_plan(
    State(pool): State<PgPool>,
    body: Result<Json<CreatePlanBody>, JsonRejection>,
) -> Result<axum::response::Response, AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;

    let plan = plan_db::insert_plan(&pool, body.posted_by, &body.draft)
        .await
        .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(plan)).into_response())
}

async fn update_plan(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    body: Result<Json<PlanDraft>, JsonRejection>,
) -> Result<axum::response::Response, AppError> {
    // Full-record update: a body missing any required field is rejected
    // here, before the store is touched.
    let Json(draft) = body.map_err(|e| AppError::bad_request(e.body_text()))?;

    plan_db::update_plan(&pool, id, &draft)
        .await
        .map_err(AppError::internal)?;

    // Zero rows affected is indistinguishable from success by design.
    Ok(Json(serde_json::json!({ "message": "Plan updated successfully!" })).into_response())
}

async fn delete_plan(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    plan_db::delete_plan(&pool, id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(serde_json::json!({ "message": "Plan deleted successfully." })).into_response())
}

// ---------------------------------------------------------------------------
// Handlers: users and friendships
// ---------------------------------------------------------------------------

async fn signup(
    State(pool): State<PgPool>,
    Json(body): Json<SignupBody>,
) -> Result<axum::response::Response, AppError> {
    let password_hash = auth::hash_password(&body.password)
        .map_err(|e| AppError::internal(anyhow::anyhow!(e)))?;

    let user = users::insert_user(&pool, &body.username, &body.email, &password_hash)
        .await
        .map_err(AppError::internal)?;

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

async fn login(
    State(pool): State<PgPool>,
    Json(body): Json<LoginBody>,
) -> Result<axum::response::Response, AppError> {
    // Same message for unknown email and wrong password.
    let invalid = || AppError::bad_request("Invalid email or password.");

    let user = users::get_user_by_email(&pool, &body.email)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(invalid)?;

    let matches = auth::verify_password(&body.password, &user.password_hash)
        .map_err(|e| AppError::internal(anyhow::anyhow!(e)))?;
    if !matches {
        return Err(invalid());
    }

    let token = auth::generate_session_token();
    sessions::create_session(&pool, user.id, &token)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(serde_json::json!({
        "message": "Logged in successfully!",
        "userId": user.id,
        "token": token,
    }))
    .into_response())
}

async fn logout(
    State(pool): State<PgPool>,
    headers: HeaderMap,
) -> Result<axum::response::Response, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::bad_request("missing Authorization: Bearer token"))?;

    sessions::delete_session(&pool, token)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(serde_json::json!({ "message": "Logged out successfully!" })).into_response())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn add_friend(
    State(pool): State<PgPool>,
    Json(body): Json<FriendBody>,
) -> Result<axum::response::Response, AppError> {
    friends::add_friend(&pool, body.user_id, body.friend_id)
        .await
        .map_err(AppError::internal)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Friend added successfully!" })),
    )
        .into_response())
}

async fn remove_friend(
    State(pool): State<PgPool>,
    Json(body): Json<FriendBody>,
) -> Result<axum::response::Response, AppError> {
    friends::remove_friend(&pool, body.user_id, body.friend_id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(serde_json::json!({ "message": "Friend removed successfully." })).into_response())
}

async fn list_friends(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let profiles = friends::list_friend_profiles(&pool, id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(profiles).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Days, Utc};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;

    use huddle_db::models::{PlanCategory, PlanDraft, User};
    use huddle_db::queries::{plans as plan_db, users};
    use huddle_test_utils::{create_test_db, drop_test_db};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    async fn send_get(pool: PgPool, uri: &str) -> axum::response::Response {
        let app = super::build_router(pool);
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn send_json(
        pool: PgPool,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> axum::response::Response {
        let app = super::build_router(pool);
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // -----------------------------------------------------------------------
    // Data helpers
    // -----------------------------------------------------------------------

    async fn make_user(pool: &PgPool, name: &str) -> User {
        users::insert_user(
            pool,
            name,
            &format!("{name}@example.com"),
            "$argon2id$placeholder",
        )
        .await
        .expect("insert_user should succeed")
    }

    fn draft(title: &str, price: f64) -> PlanDraft {
        let today = Utc::now().date_naive();
        PlanDraft {
            title: title.to_owned(),
            description: "a test plan".to_owned(),
            price,
            duration: "2 days".to_owned(),
            category: PlanCategory::Travel,
            location: "Lisbon".to_owned(),
            location_lat: 38.72,
            location_lon: -9.14,
            features: "".to_owned(),
            invited_friends: None,
            start_date: today.checked_add_days(Days::new(1)).unwrap(),
            end_date: today.checked_add_days(Days::new(3)).unwrap(),
            max_participants: 4,
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_index_welcome() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_get(pool.clone(), "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"Welcome to the Plans API!");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_list_plans_empty() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_get(pool.clone(), "/api/plans/list").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_people_filter_requires_user_id() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_get(pool.clone(), "/api/plans/list?filter_by_people=friends").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        let msg = json["error"].as_str().expect("should have error message");
        assert!(msg.contains("user_id"), "unexpected message: {msg}");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_unknown_enum_params_rejected() {
        let (pool, db_name) = create_test_db().await;

        for uri in [
            "/api/plans/list?category=sports",
            "/api/plans/list?timeline=past",
            "/api/plans/list?sort_by=title",
            "/api/plans/list?filter_by_people=everyone",
        ] {
            let resp = send_get(pool.clone(), uri).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
        }

        // A bogus sort_order is lenient: it means ascending, not an error.
        let resp = send_get(pool.clone(), "/api/plans/list?sort_order=sideways").await;
        assert_eq!(resp.status(), StatusCode::OK);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_list_plans_with_filters() {
        let (pool, db_name) = create_test_db().await;
        let author = make_user(&pool, "poster").await;

        plan_db::insert_plan(&pool, author.id, &draft("cheap trip", 40.0))
            .await
            .unwrap();
        plan_db::insert_plan(&pool, author.id, &draft("pricey trip", 400.0))
            .await
            .unwrap();

        let resp = send_get(
            pool.clone(),
            "/api/plans/list?category=travel&price_max=100",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let arr = json.as_array().expect("response should be an array");
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["title"], "cheap trip");

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_friend_scope_through_api() {
        let (pool, db_name) = create_test_db().await;
        let u = make_user(&pool, "requester").await;
        let f = make_user(&pool, "friend").await;
        let stranger = make_user(&pool, "stranger").await;

        let resp = send_json(
            pool.clone(),
            "POST",
            "/api/users/add-friend",
            serde_json::json!({ "userId": u.id, "friendId": f.id }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        plan_db::insert_plan(&pool, f.id, &draft("friend plan", 50.0))
            .await
            .unwrap();
        plan_db::insert_plan(&pool, stranger.id, &draft("stranger plan", 50.0))
            .await
            .unwrap();

        let uri = format!(
            "/api/plans/list?filter_by_people=friends&user_id={}&category=travel&price_max=100&timeline=upcoming",
            u.id
        );
        let resp = send_get(pool.clone(), &uri).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let arr = json.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["title"], "friend plan");

        // Tightening the price bound empties the result.
        let uri = format!(
            "/api/plans/list?filter_by_people=friends&user_id={}&price_max=10",
            u.id
        );
        let resp = send_get(pool.clone(), &uri).await;
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_plan_create_update_delete() {
        let (pool, db_name) = create_test_db().await;
        let author = make_user(&pool, "author").await;

        // Create.
        let mut body = serde_json::to_value(draft("original title", 25.0)).unwrap();
        body["posted_by"] = serde_json::json!(author.id);
        let resp = send_json(pool.clone(), "POST", "/api/plans", body).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["title"], "original title");
        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

        // Full-record update.
        let update = serde_json::to_value(draft("new title", 30.0)).unwrap();
        let resp = send_json(pool.clone(), "PUT", &format!("/api/plans/{id}"), update).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let stored = plan_db::get_plan(&pool, id).await.unwrap().unwrap();
        assert_eq!(stored.title, "new title");
        assert_eq!(stored.price, 30.0);

        // Partial update is rejected.
        let resp = send_json(
            pool.clone(),
            "PUT",
            &format!("/api/plans/{id}"),
            serde_json::json!({ "title": "just a title" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Delete, then delete again: both report success.
        for _ in 0..2 {
            let resp = send_json(
                pool.clone(),
                "DELETE",
                &format!("/api/plans/{id}"),
                serde_json::json!(null),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        assert!(plan_db::get_plan(&pool, id).await.unwrap().is_none());

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_signup_login_logout_flow() {
        let (pool, db_name) = create_test_db().await;

        let resp = send_json(
            pool.clone(),
            "POST",
            "/api/users/signup",
            serde_json::json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": "hunter2hunter2",
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let user = body_json(resp).await;
        assert_eq!(user["username"], "ada");
        assert!(
            user.get("password_hash").is_none(),
            "hash must not leak into responses"
        );

        // Wrong password.
        let resp = send_json(
            pool.clone(),
            "POST",
            "/api/users/login",
            serde_json::json!({ "email": "ada@example.com", "password": "wrong" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Unknown email gets the same message.
        let resp = send_json(
            pool.clone(),
            "POST",
            "/api/users/login",
            serde_json::json!({ "email": "nobody@example.com", "password": "wrong" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Invalid email or password.");

        // Correct login mints a session token.
        let resp = send_json(
            pool.clone(),
            "POST",
            "/api/users/login",
            serde_json::json!({ "email": "ada@example.com", "password": "hunter2hunter2" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let token = json["token"].as_str().expect("should return a token");
        assert_eq!(token.len(), 64);

        // Logout with the bearer token.
        let app = super::build_router(pool.clone());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/users/logout")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_friends_listing_is_directed() {
        let (pool, db_name) = create_test_db().await;
        let a = make_user(&pool, "alice").await;
        let b = make_user(&pool, "bob").await;

        let resp = send_json(
            pool.clone(),
            "POST",
            "/api/users/add-friend",
            serde_json::json!({ "userId": a.id, "friendId": b.id }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        // a lists b; b lists nobody (the listing follows stored direction).
        let resp = send_get(pool.clone(), &format!("/api/users/{}/friends", a.id)).await;
        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["username"], "bob");

        let resp = send_get(pool.clone(), &format!("/api/users/{}/friends", b.id)).await;
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]));

        // Remove, then the listing is empty. Removing again still succeeds.
        for _ in 0..2 {
            let resp = send_json(
                pool.clone(),
                "DELETE",
                "/api/users/remove-friend",
                serde_json::json!({ "userId": a.id, "friendId": b.id }),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = send_get(pool.clone(), &format!("/api/users/{}/friends", a.id)).await;
        let json = body_json(resp).await;
        assert_eq!(json, serde_json::json!([]));

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
