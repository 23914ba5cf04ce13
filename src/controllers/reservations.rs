use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::booking::{self, TicketRequest};
use crate::catalog::ReservationView;
use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/reservations", get(list_reservations).post(create_reservation))
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<String>,
    page_size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateReservationRequest {
    #[serde(default)]
    tickets: Option<Vec<TicketRequest>>,
}

#[derive(Debug, Serialize)]
struct Paginated<T> {
    count: i64,
    next: Option<u32>,
    previous: Option<u32>,
    results: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Page {
    number: u32,
    size: u32,
}

impl Page {
    fn from_query(query: &PageQuery) -> Result<Self, ApiError> {
        let number = match query.page.as_deref() {
            None | Some("") => 1,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| ApiError::BadRequest("Invalid page.".to_string()))?,
        };
        // Неверный размер страницы молча заменяется значением по умолчанию
        let size = query
            .page_size
            .as_deref()
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .map_or(DEFAULT_PAGE_SIZE, |n| n.min(MAX_PAGE_SIZE));
        Ok(Page { number, size })
    }

    fn offset(&self) -> i64 {
        (i64::from(self.number) - 1) * i64::from(self.size)
    }

    fn wrap<T>(&self, count: i64, results: Vec<T>) -> Paginated<T> {
        let seen = i64::from(self.number) * i64::from(self.size);
        Paginated {
            count,
            next: (seen < count).then(|| self.number + 1),
            previous: (self.number > 1).then(|| self.number - 1),
            results,
        }
    }
}

// GET /api/reservations
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<ReservationView>>, ApiError> {
    let page = Page::from_query(&query)?;
    let (count, reservations) = state
        .catalog
        .list_reservations(user.user_id, i64::from(page.size), page.offset())
        .await?;
    Ok(Json(page.wrap(count, reservations)))
}

// POST /api/reservations
async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tickets = req.tickets.ok_or(ApiError::MissingField("tickets"))?;
    let reservation = booking::create_reservation(&state.db, user.user_id, &tickets).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, page_size: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            page_size: page_size.map(str::to_string),
        }
    }

    #[test]
    fn defaults_to_first_page_of_ten() {
        let page = Page::from_query(&PageQuery::default()).unwrap();
        assert_eq!(page, Page { number: 1, size: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn page_size_is_capped_and_bad_values_fall_back() {
        assert_eq!(Page::from_query(&query(None, Some("500"))).unwrap().size, 100);
        assert_eq!(Page::from_query(&query(None, Some("abc"))).unwrap().size, 10);
        assert_eq!(Page::from_query(&query(None, Some("0"))).unwrap().size, 10);
    }

    #[test]
    fn invalid_page_is_rejected() {
        assert!(Page::from_query(&query(Some("0"), None)).is_err());
        assert!(Page::from_query(&query(Some("last"), None)).is_err());
    }

    #[test]
    fn next_and_previous_follow_the_count() {
        let page = Page::from_query(&query(Some("2"), Some("10"))).unwrap();
        assert_eq!(page.offset(), 10);

        let middle = page.wrap(25, vec![(); 10]);
        assert_eq!(middle.next, Some(3));
        assert_eq!(middle.previous, Some(1));

        let last = Page { number: 3, size: 10 }.wrap(25, vec![(); 5]);
        assert_eq!(last.next, None);
        assert_eq!(last.previous, Some(2));
    }

    #[test]
    fn tickets_payload_deserializes() {
        let req: CreateReservationRequest = serde_json::from_str(
            r#"{"tickets": [{"performance": 1, "row": 2, "seat": 3}]}"#,
        )
        .unwrap();
        assert_eq!(req.tickets, Some(vec![TicketRequest { performance: 1, row: 2, seat: 3 }]));
    }

    #[test]
    fn oversized_row_still_deserializes() {
        let req: CreateReservationRequest = serde_json::from_str(
            r#"{"tickets": [{"performance": 1, "row": 4294967296, "seat": 1}]}"#,
        )
        .unwrap();
        assert_eq!(req.tickets.unwrap()[0].row, 4_294_967_296);
    }

    #[test]
    fn missing_tickets_key_is_none() {
        let req: CreateReservationRequest = serde_json::from_str("{}").unwrap();
        assert!(req.tickets.is_none());
    }

    // Полный путь через роутер: нужен PostgreSQL и Redis
    mod http {
        use axum::body::Body;
        use axum::http::{header, Request, StatusCode};
        use axum::Router;
        use base64::{engine::general_purpose, Engine as _};
        use serde_json::{json, Value};
        use sqlx::PgPool;
        use std::sync::Arc;
        use tower::ServiceExt;

        use crate::cache::CacheService;
        use crate::catalog::CatalogClient;
        use crate::config::{AppConfig, Config, DatabaseConfig, LogFormat, MediaConfig, RedisConfig};
        use crate::database::Database;
        use crate::redis_client::RedisClient;
        use crate::{controllers, AppState};

        const EMAIL: &str = "viewer@theatre.test";
        const PASSWORD: &str = "secret-pass";

        fn test_config(redis_url: String) -> Config {
            Config {
                app: AppConfig {
                    host: "127.0.0.1".into(),
                    port: 0,
                    environment: "test".into(),
                    rust_log: "theatre_booking=debug".into(),
                    log_format: LogFormat::Text,
                },
                database: DatabaseConfig { url: String::new(), pool_size: 5 },
                redis: RedisConfig { url: redis_url, cache_ttl_seconds: 60, auth_cache_ttl_seconds: 60 },
                media: MediaConfig { root: std::env::temp_dir().display().to_string(), max_upload_bytes: 1024 },
            }
        }

        // Пользователь, зал 2x3 и один спектакль в нём
        async fn app(pool: PgPool) -> (Router, i64) {
            let password_hash = bcrypt::hash(PASSWORD, 4).unwrap();
            sqlx::query("INSERT INTO users (email, password_hash) VALUES ($1, $2)")
                .bind(EMAIL)
                .bind(password_hash)
                .execute(&pool)
                .await
                .unwrap();
            let performance = sqlx::query_scalar::<_, i64>(
                "WITH play AS (
                     INSERT INTO plays (title, description) VALUES ('Hamlet', 'Tragedy') RETURNING id
                 ), hall AS (
                     INSERT INTO theatre_halls (name, row, seats_in_row) VALUES ('Small', 2, 3) RETURNING id
                 )
                 INSERT INTO performances (play_id, theatre_hall_id, show_time)
                 SELECT play.id, hall.id, NOW() FROM play, hall
                 RETURNING id",
            )
            .fetch_one(&pool)
            .await
            .unwrap();

            let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
            let config = test_config(redis_url);
            let redis = RedisClient::new(&config.redis.url).await.unwrap();
            let catalog = CatalogClient::new(pool.clone());
            let state = Arc::new(AppState {
                db: Database::from_pool(pool),
                cache: CacheService::new(redis.clone(), catalog.clone(), 60),
                redis,
                catalog,
                config: config.clone(),
            });

            let router = Router::new()
                .nest("/api", controllers::routes(&config))
                .with_state(state);
            (router, performance)
        }

        async fn send(app: &Router, method: &str, body: Option<Value>, auth: bool) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri("/api/reservations");
            if auth {
                let credentials = general_purpose::STANDARD.encode(format!("{EMAIL}:{PASSWORD}"));
                request = request.header(header::AUTHORIZATION, format!("Basic {credentials}"));
            }
            let request = match body {
                Some(body) => request
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => request.body(Body::empty()).unwrap(),
            };

            let response = app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, body)
        }

        fn seats(performance: i64, places: &[(i64, i64)]) -> Value {
            json!({
                "tickets": places
                    .iter()
                    .map(|(row, seat)| json!({ "performance": performance, "row": row, "seat": seat }))
                    .collect::<Vec<_>>()
            })
        }

        #[sqlx::test(migrations = "./src/migrations")]
        #[ignore = "requires DATABASE_URL and REDIS_URL"]
        async fn booking_route_statuses_and_bodies(pool: PgPool) {
            let (app, performance) = app(pool).await;

            let (status, body) = send(&app, "POST", Some(seats(performance, &[(1, 1), (1, 2)])), true).await;
            assert_eq!(status, StatusCode::CREATED);
            assert!(body["id"].is_i64());
            assert!(body["created_at"].is_string());
            assert!(body.get("user_id").is_none());
            assert_eq!(body["tickets"].as_array().map(Vec::len), Some(2));
            assert_eq!(body["tickets"][0]["performance"], performance);
            assert_eq!(body["tickets"][0]["row"], 1);
            assert_eq!(body["tickets"][1]["seat"], 2);

            let (status, body) = send(&app, "POST", Some(seats(performance, &[(1, 1)])), true).await;
            assert_eq!(status, StatusCode::CONFLICT);
            assert_eq!(body["performance"], performance);
            assert_eq!(body["row"], 1);
            assert_eq!(body["seat"], 1);

            let (status, body) = send(&app, "POST", Some(seats(performance, &[(1, 3), (3, 1)])), true).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body,
                json!({ "tickets": [{}, { "row": ["row must be in range [1, 2], got 3"] }] })
            );

            let (status, body) = send(&app, "POST", Some(seats(performance, &[(4_294_967_296, 1)])), true).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body,
                json!({ "tickets": [{ "row": ["row must be in range [1, 2], got 4294967296"] }] })
            );

            let (status, body) = send(&app, "POST", Some(json!({})), true).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "tickets": ["This field is required."] }));

            let (status, body) = send(&app, "POST", Some(json!({ "tickets": [] })), true).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "tickets": ["This list may not be empty."] }));

            let (status, body) = send(&app, "POST", Some(seats(performance + 1000, &[(1, 1)])), true).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["performance"], performance + 1000);

            let (status, _) = send(&app, "POST", Some(seats(performance, &[(2, 2)])), false).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);

            // Неудачные попытки ничего не оставили
            let (status, body) = send(&app, "GET", None, true).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["count"], 1);
            assert_eq!(body["results"][0]["tickets"].as_array().map(Vec::len), Some(2));
        }
    }
}
