use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Reservation {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Ticket {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    #[serde(rename = "performance")]
    pub performance_id: i64,
    #[serde(skip_serializing)]
    pub reservation_id: i64,
}
