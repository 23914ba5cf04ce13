//! Хранилище для транзакции бронирования.
//!
//! Ядро бронирования работает через два трейта: [`BookingStore`] открывает транзакцию
//! и отвечает на read-only запросы, [`BookingTx`] пишет резерв и билеты внутри неё.
//! Уникальность (performance, row, seat) обеспечивает само хранилище, а не код приложения.
//! Незакоммиченная транзакция при drop откатывается.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Reservation, TheatreHall, Ticket};

/// Ограничение уникальности места на спектакле.
pub const SEAT_UNIQUE_CONSTRAINT: &str = "tickets_performance_row_seat_key";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Entity not found")]
    NotFound,

    #[error("Unique constraint violation: {message}")]
    UniqueViolation {
        constraint: Option<String>,
        message: String,
    },

    #[error("Foreign key constraint violation: {message}")]
    ForeignKeyViolation {
        constraint: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::UniqueViolation {
                constraint: db_err.constraint().map(str::to_string),
                message: db_err.message().to_string(),
            },
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => StoreError::ForeignKeyViolation {
                constraint: db_err.constraint().map(str::to_string),
                message: db_err.message().to_string(),
            },
            _ => StoreError::Other(anyhow::Error::from(err)),
        }
    }
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    type Tx: BookingTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Зал, в котором идёт спектакль. `None`, если спектакля нет.
    async fn find_hall(&self, performance_id: i64) -> Result<Option<TheatreHall>, StoreError>;

    /// Количество сохранённых билетов на спектакль на момент запроса.
    async fn tickets_sold(&self, performance_id: i64) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait BookingTx: Send {
    async fn insert_reservation(&mut self, user_id: i64) -> Result<Reservation, StoreError>;

    async fn find_hall(&mut self, performance_id: i64) -> Result<Option<TheatreHall>, StoreError>;

    /// Вставляет билет. Занятое место даёт [`StoreError::UniqueViolation`].
    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        performance_id: i64,
        row: i32,
        seat: i32,
    ) -> Result<Ticket, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
