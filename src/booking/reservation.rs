//! Атомарное создание резерва с билетами.
//!
//! Весь вызов идёт в одной транзакции хранилища: либо сохраняются резерв и все билеты,
//! либо ничего. Двойную продажу места предотвращает ограничение уникальности
//! (performance, row, seat) в хранилище; проверка диапазонов нужна для понятных ошибок.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::{Entry, HashMap};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::validator::{self, Seat, SeatError};
use crate::models::{Reservation, TheatreHall};
use crate::storage::{BookingStore, BookingTx, StoreError};

/// Запрошенное место: `{"performance": id, "row": int, "seat": int}`.
///
/// Ряд и место шире `i32`, чтобы любое целое из JSON дошло до проверки диапазона.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub performance: i64,
    pub row: i64,
    pub seat: i64,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("a reservation must contain at least one ticket")]
    EmptyRequest,

    #[error("performance {performance} not found")]
    NotFound { performance: i64 },

    /// Ошибки по каждому билету в порядке запроса; у корректного билета список пуст.
    #[error("{} ticket(s) failed validation", .0.iter().filter(|e| !e.is_empty()).count())]
    Validation(Vec<Vec<SeatError>>),

    #[error("seat {seat} in row {row} is already taken for performance {performance}")]
    SeatAlreadyTaken { performance: i64, row: i32, seat: i32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Фазы одной попытки бронирования.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    Started,
    Validating,
    Committing,
    Aborted,
}

/// Создаёт резерв пользователя `user_id` с билетами на все запрошенные места.
///
/// Порядок: резерв → разрешение залов и проверка всех мест → вставка билетов
/// в порядке запроса → commit. Любая ошибка откатывает транзакцию целиком.
/// Повторных попыток нет: `SeatAlreadyTaken` возвращается вызывающему.
pub async fn create_reservation<S: BookingStore>(
    store: &S,
    user_id: i64,
    requests: &[TicketRequest],
) -> Result<Reservation, BookingError> {
    if requests.is_empty() {
        return Err(BookingError::EmptyRequest);
    }

    let mut tx = store.begin().await?;
    debug!(user_id, tickets = requests.len(), phase = ?BookingPhase::Started, "Booking attempt");

    let mut reservation = tx.insert_reservation(user_id).await?;

    debug!(reservation_id = reservation.id, phase = ?BookingPhase::Validating, "Validating tickets");
    let mut halls: HashMap<i64, TheatreHall> = HashMap::new();
    let mut seats: Vec<(i64, Seat)> = Vec::with_capacity(requests.len());
    let mut per_ticket: Vec<Vec<SeatError>> = Vec::with_capacity(requests.len());
    for request in requests {
        let hall = match halls.entry(request.performance) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match tx.find_hall(request.performance).await? {
                Some(hall) => entry.insert(hall),
                None => {
                    let err = BookingError::NotFound { performance: request.performance };
                    return abort(tx, err).await;
                }
            },
        };
        match validator::validate(request.row, request.seat, hall) {
            Ok(seat) => {
                seats.push((request.performance, seat));
                per_ticket.push(Vec::new());
            }
            Err(errors) => per_ticket.push(errors),
        }
    }
    if seats.len() != requests.len() {
        return abort(tx, BookingError::Validation(per_ticket)).await;
    }

    for (performance, seat) in seats {
        match tx
            .insert_ticket(reservation.id, performance, seat.row, seat.seat)
            .await
        {
            Ok(ticket) => reservation.tickets.push(ticket),
            Err(StoreError::UniqueViolation { .. }) => {
                let err = BookingError::SeatAlreadyTaken {
                    performance,
                    row: seat.row,
                    seat: seat.seat,
                };
                return abort(tx, err).await;
            }
            Err(e) => return abort(tx, e.into()).await,
        }
    }

    debug!(reservation_id = reservation.id, phase = ?BookingPhase::Committing, "Committing reservation");
    tx.commit().await?;

    info!(
        "Reservation {} created for user {} with {} tickets",
        reservation.id,
        user_id,
        reservation.tickets.len()
    );
    Ok(reservation)
}

async fn abort<T: BookingTx>(tx: T, err: BookingError) -> Result<Reservation, BookingError> {
    debug!(phase = ?BookingPhase::Aborted, error = %err, "Booking aborted");
    // Ошибку отката только логируем: вызывающему важнее исходная причина
    if let Err(e) = tx.rollback().await {
        warn!("Rollback after failed booking did not complete: {}", e);
    }
    Err(err)
}
