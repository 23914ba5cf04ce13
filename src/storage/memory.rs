//! In-process хранилище с той же семантикой уникальности мест, что и у PostgreSQL.
//!
//! Вставка билета сразу занимает ключ (performance, row, seat). Если ключ уже занят
//! закоммиченной или открытой транзакцией, вставка падает с unique violation.
//! В отличие от PostgreSQL, конфликт с незакоммиченной транзакцией не ждёт её исхода.
//! Откат или drop транзакции освобождает занятые ею ключи.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{BookingStore, BookingTx, StoreError, SEAT_UNIQUE_CONSTRAINT};
use crate::models::{Reservation, TheatreHall, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SeatKey {
    performance_id: i64,
    row: i32,
    seat: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeatClaim {
    Pending(u64),
    Committed,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    next_tx: u64,
    halls: HashMap<i64, TheatreHall>,
    // performance_id -> theatre_hall_id
    performances: HashMap<i64, i64>,
    reservations: Vec<Reservation>,
    tickets: Vec<Ticket>,
    seats: HashMap<SeatKey, SeatClaim>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn hall_for(&self, performance_id: i64) -> Option<TheatreHall> {
        self.performances
            .get(&performance_id)
            .and_then(|hall_id| self.halls.get(hall_id))
            .cloned()
    }

    fn release(&mut self, tx_id: u64) {
        self.seats.retain(|_, claim| *claim != SeatClaim::Pending(tx_id));
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBookingStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Паника в другом потоке не портит данные: все изменения атомарны под замком
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_hall(&self, name: &str, row: i32, seats_in_row: i32) -> TheatreHall {
        let mut state = self.lock();
        let hall = TheatreHall {
            id: state.next_id(),
            name: name.to_string(),
            row,
            seats_in_row,
        };
        state.halls.insert(hall.id, hall.clone());
        hall
    }

    /// Регистрирует спектакль в зале и возвращает его id.
    pub fn add_performance(&self, theatre_hall_id: i64) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.performances.insert(id, theatre_hall_id);
        id
    }

    /// Закоммиченные билеты спектакля.
    pub fn tickets(&self, performance_id: i64) -> Vec<Ticket> {
        self.lock()
            .tickets
            .iter()
            .filter(|t| t.performance_id == performance_id)
            .cloned()
            .collect()
    }

    /// Закоммиченные резервы вместе с билетами.
    pub fn reservations(&self) -> Vec<Reservation> {
        let state = self.lock();
        state
            .reservations
            .iter()
            .map(|r| Reservation {
                tickets: state
                    .tickets
                    .iter()
                    .filter(|t| t.reservation_id == r.id)
                    .cloned()
                    .collect(),
                ..r.clone()
            })
            .collect()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let id = {
            let mut state = self.lock();
            state.next_tx += 1;
            state.next_tx
        };
        Ok(MemoryTx {
            store: self.clone(),
            id,
            reservations: Vec::new(),
            tickets: Vec::new(),
            finished: false,
        })
    }

    async fn find_hall(&self, performance_id: i64) -> Result<Option<TheatreHall>, StoreError> {
        Ok(self.lock().hall_for(performance_id))
    }

    async fn tickets_sold(&self, performance_id: i64) -> Result<i64, StoreError> {
        let sold = self
            .lock()
            .tickets
            .iter()
            .filter(|t| t.performance_id == performance_id)
            .count();
        Ok(sold as i64)
    }
}

pub struct MemoryTx {
    store: MemoryBookingStore,
    id: u64,
    reservations: Vec<Reservation>,
    tickets: Vec<Ticket>,
    finished: bool,
}

#[async_trait]
impl BookingTx for MemoryTx {
    async fn insert_reservation(&mut self, user_id: i64) -> Result<Reservation, StoreError> {
        let id = self.store.lock().next_id();
        let reservation = Reservation {
            id,
            user_id,
            created_at: Utc::now(),
            tickets: Vec::new(),
        };
        self.reservations.push(reservation.clone());
        Ok(reservation)
    }

    async fn find_hall(&mut self, performance_id: i64) -> Result<Option<TheatreHall>, StoreError> {
        Ok(self.store.lock().hall_for(performance_id))
    }

    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        performance_id: i64,
        row: i32,
        seat: i32,
    ) -> Result<Ticket, StoreError> {
        let mut state = self.store.lock();

        if !state.performances.contains_key(&performance_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: Some("tickets_performance_id_fkey".to_string()),
                message: format!("performance {performance_id} does not exist"),
            });
        }

        let key = SeatKey { performance_id, row, seat };
        if state.seats.contains_key(&key) {
            return Err(StoreError::UniqueViolation {
                constraint: Some(SEAT_UNIQUE_CONSTRAINT.to_string()),
                message: format!(
                    "Key (performance_id, row, seat)=({performance_id}, {row}, {seat}) already exists"
                ),
            });
        }
        state.seats.insert(key, SeatClaim::Pending(self.id));

        let ticket = Ticket {
            id: state.next_id(),
            row,
            seat,
            performance_id,
            reservation_id,
        };
        self.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let mut state = self.store.lock();
        for ticket in &self.tickets {
            let key = SeatKey {
                performance_id: ticket.performance_id,
                row: ticket.row,
                seat: ticket.seat,
            };
            state.seats.insert(key, SeatClaim::Committed);
        }
        state.reservations.append(&mut self.reservations);
        state.tickets.append(&mut self.tickets);
        drop(state);
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        self.store.lock().release(self.id);
        self.finished = true;
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            self.store.lock().release(self.id);
        }
    }
}
