//! Ядро бронирования мест.
//!
//! - [`capacity`]: вместимость зала
//! - [`validator`]: проверка ряда и места
//! - [`availability`]: остаток мест для витрины
//! - [`reservation`]: атомарное создание резерва с билетами

pub mod availability;
pub mod capacity;
pub mod reservation;
pub mod validator;

pub use availability::available;
pub use reservation::{create_reservation, BookingError, BookingPhase, TicketRequest};
pub use validator::{validate, Seat, SeatError, SeatField};
