//! Проверка координат места относительно размеров зала.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::models::TheatreHall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatField {
    Row,
    Seat,
}

impl SeatField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatField::Row => "row",
            SeatField::Seat => "seat",
        }
    }
}

impl fmt::Display for SeatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum SeatError {
    #[error("{field} must be in range [{min}, {max}], got {got}")]
    OutOfRange {
        field: SeatField,
        min: i32,
        max: i32,
        got: i64,
    },
}

impl SeatError {
    pub fn field(&self) -> SeatField {
        match self {
            SeatError::OutOfRange { field, .. } => *field,
        }
    }
}

/// Место, прошедшее проверку: координаты гарантированно внутри зала.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seat {
    pub row: i32,
    pub seat: i32,
}

/// Проверяет ряд и место независимо друг от друга и возвращает все нарушения сразу.
///
/// Координаты приходят как `i64`: значение за пределами `i32` тоже просто вне диапазона.
pub fn validate(row: i64, seat: i64, hall: &TheatreHall) -> Result<Seat, Vec<SeatError>> {
    let row = check_range(SeatField::Row, row, hall.row);
    let seat = check_range(SeatField::Seat, seat, hall.seats_in_row);

    match (row, seat) {
        (Ok(row), Ok(seat)) => Ok(Seat { row, seat }),
        (row, seat) => Err([row.err(), seat.err()].into_iter().flatten().collect()),
    }
}

fn check_range(field: SeatField, got: i64, max: i32) -> Result<i32, SeatError> {
    i32::try_from(got)
        .ok()
        .filter(|value| (1..=max).contains(value))
        .ok_or(SeatError::OutOfRange { field, min: 1, max, got })
}
