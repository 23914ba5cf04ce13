pub mod user;
pub mod genre;
pub mod actor;
pub mod play;
pub mod theatre_hall;
pub mod performance;
pub mod reservation;

pub use user::User;
pub use genre::Genre;
pub use actor::Actor;
pub use play::Play;
pub use theatre_hall::TheatreHall;
pub use performance::Performance;
pub use reservation::{Reservation, Ticket};
