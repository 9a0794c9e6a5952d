pub mod dome;
pub mod reservation;
pub mod session;
pub mod show;
pub mod theme;
pub mod user;

pub use dome::PlanetariumDome;
pub use reservation::{Reservation, SeatPosition, Ticket};
pub use session::ShowSession;
pub use show::AstronomyShow;
pub use theme::ShowTheme;
pub use user::User;
