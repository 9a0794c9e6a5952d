pub mod catalog;
pub mod deletion;
pub mod media;
pub mod reservations;
pub mod sessions;

pub use catalog::CatalogService;
pub use deletion::{DeletionReport, DeletionService};
pub use media::MediaStorage;
pub use reservations::ReservationService;
pub use sessions::SessionService;
