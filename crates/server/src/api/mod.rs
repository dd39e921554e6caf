pub mod batch;
pub mod catalog;
pub mod events;
pub mod handlers;
pub mod routes;
pub mod volumes;

pub use routes::create_router;
