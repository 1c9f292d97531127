pub mod handlers;
mod page;
pub mod router;

pub use router::router;
