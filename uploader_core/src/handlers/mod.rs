pub mod routes;
pub mod uploader;

pub use routes::create_routes;
