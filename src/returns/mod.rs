pub mod error;
pub mod handlers;
pub mod models;
pub mod refund_calculator;
pub mod repository;
pub mod service;

pub use error::*;
pub use handlers::*;
pub use models::*;
pub use refund_calculator::*;
pub use repository::*;
pub use service::*;
