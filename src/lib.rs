pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use config::Config;
pub use db::{Item, ItemsStorage};
pub use error::ItemsError;
