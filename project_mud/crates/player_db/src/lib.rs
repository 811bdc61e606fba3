pub mod db;
pub mod error;
mod schema;

pub use db::PlayerDb;
pub use error::PlayerDbError;
