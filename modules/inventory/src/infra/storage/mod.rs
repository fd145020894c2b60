pub mod sea_orm_repo;

pub use sea_orm_repo::{SeaOrmInventoryRepository, SYSTEM_TAGS};
