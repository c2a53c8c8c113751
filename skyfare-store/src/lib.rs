pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod customer_repo;
pub mod database;
pub mod history_repo;
pub mod memory;

pub use app_config::Config;
pub use booking_repo::PostgresBookingStore;
pub use catalog_repo::PostgresCatalog;
pub use customer_repo::PostgresCustomers;
pub use database::DbClient;
pub use history_repo::PostgresHistory;
pub use memory::InMemoryStore;
