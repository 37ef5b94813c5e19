pub mod app_config;
pub mod catalog_repo;
pub mod customer_repo;
pub mod database;
pub mod redis_repo;
pub mod reservation_repo;

pub use catalog_repo::CatalogRepository;
pub use customer_repo::CustomerRepository;
pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use reservation_repo::ReservationRepository;
