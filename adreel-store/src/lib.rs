pub mod ad_repo;
pub mod app_config;
pub mod database;
pub mod events;
pub mod memory_repo;
pub mod redis_repo;

pub use ad_repo::PostgresAdRepository;
pub use database::DbClient;
pub use events::EventProducer;
pub use memory_repo::InMemoryAdRepository;
pub use redis_repo::RedisClient;
