pub mod in_memory;
pub mod postgres_registry_repository;

pub use in_memory::InMemoryRegistry;
pub use postgres_registry_repository::PostgresRegistryRepository;
