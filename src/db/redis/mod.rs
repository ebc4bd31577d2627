pub mod batch;

pub use batch::create_redis_client;
pub use batch::BatchKey;
pub use batch::RedisBatchStore;
