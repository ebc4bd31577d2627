pub mod batch_store;
pub mod blender;
pub mod content_store;
pub mod feed;
pub mod paginator;
pub mod strategies;

pub use batch_store::BatchStore;
pub use blender::Blender;
pub use content_store::ContentStore;
pub use feed::FeedService;
pub use paginator::FeedPaginator;
