use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ripple_api::{
    config::Config,
    db::{create_pool, create_redis_client, PgContentStore, RedisBatchStore},
    routes::{create_router, AppState},
    services::{
        strategies::{CollaborativeStrategy, NewestStrategy, PopularStrategy, RandomStrategy},
        BatchStore, Blender, ContentStore, FeedPaginator, FeedService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;

    let redis_client = create_redis_client(&config.redis_url)?;

    let content_store: Arc<dyn ContentStore> = Arc::new(PgContentStore::new(pool.clone()));
    let batch_store: Arc<dyn BatchStore> = Arc::new(RedisBatchStore::new(
        redis_client,
        config.feed_batch_ttl_secs,
    ));

    let blender = Blender::new(
        Arc::new(CollaborativeStrategy::new(pool.clone())),
        Arc::new(PopularStrategy::new(pool.clone())),
        Arc::new(NewestStrategy::new(pool.clone())),
        Arc::new(RandomStrategy::new(pool)),
        config.blend_weights(),
    );

    let feed_config = config.feed();
    let paginator = FeedPaginator::new(
        batch_store,
        content_store.clone(),
        blender,
        feed_config.batch_size,
        feed_config.viewed_window,
    );
    let feed = Arc::new(FeedService::new(paginator, content_store));

    let state = Arc::new(AppState {
        feed,
        config: feed_config,
    });
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "ripple-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
