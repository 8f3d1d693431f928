use std::{process, sync::Arc, time::Duration};

use koktail::{
    application::{
        capacity::CapacityEnforcer,
        content::ContentService,
        error::AppError,
        landing::{LandingLimits, LandingService},
        membership::MembershipService,
        messages::MessagesService,
        plans::PlansService,
        repos::{ContentRepo, HealthRepo, MessagesRepo, PlansRepo, UsersRepo},
        users::UsersService,
    },
    cache::{CacheConfig, CacheStore},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Enforce(_) => run_enforce(settings).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn init_cache(settings: &config::Settings) -> Result<CacheStore, AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store = CacheStore::connect(&cache_config)
        .await
        .map_err(|err| InfraError::cache(err.to_string()))?;
    info!(
        backend = store.backend_name(),
        ttl_secs = store.landing_ttl().as_secs(),
        "Landing cache ready"
    );
    Ok(store)
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    cache: CacheStore,
    settings: &config::Settings,
) -> Result<HttpState, AppError> {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let content_repo: Arc<dyn ContentRepo> = repositories.clone();
    let plans_repo: Arc<dyn PlansRepo> = repositories.clone();
    let messages_repo: Arc<dyn MessagesRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let registry = Arc::new(settings.activities.clone());
    let membership = MembershipService::new(users_repo.clone(), registry.clone(), cache.clone());
    let enforcer = CapacityEnforcer::new(users_repo.clone(), membership.clone(), cache.clone());
    let limits = LandingLimits {
        comments: settings.content.recent_comments.get(),
        gallery: settings.content.recent_gallery.get(),
        completed: settings.content.recent_completed.get(),
    };
    let plan_lifetime = time::Duration::try_from(settings.content.plan_lifetime)
        .map_err(|err| InfraError::configuration(format!("plan lifetime out of range: {err}")))?;

    Ok(HttpState {
        landing: Arc::new(LandingService::new(
            enforcer,
            content_repo.clone(),
            plans_repo.clone(),
            registry,
            cache.clone(),
            limits,
        )),
        membership: Arc::new(membership),
        users: Arc::new(UsersService::new(users_repo.clone())),
        content: Arc::new(ContentService::new(
            content_repo.clone(),
            users_repo.clone(),
            cache,
        )),
        messages: Arc::new(MessagesService::new(
            messages_repo,
            content_repo,
            users_repo.clone(),
        )),
        plans: Arc::new(PlansService::new(plans_repo, users_repo, plan_lifetime)),
        health: health_repo,
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = init_cache(&settings).await?;
    let state = build_http_state(repositories, cache, &settings)?;

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(addr = %settings.server.addr, "Listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let router = http::build_router(state);
    let mut server: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        _ = shutdown_signal() => {}
    }

    info!(
        grace_secs = settings.server.graceful_shutdown.as_secs(),
        "Shutdown signal received; draining connections"
    );
    let _ = stop_tx.send(());

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!("Graceful shutdown window elapsed; aborting open connections");
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn run_enforce(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = init_cache(&settings).await?;
    let users_repo: Arc<dyn UsersRepo> = repositories;
    let registry = Arc::new(settings.activities.clone());
    let ledger = MembershipService::new(users_repo.clone(), registry.clone(), cache.clone());

    let started = std::time::Instant::now();
    let counts = CapacityEnforcer::new(users_repo, ledger, cache)
        .recompute_and_enforce(&registry)
        .await?;

    for entry in counts.iter() {
        info!(activity = %entry.name, count = entry.count, "Activity count");
    }
    info!(
        activities = counts.len(),
        elapsed_ms = duration_ms(started.elapsed()),
        "Capacity pass complete"
    );
    Ok(())
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
