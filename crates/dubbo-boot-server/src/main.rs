mod app;
mod listeners;
mod providers;

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use dubbo_boot_core::config::SslProperties;
use dubbo_boot_core::{
    ApplicationContext, DubboHealthIndicator, ExportedService, ProcessEnvironment,
    ServicePublisher, Settings,
};
use dubbo_boot_db::DbRegistry;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::listeners::{plan_listeners, ListenerPlan};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let registry = DbRegistry::open(&settings.dubbo.registry_address)?;

    // Publishing writes the process environment, so it has to happen before
    // the runtime spawns its worker threads.
    let context = providers::provider_context()?;
    let exported = {
        // SAFETY: no runtime has been built and no thread spawned yet; the
        // environment handle is dropped at the end of this block.
        let environment = unsafe { ProcessEnvironment::new() };
        ServicePublisher::new(&settings, &registry, &environment).publish(&context)?
    };
    providers::register_references(&context, &settings)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(settings, context, exported))?;
    Ok(())
}

async fn serve(
    settings: Settings,
    context: ApplicationContext,
    exported: Vec<ExportedService>,
) -> std::io::Result<()> {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).ok();

    let state = AppState::new(DubboHealthIndicator::new(context.references()), &exported);
    let rpc = app::rpc_router(state.clone(), &settings.management.context_path);
    let management = app::management_router(
        state,
        &settings.management.context_path,
        Some(handle),
    );

    let ssl = settings.management.ssl.as_ref();

    match plan_listeners(&settings) {
        ListenerPlan::Shared(addr) => serve_app(addr, rpc.merge(management), ssl).await,
        ListenerPlan::Split { server, management: management_addr } => {
            tokio::try_join!(
                serve_app(server, rpc, None),
                serve_app(management_addr, management, ssl),
            )?;
            Ok(())
        }
    }
}

async fn serve_app(
    addr: SocketAddr,
    app: Router,
    ssl: Option<&SslProperties>,
) -> std::io::Result<()> {
    match ssl {
        Some(ssl) => {
            let config = RustlsConfig::from_pem_file(&ssl.cert_path, &ssl.key_path).await?;
            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                async move {
                    shutdown_signal().await;
                    handle.graceful_shutdown(Some(Duration::from_secs(10)));
                }
            });
            tracing::info!("listening on https://{}", addr);
            axum_server::bind_rustls(addr, config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            tracing::info!("listening on http://{}", addr);
            axum::Server::bind(&addr)
                .serve(app.into_make_service())
                .with_graceful_shutdown(shutdown_signal())
                .await
                .map_err(std::io::Error::other)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}
