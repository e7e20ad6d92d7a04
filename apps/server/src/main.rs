use std::sync::Arc;

use ibdash_server::{api::app_router, build_state, build_supervisor, config::Config, init_tracing};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let state = build_state(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = wait_for_shutdown_signal().await {
                tracing::error!("Signal handler error: {}. Shutting down anyway.", e);
            }
            let _ = shutdown_tx.send(true);
        });
    }

    tracing::info!(
        "Refreshing from terminal at {} every {:?}",
        config.endpoint,
        config.refresh_interval
    );
    let supervisor = build_supervisor(&state, &config);
    let supervisor_task = {
        let shutdown_tx = shutdown_tx.clone();
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let result = supervisor.run(shutdown_rx).await;
            if result.is_err() {
                // Bring the HTTP server down with the loop.
                let _ = shutdown_tx.send(true);
            }
            result
        })
    };

    let router = app_router(state, &config);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    let mut server_shutdown = shutdown_rx.clone();
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await;
    let _ = shutdown_tx.send(true);
    served?;

    match supervisor_task.await {
        Ok(Ok(())) => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
        Err(e) => Err(anyhow::anyhow!("refresh supervisor task failed: {}", e)),
    }
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C elsewhere).
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
            _ = sigint.recv() => tracing::info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C");
    }

    Ok(())
}
