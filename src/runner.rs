use maildrain::config::Config;
use maildrain::delivery::{HostIdentity, Maildir};
use maildrain::pipeline;
use maildrain::storage::Bucket;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(config: Config) -> Result<(), AnyError> {
    let maildir = Maildir::open(&config.delivery.maildir).await?;
    let host = match &config.delivery.hostname {
        Some(name) => HostIdentity::from_fqdn(name),
        None => HostIdentity::local()?,
    };
    let bucket = Bucket::connect(&config.source)?;

    info!(
        bucket = %config.source.bucket,
        prefix = %config.source.prefix,
        page_size = config.source.page_size,
        workers = config.delivery.workers,
        delete = config.source.delete,
        maildir = %maildir.root().display(),
        host = host.as_str(),
        "Draining bucket into maildir"
    );

    let cancel = CancellationToken::new();
    let signal_watch = tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = pipeline::drain(&config, bucket, maildir, host, cancel).await;
    signal_watch.abort();

    match result {
        Ok(summary) => {
            info!(
                pages = summary.pages,
                delivered = summary.delivered,
                deleted = summary.deleted,
                bytes = summary.bytes,
                "Drain complete"
            );
            Ok(())
        }
        Err(err) => {
            error!(
                key = err.key().unwrap_or("-"),
                operation = err.operation(),
                error = %err,
                "Drain aborted"
            );
            Err(err.into())
        }
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    shutdown_signal().await;
    cancel.cancel();
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, stopping after in-flight transfers");
}
