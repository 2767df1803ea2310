//! # hpapowerd
//!
//! Composition root: loads the configuration, installs logging, brings the
//! actuator up de-energized, and serves the control endpoint together with
//! the static page until SIGINT or SIGTERM. On the way out the actuator is
//! forced off again.

mod config;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use hpapower_adapter_gpio_sysfs::SysfsGpio;
use hpapower_adapter_http_axum::router;
use hpapower_adapter_http_axum::state::AppState;
use hpapower_adapter_virtual::VirtualActuator;
use hpapower_app::ports::ActuatorDriver;
use hpapower_app::services::actuator_store::ActuatorStore;
use hpapower_domain::error::ActuatorError;

use crate::config::{ActuatorConfig, Config, ConfigError, DriverKind};

/// Reasons the daemon could not start or stopped abnormally.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to drive the actuator to its safe level: {0}")]
    Actuator(#[from] ActuatorError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("hpapowerd: {}", StartupError::from(err));
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "hpapowerd stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    let store = ActuatorStore::start(build_driver(&config.actuator))?;

    let state = AppState::new(store.clone(), config.endpoint(), &config.static_files.root);
    let app = router::build(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(
        %addr,
        control = %config.control.path,
        static_root = %config.static_files.root.display(),
        "hpapowerd listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    match store.force_safe() {
        Ok(()) => tracing::info!("actuator forced off, shutting down"),
        Err(err) => tracing::error!(error = %err, "failed to force actuator off"),
    }
    Ok(())
}

fn build_driver(config: &ActuatorConfig) -> Box<dyn ActuatorDriver> {
    match config.driver {
        DriverKind::Sysfs => {
            tracing::info!(
                pin = config.gpio.pin,
                root = %config.gpio.root.display(),
                active_low = config.gpio.active_low,
                "using sysfs GPIO driver"
            );
            Box::new(SysfsGpio::new(config.gpio.clone()))
        }
        DriverKind::Virtual => {
            tracing::info!("using virtual actuator driver");
            Box::new(VirtualActuator::default())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
