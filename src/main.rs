use anyhow::{Context, Result};
use std::sync::Arc;
use sunspec_curtail::config::Config;
use sunspec_curtail::driver::{CurtailmentDriver, DriverCommand};
use sunspec_curtail::logging::{get_logger, init_logging};
use sunspec_curtail::sunspec::SunSpecConnector;
use sunspec_curtail::telemetry::HomeAssistantTelemetry;
use tokio::sync::mpsc;

fn load_config() -> Result<Config> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load {}", path.to_string_lossy()))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let logger = get_logger("main");
    logger.info(&format!(
        "sunspec-curtail {} starting up",
        env!("APP_VERSION")
    ));

    let telemetry = Arc::new(
        HomeAssistantTelemetry::from_config(&config.telemetry)
            .context("Failed to create telemetry client")?,
    );
    let connector = Arc::new(SunSpecConnector::new(&config.modbus, config.unit_id()));

    // Create driver command channel
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<DriverCommand>();
    let mut driver = CurtailmentDriver::new(config.clone(), connector, telemetry, cmd_rx);

    if let Err(e) = driver.setup().await {
        logger.error(&format!("Inverter setup failed: {}", e));
        return Err(anyhow::anyhow!("Inverter setup failed: {}", e));
    }

    #[cfg(feature = "web")]
    let web_task = config.web.enabled.then(|| {
        let state = sunspec_curtail::web::AppState {
            commands_tx: cmd_tx.clone(),
            snapshot_rx: driver.subscribe_snapshot(),
            log_file: config.logging.file.clone(),
        };
        let (host, port) = (config.web.host.clone(), config.web.port);
        tokio::spawn(async move {
            if let Err(e) = sunspec_curtail::web::serve(state, &host, port).await {
                get_logger("web").error(&format!("Web server error: {}", e));
            }
        })
    });
    #[cfg(not(feature = "web"))]
    drop(cmd_tx);

    let shutdown_tx = driver.get_shutdown_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let result = driver.run().await;

    #[cfg(feature = "web")]
    {
        if let Some(task) = web_task {
            task.abort();
        }
    }

    match result {
        Ok(()) => {
            logger.info("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            logger.error(&format!("Driver failed with error: {}", e));
            Err(anyhow::anyhow!("Driver error: {}", e))
        }
    }
}
