use crate::{
    communication::service::run_server,
    config::{create_default_config, init_config},
    controller::multi_axis::{MultiAxis, RouterCommand},
    controllers::simulated::create_axes,
};

use std::path::PathBuf;

use tokio::sync::broadcast;
use tracing::{error, info};
use utilities::command_executor::CommandExecutor;

pub mod communication;
pub mod config;
pub mod controller;
pub mod controllers;
pub mod logging;
pub mod models;

const DIAGNOSTICS_CAPACITY: usize = 64;

fn should_create_config() -> bool {
    std::env::var("CREATE_CONFIG")
        .map(|val| val == "1" || val.to_lowercase() == "true")
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if should_create_config() {
        create_default_config(None::<PathBuf>)?;
    }

    let (_config_manager, config) = init_config().map_err(|e| {
        eprintln!("Failed to load configuration: {:#}", e);
        eprintln!("Run with CREATE_CONFIG=1 to create a default configuration file.");
        e
    })?;

    let _log_guard = logging::init(&config.logging);

    let (diagnostics, _) = broadcast::channel(DIAGNOSTICS_CAPACITY);

    let axes = create_axes(&config)?;
    let multi_axis = MultiAxis::new(axes, diagnostics.clone())?;

    let executor = CommandExecutor::new(multi_axis);
    let commands = executor.sender();
    let executor_handle = executor.spawn(config.control.tick_period());

    commands
        .send_command(RouterCommand::Begin {
            home: config.control.home_on_startup,
        })
        .await?;

    let server_result = tokio::select! {
        result = run_server(&config.transport, commands.clone(), diagnostics.clone()) => result,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Interrupted"),
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
            Ok(())
        }
    };

    if let Err(e) = &server_result {
        error!("Server stopped: {:#}", e);
    }

    commands.send_command(RouterCommand::Shutdown).await?;
    executor_handle.await??;

    server_result
}
