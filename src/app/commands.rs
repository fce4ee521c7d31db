//! Subcommand implementations
//!
//! Each command returns the process exit code: 0 for a valid/successful
//! outcome, 1 when the input was rejected.

use crate::app::cli::api::{
    describe_state, device_line, extraction_report, store_path, validation_line, Command, Settings,
};
use crate::core::error_handling::ContextualError;
use crate::core::shutdown::ShutdownCoordinator;
use crate::flow::api::{FlowControlError, FlowErrorKind, FlowState, HttpValidationService, ScanFlow};
use crate::identity::api::{format as format_rut, has_format, IdentityExtractor};
use crate::scanner::api::{CameraProvider, DeviceSelector, ScanError, WedgeCamera, WedgeDecoder};
use crate::store::api::{FileStore, KeyValueStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;

const STORE_SCOPE: &str = "scanner";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("--api-url (or api-url in the configuration file) is required for scanning")]
    MissingApiUrl,
    #[error("cannot read {name}: {source}")]
    Input {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write output: {0}")]
    Output(#[from] serde_json::Error),
    #[error(transparent)]
    Scanner(#[from] ScanError),
    #[error(transparent)]
    Flow(#[from] FlowControlError),
}

impl ContextualError for CommandError {
    fn is_user_actionable(&self) -> bool {
        match self {
            CommandError::MissingApiUrl | CommandError::Input { .. } => true,
            CommandError::Scanner(e) => e.is_user_actionable(),
            CommandError::Output(_) | CommandError::Flow(_) => false,
        }
    }

    fn user_message(&self) -> Option<String> {
        match self {
            CommandError::Scanner(e) => e.user_message(),
            _ if self.is_user_actionable() => Some(self.to_string()),
            _ => None,
        }
    }
}

pub async fn run(command: Command, settings: &Settings, use_color: bool) -> Result<i32, CommandError> {
    match command {
        Command::Validate { rut } => {
            let (line, valid) = validation_line(&rut, use_color);
            println!("{}", line);
            Ok(if valid { 0 } else { 1 })
        }
        Command::Format { rut } => {
            if has_format(&rut) {
                println!("{}", format_rut(&rut));
                Ok(0)
            } else {
                eprintln!("'{}' is not a RUT", rut.trim());
                Ok(1)
            }
        }
        Command::Extract { file } => extract(file.as_deref(), settings).await,
        Command::Scan {
            device,
            once,
            hold_ms,
        } => scan(settings, device, once, Duration::from_millis(hold_ms), use_color).await,
        Command::Devices { forget } => devices(settings, forget).await,
    }
}

async fn extract(file: Option<&Path>, settings: &Settings) -> Result<i32, CommandError> {
    let text = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CommandError::Input {
                name: path.display().to_string(),
                source,
            })?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .map_err(|source| CommandError::Input {
                    name: "standard input".to_string(),
                    source,
                })?;
            buffer
        }
    };

    let extractor = IdentityExtractor::new(settings.extraction.clone());
    let report = extraction_report(&text, &extractor);
    println!("{}", serde_json::to_string_pretty(&report)?);

    let found = !report["identity"].is_null() || !report["ticket"].is_null();
    Ok(if found { 0 } else { 1 })
}

/// Preference store, or `None` (with a warning) when it cannot be opened
fn open_store(settings: &Settings) -> Option<Arc<dyn KeyValueStore>> {
    let path: PathBuf = store_path(settings)?;
    match FileStore::open(&path, STORE_SCOPE) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            log::warn!("Device preference disabled: {}", e);
            None
        }
    }
}

async fn scan(
    settings: &Settings,
    device: Option<String>,
    once: bool,
    hold: Duration,
    use_color: bool,
) -> Result<i32, CommandError> {
    let api_url = settings.api_url.as_deref().ok_or(CommandError::MissingApiUrl)?;
    let mut service = HttpValidationService::new(api_url, settings.mode);
    if let Some(token) = &settings.api_token {
        service = service.with_token(token.clone());
    }

    let mut builder = ScanFlow::builder(
        Arc::new(WedgeCamera::stdin()),
        Arc::new(WedgeDecoder),
        Arc::new(service),
    )
    .mode(settings.mode)
    .scanner_config(settings.scanner.clone())
    .dedup_window(settings.dedup_window)
    .extraction_policy(settings.extraction.clone());
    if let Some(store) = open_store(settings) {
        builder = builder.device_store(store);
    }
    let flow = builder.build();

    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers();
    let mut shutdown_rx = shutdown.subscribe();
    let mut states = flow.subscribe();

    let start = |flow: &ScanFlow| match &device {
        Some(id) => flow.start_with_device(id),
        None => flow.start(),
    };
    start(&flow)?;
    log::info!("Scanning in {} mode against {}", settings.mode, api_url);

    let mut exit_code = 0;
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                println!("{}", describe_state(&state, use_color));

                match &state {
                    FlowState::Success { .. } => {
                        if once {
                            break;
                        }
                        tokio::time::sleep(hold).await;
                        if shutdown.is_shutdown_requested() {
                            break;
                        }
                        flow.confirm()?;
                    }
                    FlowState::Error { error } => {
                        // A closed input cannot recover
                        if once || error.kind == FlowErrorKind::Scanner {
                            exit_code = 1;
                            break;
                        }
                        tokio::time::sleep(hold).await;
                        if shutdown.is_shutdown_requested() {
                            break;
                        }
                        flow.reset()?;
                        start(&flow)?;
                    }
                    _ => {}
                }
            }
        }
    }

    let statistics = flow.statistics();
    log::info!(
        "Session ended: {} decoded, {} validations, {} duplicates suppressed",
        statistics.decoded,
        statistics.validations_started,
        statistics.duplicates_suppressed
    );
    log::debug!("Scan statistics: {:?}", statistics);
    flow.shutdown().await;
    Ok(exit_code)
}

async fn devices(settings: &Settings, forget: bool) -> Result<i32, CommandError> {
    let selector = DeviceSelector::new(open_store(settings));
    if forget {
        selector.forget();
        println!("Forgot the remembered device");
    }

    let camera = WedgeCamera::stdin();
    let devices = camera.enumerate_devices().await?;
    let stored = selector.stored();

    for device in &devices {
        println!("{}", device_line(device, stored.as_deref() == Some(device.id.as_str())));
    }
    if let Some(id) = stored.filter(|id| !devices.iter().any(|d| &d.id == id)) {
        println!("Remembered device '{}' is not connected", id);
    }
    Ok(0)
}
