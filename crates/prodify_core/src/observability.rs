//! Logging and OpenTelemetry metrics initialization.

#[cfg(feature = "metrics")]
use opentelemetry::{KeyValue, global};
#[cfg(feature = "metrics")]
use opentelemetry_otlp::{MetricExporter as OtlpExporter, WithExportConfig};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
};
#[cfg(feature = "metrics")]
use opentelemetry_stdout::MetricExporter as StdoutExporter;
#[cfg(feature = "metrics")]
use parking_lot::Mutex;
use prodify_error::ConfigError;
#[cfg(feature = "metrics")]
use std::time::Duration;
use tracing::{debug, info, instrument};
#[cfg(feature = "metrics")]
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Provider installed by [`init_observability`], kept for flushing at exit.
#[cfg(feature = "metrics")]
static METER_PROVIDER: Mutex<Option<SdkMeterProvider>> = parking_lot::const_mutex(None);

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `"info"`) is used.
///
/// # Errors
///
/// Returns an error if the directive is invalid or a subscriber is already installed.
pub fn init_tracing(default_directive: &str) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)
            .map_err(|e| ConfigError::new(format!("Invalid log directive: {}", e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ConfigError::new(format!("Failed to install subscriber: {}", e)))
}

/// Initialize OpenTelemetry metrics with OTLP or stdout export.
///
/// Checks the `OTEL_EXPORTER` environment variable:
/// - "otlp" -> OTLP exporter to `OTEL_EXPORTER_OTLP_ENDPOINT` (default: http://localhost:4318)
/// - "stdout" or unset -> stdout exporter
///
/// When the `metrics` feature is disabled, this function returns `Ok(())`
/// immediately and console instruments record into the no-op global meter.
#[instrument(skip_all, fields(service_name))]
pub fn init_observability(
    service_name: &'static str,
    export_interval_secs: u64,
) -> Result<(), ConfigError> {
    #[cfg(not(feature = "metrics"))]
    {
        let _ = export_interval_secs;
        info!(
            service_name = service_name,
            "Metrics feature disabled - skipping metrics initialization"
        );
        Ok(())
    }

    #[cfg(feature = "metrics")]
    {
        info!(
            service_name = service_name,
            export_interval_secs = export_interval_secs,
            "Initializing OpenTelemetry metrics"
        );

        let resource = Resource::builder_empty()
            .with_attributes([KeyValue::new("service.name", service_name)])
            .build();

        let exporter_type = std::env::var("OTEL_EXPORTER").unwrap_or_else(|_| "stdout".to_string());
        info!(exporter_type = %exporter_type, "Selecting metrics exporter");

        let meter_provider = match exporter_type.as_str() {
            "otlp" => {
                let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:4318".to_string());
                info!(endpoint = %endpoint, "Using OTLP metrics exporter");

                let exporter = OtlpExporter::builder()
                    .with_http()
                    .with_endpoint(&endpoint)
                    .with_timeout(Duration::from_secs(10))
                    .build()
                    .map_err(|e| {
                        warn!(error = %e, "OTLP exporter creation failed");
                        ConfigError::new(format!("Failed to create OTLP exporter: {}", e))
                    })?;

                let reader = PeriodicReader::builder(exporter)
                    .with_interval(Duration::from_secs(export_interval_secs))
                    .build();

                SdkMeterProvider::builder()
                    .with_resource(resource)
                    .with_reader(reader)
                    .build()
            }
            _ => {
                info!("Using stdout metrics exporter");
                let reader = PeriodicReader::builder(StdoutExporter::default())
                    .with_interval(Duration::from_secs(export_interval_secs))
                    .build();

                SdkMeterProvider::builder()
                    .with_resource(resource)
                    .with_reader(reader)
                    .build()
            }
        };

        global::set_meter_provider(meter_provider.clone());
        if METER_PROVIDER.lock().replace(meter_provider).is_some() {
            warn!("Replaced a previously initialized meter provider");
        }
        debug!("Meter provider registered globally");
        Ok(())
    }
}

/// Flushes pending metrics and shuts the meter provider down.
///
/// The periodic reader exports on an interval, so a short-lived process must
/// call this before exiting or its measurements are lost. Does nothing if
/// [`init_observability`] installed no provider.
///
/// # Errors
///
/// Returns an error if the exporter fails to flush or shut down.
#[instrument]
pub fn shutdown_observability() -> Result<(), ConfigError> {
    #[cfg(feature = "metrics")]
    {
        let Some(provider) = METER_PROVIDER.lock().take() else {
            debug!("No meter provider to shut down");
            return Ok(());
        };
        info!("Shutting down OpenTelemetry metrics provider");
        provider
            .force_flush()
            .map_err(|e| ConfigError::new(format!("Failed to flush metrics: {}", e)))?;
        provider
            .shutdown()
            .map_err(|e| ConfigError::new(format!("Failed to shut down metrics: {}", e)))?;
    }

    debug!("Metrics shutdown complete");
    Ok(())
}
