//! Stdout logging with optional OpenTelemetry OTLP export of traces and logs.

use anyhow::{Context, Result};
use header_relay_core::config::ObservabilityConfig;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    logs::SdkLoggerProvider,
    propagation::TraceContextPropagator,
    resource::Resource,
    trace::{Sampler, SdkTracerProvider},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Shuts the OpenTelemetry providers down when dropped, flushing pending exports.
pub struct ObservabilityGuard {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            let _ = provider.shutdown();
        }
        // Dropping the logger provider flushes its batch processor.
        drop(self.logger_provider.take());
    }
}

/// Installs the global tracing subscriber.
///
/// Keep the returned guard alive until the relayer exits. If the OTLP exporters cannot be
/// built the relayer falls back to stdout logging only.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_observability(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let filter = || EnvFilter::new(config.level().as_str().to_lowercase());
    let stdout = || {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
    };

    if config.use_otel {
        match (tracer_provider(config), logger_provider(config)) {
            (Ok(tracer_provider), Ok(logger_provider)) => {
                let tracer = tracer_provider.tracer(config.service_name.clone());
                Registry::default()
                    .with(filter())
                    .with(stdout())
                    .with(tracing_opentelemetry::layer().with_tracer(tracer))
                    .with(OpenTelemetryTracingBridge::new(&logger_provider))
                    .try_init()
                    .context("Failed to set global default subscriber")?;

                return Ok(ObservabilityGuard {
                    tracer_provider: Some(tracer_provider),
                    logger_provider: Some(logger_provider),
                });
            }
            (Err(e), _) | (_, Err(e)) => eprintln!("OpenTelemetry disabled: {e}"),
        }
    }

    Registry::default()
        .with(filter())
        .with(stdout())
        .try_init()
        .context("Failed to set global default subscriber")?;

    Ok(ObservabilityGuard {
        tracer_provider: None,
        logger_provider: None,
    })
}

fn resource(config: &ObservabilityConfig) -> Resource {
    Resource::builder()
        .with_attributes(vec![
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

fn tracer_provider(config: &ObservabilityConfig) -> Result<SdkTracerProvider> {
    let mut exporter = opentelemetry_otlp::SpanExporter::builder().with_tonic();
    if let Some(endpoint) = &config.otel_endpoint {
        exporter = exporter.with_endpoint(endpoint);
    }

    Ok(SdkTracerProvider::builder()
        .with_resource(resource(config))
        .with_sampler(Sampler::AlwaysOn)
        .with_batch_exporter(exporter.build()?)
        .build())
}

fn logger_provider(config: &ObservabilityConfig) -> Result<SdkLoggerProvider> {
    let mut exporter = opentelemetry_otlp::LogExporter::builder().with_tonic();
    if let Some(endpoint) = &config.otel_endpoint {
        exporter = exporter.with_endpoint(endpoint);
    }

    Ok(SdkLoggerProvider::builder()
        .with_resource(resource(config))
        .with_batch_exporter(exporter.build()?)
        .build())
}
