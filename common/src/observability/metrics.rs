//! Prometheus metrics (Rust `prometheus` crate).
//!
//! One `MetricsContext` per process. The receiver and the sender register the
//! same families and each increments the ones that apply to it, so a single
//! dashboard can scrape both.

use anyhow::Result;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::level::SILENCE_FLOOR_DB;

/// Configuration for the built-in Prometheus scrape endpoint.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    // ---
    /// Address to bind, e.g. `127.0.0.1:9200`.
    pub bind: SocketAddr,
}

impl MetricsServerConfig {
    // ---
    pub fn new(bind: SocketAddr) -> Self {
        // ---
        Self { bind }
    }
}

/// Prometheus metrics registry + handles.
///
/// Thin wrapper around the `prometheus` crate so the per-packet path is
/// just counter increments and histogram observations.
#[derive(Clone)]
pub struct MetricsContext {
    // ---
    registry: Registry,

    // Receive side
    pub datagrams_received_total: IntCounter,
    pub bytes_received_total: IntCounter,
    pub packets_encoded_total: IntCounter,
    pub packets_malformed_total: IntCounter,
    pub payloads_without_samples_total: IntCounter,
    pub payloads_silent_total: IntCounter,

    // Send side
    pub datagrams_sent_total: IntCounter,
    pub bytes_sent_total: IntCounter,
    pub send_errors_total: IntCounter,

    // Level
    pub last_level_db: Gauge,
    pub payload_level_db: Histogram,

    // Latency (seconds)
    pub analysis_seconds: Histogram,
}

impl MetricsContext {
    // ---
    /// Create a new registry and register the standard metrics.
    ///
    /// `process_name` is applied as a constant label (`process=<name>`).
    pub fn new(process_name: &str) -> Result<Self> {
        // ---
        let registry = Registry::new_custom(
            Some("rtp_level_monitor".into()),
            Some(prometheus::labels! { "process".to_string() => process_name.to_string() }),
        )?;

        let datagrams_received_total = IntCounter::with_opts(Opts::new(
            "datagrams_received_total",
            "Total UDP datagrams received",
        ))?;
        let bytes_received_total = IntCounter::with_opts(Opts::new(
            "bytes_received_total",
            "Total payload bytes received",
        ))?;
        let packets_encoded_total = IntCounter::with_opts(Opts::new(
            "rtp_packets_encoded_total",
            "Total payloads framed into RTP packets",
        ))?;
        let packets_malformed_total = IntCounter::with_opts(Opts::new(
            "rtp_packets_malformed_total",
            "Total packets whose header could not be decoded",
        ))?;
        let payloads_without_samples_total = IntCounter::with_opts(Opts::new(
            "payloads_without_samples_total",
            "Total payloads holding no complete 16-bit sample",
        ))?;
        let payloads_silent_total = IntCounter::with_opts(Opts::new(
            "payloads_silent_total",
            "Total payloads measured at the silence floor",
        ))?;

        let datagrams_sent_total = IntCounter::with_opts(Opts::new(
            "datagrams_sent_total",
            "Total UDP datagrams sent",
        ))?;
        let bytes_sent_total = IntCounter::with_opts(Opts::new(
            "bytes_sent_total",
            "Total payload bytes sent",
        ))?;
        let send_errors_total = IntCounter::with_opts(Opts::new(
            "send_errors_total",
            "Total datagrams that failed to send",
        ))?;

        let last_level_db = Gauge::with_opts(Opts::new(
            "last_level_db",
            "Level of the most recently analyzed payload (dB)",
        ))?;
        // -100 dB floor up to +90 dB (full-scale 16-bit) in 10 dB steps
        let payload_level_db = Histogram::with_opts(
            HistogramOpts::new("payload_level_db", "Payload RMS level (dB)")
                .buckets(prometheus::linear_buckets(SILENCE_FLOOR_DB, 10.0, 20)?),
        )?;

        let analysis_seconds = Histogram::with_opts(HistogramOpts::new(
            "analysis_seconds",
            "Encode + decode + level computation time per datagram (seconds)",
        ))?;

        registry.register(Box::new(datagrams_received_total.clone()))?;
        registry.register(Box::new(bytes_received_total.clone()))?;
        registry.register(Box::new(packets_encoded_total.clone()))?;
        registry.register(Box::new(packets_malformed_total.clone()))?;
        registry.register(Box::new(payloads_without_samples_total.clone()))?;
        registry.register(Box::new(payloads_silent_total.clone()))?;
        registry.register(Box::new(datagrams_sent_total.clone()))?;
        registry.register(Box::new(bytes_sent_total.clone()))?;
        registry.register(Box::new(send_errors_total.clone()))?;
        registry.register(Box::new(last_level_db.clone()))?;
        registry.register(Box::new(payload_level_db.clone()))?;
        registry.register(Box::new(analysis_seconds.clone()))?;

        Ok(Self {
            registry,
            datagrams_received_total,
            bytes_received_total,
            packets_encoded_total,
            packets_malformed_total,
            payloads_without_samples_total,
            payloads_silent_total,
            datagrams_sent_total,
            bytes_sent_total,
            send_errors_total,
            last_level_db,
            payload_level_db,
            analysis_seconds,
        })
    }

    /// Records one measured payload level.
    pub fn observe_level(&self, db: f64) {
        // ---
        self.last_level_db.set(db);
        self.payload_level_db.observe(db);
    }

    /// Gather metric families from this registry.
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        // ---
        self.registry.gather()
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<Vec<u8>> {
        // ---
        encode_text(&self.registry)
    }

    /// Spawns a minimal HTTP server that serves `GET /metrics`.
    ///
    /// Callers decide whether to run it; the handle resolves only if the
    /// server fails.
    pub fn spawn_metrics_server(&self, cfg: MetricsServerConfig) -> JoinHandle<Result<()>> {
        // ---
        let registry = Arc::new(self.registry.clone());
        tokio::spawn(async move {
            // ---
            let make_svc = make_service_fn(move |_conn| {
                let registry = Arc::clone(&registry);
                async move {
                    Ok::<_, hyper::Error>(service_fn(move |req| {
                        let registry = Arc::clone(&registry);
                        async move { handle_metrics_request(req, registry).await }
                    }))
                }
            });

            let server = Server::try_bind(&cfg.bind)
                .map_err(|e| anyhow::anyhow!("failed to bind metrics server {}: {e}", cfg.bind))?
                .serve(make_svc);
            server.await.map_err(|e| anyhow::anyhow!(e))?;
            Ok(())
        })
    }
}

fn encode_text(registry: &Registry) -> Result<Vec<u8>> {
    // ---
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(buffer)
}

async fn handle_metrics_request(
    req: Request<Body>,
    registry: Arc<Registry>,
) -> Result<Response<Body>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => match encode_text(&registry) {
            Ok(buffer) => {
                let mut resp = Response::new(Body::from(buffer));
                resp.headers_mut().insert(
                    hyper::header::CONTENT_TYPE,
                    hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                Ok(resp)
            }
            Err(e) => {
                let mut resp = Response::new(Body::from(format!("encode error: {e}")));
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                Ok(resp)
            }
        },
        _ => {
            let mut resp = Response::new(Body::from("not found"));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            Ok(resp)
        }
    }
}
