//! Helper types for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use health_monitoring::{
    Probe, ProbeError, ProbeResult, ProbeSource,
    probes::{BaseConfig, TcpProbe, TcpProbeConfig},
};
use tracing::{Event, Level, Subscriber, field::Field, subscriber::DefaultGuard};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
};

/// Execution counters shared between a test and its probe
#[derive(Debug, Default)]
pub struct ProbeStats {
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ProbeStats {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Probe that sleeps for a fixed time and records every execution
pub struct CountingProbe {
    base: BaseConfig,
    work: Duration,
    fail: bool,
    stats: Arc<ProbeStats>,
    span: tracing::Span,
}

impl CountingProbe {
    pub fn new(name: &str, interval: Duration, work: Duration) -> (Self, Arc<ProbeStats>) {
        let stats = Arc::new(ProbeStats::default());
        let probe = Self {
            base: BaseConfig::new(name, interval),
            work,
            fail: false,
            stats: stats.clone(),
            span: tracing::info_span!("probe", name = %name),
        };
        (probe, stats)
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn one_off(mut self) -> Self {
        self.base.one_off = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Probe> {
        Box::new(self)
    }
}

#[async_trait]
impl Probe for CountingProbe {
    fn validate(&self) -> ProbeResult<()> {
        if self.base.name.is_empty() {
            return Err(ProbeError::validation("the probe name is missing"));
        }
        Ok(())
    }

    fn initialize(&mut self) -> ProbeResult<()> {
        Ok(())
    }

    async fn execute(&self) -> ProbeResult<()> {
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        let current = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(self.work).await;

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.stats.finished.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(ProbeError::Execution(anyhow::anyhow!("simulated failure")));
        }
        Ok(())
    }

    fn base(&self) -> &BaseConfig {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "counting"
    }

    fn summary(&self) -> String {
        self.base.summarize("nothing")
    }

    fn set_source(&mut self, source: ProbeSource) {
        self.base.source = source;
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.base).unwrap_or_default()
    }

    fn span(&self) -> &tracing::Span {
        &self.span
    }
}

pub fn tcp_config(name: &str, port: u16) -> TcpProbeConfig {
    TcpProbeConfig {
        base: BaseConfig::new(name, Duration::from_secs(10)),
        target: "127.0.0.1".to_string(),
        port,
        timeout: Duration::from_secs(1),
    }
}

pub fn tcp_probe(name: &str, port: u16) -> Box<dyn Probe> {
    Box::new(TcpProbe::new(tcp_config(name, port)))
}

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

/// Collects every event emitted while installed as the default subscriber
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Install on the current thread. Use with the current-thread runtime.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(CaptureLayer(self.clone()));
        tracing::subscriber::set_default(subscriber)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, level: Level, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.level == level && event.message.starts_with(prefix))
            .count()
    }

    /// Number of logged outcomes (successes and failures)
    pub fn outcomes(&self) -> usize {
        self.count(Level::INFO, "health check succeeded")
            + self.count(Level::ERROR, "health check failed")
    }
}

struct CaptureLayer(CapturedLogs);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
