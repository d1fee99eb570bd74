use std::path::{Path, PathBuf};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::events::{EventPublisher, PlayerEvent};

const DEFAULT_FILTER: &str = "info,radio_core=debug";

/// Forwards WARN/ERROR records to the event publisher so the front-ends
/// can show them.
pub struct BroadcastLayer {
    events: EventPublisher,
}

impl BroadcastLayer {
    pub fn new(events: EventPublisher) -> Self {
        Self { events }
    }
}

impl<S> tracing_subscriber::Layer<S> for BroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let level = event.metadata().level();
        if !matches!(*level, tracing::Level::WARN | tracing::Level::ERROR) {
            return;
        }

        let mut message = format!("{} [{}] ", chrono::Local::now().format("%H:%M:%S"), level);
        event.record(&mut MessageVisitor(&mut message));
        self.events.publish(PlayerEvent::Log(message));
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

pub fn default_log_path(binary: &str) -> PathBuf {
    radio_proto::platform::data_dir().join(format!("{}.log", binary))
}

/// File logging plus the broadcast layer.  Stdout belongs to the prompt or
/// the terminal UI, so nothing is written there.
pub fn init_file_logging(log_path: &Path, events: &EventPublisher) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(BroadcastLayer::new(events.clone()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)),
        )
        .try_init()?;

    tracing::info!("Log file: {:?}", log_path);
    Ok(())
}
