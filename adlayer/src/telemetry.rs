//! Analytics event emission.
//!
//! The host wires its analytics backend in through [`EventSink`]; emission is
//! fire-and-forget and must never block or fail visibly. Event names and
//! attribute keys are stable strings consumed by downstream dashboards.

use crate::category::AdCategory;

/// Events the coordination layer reports.
#[derive(Debug, Clone, PartialEq)]
pub enum AdEvent {
    /// Remote configuration fetch failed on the very first app launch.
    RemoteConfigLoadFailFirstOpen,
    /// Remote configuration fetch failed on a later launch.
    RemoteConfigLoadFailLaunchApp,
    /// The rendering collaborator reported revenue for a presented ad.
    AdRevenue {
        /// Unit the revenue was earned on.
        unit_id: String,
        /// Category of the presenting slot.
        format: AdCategory,
        /// Revenue in micro-units of `currency`.
        value_micros: i64,
        /// ISO 4217 currency code.
        currency: String,
    },
}

impl AdEvent {
    /// Stable wire name for the event.
    pub fn name(&self) -> &'static str {
        match self {
            AdEvent::RemoteConfigLoadFailFirstOpen => "remote_config_load_fail_first_open",
            AdEvent::RemoteConfigLoadFailLaunchApp => "remote_config_load_fail_launch_app",
            AdEvent::AdRevenue { .. } => "ad_revenue",
        }
    }

    /// Attribute key/value pairs attached to the event.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        match self {
            AdEvent::RemoteConfigLoadFailFirstOpen | AdEvent::RemoteConfigLoadFailLaunchApp => {
                Vec::new()
            }
            AdEvent::AdRevenue {
                unit_id,
                format,
                value_micros,
                currency,
            } => vec![
                ("unit_id", unit_id.clone()),
                ("format", format.to_string()),
                ("value_micros", value_micros.to_string()),
                ("currency", currency.clone()),
            ],
        }
    }
}

/// Fire-and-forget analytics sink.
pub trait EventSink: Send + Sync {
    /// Records one event. Must not block.
    fn emit(&self, event: AdEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: AdEvent) {}
}

/// Sink that forwards events to the tracing subscriber.
///
/// Useful for the demo harness and for hosts without a dedicated analytics
/// backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AdEvent) {
        tracing::info!(
            target: "adlayer::telemetry",
            event = event.name(),
            attributes = ?event.attributes(),
            "analytics event"
        );
    }
}
