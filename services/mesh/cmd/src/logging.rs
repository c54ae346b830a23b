//! Console log format shared by every crate of the mesh.
//!
//! Lines look like `[timestamp] [component] [LEVEL] message key=value...`.
//! The component column names the mesh crate that logged the event, or the
//! `component` field when one is attached with the `component_*!` macros.

use std::fmt::{self, Write as _};
use std::io::IsTerminal;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[90m";

const COMPONENT_WIDTH: usize = 16;

/// Log with a `component` field naming a subsystem of the binary
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(component = $component, $($arg)*)
    };
}

#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(component = $component, $($arg)*)
    };
}

#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(component = $component, $($arg)*)
    };
}

/// `FormatEvent` producing the mesh console format
pub struct MeshLogFormatter {
    binary: String,
    color: bool,
}

impl MeshLogFormatter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            color: std::io::stdout().is_terminal() && std::env::var("TERM").map_or(false, |t| t != "dumb"),
        }
    }

    /// Column text for an event from `target`, padded or cut to a fixed width
    fn component(&self, explicit: Option<&str>, target: &str) -> String {
        let crate_name = target.split("::").next().unwrap_or(target);
        let name = match explicit {
            Some(component) => format!("{}/{}", self.binary, component),
            None => match crate_name.strip_prefix("mesh_") {
                Some(library) => format!("mesh-{}", library),
                None => self.binary.clone(),
            },
        };

        if name.chars().count() > COMPONENT_WIDTH {
            let cut: String = name.chars().take(COMPONENT_WIDTH - 1).collect();
            format!("{}…", cut)
        } else {
            format!("{:<width$}", name, width = COMPONENT_WIDTH)
        }
    }
}

fn level_style(level: &Level) -> (&'static str, &'static str) {
    match *level {
        Level::ERROR => ("ERROR", "\x1b[91m"),
        Level::WARN => ("WARN ", "\x1b[93m"),
        Level::INFO => ("INFO ", "\x1b[32m"),
        Level::DEBUG => ("DEBUG", DIM),
        Level::TRACE => ("TRACE", DIM),
    }
}

impl<S, N> FormatEvent<S, N> for MeshLogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let (label, level_color) = level_style(metadata.level());
        let (level_color, dim, reset) = if self.color {
            (level_color, DIM, RESET)
        } else {
            ("", "", "")
        };

        writeln!(
            writer,
            "{dim}[{}]{reset} [{}] [{level_color}{label}{reset}] {}{dim}{}{reset}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            self.component(fields.component.as_deref(), metadata.target()),
            fields.message,
            fields.extra,
        )
    }
}

/// Message, component, and the remaining structured fields of one event
#[derive(Default)]
struct EventFields {
    message: String,
    component: Option<String>,
    extra: String,
}

impl tracing::field::Visit for EventFields {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            "component" => self.component = Some(format!("{:?}", value).trim_matches('"').to_string()),
            name => {
                let _ = write!(self.extra, " {}={:?}", name, value);
            }
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "component" => self.component = Some(value.to_string()),
            name => {
                let _ = write!(self.extra, " {}={}", name, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> MeshLogFormatter {
        MeshLogFormatter {
            binary: "social-mesh".to_string(),
            color: false,
        }
    }

    #[test]
    fn test_component_names_the_logging_crate() {
        let formatter = plain();

        assert_eq!(
            formatter.component(None, "mesh_node::rendezvous"),
            format!("{:<16}", "mesh-node")
        );
        assert_eq!(
            formatter.component(None, "social_mesh::simulate"),
            format!("{:<16}", "social-mesh")
        );
        assert_eq!(
            formatter.component(Some("sim"), "social_mesh::simulate"),
            format!("{:<16}", "social-mesh/sim")
        );
    }

    #[test]
    fn test_long_component_is_cut() {
        let column = plain().component(Some("bootstrap"), "social_mesh::bootstrap");

        assert_eq!(column.chars().count(), COMPONENT_WIDTH);
        assert!(column.starts_with("social-mesh/boo"));
        assert!(column.ends_with('…'));
    }

    #[test]
    fn test_levels_share_one_width() {
        let widths: Vec<usize> = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE]
            .iter()
            .map(|level| level_style(level).0.len())
            .collect();
        assert!(widths.iter().all(|w| *w == 5));
    }
}
