//! Colorful console output for solver progress.
//!
//! Provides a custom `tracing` layer that formats knapsack solver events.
//!
//! ## Log Levels
//!
//! - **INFO**: Lifecycle events (solve start/end, surrogate bounds)
//! - **DEBUG**: Bound improvements, reductions and search summaries
//! - **TRACE**: Individual expansions and core extensions

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();
static EPOCH: OnceLock<Instant> = OnceLock::new();
static SOLVE_START_NANOS: AtomicU64 = AtomicU64::new(0);

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes the solver console output.
///
/// Safe to call multiple times; only the first call has effect.
/// Prints the KnapForge banner and sets up tracing with
/// `knapforge=info` unless `RUST_LOG` says otherwise.
pub fn init() {
    INIT.get_or_init(|| {
        print_banner();

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("knapforge=info"));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(KnapsackConsoleLayer)
            .try_init();
    });
}

fn mark_solve_start() {
    let epoch = EPOCH.get_or_init(Instant::now);
    let nanos = epoch.elapsed().as_nanos() as u64;
    SOLVE_START_NANOS.store(nanos, Ordering::Relaxed);
}

fn elapsed_secs() -> f64 {
    let Some(epoch) = EPOCH.get() else {
        return 0.0;
    };
    let start_nanos = SOLVE_START_NANOS.load(Ordering::Relaxed);
    let now_nanos = epoch.elapsed().as_nanos() as u64;
    now_nanos.saturating_sub(start_nanos) as f64 / 1_000_000_000.0
}

fn print_banner() {
    let banner = r#"
 _  __                   _____
| |/ /_ __   __ _ _ __  |  ___|__  _ __ __ _  ___
| ' /| '_ \ / _` | '_ \ | |_ / _ \| '__/ _` |/ _ \
| . \| | | | (_| | |_) ||  _| (_) | | | (_| |  __/
|_|\_\_| |_|\__,_| .__/ |_|  \___/|_|  \__, |\___|
                 |_|                   |___/
"#;

    let version_line = format!("             v{} - Exact 0-1 Knapsack Solver\n", VERSION);

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", banner.bright_cyan());
    let _ = writeln!(stdout, "{}", version_line.bright_white().bold());
    let _ = stdout.flush();
}

/// A tracing layer that formats solver events with colors.
pub struct KnapsackConsoleLayer;

impl<S: Subscriber> Layer<S> for KnapsackConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("knapforge") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor, *metadata.level());
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    status: Option<String>,
    mode: Option<String>,
    reason: Option<String>,
    phase: Option<String>,
    items: Option<u64>,
    capacity: Option<i64>,
    time_limit_ms: Option<u64>,
    duration_ms: Option<u64>,
    expansions: Option<u64>,
    peak_states: Option<u64>,
    states: Option<u64>,
    value: Option<i64>,
    lower_bound: Option<i64>,
    upper_bound: Option<i64>,
    multiplier: Option<i64>,
    cardinality: Option<u64>,
    included: Option<u64>,
    excluded: Option<u64>,
    free: Option<u64>,
}

fn unquote(value: &dyn std::fmt::Debug) -> String {
    format!("{:?}", value).trim_matches('"').to_string()
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "event" => self.event = Some(unquote(value)),
            "status" => self.status = Some(unquote(value)),
            "mode" => self.mode = Some(unquote(value)),
            "reason" => self.reason = Some(unquote(value)),
            "phase" => self.phase = Some(unquote(value)),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "items" => self.items = Some(value),
            "time_limit_ms" => self.time_limit_ms = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            "expansions" => self.expansions = Some(value),
            "peak_states" => self.peak_states = Some(value),
            "states" => self.states = Some(value),
            "cardinality" => self.cardinality = Some(value),
            "included" => self.included = Some(value),
            "excluded" => self.excluded = Some(value),
            "free" => self.free = Some(value),
            _ => self.record_i64(field, value as i64),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            "capacity" => self.capacity = Some(value),
            "value" => self.value = Some(value),
            "lower_bound" => self.lower_bound = Some(value),
            "upper_bound" => self.upper_bound = Some(value),
            "multiplier" => self.multiplier = Some(value),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "event" => self.event = Some(value.to_string()),
            "status" => self.status = Some(value.to_string()),
            "reason" => self.reason = Some(value.to_string()),
            _ => {}
        }
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    match v.event.as_deref().unwrap_or("") {
        "solve_start" => format_solve_start(v),
        "solve_end" => format_solve_end(v),
        "lower_bound_improved" => format_bound(v, true),
        "upper_bound_improved" => format_bound(v, false),
        "surrogate_bound" => format_surrogate(v),
        "reduction" => format_reduction(v),
        "search_end" if level <= Level::DEBUG => format_search_end(v),
        _ => String::new(),
    }
}

fn format_elapsed() -> String {
    format!("{:>7.3}s", elapsed_secs())
        .bright_black()
        .to_string()
}

fn format_solve_start(v: &EventVisitor) -> String {
    mark_solve_start();
    let items = v.items.unwrap_or(0);
    let capacity = v.capacity.unwrap_or(0);

    let mut output = format!(
        "{} {} Solving │ {} items │ capacity {}",
        format_elapsed(),
        "▶".bright_green().bold(),
        items.to_formatted_string(&Locale::en).bright_yellow(),
        capacity.to_formatted_string(&Locale::en).bright_yellow(),
    );
    if let Some(mode) = &v.mode {
        output.push_str(&format!(" │ {}", mode.bright_magenta()));
    }
    if let Some(limit) = v.time_limit_ms.filter(|&limit| limit > 0) {
        output.push_str(&format!(" │ {} limit", format_duration_ms(limit).bright_yellow()));
    }
    output
}

fn format_solve_end(v: &EventVisitor) -> String {
    let lower = v.lower_bound.unwrap_or(0);
    let upper = v.upper_bound.unwrap_or(lower);
    let converged = v.status.as_deref() == Some("converged");

    let status = if converged {
        "OPTIMAL".bright_green().bold().to_string()
    } else {
        "TIMED OUT".bright_yellow().bold().to_string()
    };

    let mut output = format!(
        "{} {} Solving complete │ {} │ {}",
        format_elapsed(),
        "■".bright_cyan().bold(),
        format_gap(lower, upper),
        status
    );

    output.push_str("\n\n");
    output.push_str(
        &"╔══════════════════════════════════════════════════════════╗"
            .bright_cyan()
            .to_string(),
    );
    output.push('\n');

    let status_text = if converged {
        "OPTIMAL SOLUTION FOUND"
    } else {
        "TIME LIMIT REACHED (bounds not closed)"
    };
    let inner_width: usize = 58;
    let total_pad = inner_width.saturating_sub(status_text.len());
    let left_pad = total_pad / 2;
    let right_pad = total_pad - left_pad;
    let status_colored = if converged {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_yellow().bold().to_string()
    };
    output.push_str(&format!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        status_colored,
        " ".repeat(right_pad),
        "║".bright_cyan()
    ));
    output.push('\n');

    output.push_str(
        &"╠══════════════════════════════════════════════════════════╣"
            .bright_cyan()
            .to_string(),
    );
    output.push('\n');

    let rows = [
        ("Best Profit:", lower.to_formatted_string(&Locale::en)),
        ("Upper Bound:", upper.to_formatted_string(&Locale::en)),
        (
            "Expansions:",
            v.expansions.unwrap_or(0).to_formatted_string(&Locale::en),
        ),
        (
            "Peak States:",
            v.peak_states.unwrap_or(0).to_formatted_string(&Locale::en),
        ),
        ("Duration:", format_duration_ms(v.duration_ms.unwrap_or(0))),
    ];
    for (label, value) in rows {
        output.push_str(&format!(
            "{}  {:<18}{:>36}  {}",
            "║".bright_cyan(),
            label,
            value,
            "║".bright_cyan()
        ));
        output.push('\n');
    }

    output.push_str(
        &"╚══════════════════════════════════════════════════════════╝"
            .bright_cyan()
            .to_string(),
    );
    output.push('\n');

    output
}

fn format_bound(v: &EventVisitor, lower: bool) -> String {
    let value = v.value.unwrap_or(0).to_formatted_string(&Locale::en);
    let reason = v.reason.as_deref().unwrap_or("unknown");
    let (icon, label, value) = if lower {
        ("▲".bright_green().to_string(), "lower", value.bright_green().to_string())
    } else {
        ("▼".bright_yellow().to_string(), "upper", value.bright_yellow().to_string())
    };
    format!(
        "{} {} {} bound {:>14} │ {}",
        format_elapsed(),
        icon,
        label.white().bold(),
        value,
        reason.bright_black()
    )
}

fn format_surrogate(v: &EventVisitor) -> String {
    format!(
        "{} {} Surrogate │ multiplier {} │ cardinality {} │ bound {}",
        format_elapsed(),
        "◆".bright_magenta(),
        v.multiplier.unwrap_or(0).to_formatted_string(&Locale::en).bright_magenta(),
        v.cardinality.unwrap_or(0).to_formatted_string(&Locale::en).white(),
        v.upper_bound.unwrap_or(0).to_formatted_string(&Locale::en).bright_yellow()
    )
}

fn format_reduction(v: &EventVisitor) -> String {
    format!(
        "{} {} Reduction │ {} in │ {} out │ {} free",
        format_elapsed(),
        "✂".bright_blue(),
        v.included.unwrap_or(0).to_formatted_string(&Locale::en).white(),
        v.excluded.unwrap_or(0).to_formatted_string(&Locale::en).white(),
        v.free.unwrap_or(0).to_formatted_string(&Locale::en).bright_yellow()
    )
}

fn format_search_end(v: &EventVisitor) -> String {
    format!(
        "{} {} Search {} │ {} states",
        format_elapsed(),
        "◀".bright_blue(),
        v.phase.as_deref().unwrap_or("ended").white().bold(),
        v.states.unwrap_or(0).to_formatted_string(&Locale::en).white()
    )
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

// Relative distance between the bounds, colored by whether it closed.
fn format_gap(lower: i64, upper: i64) -> String {
    let gap = upper.saturating_sub(lower);
    if gap <= 0 {
        return "gap 0".bright_green().to_string();
    }
    let relative = gap as f64 / (upper.unsigned_abs().max(1)) as f64 * 100.0;
    format!("gap {} ({:.3}%)", gap.to_formatted_string(&Locale::en), relative)
        .yellow()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration_ms(12), "12ms");
        assert_eq!(format_duration_ms(1500), "1.50s");
        assert_eq!(format_duration_ms(125_000), "2m 5s");
    }

    #[test]
    fn test_unknown_events_are_silent() {
        let visitor = EventVisitor {
            event: Some("expand".to_string()),
            ..EventVisitor::default()
        };
        assert!(format_event(&visitor, Level::TRACE).is_empty());
    }

    #[test]
    fn test_bound_line_mentions_reason() {
        let visitor = EventVisitor {
            event: Some("upper_bound_improved".to_string()),
            value: Some(1234),
            reason: Some("dantzig bound".to_string()),
            ..EventVisitor::default()
        };
        let line = format_event(&visitor, Level::DEBUG);
        assert!(line.contains("dantzig bound"));
        assert!(line.contains("1,234"));
    }

    #[test]
    fn test_closed_gap() {
        assert!(format_gap(10, 10).contains("gap 0"));
        assert!(format_gap(90, 100).contains("10.000%"));
    }
}
