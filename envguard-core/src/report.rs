//! Notifications and Report Rendering
//!
//! Both modes end in a [`Notification`]: a subject, a plain-text body and an
//! optional attachment. Edge mode builds one per emitted alert; batch mode
//! builds one per run from the [`ReportRenderer`] output.
//!
//! ## Report Format
//!
//! ```text
//! 📊 Daily Office Sensor Report (last 24h):
//!
//! ⚠️ Anomaly Periods Detected:
//! - 2024-05-01 10:00 – 10:02
//! - 2024-05-01 10:10 – 10:11
//! ```
//!
//! Each line shows the start with its date and the end as time only. Periods
//! are printed in the order given, which is chronological when they come
//! straight from [`group_periods`](crate::group_periods).

use chrono::Duration;

use crate::{
    constants::alerting::BATCH_WINDOW_HOURS,
    periods::AnomalyPeriod,
    threshold::Verdict,
};

/// Subject of every edge-mode alert
pub const ALERT_SUBJECT: &str = "IoT Alert 🚨";

/// Body line used when a batch window had no anomaly periods
pub const NO_ANOMALIES_LINE: &str = "✅ No anomalies detected.";

/// Heading above the list of periods
pub const PERIODS_HEADING: &str = "⚠️ Anomaly Periods Detected:";

/// Binary payload attached to a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Outbound message handed to a notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self { subject: subject.into(), body: body.into(), attachment: None }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Alert for an anomalous verdict from the threshold detector
    pub fn alert(verdict: &Verdict) -> Self {
        Self::new(ALERT_SUBJECT, verdict.reason.clone())
    }
}

/// Renders grouped anomaly periods into a daily report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRenderer {
    label: String,
    window_hours: i64,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new("office", Duration::hours(BATCH_WINDOW_HOURS))
    }
}

impl ReportRenderer {
    /// `source` names the analyzed location; an empty source means every location
    pub fn new(source: &str, window: Duration) -> Self {
        Self { label: title_case(source), window_hours: window.num_hours() }
    }

    /// First line of every report body
    pub fn header(&self) -> String {
        format!("📊 Daily {} Sensor Report (last {}h):", self.label, self.window_hours)
    }

    /// Subject line for the report notification
    pub fn subject(&self) -> String {
        format!("📈 Daily IoT Report – {} Sensors", self.label)
    }

    /// Render the report body
    pub fn render(&self, periods: &[AnomalyPeriod]) -> String {
        let mut lines = vec![self.header(), String::new()];

        if periods.is_empty() {
            lines.push(NO_ANOMALIES_LINE.to_string());
        } else {
            lines.push(PERIODS_HEADING.to_string());
            lines.extend(periods.iter().map(|period| {
                format!(
                    "- {} – {}",
                    period.start.format("%Y-%m-%d %H:%M"),
                    period.end.format("%H:%M"),
                )
            }));
        }

        lines.join("\n")
    }

    /// Build the report notification
    pub fn notification(&self, periods: &[AnomalyPeriod]) -> Notification {
        Notification::new(self.subject(), self.render(periods))
    }
}

fn title_case(source: &str) -> String {
    let source = source.trim();
    if source.is_empty() {
        return "All".to_string();
    }

    source
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
