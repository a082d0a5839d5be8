//! Process configuration
//!
//! Every setting comes from a command-line flag or its environment variable
//! (a `.env` file is loaded first). The raw arguments are turned into
//! validated settings before anything connects; a bad value is fatal at
//! startup.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use clap::{Args, ValueEnum};
use envguard_connectors::{LogNotifier, MqttConfig, Notifier, SmtpConfig, SmtpNotifier};
use envguard_core::{
    constants::{alerting, thresholds},
    Bounds, ConfigError, CooldownPolicy, SensorKind, ThresholdDetector,
};
use envguard_ml::{DetectorConfig, ForestConfig};

use crate::error::ServiceResult;

/// Which notifier delivers alerts and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotifierKind {
    Smtp,
    /// Write notifications to the log (dry run)
    Log,
}

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// SQLite database holding readings and the alert log
    #[arg(long, env = "ENVGUARD_STORE_PATH", default_value = "edge_data.sqlite3")]
    pub store_path: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct NotifierArgs {
    #[arg(long, env = "ENVGUARD_NOTIFIER", value_enum, default_value = "smtp")]
    pub notifier: NotifierKind,

    #[arg(long, env = "EMAIL_SENDER")]
    pub email_sender: Option<String>,

    #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
    pub email_password: Option<String>,

    #[arg(long, env = "EMAIL_RECEIVER")]
    pub email_receiver: Option<String>,

    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = 465)]
    pub smtp_port: u16,
}

impl NotifierArgs {
    /// Mail settings; sender, password and receiver are all required
    pub fn smtp_config(&self) -> Result<SmtpConfig, ConfigError> {
        Ok(SmtpConfig {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            sender: required(&self.email_sender, "EMAIL_SENDER")?,
            password: required(&self.email_password, "EMAIL_PASSWORD")?,
            receiver: required(&self.email_receiver, "EMAIL_RECEIVER")?,
        })
    }

    pub fn build(&self) -> ServiceResult<Arc<dyn Notifier>> {
        match self.notifier {
            NotifierKind::Smtp => Ok(Arc::new(SmtpNotifier::new(&self.smtp_config()?)?)),
            NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct EdgeArgs {
    #[arg(long, env = "MQTT_HOST", default_value = "127.0.0.1")]
    pub mqtt_host: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    #[arg(long, env = "MQTT_CLIENT_ID", default_value = "envguard-edge")]
    pub mqtt_client_id: String,

    /// First topic segment, as in `<prefix>/<source>/<kind>`
    #[arg(long, env = "MQTT_TOPIC_PREFIX", default_value = "esp8266")]
    pub mqtt_topic_prefix: String,

    #[arg(long, env = "MQTT_USERNAME")]
    pub mqtt_username: Option<String>,

    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    #[arg(long, env = "TEMP_MIN", default_value_t = thresholds::TEMP_MIN_C)]
    pub temp_min: f64,

    #[arg(long, env = "TEMP_MAX", default_value_t = thresholds::TEMP_MAX_C)]
    pub temp_max: f64,

    #[arg(long, env = "HUM_MIN", default_value_t = thresholds::HUM_MIN_PCT)]
    pub hum_min: f64,

    #[arg(long, env = "HUM_MAX", default_value_t = thresholds::HUM_MAX_PCT)]
    pub hum_max: f64,

    #[arg(long, env = "ALERT_COOLDOWN_SECS", default_value_t = alerting::ALERT_COOLDOWN_SECS)]
    pub alert_cooldown_secs: i64,

    /// `volatile` forgets cooldowns on restart, `persisted` keeps them in the store
    #[arg(long, env = "COOLDOWN_POLICY", default_value = "volatile", value_parser = parse_policy)]
    pub cooldown_policy: CooldownPolicy,

    /// Messages buffered between the broker connection and the consumer
    #[arg(long, env = "ENVGUARD_CHANNEL_CAPACITY", default_value_t = 256)]
    pub channel_capacity: usize,
}

impl EdgeArgs {
    pub fn mqtt_config(&self) -> Result<MqttConfig, ConfigError> {
        let credentials = match (&self.mqtt_username, &self.mqtt_password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("MQTT_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("MQTT_USERNAME")),
        };

        Ok(MqttConfig {
            host: self.mqtt_host.clone(),
            port: self.mqtt_port,
            client_id: self.mqtt_client_id.clone(),
            topic_prefix: self.mqtt_topic_prefix.clone(),
            credentials,
            ..MqttConfig::default()
        })
    }

    pub fn settings(&self) -> Result<EdgeSettings, ConfigError> {
        let detector = ThresholdDetector::empty()
            .with_bounds(
                SensorKind::Temperature,
                Bounds::new(SensorKind::Temperature, self.temp_min, self.temp_max)?,
            )
            .with_bounds(
                SensorKind::Humidity,
                Bounds::new(SensorKind::Humidity, self.hum_min, self.hum_max)?,
            );

        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "ENVGUARD_CHANNEL_CAPACITY",
                reason: "must be at least 1".into(),
            });
        }

        Ok(EdgeSettings {
            detector,
            cooldown: positive_secs(self.alert_cooldown_secs, "ALERT_COOLDOWN_SECS")?,
            cooldown_policy: self.cooldown_policy,
            channel_capacity: self.channel_capacity,
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    #[arg(long, env = "BATCH_WINDOW_HOURS", default_value_t = alerting::BATCH_WINDOW_HOURS)]
    pub batch_window_hours: i64,

    /// Source to analyze; empty analyzes every source together
    #[arg(long, env = "BATCH_SOURCE", default_value = alerting::BATCH_SOURCE)]
    pub batch_source: String,

    #[arg(long, env = "GAP_THRESHOLD_SECS", default_value_t = alerting::GAP_THRESHOLD_SECS)]
    pub gap_threshold_secs: i64,

    #[arg(long, env = "CONTAMINATION", default_value_t = alerting::CONTAMINATION)]
    pub contamination: f64,

    #[arg(long, env = "RANDOM_SEED", default_value_t = alerting::RANDOM_SEED)]
    pub random_seed: u64,

    /// Slot width readings are truncated to before pivoting; use a coarser
    /// slot if a device's kinds often straddle a boundary
    #[arg(long, env = "ALIGNMENT_MILLIS", default_value_t = alerting::ALIGNMENT_MILLIS)]
    pub alignment_millis: i64,

    /// Repeat the run on this schedule instead of exiting after one
    #[arg(long, env = "BATCH_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,
}

impl BatchArgs {
    pub fn settings(&self) -> Result<BatchSettings, ConfigError> {
        let source = self.batch_source.trim();
        let settings = BatchSettings {
            window: positive_hours(self.batch_window_hours, "BATCH_WINDOW_HOURS")?,
            source: (!source.is_empty()).then(|| source.to_string()),
            gap: positive_secs(self.gap_threshold_secs, "GAP_THRESHOLD_SECS")?,
            detector: DetectorConfig {
                contamination: self.contamination,
                alignment: Duration::milliseconds(self.alignment_millis),
                ..DetectorConfig::default()
            },
            forest: ForestConfig::default().with_seed(self.random_seed),
            interval: match self.interval_secs {
                Some(0) => return Err(ConfigError::NonPositiveDuration { name: "BATCH_INTERVAL_SECS" }),
                Some(secs) => Some(std::time::Duration::from_secs(secs)),
                None => None,
            },
        };
        settings.detector.validate()?;
        Ok(settings)
    }
}

/// Validated edge-mode settings
#[derive(Debug, Clone)]
pub struct EdgeSettings {
    pub detector: ThresholdDetector,
    pub cooldown: Duration,
    pub cooldown_policy: CooldownPolicy,
    pub channel_capacity: usize,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            detector: ThresholdDetector::default(),
            cooldown: Duration::seconds(alerting::ALERT_COOLDOWN_SECS),
            cooldown_policy: CooldownPolicy::default(),
            channel_capacity: 256,
        }
    }
}

/// Validated batch-mode settings
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// How far back from "now" each run reads
    pub window: Duration,
    /// `None` analyzes all sources
    pub source: Option<String>,
    pub gap: Duration,
    pub detector: DetectorConfig,
    pub forest: ForestConfig,
    pub interval: Option<std::time::Duration>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            window: Duration::hours(alerting::BATCH_WINDOW_HOURS),
            source: Some(alerting::BATCH_SOURCE.to_string()),
            gap: Duration::seconds(alerting::GAP_THRESHOLD_SECS),
            detector: DetectorConfig::default(),
            forest: ForestConfig::default().with_seed(alerting::RANDOM_SEED),
            interval: None,
        }
    }
}

fn parse_policy(value: &str) -> Result<CooldownPolicy, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "volatile" => Ok(CooldownPolicy::Volatile),
        "persisted" => Ok(CooldownPolicy::Persisted),
        other => Err(format!("expected `volatile` or `persisted`, got `{other}`")),
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(name))
}

fn positive_secs(secs: i64, name: &'static str) -> Result<Duration, ConfigError> {
    if secs <= 0 {
        return Err(ConfigError::NonPositiveDuration { name });
    }
    Ok(Duration::seconds(secs))
}

fn positive_hours(hours: i64, name: &'static str) -> Result<Duration, ConfigError> {
    if hours <= 0 {
        return Err(ConfigError::NonPositiveDuration { name });
    }
    Ok(Duration::hours(hours))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};
    use std::sync::Once;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        edge: EdgeArgs,
        #[command(flatten)]
        batch: BatchArgs,
        #[command(flatten)]
        notifier: NotifierArgs,
    }

    /// Drop every variable the arguments fall back to, so the shell running
    /// the tests cannot change the defaults
    fn clear_env() {
        static CLEARED: Once = Once::new();
        CLEARED.call_once(|| {
            for arg in Harness::command().get_arguments() {
                if let Some(name) = arg.get_env() {
                    std::env::remove_var(name);
                }
            }
        });
    }

    fn parse(args: &[&str]) -> Harness {
        clear_env();
        Harness::try_parse_from(std::iter::once("envguard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_constants() {
        let harness = parse(&[]);
        let edge = harness.edge.settings().unwrap();
        assert_eq!(edge.cooldown, Duration::hours(1));
        assert_eq!(edge.cooldown_policy, CooldownPolicy::Volatile);
        assert_eq!(edge.detector, ThresholdDetector::default());

        let batch = harness.batch.settings().unwrap();
        assert_eq!(batch.window, Duration::hours(24));
        assert_eq!(batch.source.as_deref(), Some("office"));
        assert_eq!(batch.gap, Duration::minutes(5));
        assert_eq!(batch.detector.contamination, 0.05);
        assert_eq!(batch.forest.seed, 42);
        assert_eq!(batch.detector.alignment, Duration::seconds(1));
        assert_eq!(batch.interval, None);

        let mqtt = harness.edge.mqtt_config().unwrap();
        assert_eq!(mqtt.topics(), MqttConfig::default().topics());
        assert_eq!(mqtt.credentials, None);
    }

    #[test]
    fn overrides_and_policy() {
        let harness = parse(&[
            "--temp-max",
            "35",
            "--cooldown-policy",
            "persisted",
            "--batch-source",
            "",
            "--interval-secs",
            "86400",
            "--alignment-millis",
            "2000",
        ]);
        let edge = harness.edge.settings().unwrap();
        assert_eq!(edge.cooldown_policy, CooldownPolicy::Persisted);
        assert_eq!(edge.detector.bounds(SensorKind::Temperature).unwrap().max(), 35.0);

        let batch = harness.batch.settings().unwrap();
        assert_eq!(batch.source, None);
        assert_eq!(batch.interval, Some(std::time::Duration::from_secs(86_400)));
        assert_eq!(batch.detector.alignment, Duration::seconds(2));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            parse(&["--hum-min", "90"]).edge.settings(),
            Err(ConfigError::InvalidBounds { .. })
        ));
        assert!(matches!(
            parse(&["--alert-cooldown-secs", "0"]).edge.settings(),
            Err(ConfigError::NonPositiveDuration { name: "ALERT_COOLDOWN_SECS" })
        ));
        assert!(matches!(
            parse(&["--contamination", "0.7"]).batch.settings(),
            Ok(_)
        ));
        assert!(matches!(
            parse(&["--contamination", "1.5"]).batch.settings(),
            Err(ConfigError::InvalidContamination(_))
        ));
        assert!(matches!(
            parse(&["--alignment-millis=-5"]).batch.settings(),
            Err(ConfigError::Invalid { name: "alignment", .. })
        ));
        clear_env();
        assert!(Harness::try_parse_from(["envguard", "--cooldown-policy", "forever"]).is_err());
    }

    #[test]
    fn smtp_requires_credentials() {
        let harness = parse(&["--email-sender", "a@example.com", "--email-receiver", "b@example.com"]);
        assert_eq!(
            harness.notifier.smtp_config(),
            Err(ConfigError::Missing("EMAIL_PASSWORD"))
        );

        let harness = parse(&["--notifier", "log"]);
        assert!(harness.notifier.build().is_ok());
    }

    #[test]
    fn mqtt_credentials_come_in_pairs() {
        assert_eq!(
            parse(&["--mqtt-username", "edge"]).edge.mqtt_config(),
            Err(ConfigError::Missing("MQTT_PASSWORD"))
        );
        let config = parse(&["--mqtt-username", "edge", "--mqtt-password", "pw"]).edge.mqtt_config().unwrap();
        assert_eq!(config.credentials, Some(("edge".into(), "pw".into())));
    }
}
