//! Dashboard insights: periodic weather summary and topic advice.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::InsightConfig;
use crate::gateway::AiGateway;
use crate::profile::UserProfile;

/// Shown until the first weather summary arrives.
pub const WEATHER_PENDING: &str = "جاري تحليل حالة الطقس...";

/// Shown when advice generation fails.
pub const ADVICE_FAILURE: &str = "حدث خطأ أثناء توليد الأفكار. يرجى المحاولة مرة أخرى.";

const SUGGESTED_TOPICS: &[&str] = &[
    "تقليل استخدام البلاستيك",
    "توفير المياه في المنزل",
    "إعادة تدوير الورق",
    "الزراعة المنزلية",
    "الطاقة الشمسية",
];

/// Topics offered as one-tap suggestions.
#[must_use]
pub fn advice_suggestions() -> &'static [&'static str] {
    SUGGESTED_TOPICS
}

/// Ideas for `topic`, or `None` when the topic is blank.
///
/// Gateway failures are absorbed into [`ADVICE_FAILURE`].
pub async fn generate_advice<G>(
    gateway: &G,
    topic: &str,
    profile: Option<&UserProfile>,
) -> Option<String>
where
    G: AiGateway + ?Sized,
{
    let topic = topic.trim();
    if topic.is_empty() {
        return None;
    }
    match gateway.topic_advice(topic, profile).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(code = e.code(), "advice generation failed: {e}");
            Some(ADVICE_FAILURE.to_owned())
        }
    }
}

/// Keeps the latest weather summary for a profile's city fresh.
///
/// Call [`run`](Self::run) to start refreshing:
///
/// ```rust,ignore
/// let (refresher, weather) = WeatherRefresher::new(gateway, profile, &config.insight, cancel.child_token());
/// tokio::spawn(refresher.run());
/// ```
pub struct WeatherRefresher<G: AiGateway + ?Sized> {
    gateway: Arc<G>,
    profile: UserProfile,
    tx: watch::Sender<String>,
    cancel: CancellationToken,
    refresh_interval: Duration,
}

impl<G: AiGateway + ?Sized> WeatherRefresher<G> {
    /// Create a refresher and the receiver observing its summaries.
    pub fn new(
        gateway: Arc<G>,
        profile: UserProfile,
        config: &InsightConfig,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<String>) {
        let (tx, rx) = watch::channel(WEATHER_PENDING.to_owned());
        let refresher = Self {
            gateway,
            profile,
            tx,
            cancel,
            refresh_interval: Duration::from_secs(config.weather_refresh_secs.max(1)),
        };
        (refresher, rx)
    }

    /// Override the refresh interval.
    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Fetch now, then every refresh interval, until cancelled or no
    /// receiver remains.
    pub async fn run(self) {
        info!(city = %self.profile.city, "weather refresher started");
        loop {
            let summary = self.gateway.weather_insight(&self.profile).await;
            if self.tx.send(summary).is_err() {
                debug!("weather receivers gone, stopping");
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("weather refresher cancelled");
                    break;
                }
                _ = tokio::time::sleep(self.refresh_interval) => {}
            }
        }
    }
}
