use std::{
    fs,
    path::PathBuf,
    time::{Duration, SystemTime},
};

use anyhow::{Context, anyhow};
use reqwest::{StatusCode, Url};
use ring::digest::{SHA256, digest};
use sleepweather_codec::{ForecastResponse, WeatherObservations, open_meteo::variable_name};
use sleepweather_types::{SleepWindow, WeatherMetric};
use strum::IntoEnumIterator;

const FORECAST_API: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Base delay, doubled after every failed attempt.
    pub backoff_factor: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: Duration::from_millis(200),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt`, starting at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_factor * 2_u32.pow(attempt.saturating_sub(1))
    }

    fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

/// Response bodies on disk, one file per request URL.
pub struct ResponseCache {
    dir: PathBuf,
    expire_after: Duration,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, expire_after: Duration) -> Self {
        Self {
            dir: dir.into(),
            expire_after,
        }
    }

    /// SHA-256 of the full URL, so entries survive toolchain upgrades.
    fn path(&self, url: &Url) -> PathBuf {
        let hex: String = digest(&SHA256, url.as_str().as_bytes())
            .as_ref()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        self.dir.join(format!("{hex}.json"))
    }

    pub fn get(&self, url: &Url) -> Option<Vec<u8>> {
        let path = self.path(url);
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let age = SystemTime::now().duration_since(modified).unwrap_or_default();
        if age >= self.expire_after {
            return None;
        }
        fs::read(path).ok()
    }

    pub fn put(&self, url: &Url, body: &[u8]) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path(url);
        fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))
    }
}

pub struct WeatherClient {
    client: reqwest::Client,
    latitude: f64,
    longitude: f64,
    retry: RetryConfig,
    cache: ResponseCache,
}

impl WeatherClient {
    pub fn new(latitude: f64, longitude: f64, retry: RetryConfig, cache: ResponseCache) -> Self {
        Self {
            client: reqwest::Client::new(),
            latitude,
            longitude,
            retry,
            cache,
        }
    }

    /// Request URL covering `sleep_date - 1` and `sleep_date` of `window`.
    pub fn url(&self, window: &SleepWindow) -> anyhow::Result<Url> {
        let variables = WeatherMetric::iter()
            .map(variable_name)
            .collect::<Vec<_>>()
            .join(",");
        let past_days = window.past_days();

        let params = [
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("hourly", variables.clone()),
            ("minutely_15", variables),
            ("past_days", past_days.to_string()),
            ("forecast_days", window.forecast_days().to_string()),
            ("past_minutely_15", (96 * past_days).to_string()),
            ("forecast_minutely_15", "4".to_owned()),
            ("timeformat", "unixtime".to_owned()),
        ];
        Ok(Url::parse_with_params(FORECAST_API, &params)?)
    }

    pub async fn fetch(&self, window: &SleepWindow) -> anyhow::Result<ForecastResponse> {
        let url = self.url(window)?;

        let body = match self.cache.get(&url) {
            Some(body) => {
                debug!("weather response served from cache");
                body
            }
            None => {
                let body = self.get_with_retry(&url).await?;
                if let Err(error) = self.cache.put(&url, &body) {
                    warn!("could not cache weather response: {error:#}");
                }
                body
            }
        };

        let response = ForecastResponse::from_slice(&body)?;
        info!(
            "coordinates {}°N {}°E, elevation {} m asl, utc offset {}s",
            response.latitude,
            response.longitude,
            response
                .elevation
                .map_or_else(|| "unknown".to_owned(), |e| e.to_string()),
            response.utc_offset_seconds
        );
        Ok(response)
    }

    pub async fn observations(&self, window: &SleepWindow) -> anyhow::Result<WeatherObservations> {
        let observations = self.fetch(window).await?.observations()?;
        info!(
            "weather window {} to {}",
            observations.start, observations.end
        );
        Ok(observations)
    }

    async fn get_with_retry(&self, url: &Url) -> anyhow::Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            let failure = match self.client.get(url.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let body = resp.bytes().await.context("failed to read weather response")?;
                    return Ok(body.to_vec());
                }
                Ok(resp) if RetryConfig::is_retryable(resp.status()) => {
                    anyhow!("weather API returned {}", resp.status())
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(anyhow!("weather request failed ({status}): {body}"));
                }
                Err(error) => anyhow!(error).context("failed to reach weather API"),
            };

            attempt += 1;
            if attempt > self.retry.max_retries {
                return Err(failure.context(format!(
                    "giving up after {} retries",
                    self.retry.max_retries
                )));
            }

            let backoff = self.retry.backoff(attempt);
            warn!(
                "{failure:#} - retry {attempt}/{} after {}ms",
                self.retry.max_retries,
                backoff.as_millis()
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client(cache_dir: &std::path::Path) -> WeatherClient {
        WeatherClient::new(
            48.1067,
            11.4248,
            RetryConfig::default(),
            ResponseCache::new(cache_dir, Duration::from_secs(3600)),
        )
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn param(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn last_night_window() {
        let dir = tempfile::tempdir().unwrap();
        let url = client(dir.path())
            .url(&SleepWindow::yesterday(date(10)))
            .unwrap();

        assert_eq!(param(&url, "past_days").as_deref(), Some("2"));
        assert_eq!(param(&url, "forecast_days").as_deref(), Some("0"));
        assert_eq!(param(&url, "past_minutely_15").as_deref(), Some("192"));
        assert_eq!(param(&url, "timeformat").as_deref(), Some("unixtime"));
        assert_eq!(
            param(&url, "hourly").as_deref(),
            Some("temperature_2m,relative_humidity_2m,surface_pressure,precipitation")
        );
        assert_eq!(param(&url, "latitude").as_deref(), Some("48.1067"));
    }

    #[test]
    fn same_day_window_needs_forecast() {
        let dir = tempfile::tempdir().unwrap();
        let window = SleepWindow::new(date(10), date(10)).unwrap();
        let url = client(dir.path()).url(&window).unwrap();

        assert_eq!(param(&url, "past_days").as_deref(), Some("1"));
        assert_eq!(param(&url, "forecast_days").as_deref(), Some("1"));
    }

    #[test]
    fn backoff_doubles() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(200));
        assert_eq!(retry.backoff(2), Duration::from_millis(400));
        assert_eq!(retry.backoff(5), Duration::from_millis(3200));
    }

    #[test]
    fn retryable_statuses() {
        assert!(RetryConfig::is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(RetryConfig::is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!RetryConfig::is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn cache_hits_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::parse("https://api.open-meteo.com/v1/forecast?past_days=2").unwrap();
        let other = Url::parse("https://api.open-meteo.com/v1/forecast?past_days=3").unwrap();

        let cache = ResponseCache::new(dir.path(), Duration::from_secs(3600));
        assert_eq!(cache.get(&url), None);
        cache.put(&url, b"{}").unwrap();
        assert_eq!(cache.get(&url), Some(b"{}".to_vec()));
        assert_eq!(cache.get(&other), None);

        let expired = ResponseCache::new(dir.path(), Duration::ZERO);
        assert_eq!(expired.get(&url), None);
    }

    #[test]
    fn cache_file_name_is_url_sha256() {
        let cache = ResponseCache::new("/tmp/weather", Duration::from_secs(60));
        let url = Url::parse("https://api.open-meteo.com/v1/forecast?latitude=47.37").unwrap();
        assert_eq!(
            cache.path(&url),
            PathBuf::from(
                "/tmp/weather/c98b2d34eef429c978a4f77a3eec87d74d762e2ba4bfcd59c82e6017401c5265.json"
            )
        );
    }
}
