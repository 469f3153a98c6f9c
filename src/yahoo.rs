use async_trait::async_trait;
use bullish_scanner::models::PriceBar;
use bullish_scanner::services::{FetchError, HistoryProvider};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration as StdDuration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::config::HistoryConfig;

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";
const FALLBACK_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;
const MAX_BACKOFF: StdDuration = StdDuration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Decode a chart API response body into ascending daily bars.
///
/// Timestamps are converted to calendar dates in the exchange timezone. Slots
/// with a missing open/high/low/close are dropped, a missing volume counts as
/// zero, and when two slots land on the same date the later one wins.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<PriceBar>, FetchError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

    if let Some(error) = envelope.chart.error {
        let code = error.code.unwrap_or_default();
        if code.eq_ignore_ascii_case("Not Found") {
            return Err(FetchError::NoData(symbol.to_string()));
        }
        return Err(FetchError::InvalidResponse(format!(
            "{}: {}",
            code,
            error.description.unwrap_or_default()
        )));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(FetchError::NoData(symbol.to_string()));
    };

    let tz = result
        .meta
        .and_then(|m| m.exchange_timezone_name)
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(FALLBACK_TIMEZONE);

    let quote = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .unwrap_or_default();

    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let mut by_date: BTreeMap<NaiveDate, PriceBar> = BTreeMap::new();
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        ) else {
            continue;
        };
        let Some(utc) = DateTime::from_timestamp(ts, 0) else {
            continue;
        };
        let date = utc.with_timezone(&tz).date_naive();
        let volume = at(&quote.volume, i)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
            .unwrap_or(0);

        by_date.insert(date, PriceBar::new(date, open, high, low, close, volume));
    }

    Ok(by_date.into_values().collect())
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN || status.is_server_error()
}

/// Daily history from the public chart API
pub struct YahooClient {
    client: Client,
    base_url: String,
    range: String,
    interval: String,
    max_retries: u32,
    rate_limit_per_minute: u32,
    request_timestamps: Mutex<Vec<Instant>>,
    user_agents: Vec<String>,
    random_agent: bool,
}

impl YahooClient {
    pub fn new(config: &HistoryConfig, random_agent: bool) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15".to_string(),
        ];

        Ok(YahooClient {
            client,
            base_url: CHART_BASE_URL.to_string(),
            range: config.range.clone(),
            interval: config.interval.clone(),
            max_retries: config.max_retries,
            rate_limit_per_minute: config.rate_limit_per_minute.max(1),
            request_timestamps: Mutex::new(Vec::new()),
            user_agents,
            random_agent,
        })
    }

    pub fn chart_url(&self, symbol: &str) -> String {
        format!(
            "{}{}?range={}&interval={}",
            self.base_url, symbol, self.range, self.interval
        )
    }

    fn get_user_agent(&self) -> &str {
        if self.random_agent {
            use rand::seq::IndexedRandom;
            if let Some(agent) = self.user_agents.choose(&mut rand::rng()) {
                return agent;
            }
        }
        &self.user_agents[0]
    }

    async fn enforce_rate_limit(&self) {
        let mut timestamps = self.request_timestamps.lock().await;
        let window = StdDuration::from_secs(60);

        // Remove timestamps older than 1 minute
        let now = Instant::now();
        timestamps.retain(|&t| now.duration_since(t) < window);

        if timestamps.len() >= self.rate_limit_per_minute as usize {
            if let Some(&oldest) = timestamps.first() {
                let wait_time = window.saturating_sub(now.duration_since(oldest));
                if !wait_time.is_zero() {
                    tracing::debug!(wait_ms = wait_time.as_millis() as u64, "Rate limit reached, waiting");
                    sleep(wait_time + StdDuration::from_millis(100)).await;
                }
            }
        }

        timestamps.push(Instant::now());
    }

    async fn fetch_once(&self, url: &str, symbol: &str) -> Result<Vec<PriceBar>, (FetchError, bool)> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("User-Agent", self.get_user_agent())
            .send()
            .await
            .map_err(|e| (FetchError::Http(e.to_string()), true))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err((FetchError::NoData(symbol.to_string()), false));
        }
        if !status.is_success() {
            let error = if status == StatusCode::TOO_MANY_REQUESTS {
                FetchError::RateLimit
            } else {
                FetchError::Http(format!("status {}", status))
            };
            return Err((error, is_retryable(status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| (FetchError::Http(e.to_string()), true))?;

        match parse_chart(symbol, &body) {
            Ok(bars) if bars.is_empty() => Err((FetchError::NoData(symbol.to_string()), true)),
            Ok(bars) => Ok(bars),
            Err(e @ FetchError::NoData(_)) => Err((e, false)),
            Err(e) => Err((e, true)),
        }
    }
}

#[async_trait]
impl HistoryProvider for YahooClient {
    async fn fetch(&self, symbol: &str) -> Result<Vec<PriceBar>, FetchError> {
        let url = self.chart_url(symbol);
        let mut last_error = FetchError::NoData(symbol.to_string());

        for attempt in 0..=self.max_retries {
            self.enforce_rate_limit().await;

            if attempt > 0 {
                let delay = StdDuration::from_secs_f64(2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>());
                sleep(delay.min(MAX_BACKOFF)).await;
            }

            match self.fetch_once(&url, symbol).await {
                Ok(bars) => return Ok(bars),
                Err((error, retryable)) => {
                    tracing::debug!(symbol, attempt, %error, retryable, "History request failed");
                    last_error = error;
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}
