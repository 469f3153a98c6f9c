use crate::models::{PriceBar, RawPriceBar};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(String),
    #[error("rate limited")]
    RateLimit,
    #[error("no data for {0}")]
    NoData(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The source answered, but its rows are malformed
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of daily price history, one symbol at a time.
///
/// Implementations return bars in ascending date order. An empty vector and an
/// error are both treated as "skip this symbol" by the scan.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<Vec<PriceBar>, FetchError>;

    fn name(&self) -> &str {
        "history"
    }
}

/// Fixed in-memory histories, mostly for tests and replaying captured data
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    histories: HashMap<String, Vec<PriceBar>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.histories.insert(symbol.to_string(), bars);
        self
    }

    pub fn insert(&mut self, symbol: &str, bars: Vec<PriceBar>) {
        self.histories.insert(symbol.to_string(), bars);
    }
}

#[async_trait]
impl HistoryProvider for InMemoryProvider {
    async fn fetch(&self, symbol: &str) -> Result<Vec<PriceBar>, FetchError> {
        self.histories
            .get(symbol)
            .cloned()
            .ok_or_else(|| FetchError::NoData(symbol.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Reads `<dir>/<SYMBOL>.csv` files with `date,open,high,low,close,volume` columns
#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }

    /// Parse CSV history content; rows are sorted by date
    pub fn parse_history(content: &[u8]) -> Result<Vec<PriceBar>, FetchError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content);

        let mut bars = Vec::new();
        for record in reader.deserialize::<RawPriceBar>() {
            let raw = record.map_err(|e| FetchError::InvalidData(e.to_string()))?;
            let bar = raw
                .to_price_bar()
                .map_err(|e| FetchError::InvalidData(e.to_string()))?;
            bars.push(bar);
        }

        bars.sort_by_key(|bar| bar.date);
        Ok(bars)
    }
}

#[async_trait]
impl HistoryProvider for CsvDirectoryProvider {
    async fn fetch(&self, symbol: &str) -> Result<Vec<PriceBar>, FetchError> {
        let path = self.path_for(symbol);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NoData(symbol.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Self::parse_history(&content)
    }

    fn name(&self) -> &str {
        "csv-dir"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn in_memory_provider_returns_stored_history() {
        let bar = PriceBar::new(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            1.0,
            1.0,
            1.0,
            1.0,
            10,
        );
        let provider = InMemoryProvider::new().with_history("A.NS", vec![bar.clone()]);

        assert_eq!(provider.fetch("A.NS").await.unwrap(), vec![bar]);
        assert!(matches!(provider.fetch("B.NS").await, Err(FetchError::NoData(_))));
    }

    #[tokio::test]
    async fn csv_directory_provider_reads_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("INFY.NS.csv")).unwrap();
        writeln!(file, "Date,Open,High,Low,Close,Volume").unwrap();
        writeln!(file, "2024-01-03,11,12,10,11.5,2000").unwrap();
        writeln!(file, "2024-01-02,10,11,9,10.5,1500.0").unwrap();
        drop(file);

        let provider = CsvDirectoryProvider::new(dir.path());
        let bars = provider.fetch("INFY.NS").await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date.to_string(), "2024-01-02");
        assert_eq!(bars[0].volume, 1500);
        assert_eq!(bars[1].close, 11.5);

        assert!(matches!(provider.fetch("TCS.NS").await, Err(FetchError::NoData(_))));
    }

    #[test]
    fn malformed_rows_are_invalid_data() {
        let bad_date = b"date,open,high,low,close,volume\nnot-a-date,1,1,1,1,1\n";
        assert!(matches!(
            CsvDirectoryProvider::parse_history(bad_date),
            Err(FetchError::InvalidData(_))
        ));

        let negative_volume = b"date,open,high,low,close,volume\n2024-01-02,1,1,1,1,-5\n";
        assert!(matches!(
            CsvDirectoryProvider::parse_history(negative_volume),
            Err(FetchError::InvalidData(_))
        ));

        let bad_number = b"date,open,high,low,close,volume\n2024-01-02,1,1,1,abc,5\n";
        assert!(matches!(
            CsvDirectoryProvider::parse_history(bad_number),
            Err(FetchError::InvalidData(_))
        ));
    }
}
