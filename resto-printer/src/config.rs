use std::path::PathBuf;
use std::time::Duration;

use crate::discovery::DEFAULT_BLE_SCAN_TIMEOUT;
use crate::encoding::TextEncoding;
use crate::stream::DEFAULT_WIDTH;

/// Registry database file name inside the data directory
const REGISTRY_FILE: &str = "printers.redb";

/// Printer subsystem configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | RESTO_DATA_DIR | ./data | registry database directory |
/// | PAPER_WIDTH | 32 | characters per line |
/// | PRINTER_ENCODING | utf8 | `utf8` or `gbk` |
/// | BLE_SCAN_TIMEOUT_MS | 10000 | BLE scan hard stop |
/// | CONNECT_TIMEOUT_MS | 15000 | connect timeout |
/// | TRANSMIT_TIMEOUT_MS | 15000 | transmit timeout |
/// | BLE_CHUNK_SIZE | 128 | BLE write chunk size (bytes) |
/// | RFCOMM_CHANNEL | 0 | `/dev/rfcommN` index used for Classic binds |
/// | LOG_LEVEL | info | log level |
/// | LOG_DIR | (unset) | daily rolling log directory |
#[derive(Debug, Clone)]
pub struct PrinterConfig {
    pub data_dir: PathBuf,
    pub paper_width: usize,
    pub encoding: TextEncoding,
    pub ble_scan_timeout: Duration,
    pub connect_timeout: Duration,
    pub transmit_timeout: Duration,
    pub ble_chunk_size: usize,
    pub rfcomm_channel: u8,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl PrinterConfig {
    /// Load configuration from the environment, defaulting unset values
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("RESTO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            paper_width: env_parse("PAPER_WIDTH").unwrap_or(DEFAULT_WIDTH),
            encoding: env_parse("PRINTER_ENCODING").unwrap_or_default(),
            ble_scan_timeout: env_parse("BLE_SCAN_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_BLE_SCAN_TIMEOUT),
            connect_timeout: Duration::from_millis(
                env_parse("CONNECT_TIMEOUT_MS").unwrap_or(15_000),
            ),
            transmit_timeout: Duration::from_millis(
                env_parse("TRANSMIT_TIMEOUT_MS").unwrap_or(15_000),
            ),
            ble_chunk_size: env_parse("BLE_CHUNK_SIZE").unwrap_or(128),
            rfcomm_channel: env_parse("RFCOMM_CHANNEL").unwrap_or(0),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// Environment config with a different data directory
    ///
    /// Used by tests and demos
    pub fn with_overrides(data_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::from_env();
        config.data_dir = data_dir.into();
        config
    }

    /// Path of the printer registry database
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(REGISTRY_FILE)
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
