use std::time::Duration;

use tracing::warn;

use wirecall_proto::{Handshake, WireFormat};
use wirecall_transport::DEFAULT_READ_TIMEOUT;

/// How a client encodes its calls.
///
/// Defaults match the conservative wire settings: binary format, no
/// compression, 64-bit integers spelled as strings in the text format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireConfig {
    pub format: WireFormat,
    pub compressed: bool,
    pub numeric_text: bool,
    pub read_timeout: Duration,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            format: WireFormat::Binary,
            compressed: false,
            numeric_text: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl WireConfig {
    /// Build a config from the environment, falling back to defaults for
    /// anything unset. Unrecognized values are ignored with a warning
    /// rather than failing the process.
    ///
    /// * `WIRECALL_FORMAT` — `binary` or `text`
    /// * `WIRECALL_COMPRESSION` — `true`/`false`
    /// * `WIRECALL_NUMERIC_TEXT` — `true`/`false`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("WIRECALL_FORMAT") {
            match raw.to_ascii_lowercase().as_str() {
                "binary" => config.format = WireFormat::Binary,
                "text" | "json" => config.format = WireFormat::Text,
                other => warn!(value = other, "ignoring unrecognized WIRECALL_FORMAT"),
            }
        }
        if let Ok(raw) = std::env::var("WIRECALL_COMPRESSION") {
            match parse_bool(&raw) {
                Some(flag) => config.compressed = flag,
                None => warn!(value = %raw, "ignoring unrecognized WIRECALL_COMPRESSION"),
            }
        }
        if let Ok(raw) = std::env::var("WIRECALL_NUMERIC_TEXT") {
            match parse_bool(&raw) {
                Some(flag) => config.numeric_text = flag,
                None => warn!(value = %raw, "ignoring unrecognized WIRECALL_NUMERIC_TEXT"),
            }
        }

        config
    }

    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    pub fn with_numeric_text(mut self, numeric_text: bool) -> Self {
        self.numeric_text = numeric_text;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// The handshake this config puts on the wire.
    pub fn handshake(&self) -> Handshake {
        Handshake::new(self.format, self.compressed, self.numeric_text)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_binary_uncompressed() {
        let config = WireConfig::default();
        assert_eq!(config.format, WireFormat::Binary);
        assert!(!config.compressed);
        assert!(!config.numeric_text);
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn builders_override_fields() {
        let config = WireConfig::default()
            .with_format(WireFormat::Text)
            .with_compression(true)
            .with_numeric_text(true)
            .with_read_timeout(Duration::from_secs(5));

        let handshake = config.handshake();
        assert_eq!(handshake.format, WireFormat::Text);
        assert!(handshake.compressed);
        assert!(handshake.numeric_text);
    }

    // Env vars are process-global, so all from_env cases live in one test.
    #[test]
    fn from_env_reads_and_ignores() {
        std::env::set_var("WIRECALL_FORMAT", "text");
        std::env::set_var("WIRECALL_COMPRESSION", "true");
        std::env::set_var("WIRECALL_NUMERIC_TEXT", "garbage");

        let config = WireConfig::from_env();
        assert_eq!(config.format, WireFormat::Text);
        assert!(config.compressed);
        assert!(!config.numeric_text);

        std::env::remove_var("WIRECALL_FORMAT");
        std::env::remove_var("WIRECALL_COMPRESSION");
        std::env::remove_var("WIRECALL_NUMERIC_TEXT");
    }
}
