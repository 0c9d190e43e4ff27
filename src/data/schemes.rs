use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref DEFAULT_PORT_MAP: HashMap<&'static str, u16> = {
        let mut m = HashMap::new();

        // Handshake (HTTP) schemes
        m.insert("http", INSECURE_PORT);
        m.insert("https", SECURE_PORT);

        // WebSocket schemes
        m.insert("ws", INSECURE_PORT);
        m.insert("wss", SECURE_PORT);

        m
    };

    // RFC 3986 scheme followed by "://"
    static ref SCHEME_PREFIX: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap();
}

pub const INSECURE_PORT: u16 = 80;
pub const SECURE_PORT: u16 = 443;

/// Default port of a scheme, case-insensitive. Unknown schemes have none.
pub fn default_port(scheme: &str) -> Option<u16> {
    DEFAULT_PORT_MAP.get(scheme.to_ascii_lowercase().as_str()).copied()
}

/// True for schemes carried over TLS.
pub fn is_secure_scheme(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("wss")
}

pub fn has_scheme(uri: &str) -> bool {
    SCHEME_PREFIX.is_match(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_ignore_case() {
        assert_eq!(default_port("HTTP"), Some(80));
        assert_eq!(default_port("Wss"), Some(443));
        assert_eq!(default_port("ftp"), None);
    }

    #[test]
    fn plain_and_tls_schemes_share_ports() {
        assert_eq!(default_port("ws"), Some(INSECURE_PORT));
        assert_eq!(default_port("http"), default_port("ws"));
        assert_eq!(default_port("https"), Some(SECURE_PORT));
        assert!(is_secure_scheme("WSS") && !is_secure_scheme("ws"));
    }

    #[test]
    fn scheme_detection() {
        assert!(has_scheme("https://example.com"));
        assert!(has_scheme("WS://example.com"));
        assert!(!has_scheme("example.com/chat"));
        assert!(!has_scheme("//example.com"));
    }
}
