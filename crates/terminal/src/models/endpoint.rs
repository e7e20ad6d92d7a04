use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where the terminal listens and which API session id to use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalEndpoint {
    pub host: String,
    pub port: u16,
    pub client_id: i32,
}

impl TerminalEndpoint {
    pub fn new(host: impl Into<String>, port: u16, client_id: i32) -> Self {
        Self {
            host: host.into(),
            port,
            client_id,
        }
    }

    /// `host:port` as expected by the API client.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for TerminalEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (client id {})", self.address(), self.client_id)
    }
}

/// Market data type requested after connecting.
///
/// `Delayed` returns live data where the account holds a subscription and
/// delayed data everywhere else.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketDataKind {
    Live,
    Frozen,
    #[default]
    Delayed,
    DelayedFrozen,
}

impl FromStr for MarketDataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" | "realtime" | "1" => Ok(Self::Live),
            "frozen" | "2" => Ok(Self::Frozen),
            "delayed" | "3" => Ok(Self::Delayed),
            "delayed_frozen" | "delayed-frozen" | "4" => Ok(Self::DelayedFrozen),
            other => Err(format!("unknown market data type '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address() {
        let endpoint = TerminalEndpoint::new("host.docker.internal", 7498, 10);
        assert_eq!(endpoint.address(), "host.docker.internal:7498");
        assert_eq!(
            endpoint.to_string(),
            "host.docker.internal:7498 (client id 10)"
        );
    }

    #[test]
    fn test_market_data_kind_parse() {
        assert_eq!("delayed".parse::<MarketDataKind>(), Ok(MarketDataKind::Delayed));
        assert_eq!("3".parse::<MarketDataKind>(), Ok(MarketDataKind::Delayed));
        assert_eq!(" Live ".parse::<MarketDataKind>(), Ok(MarketDataKind::Live));
        assert_eq!(
            "delayed-frozen".parse::<MarketDataKind>(),
            Ok(MarketDataKind::DelayedFrozen)
        );
        assert!("streaming".parse::<MarketDataKind>().is_err());
    }
}
