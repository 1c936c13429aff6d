//! Enumerations used throughout the tickwire pipeline.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TwError;

// ---------------------------------------------------------------------------
// Exchange identifiers
// ---------------------------------------------------------------------------

/// Supported cryptocurrency exchanges.
///
/// The lowercase name is the constant `exchange` field of every record a
/// connector pushes downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Huobi,
    Bittrex,
    Binance,
    Kraken,
}

impl Exchange {
    pub const ALL: [Exchange; 4] = [Exchange::Huobi, Exchange::Bittrex, Exchange::Binance, Exchange::Kraken];

    /// Lowercase wire name (e.g. `"huobi"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Huobi => "huobi",
            Self::Bittrex => "bittrex",
            Self::Binance => "binance",
            Self::Kraken => "kraken",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = TwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "huobi" => Ok(Self::Huobi),
            "bittrex" => Ok(Self::Bittrex),
            "binance" => Ok(Self::Binance),
            "kraken" => Ok(Self::Kraken),
            other => Err(TwError::Config(format!("unknown exchange: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire compression
// ---------------------------------------------------------------------------

/// Compression applied by an exchange to its payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Plain text payloads.
    #[default]
    None,
    /// gzip-wrapped binary frames (Huobi).
    Gzip,
    /// Raw deflate stream without zlib header (Bittrex hub arguments).
    Deflate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Huobi".parse::<Exchange>().unwrap(), Exchange::Huobi);
        assert_eq!("BINANCE".parse::<Exchange>().unwrap(), Exchange::Binance);
        assert_eq!("Kraken".parse::<Exchange>().unwrap(), Exchange::Kraken);
        assert!("okx".parse::<Exchange>().is_err());
    }

    #[test]
    fn display_matches_wire_name() {
        for ex in Exchange::ALL {
            assert_eq!(ex.to_string(), ex.as_str());
        }
    }
}
