//! Screening universes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StockError;

/// Largest S&P 500 constituents by weight
pub const SP500_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "AMZN", "NVDA", "GOOGL", "META", "GOOG", "BRK-B", "UNH", "XOM",
    "JPM", "JNJ", "V", "PG", "MA", "HD", "CVX", "ABBV", "MRK", "LLY",
    "AVGO", "PEP", "KO", "COST", "CSCO", "TMO", "ABT", "MCD", "ACN", "WMT",
    "BAC", "CRM", "DHR", "PFE", "ADBE", "LIN", "CMCSA", "NKE", "NEE", "TXN",
    "VZ", "PM", "RTX", "ORCL", "UPS", "HON", "T", "QCOM", "INTC", "BMY",
    "UNP", "WFC", "MS", "AMGN", "BA", "LOW", "INTU", "COP", "SPGI", "GS",
    "BLK", "AMD", "CAT", "DE", "AMAT", "AXP", "ISRG", "BKNG", "SBUX", "PLD",
    "MDLZ", "ADI", "TJX", "GILD", "MMC", "CVS", "CI", "VRTX", "SYK", "C",
    "CB", "REGN", "DIS", "BDX", "EOG", "SO", "TMUS", "MO", "ZTS", "LRCX",
    "CME", "SCHW", "PGR", "AON", "BSX", "SLB", "NOC", "GE", "ITW", "CSX",
];

/// Nasdaq-100 constituents
pub const NASDAQ100_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "NVDA", "AMZN", "META", "AVGO", "GOOGL", "GOOG", "TSLA", "COST",
    "NFLX", "AMD", "PEP", "ADBE", "LIN", "CSCO", "TMUS", "QCOM", "INTU", "TXN",
    "AMGN", "ISRG", "CMCSA", "AMAT", "BKNG", "HON", "VRTX", "PANW", "ADP", "MU",
    "ADI", "SBUX", "GILD", "LRCX", "MELI", "INTC", "KLAC", "MDLZ", "CTAS", "REGN",
    "SNPS", "CDNS", "PYPL", "MAR", "CRWD", "CSX", "ASML", "ORLY", "PDD", "MRVL",
    "ABNB", "ROP", "NXPI", "CEG", "WDAY", "FTNT", "ADSK", "PCAR", "MNST", "CPRT",
    "AEP", "ROST", "CHTR", "KDP", "PAYX", "DASH", "TTD", "ODFL", "FAST", "KHC",
    "EA", "VRSK", "CTSH", "DDOG", "EXC", "GEHC", "XEL", "LULU", "BKR", "IDXX",
    "CCEP", "TEAM", "ZS", "FANG", "ANSS", "CSGP", "ON", "CDW", "DXCM", "MCHP",
    "TTWO", "BIIB", "GFS", "WBD", "MDB", "ILMN", "ARM", "MRNA", "SMCI", "DLTR",
];

/// Set of symbols a screen runs over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Universe {
    Sp500,
    Nasdaq100,
    Custom(Vec<String>),
}

impl Universe {
    /// Build a custom universe, normalizing and de-duplicating symbols
    pub fn custom<I, S>(symbols: I) -> Result<Self, StockError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim().to_ascii_uppercase();
            if symbol.is_empty() {
                continue;
            }
            if !symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
            {
                return Err(StockError::MalformedInput(format!("invalid symbol '{symbol}'")));
            }
            if !out.contains(&symbol) {
                out.push(symbol);
            }
        }

        if out.is_empty() {
            return Err(StockError::MalformedInput("empty symbol list".to_string()));
        }
        Ok(Universe::Custom(out))
    }

    pub fn symbols(&self) -> Vec<String> {
        match self {
            Universe::Sp500 => SP500_SYMBOLS.iter().map(ToString::to_string).collect(),
            Universe::Nasdaq100 => NASDAQ100_SYMBOLS.iter().map(ToString::to_string).collect(),
            Universe::Custom(symbols) => symbols.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Universe::Sp500 => SP500_SYMBOLS.len(),
            Universe::Nasdaq100 => NASDAQ100_SYMBOLS.len(),
            Universe::Custom(symbols) => symbols.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for Universe {
    type Err = StockError;

    /// `sp500`, `nasdaq100`, or a comma-separated symbol list
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sp500" | "s&p500" | "spx" => Ok(Universe::Sp500),
            "nasdaq100" | "ndx" => Ok(Universe::Nasdaq100),
            _ => Universe::custom(s.split(',')),
        }
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Universe::Sp500 => f.write_str("S&P 500"),
            Universe::Nasdaq100 => f.write_str("Nasdaq-100"),
            Universe::Custom(symbols) => write!(f, "custom ({} symbols)", symbols.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_universes() {
        assert_eq!("sp500".parse::<Universe>().unwrap(), Universe::Sp500);
        assert_eq!(" SP500 ".parse::<Universe>().unwrap(), Universe::Sp500);
        assert_eq!("nasdaq100".parse::<Universe>().unwrap(), Universe::Nasdaq100);
        assert_eq!("NDX".parse::<Universe>().unwrap(), Universe::Nasdaq100);
    }

    #[test]
    fn test_parse_custom_list() {
        let universe: Universe = "aapl, msft,,AAPL,brk-b".parse().unwrap();
        assert_eq!(
            universe,
            Universe::Custom(vec!["AAPL".to_string(), "MSFT".to_string(), "BRK-B".to_string()])
        );
        assert_eq!(universe.len(), 3);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            " , ,".parse::<Universe>(),
            Err(StockError::MalformedInput(_))
        ));
        assert!("AAPL,MS FT".parse::<Universe>().is_err());
    }

    #[test]
    fn test_builtin_lists_unique() {
        for list in [SP500_SYMBOLS, NASDAQ100_SYMBOLS] {
            let mut sorted = list.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), list.len());
        }
        assert_eq!(Universe::Sp500.symbols().len(), 100);
        assert_eq!(Universe::Nasdaq100.len(), 100);
    }
}
