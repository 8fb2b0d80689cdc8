use serde::{Deserialize, Serialize};

/// One configured ticker with the sector it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub sector: String,
    pub symbol: String,
    pub company_name: String,
}

/// Ordered sector -> (symbol, name) mapping. Iteration follows sector
/// declaration order, then symbol order within the sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolUniverse {
    entries: Vec<SymbolEntry>,
}

const DEFAULT_PORTFOLIO: &[(&str, &[(&str, &str)])] = &[
    (
        "Financial Sector",
        &[
            ("HDFCBANK.NS", "HDFC Bank"),
            ("BAJFINANCE.NS", "Bajaj Finance"),
            ("ICICIBANK.NS", "ICICI Bank"),
            ("BAJAJHFL.NS", "Bajaj Housing"),
            ("SAVAFINANCIAL.BO", "Savani Financials"),
            ("SBILIFE.NS", "SBI Life"),
        ],
    ),
    (
        "Tech Sector",
        &[
            ("AFFLE.NS", "Affle India"),
            ("LTIM.NS", "LTI Mindtree"),
            ("KPITTECH.NS", "KPIT Tech"),
            ("TATATECH.NS", "Tata Tech"),
            ("BLSE.NS", "BLS E-Services"),
            ("TANLA.NS", "Tanla Platforms"),
            ("INFY.NS", "Infosys"),
            ("HAPPSTMNDS.NS", "Happiest Minds"),
        ],
    ),
    (
        "Consumer Sector",
        &[
            ("DMART.NS", "DMart"),
            ("TATACONSUM.NS", "Tata Consumer"),
            ("PIDILITIND.NS", "Pidilite"),
        ],
    ),
    (
        "Power Sector",
        &[
            ("TATAPOWER.NS", "Tata Power"),
            ("KPIGREEN.NS", "KPI Green"),
            ("SUZLON.NS", "Suzlon"),
            ("GENSOL.NS", "Gensol"),
        ],
    ),
    (
        "Pipe Sector",
        &[
            ("HARIOMPIPE.NS", "Hariom Pipes"),
            ("ASTRAL.NS", "Astral"),
            ("POLYCAB.NS", "Polycab"),
        ],
    ),
    (
        "Others",
        &[
            ("CLEAN.NS", "Clean Science"),
            ("DEEPAKNTR.NS", "Deepak Nitrite"),
            ("FINEORG.NS", "Fine Organic"),
            ("GRAVITA.NS", "Gravita"),
            ("EASEMYTRIP.NS", "Easemytrip"),
        ],
    ),
];

impl SymbolUniverse {
    /// Build from `(sector, [(symbol, company_name)])` groups, in order.
    pub fn from_sectors<S, I, T>(sectors: I) -> Self
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, Vec<(T, T)>)>,
        T: AsRef<str>,
    {
        let entries = sectors
            .into_iter()
            .flat_map(|(sector, symbols)| {
                let sector = sector.as_ref().to_string();
                symbols.into_iter().map(move |(symbol, name)| SymbolEntry {
                    sector: sector.clone(),
                    symbol: symbol.as_ref().to_string(),
                    company_name: name.as_ref().to_string(),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct sector names in declaration order.
    pub fn sectors(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in &self.entries {
            if out.last() != Some(&e.sector.as_str()) {
                out.push(&e.sector);
            }
        }
        out
    }
}

impl Default for SymbolUniverse {
    fn default() -> Self {
        Self::from_sectors(
            DEFAULT_PORTFOLIO
                .iter()
                .map(|(sector, symbols)| (*sector, symbols.to_vec())),
        )
    }
}
