//! Display names for well-known tickers.

/// Sorted by ticker so lookups can binary search.
static KNOWN_COMPANIES: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("ABT", "Abbott Laboratories"),
    ("AMD", "Advanced Micro Devices"),
    ("AMZN", "Amazon.com Inc."),
    ("BA", "Boeing Co."),
    ("BAC", "Bank of America Corp."),
    ("C", "Citigroup Inc."),
    ("COP", "ConocoPhillips"),
    ("CRM", "Salesforce Inc."),
    ("CVX", "Chevron Corp."),
    ("DIS", "Walt Disney Co."),
    ("GE", "General Electric Co."),
    ("GOOGL", "Alphabet Inc."),
    ("GS", "Goldman Sachs Group Inc."),
    ("HD", "Home Depot Inc."),
    ("IBM", "International Business Machines"),
    ("INTC", "Intel Corp."),
    ("IWM", "iShares Russell 2000 ETF"),
    ("JNJ", "Johnson & Johnson"),
    ("JPM", "JPMorgan Chase & Co."),
    ("KO", "Coca-Cola Co."),
    ("LOW", "Lowe's Companies Inc."),
    ("MA", "Mastercard Inc."),
    ("META", "Meta Platforms Inc."),
    ("MRK", "Merck & Co Inc."),
    ("MS", "Morgan Stanley"),
    ("MSFT", "Microsoft Corp."),
    ("NFLX", "Netflix Inc."),
    ("NVDA", "NVIDIA Corp."),
    ("ORCL", "Oracle Corp."),
    ("PEP", "PepsiCo Inc."),
    ("PFE", "Pfizer Inc."),
    ("PG", "Procter & Gamble Co."),
    ("PYPL", "PayPal Holdings Inc."),
    ("QQQ", "Invesco QQQ Trust"),
    ("SPY", "SPDR S&P 500 ETF"),
    ("SQ", "Block Inc."),
    ("TGT", "Target Corp."),
    ("TMO", "Thermo Fisher Scientific"),
    ("TSLA", "Tesla Inc."),
    ("UNH", "UnitedHealth Group Inc."),
    ("V", "Visa Inc."),
    ("VTI", "Vanguard Total Stock Market ETF"),
    ("WFC", "Wells Fargo & Co."),
    ("WMT", "Walmart Inc."),
    ("XOM", "Exxon Mobil Corp."),
];

/// Display name for a normalized symbol, falling back to the symbol itself.
pub fn company_name(symbol: &str) -> String {
    KNOWN_COMPANIES
        .binary_search_by(|(ticker, _)| ticker.cmp(&symbol))
        .map(|idx| KNOWN_COMPANIES[idx].1.to_string())
        .unwrap_or_else(|_| symbol.to_string())
}
