/// Decimal precision for monetary values
pub const DECIMAL_PRECISION: u32 = 8;

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Quantity threshold below which a lot or balance is treated as dust
pub const QUANTITY_THRESHOLD: &str = "0.0000000001";

/// Tolerance for debit/credit equality checks on journal entries
pub const BALANCE_TOLERANCE: &str = "0.000001";

/// Days in a year used for the short-term/long-term holding boundary
pub const LONG_TERM_HOLD_DAYS: f64 = 365.25;

// Chart of accounts. Leading digit encodes the account class:
// 1 asset, 2 liability, 3 equity, 4 revenue, 5 expense.
pub const ACCT_CASH: u32 = 1000;
pub const ACCT_CRYPTO_HOLDINGS: u32 = 1100;
pub const ACCT_MARGIN_LOANS: u32 = 2000;
pub const ACCT_OWNER_CAPITAL: u32 = 3000;
pub const ACCT_TRADING_GAINS: u32 = 4000;
pub const ACCT_OTHER_INCOME: u32 = 4900;
pub const ACCT_EXCHANGE_FEES: u32 = 5000;
pub const ACCT_TRADING_LOSSES: u32 = 5100;

lazy_static::lazy_static! {
    /// Known quote assets for symbol splitting, longest-match wins.
    pub static ref KNOWN_QUOTE_ASSETS: Vec<&'static str> = vec![
        "USDT", "USDC", "FDUSD", "TUSD", "BUSD", "USDP", "DAI",
        "BTC", "ETH", "BNB",
        "EUR", "USD", "GBP", "TRY", "JPY", "AUD",
    ];
}
