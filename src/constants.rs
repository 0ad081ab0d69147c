//! Market and cache constants
//!
//! ## Defaults
//!
//! | Setting           | Default | Env override               |
//! |-------------------|---------|----------------------------|
//! | Refresh interval  | 2 s     | `B3_REFRESH_SECS`          |
//! | Quote cache expiry| 30 s    | `B3_CACHE_EXPIRY_SECS`     |
//! | Metadata expiry   | 24 h    | `B3_METADATA_EXPIRY_HOURS` |
//! | Fetch workers     | 5       | `B3_WORKER_COUNT`          |
//! | Request timeout   | 10 s    | `B3_REQUEST_TIMEOUT_SECS`  |

/// Seconds between two refresh ticks of the dashboard
pub const DEFAULT_REFRESH_SECS: u64 = 2;

/// Maximum age of a cached quote before it must be refetched
pub const DEFAULT_CACHE_EXPIRY_SECS: u64 = 30;

/// Maximum age of the metadata database before it is reported as outdated
pub const DEFAULT_METADATA_EXPIRY_HOURS: u64 = 24;

/// Concurrent provider requests per batch
pub const DEFAULT_WORKER_COUNT: usize = 5;

/// Per-request timeout; a timed-out ticker becomes a failure without cancelling siblings
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default HTTP port (same as the dashboard it replaces)
pub const DEFAULT_PORT: u16 = 8501;

/// Choices offered by the refresh-interval selector
pub const REFRESH_INTERVAL_CHOICES: &[u64] = &[2, 5, 10, 30, 60];

/// Exchange suffixes accepted in the watchlist
pub const KNOWN_SUFFIXES: &[&str] = &[".SA"];

/// B3 suffix used by the quote provider
pub const B3_SUFFIX: &str = ".SA";

/// Maximum number of search results rendered in the UI
pub const SEARCH_RESULT_LIMIT: usize = 20;

/// Metadata database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "stock_database.json";

/// Watchlist used when a session starts without a snapshot
pub const DEFAULT_WATCHLIST: &[&str] = &["ITUB4.SA", "PETR4.SA", "VALE3.SA", "BBDC4.SA", "ABEV3.SA"];

/// Popular tickers offered as suggestions next to the add form
pub const POPULAR_TICKERS: &[&str] = &[
    "ITUB4.SA", "PETR4.SA", "VALE3.SA", "BBDC4.SA", "ABEV3.SA",
    "MGLU3.SA", "ELET3.SA", "JBSS3.SA", "SUZB3.SA", "VIVT3.SA",
    "BRFS3.SA", "CSNA3.SA", "LREN3.SA", "RAIL3.SA", "USIM5.SA",
    "GGBR4.SA", "CPFE3.SA", "MRVE3.SA", "TOTS3.SA", "RDOR3.SA",
];

/// Tickers scanned by a metadata update when no listing scrape is requested
pub const KNOWN_B3_TICKERS: &[&str] = &[
    "ABEV3.SA", "ALPA4.SA", "ALUP11.SA", "ANIM3.SA", "ASAI3.SA", "AZUL4.SA",
    "B3SA3.SA", "BBAS3.SA", "BBDC3.SA", "BBDC4.SA", "BBSE3.SA", "BEEF3.SA",
    "BPAC11.SA", "BRAP4.SA", "BRFS3.SA", "CMIG4.SA", "COGN3.SA", "CPFE3.SA",
    "CPLE6.SA", "CRFB3.SA", "CSAN3.SA", "CSNA3.SA", "CYRE3.SA", "DXCO3.SA",
    "EGIE3.SA", "ELET3.SA", "ELET6.SA", "EMBR3.SA", "ENEV3.SA", "ENGI11.SA",
    "EQTL3.SA", "EZTC3.SA", "FLRY3.SA", "GGBR4.SA", "GOAU4.SA", "HAPV3.SA",
    "HYPE3.SA", "IGTI11.SA", "IRBR3.SA", "ITSA4.SA", "ITUB3.SA", "ITUB4.SA",
    "JBSS3.SA", "KLBN11.SA", "LREN3.SA", "LWSA3.SA", "MGLU3.SA", "MRFG3.SA",
    "MRVE3.SA", "MULT3.SA", "PCAR3.SA", "PETR3.SA", "PETR4.SA", "PRIO3.SA",
    "PSSA3.SA", "RADL3.SA", "RAIL3.SA", "RDOR3.SA", "RENT3.SA", "SANB11.SA",
    "SBSP3.SA", "SLCE3.SA", "SMTO3.SA", "SUZB3.SA", "TAEE11.SA", "TIMS3.SA",
    "TOTS3.SA", "UGPA3.SA", "USIM5.SA", "VALE3.SA", "VBBR3.SA", "VIVT3.SA",
    "WEGE3.SA", "YDUQ3.SA",
];

/// Base URL of the public listing site used for metadata links and scraping
pub const DADOS_MERCADO_BASE_URL: &str = "https://www.dadosdemercado.com.br";
