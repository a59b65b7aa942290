/// Configuration for [`Connection`](super::Connection).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Schema for unqualified names. When unset the server is asked
    /// (`SELECT SCHEMA_NAME()`), falling back to `dbo`.
    pub default_schema: Option<String>,
    /// Whether table metadata and constraints are memoized.
    pub schema_cache_enabled: bool,
    /// Whether executed statements are logged.
    pub logging_enabled: bool,
    /// Logged statement text is cut to this many characters.
    pub max_sql_length: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            default_schema: None,
            schema_cache_enabled: true,
            logging_enabled: false,
            max_sql_length: 200,
        }
    }
}

impl ConnectionConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed default schema instead of asking the server.
    pub fn default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Disable metadata caching; every lookup hits the catalog.
    pub fn no_schema_cache(mut self) -> Self {
        self.schema_cache_enabled = false;
        self
    }

    /// Enable statement logging.
    pub fn with_logging(mut self) -> Self {
        self.logging_enabled = true;
        self
    }

    /// Set the maximum logged SQL length.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = len;
        self
    }
}
