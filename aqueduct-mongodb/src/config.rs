//! MongoDB connection configuration.

use std::time::Duration;

use mongodb::options::ClientOptions;

use crate::error::{MongoError, MongoResult};

/// MongoDB connection configuration.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Minimum connection pool size.
    pub min_pool_size: Option<u32>,
    /// Maximum connection pool size.
    pub max_pool_size: Option<u32>,
    /// Maximum idle time for pooled connections.
    pub max_idle_time: Option<Duration>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Read preference.
    pub read_preference: Option<ReadPreference>,
    /// Write concern.
    pub write_concern: Option<WriteConcern>,
    /// Retry writes.
    pub retry_writes: Option<bool>,
    /// Retry reads.
    pub retry_reads: Option<bool>,
}

/// MongoDB read preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPreference {
    /// Read from the primary only.
    #[default]
    Primary,
    /// Prefer the primary, fall back to a secondary.
    PrimaryPreferred,
    /// Read from a secondary only.
    Secondary,
    /// Prefer a secondary, fall back to the primary.
    SecondaryPreferred,
    /// Read from the nearest member.
    Nearest,
}

/// MongoDB write concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteConcern {
    /// Acknowledge writes from the given number of nodes.
    Nodes(u32),
    /// Acknowledge writes from a majority of nodes.
    Majority,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: String::new(),
            app_name: Some("aqueduct".to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            max_idle_time: Some(Duration::from_secs(300)),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            read_preference: Some(ReadPreference::Primary),
            write_concern: None,
            retry_writes: Some(true),
            retry_reads: Some(true),
        }
    }
}

impl MongoConfig {
    /// Create a configuration from a MongoDB URI and database name.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Convert to driver [`ClientOptions`].
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoError::config(format!("failed to parse URI: {e}")))?;

        options.app_name = self.app_name.clone();
        options.min_pool_size = self.min_pool_size;
        options.max_pool_size = self.max_pool_size;
        options.max_idle_time = self.max_idle_time;
        options.connect_timeout = self.connect_timeout;
        options.server_selection_timeout = self.server_selection_timeout;
        options.retry_writes = self.retry_writes;
        options.retry_reads = self.retry_reads;

        if let Some(read_preference) = self.read_preference {
            use mongodb::options::{ReadPreference as Driver, SelectionCriteria};
            let driver_pref = match read_preference {
                ReadPreference::Primary => Driver::Primary,
                ReadPreference::PrimaryPreferred => Driver::PrimaryPreferred {
                    options: Default::default(),
                },
                ReadPreference::Secondary => Driver::Secondary {
                    options: Default::default(),
                },
                ReadPreference::SecondaryPreferred => Driver::SecondaryPreferred {
                    options: Default::default(),
                },
                ReadPreference::Nearest => Driver::Nearest {
                    options: Default::default(),
                },
            };
            options.selection_criteria = Some(SelectionCriteria::ReadPreference(driver_pref));
        }

        if let Some(ref write_concern) = self.write_concern {
            use mongodb::options::Acknowledgment;
            let w = match write_concern {
                WriteConcern::Nodes(n) => Acknowledgment::Nodes(*n),
                WriteConcern::Majority => Acknowledgment::Majority,
            };
            options.write_concern = Some(mongodb::options::WriteConcern::builder().w(w).build());
        }

        Ok(options)
    }
}

/// Builder for [`MongoConfig`].
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    config: MongoConfig,
    database_set: bool,
}

impl MongoConfigBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            config: MongoConfig::default(),
            database_set: false,
        }
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.config.uri = uri.into();
        self
    }

    /// Set the database name (required).
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = database.into();
        self.database_set = true;
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = Some(name.into());
        self
    }

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.config.min_pool_size = Some(size);
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.config.max_pool_size = Some(size);
        self
    }

    /// Set the maximum idle time for pooled connections.
    pub fn max_idle_time(mut self, duration: Duration) -> Self {
        self.config.max_idle_time = Some(duration);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.config.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.config.server_selection_timeout = Some(duration);
        self
    }

    /// Set the read preference.
    pub fn read_preference(mut self, preference: ReadPreference) -> Self {
        self.config.read_preference = Some(preference);
        self
    }

    /// Set the write concern.
    pub fn write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.config.write_concern = Some(write_concern);
        self
    }

    /// Enable or disable retryable writes.
    pub fn retry_writes(mut self, enabled: bool) -> Self {
        self.config.retry_writes = Some(enabled);
        self
    }

    /// Enable or disable retryable reads.
    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.config.retry_reads = Some(enabled);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoResult<MongoConfig> {
        if !self.database_set || self.config.database.is_empty() {
            return Err(MongoError::config("database name is required"));
        }
        Ok(self.config)
    }
}
