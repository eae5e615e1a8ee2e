//! Memory store configuration.

use std::env;

/// Settings that shape the metadata the memory store reports.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Region used when building table ARNs.
    pub default_region: String,
    /// Account id used when building table ARNs.
    pub account_id: String,
}

impl MemoryConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads `DYNORM_MEMORY_REGION` (falling back to `AWS_REGION`) and
    /// `DYNORM_MEMORY_ACCOUNT_ID`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_region: env::var("DYNORM_MEMORY_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or(defaults.default_region),
            account_id: env::var("DYNORM_MEMORY_ACCOUNT_ID").unwrap_or(defaults.account_id),
        }
    }

    /// Build the ARN of a table.
    #[must_use]
    pub fn table_arn(&self, table_name: &str) -> String {
        format!(
            "arn:aws:dynamodb:{}:{}:table/{table_name}",
            self.default_region, self.account_id
        )
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            default_region: "us-east-1".to_owned(),
            account_id: "000000000000".to_owned(),
        }
    }
}
