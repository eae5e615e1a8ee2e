//! Connection settings for the SDK backend.

use std::env;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::config::Region;

/// Region used when neither `AWS_REGION` nor `DEFAULT_REGION` is set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Where and how to reach DynamoDB.
#[derive(Debug, Clone)]
pub struct AwsClientConfig {
    /// AWS region.
    pub region: String,
    /// Endpoint override, e.g. a local DynamoDB.
    pub endpoint_url: Option<String>,
    /// Static access key id. Falls back to the SDK credential chain when unset.
    pub access_key_id: Option<String>,
    /// Static secret access key.
    pub secret_access_key: Option<String>,
    /// Optional session token for temporary credentials.
    pub session_token: Option<String>,
}

impl Default for AwsClientConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_owned(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

impl AwsClientConfig {
    /// Create configuration from environment variables.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `DYNORM_ENDPOINT_URL`, then `AWS_ENDPOINT_URL_DYNAMODB` | endpoint override |
    /// | `AWS_REGION`, then `DEFAULT_REGION` | region, default `us-east-1` |
    /// | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN` | static credentials |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok().filter(|v| !v.is_empty()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            region: lookup("AWS_REGION")
                .or_else(|| lookup("DEFAULT_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            endpoint_url: lookup("DYNORM_ENDPOINT_URL")
                .or_else(|| lookup("AWS_ENDPOINT_URL_DYNAMODB")),
            access_key_id: lookup("AWS_ACCESS_KEY_ID"),
            secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
            session_token: lookup("AWS_SESSION_TOKEN"),
        }
    }

    /// Set the endpoint override.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Use static credentials instead of the SDK credential chain.
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    fn static_credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials::new(
                access_key_id,
                secret_access_key,
                self.session_token.clone(),
                None,
                "dynorm",
            )),
            _ => None,
        }
    }

    /// Build an SDK client from these settings.
    pub async fn load_sdk_client(&self) -> aws_sdk_dynamodb::Client {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        if let Some(credentials) = self.static_credentials() {
            loader = loader.credentials_provider(credentials);
        }
        let sdk_config = loader.load().await;
        aws_sdk_dynamodb::Client::new(&sdk_config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_should_default_region() {
        let config = AwsClientConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.region, "us-east-1");
        assert!(config.endpoint_url.is_none());
        assert!(config.static_credentials().is_none());
    }

    #[test]
    fn test_should_prefer_dynorm_endpoint() {
        let config = AwsClientConfig::from_lookup(lookup_from(&[
            ("DYNORM_ENDPOINT_URL", "http://localhost:8000"),
            ("AWS_ENDPOINT_URL_DYNAMODB", "http://localhost:4566"),
            ("DEFAULT_REGION", "eu-west-1"),
        ]));
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.region, "eu-west-1");
    }

    #[test]
    fn test_should_require_both_credential_halves() {
        let config =
            AwsClientConfig::from_lookup(lookup_from(&[("AWS_ACCESS_KEY_ID", "test")]));
        assert!(config.static_credentials().is_none());

        let config = config.with_credentials("test", "secret");
        let credentials = config.static_credentials().unwrap();
        assert_eq!(credentials.access_key_id(), "test");
    }
}
