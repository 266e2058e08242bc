//! Workflow configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::invoice_type::TypeTokens;

pub const ENV_DEFAULT_OBJECT: &str = "BULKPAY_DEFAULT_OBJECT";
pub const ENV_NAVIGATION_DELAY_MS: &str = "BULKPAY_NAVIGATION_DELAY_MS";
pub const ENV_CALL_TIMEOUT_MS: &str = "BULKPAY_CALL_TIMEOUT_MS";
pub const ENV_PURCHASE_TOKEN: &str = "BULKPAY_PURCHASE_TOKEN";
pub const ENV_SALES_TOKEN: &str = "BULKPAY_SALES_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Object whose list view is used when the batch type is unresolved.
    pub default_object_api_name: String,
    /// Pause between a fatal alert and navigating away.
    #[serde(with = "millis")]
    pub navigation_delay: Duration,
    /// Upper bound for each backend call; `None` waits indefinitely.
    #[serde(with = "opt_millis")]
    pub call_timeout: Option<Duration>,
    pub type_tokens: TypeTokens,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_object_api_name: "Invoice".to_string(),
            navigation_delay: Duration::from_millis(2000),
            call_timeout: Some(Duration::from_millis(30_000)),
            type_tokens: TypeTokens::default(),
        }
    }
}

impl WorkflowConfig {
    /// Defaults overridden by `BULKPAY_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`WorkflowConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(object) = lookup(ENV_DEFAULT_OBJECT).filter(|v| !v.trim().is_empty()) {
            config.default_object_api_name = object.trim().to_string();
        }
        if let Some(ms) = parse_millis(&lookup, ENV_NAVIGATION_DELAY_MS) {
            config.navigation_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_millis(&lookup, ENV_CALL_TIMEOUT_MS) {
            // 0 disables the bound.
            config.call_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(token) = lookup(ENV_PURCHASE_TOKEN) {
            config.type_tokens.purchase = token;
        }
        if let Some(token) = lookup(ENV_SALES_TOKEN) {
            config.type_tokens.sales = token;
        }

        config
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring invalid duration; using default");
            None
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis))
    }
}
