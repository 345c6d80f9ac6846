//! The capability contract implemented by provider variants.

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{CapabilityError, SchedulerError};

/// Provider options, keyed by option name.
pub type ProviderOptions = BTreeMap<String, Value>;

/// Declared option set of a capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSchema {
    required: Vec<String>,
    optional: Vec<String>,
}

impl OptionSchema {
    /// Empty schema: accepts only an empty option map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required key. Declaration order decides which missing key is reported.
    #[must_use]
    pub fn required(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }

    /// Declare an optional key.
    #[must_use]
    pub fn optional(mut self, key: impl Into<String>) -> Self {
        self.optional.push(key.into());
        self
    }

    /// Required keys in declaration order.
    #[must_use]
    pub fn required_keys(&self) -> &[String] {
        &self.required
    }

    /// Optional keys in declaration order.
    #[must_use]
    pub fn optional_keys(&self) -> &[String] {
        &self.optional
    }

    fn recognizes(&self, key: &str) -> bool {
        self.required.iter().chain(&self.optional).any(|k| k == key)
    }

    /// Check `options` against the schema.
    ///
    /// Missing required keys are reported first, in declaration order, then
    /// unknown keys in lexicographic order.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Configuration`] naming the first offending key.
    pub fn validate(&self, provider: &str, options: &ProviderOptions) -> Result<(), SchedulerError> {
        let reject = |key: &str, reason: String| SchedulerError::Configuration {
            provider: provider.to_owned(),
            key: Some(key.to_owned()),
            reason,
        };
        for key in &self.required {
            match options.get(key) {
                None => return Err(reject(key, format!("missing required option `{key}`"))),
                Some(Value::Null) => {
                    return Err(reject(key, format!("required option `{key}` is null")));
                }
                Some(_) => {}
            }
        }
        if let Some(key) = options.keys().find(|k| !self.recognizes(k)) {
            return Err(reject(key, format!("unknown option `{key}`")));
        }
        Ok(())
    }
}

/// A pluggable capability invoked by a provider.
///
/// Implementations classify their own failures; anything returned as
/// [`CapabilityError::Other`] is treated as permanent. A call may run past
/// its deadline; the scheduler abandons it without waiting. Blocking work
/// belongs on `tokio::task::spawn_blocking` inside `invoke`.
#[async_trait]
pub trait Capability: Send + Sync + 'static {
    /// Capability type tag tasks are routed by.
    fn kind(&self) -> &str;

    /// Recognized configuration options.
    fn schema(&self) -> OptionSchema;

    /// Perform one unit of work.
    async fn invoke(&self, config: &ProviderOptions, payload: Value) -> Result<Value, CapabilityError>;
}

/// Capability backed by an async closure.
///
/// ```rust,ignore
/// let echo = FnCapability::new("echo", OptionSchema::new(), |_cfg, payload| async move {
///     Ok(payload)
/// });
/// ```
pub struct FnCapability<F> {
    kind: String,
    schema: OptionSchema,
    call: F,
}

impl<F> FnCapability<F> {
    /// Wrap `call` as a capability of the given kind.
    pub fn new(kind: impl Into<String>, schema: OptionSchema, call: F) -> Self {
        Self {
            kind: kind.into(),
            schema,
            call,
        }
    }
}

#[async_trait]
impl<F, Fut> Capability for FnCapability<F>
where
    F: Fn(ProviderOptions, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, CapabilityError>> + Send + 'static,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    fn schema(&self) -> OptionSchema {
        self.schema.clone()
    }

    async fn invoke(&self, config: &ProviderOptions, payload: Value) -> Result<Value, CapabilityError> {
        (self.call)(config.clone(), payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(pairs: &[(&str, Value)]) -> ProviderOptions {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn test_missing_required_named_in_declaration_order() {
        let schema = OptionSchema::new().required("api_key").required("model");
        let err = schema
            .validate("search", &options(&[("api_key", json!("x"))]))
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Configuration { key: Some(ref k), .. } if k == "model"
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let schema = OptionSchema::new().required("model").optional("temperature");
        let err = schema
            .validate(
                "llm",
                &options(&[("model", json!("m")), ("zeta", json!(1)), ("alpha", json!(2))]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Configuration { key: Some(ref k), .. } if k == "alpha"
        ));
    }

    #[test]
    fn test_null_required_rejected() {
        let schema = OptionSchema::new().required("model");
        assert!(schema.validate("llm", &options(&[("model", Value::Null)])).is_err());
    }

    #[test]
    fn test_optional_may_be_omitted() {
        let schema = OptionSchema::new().required("model").optional("temperature");
        assert!(schema.validate("llm", &options(&[("model", json!("m"))])).is_ok());
    }

    #[tokio::test]
    async fn test_fn_capability_invokes_closure() {
        let cap = FnCapability::new("echo", OptionSchema::new(), |_cfg, payload| async move {
            Ok(json!({ "echo": payload }))
        });
        assert_eq!(cap.kind(), "echo");
        let out = cap.invoke(&ProviderOptions::new(), json!(3)).await.unwrap();
        assert_eq!(out, json!({ "echo": 3 }));
    }
}
