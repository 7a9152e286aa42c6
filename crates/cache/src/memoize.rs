//! Per-method memoization policy.
//!
//! The rpc method registry attaches a [`CachePolicy`] to read methods whose
//! results are worth caching. The policy decides, per call, whether the
//! argument list disqualifies caching (block tags like `latest`, unknown
//! filter ids) and how the cache key is derived from the arguments.

use crate::wildcard_match;
use rustc_hash::FxHasher;
use serde_json::Value;
use std::{
    hash::{Hash, Hasher},
    time::Duration,
};

/// Skip caching when the argument at `index` equals `value`.
#[derive(Debug, Clone)]
pub struct SkipParam {
    /// Position of the argument in the call's parameter list.
    pub index: usize,
    /// The literal that disables caching, compared as JSON.
    pub value: Value,
}

/// A named field of an object argument together with the pattern that
/// disables caching.
#[derive(Debug, Clone)]
pub struct NamedField {
    /// Field name inside the object argument.
    pub name: String,
    /// Wildcard pattern matched against the field's string form.
    pub pattern: String,
}

/// Skip caching when the object argument at `index` has a field matching one
/// of the patterns.
#[derive(Debug, Clone)]
pub struct SkipNamedParam {
    /// Position of the argument in the call's parameter list.
    pub index: usize,
    /// Field patterns that disable caching.
    pub fields: Vec<NamedField>,
}

/// Memoization configuration of a single rpc method.
pub struct CachePolicy {
    /// Time-to-live of cached results; `None` uses no expiry.
    pub ttl: Option<Duration>,
    /// Positional literal skip rules.
    pub skip_params: Vec<SkipParam>,
    /// Object-field skip rules.
    pub skip_named_params: Vec<SkipNamedParam>,
    /// Custom cache-key suffix derivation; the default fingerprints the full
    /// argument list.
    pub key_layout: Option<Box<dyn Fn(&[Value]) -> String + Send + Sync>>,
}

impl std::fmt::Debug for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachePolicy")
            .field("ttl", &self.ttl)
            .field("skip_params", &self.skip_params)
            .field("skip_named_params", &self.skip_named_params)
            .field("key_layout", &self.key_layout.as_ref().map(|_| "custom"))
            .finish()
    }
}

// === impl CachePolicy ===

impl CachePolicy {
    /// A policy with the given ttl and no skip rules.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl), skip_params: Vec::new(), skip_named_params: Vec::new(), key_layout: None }
    }

    /// Adds a positional skip rule.
    pub fn skip_param(mut self, index: usize, value: Value) -> Self {
        self.skip_params.push(SkipParam { index, value });
        self
    }

    /// Adds skip rules for the block-tag argument at `index`.
    ///
    /// Tag-addressed reads (`latest`, `pending`, `safe`, `finalized`) resolve
    /// to a moving target and are never cached.
    pub fn skip_block_tags(self, index: usize) -> Self {
        ["latest", "pending", "safe", "finalized"]
            .into_iter()
            .fold(self, |policy, tag| policy.skip_param(index, Value::String(tag.to_owned())))
    }

    /// Adds an object-field skip rule.
    pub fn skip_named_param(mut self, index: usize, fields: Vec<NamedField>) -> Self {
        self.skip_named_params.push(SkipNamedParam { index, fields });
        self
    }

    /// Replaces the default argument fingerprint with a custom layout.
    pub fn key_layout(
        mut self,
        layout: impl Fn(&[Value]) -> String + Send + Sync + 'static,
    ) -> Self {
        self.key_layout = Some(Box::new(layout));
        self
    }

    /// Returns whether this call's arguments disqualify caching.
    pub fn should_skip(&self, args: &[Value]) -> bool {
        for rule in &self.skip_params {
            if args.get(rule.index) == Some(&rule.value) {
                return true
            }
        }
        for rule in &self.skip_named_params {
            let Some(Value::Object(object)) = args.get(rule.index) else { continue };
            for field in &rule.fields {
                let Some(value) = object.get(&field.name) else { continue };
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if wildcard_match(&field.pattern, &text) {
                    return true
                }
            }
        }
        false
    }

    /// Derives the cache key for `method` called with `args`.
    pub fn cache_key(&self, method: &str, args: &[Value]) -> String {
        let suffix = match &self.key_layout {
            Some(layout) => layout(args),
            None => fingerprint(args),
        };
        format!("{method}:{suffix}")
    }
}

/// Opaque fingerprint of an argument list.
fn fingerprint(args: &[Value]) -> String {
    let mut hasher = FxHasher::default();
    for arg in args {
        arg.to_string().hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn block_tags_are_never_cached() {
        let policy = CachePolicy::with_ttl(Duration::from_secs(1)).skip_block_tags(1);
        assert!(policy.should_skip(&[json!("0xabc"), json!("latest")]));
        assert!(policy.should_skip(&[json!("0xabc"), json!("pending")]));
        assert!(!policy.should_skip(&[json!("0xabc"), json!("0x10")]));
    }

    #[test]
    fn named_param_patterns() {
        let policy = CachePolicy::with_ttl(Duration::from_secs(1)).skip_named_param(
            0,
            vec![
                NamedField { name: "fromBlock".into(), pattern: "latest".into() },
                NamedField { name: "blockHash".into(), pattern: "0xdead*".into() },
            ],
        );
        assert!(policy.should_skip(&[json!({"fromBlock": "latest"})]));
        assert!(policy.should_skip(&[json!({"blockHash": "0xdeadbeef"})]));
        assert!(!policy.should_skip(&[json!({"fromBlock": "0x1"})]));
        assert!(!policy.should_skip(&[json!("not an object")]));
    }

    #[test]
    fn keys_are_stable_and_distinct() {
        let policy = CachePolicy::with_ttl(Duration::from_secs(1));
        let a = policy.cache_key("eth_getBlockByNumber", &[json!("0x1"), json!(false)]);
        let b = policy.cache_key("eth_getBlockByNumber", &[json!("0x1"), json!(false)]);
        let c = policy.cache_key("eth_getBlockByNumber", &[json!("0x2"), json!(false)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("eth_getBlockByNumber:"));
    }

    #[test]
    fn custom_key_layout() {
        let policy = CachePolicy::with_ttl(Duration::from_secs(1))
            .key_layout(|args| args.first().map(ToString::to_string).unwrap_or_default());
        let key = policy.cache_key("eth_getTransactionReceipt", &[json!("0xhash")]);
        assert_eq!(key, "eth_getTransactionReceipt:\"0xhash\"");
    }
}
