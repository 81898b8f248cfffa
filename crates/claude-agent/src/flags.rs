//! Ordered flag set for the `claude` command line.
//!
//! Base flags are assembled per step, user flags come from the command line,
//! and the merged set is flattened to argv. A handful of keys belong to this
//! tool rather than to `claude` and are never forwarded.

use tracing::debug;

/// Keys consumed by the orchestrator itself.
pub const INTERNAL_KEYS: &[&str] = &["entity", "form-name", "form-type", "output", "skip-steps"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    Str(String),
    List(Vec<String>),
}

impl From<bool> for FlagValue {
    fn from(v: bool) -> Self {
        FlagValue::Bool(v)
    }
}

impl From<&str> for FlagValue {
    fn from(v: &str) -> Self {
        FlagValue::Str(v.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(v: String) -> Self {
        FlagValue::Str(v)
    }
}

impl From<Vec<String>> for FlagValue {
    fn from(v: Vec<String>) -> Self {
        FlagValue::List(v)
    }
}

/// Insertion-ordered `key → value`. A `None` value is an explicit null: it
/// overrides an earlier value during a merge and emits nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    entries: Vec<(String, Option<FlagValue>)>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, keeping its original position if already present.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FlagValue>) -> &mut Self {
        self.put(key.into(), Some(value.into()));
        self
    }

    pub fn set_null(&mut self, key: impl Into<String>) -> &mut Self {
        self.put(key.into(), None);
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.set(key, value);
        self
    }

    fn put(&mut self, key: String, value: Option<FlagValue>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Non-null value for `key`.
    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `self` overridden by `user`. Keys keep the position of their first
    /// occurrence; the later value wins, including a null.
    pub fn merge(&self, user: &FlagSet) -> FlagSet {
        let mut out = self.clone();
        for (k, v) in &user.entries {
            out.put(k.clone(), v.clone());
        }
        out
    }

    pub fn is_internal(key: &str) -> bool {
        INTERNAL_KEYS.contains(&key)
    }

    /// Flatten to argv. `true` → `--key`, `false`/null/empty list → nothing,
    /// string → `--key value`, list → `--key v1 v2 …`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (key, value) in &self.entries {
            if Self::is_internal(key) {
                continue;
            }
            match value {
                None | Some(FlagValue::Bool(false)) => {}
                Some(FlagValue::Bool(true)) => args.push(format!("--{key}")),
                Some(FlagValue::Str(s)) => {
                    args.push(format!("--{key}"));
                    args.push(s.clone());
                }
                Some(FlagValue::List(items)) => {
                    if items.is_empty() {
                        continue;
                    }
                    args.push(format!("--{key}"));
                    args.extend(items.iter().cloned());
                }
            }
        }
        args
    }

    /// Parse unrecognised command-line tokens into user flags.
    ///
    /// `--k=v` and `--k v` give a string, `--k v1 v2` a list, a bare `--k`
    /// is `true`. Repeating a key appends to a list. Tokens before the first
    /// `--` flag are dropped.
    pub fn parse_passthrough<I, S>(tokens: I) -> FlagSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = FlagSet::new();
        let mut current: Option<(String, Vec<String>)> = None;

        for token in tokens {
            let token = token.as_ref();
            match token.strip_prefix("--").filter(|k| !k.is_empty()) {
                Some(rest) => {
                    if let Some((key, values)) = current.take() {
                        flags.append(key, values);
                    }
                    match rest.split_once('=') {
                        Some((key, value)) => {
                            flags.append(key.to_string(), vec![value.to_string()])
                        }
                        None => current = Some((rest.to_string(), Vec::new())),
                    }
                }
                None => match current.as_mut() {
                    Some((_, values)) => values.push(token.to_string()),
                    None => debug!(token, "ignoring stray passthrough token"),
                },
            }
        }
        if let Some((key, values)) = current {
            flags.append(key, values);
        }
        flags
    }

    fn append(&mut self, key: String, mut values: Vec<String>) {
        let value = match values.len() {
            0 => FlagValue::Bool(true),
            1 => FlagValue::Str(values.remove(0)),
            _ => FlagValue::List(values),
        };
        let merged = match (self.get(&key).cloned(), value) {
            (Some(FlagValue::Str(a)), FlagValue::Str(b)) => FlagValue::List(vec![a, b]),
            (Some(FlagValue::Str(a)), FlagValue::List(mut b)) => {
                b.insert(0, a);
                FlagValue::List(b)
            }
            (Some(FlagValue::List(mut a)), FlagValue::Str(b)) => {
                a.push(b);
                FlagValue::List(a)
            }
            (Some(FlagValue::List(mut a)), FlagValue::List(b)) => {
                a.extend(b);
                FlagValue::List(a)
            }
            (_, v) => v,
        };
        self.put(key, Some(merged));
    }
}
