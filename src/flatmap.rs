//! Flatmap Codec
//!
//! Converts a [`Value`] tree into a flat mapping of dotted path keys to text,
//! and back.
//!
//! # Key format
//!
//! ```text
//! rules.#                        = 1           list length
//! rules.0.owner                  = sys         map key under list element 0
//! rules.0.resources.0.hosts.#    = 1
//! rules.0.resources.0.hosts.0    = *           list of scalars: no trailing dot
//! ```
//!
//! - A map contributes one entry per key, using the key verbatim.
//! - A list contributes `<prefix>.#` holding the element count, and one entry
//!   per element at `<prefix>.<index>` (0-based, no gaps).
//! - A bare leaf at the root is stored under the empty key.
//!
//! # Addressable keys
//!
//! Map keys are rejected by [`encode`] when they would make a flat key
//! ambiguous: the empty key, keys containing `.`, keys starting with `#`, and
//! keys made only of ASCII digits (these read as list indices). With those
//! rejected, no two distinct tree paths can produce the same flat key. Keys
//! containing `=` or control characters are rejected too, so that every key
//! survives the line form below.
//!
//! An empty map nested under a key or list index contributes no entries and
//! does not survive a round trip; the policy mapper never produces one.
//!
//! # Line form
//!
//! [`FlatMap::to_lines`] writes one `key = value` line per entry. A value that
//! would not read back verbatim (control characters such as a newline,
//! leading or trailing whitespace, or a leading `"`) is written as a JSON
//! string literal, and [`FlatMap::parse_lines`] unquotes any value starting
//! with `"`. Keys never need quoting: [`encode`] rejects `=` and control
//! characters in map keys.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::value::{join_path, Value};

/// Path step holding a list's element count
pub const COUNT_KEY: &str = "#";

/// Separator between path steps
pub const SEPARATOR: char = '.';

/// Flat path-key to text mapping
///
/// Backed by a `BTreeMap`, so iteration is sorted by key. This is the form
/// used to dump and assert resource state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatMap(BTreeMap<String, String>);

impl FlatMap {
    /// Create an empty flat map
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert an entry, returning any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Whether the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries whose key starts with `prefix`, in key order
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter().filter(move |(k, _)| k.starts_with(prefix))
    }

    /// Consume into the underlying map
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }

    /// Render as `key = value` lines, sorted by key
    pub fn to_lines(&self) -> String {
        self.to_string()
    }

    /// Parse `key = value` lines
    ///
    /// The first `" = "` on a line separates key from value, so values may
    /// themselves contain `=`. A value starting with `"` is a JSON string
    /// literal. Blank lines are skipped. Every line starting with `#` is a
    /// comment, except the root list count line `# = <n>`.
    pub fn parse_lines(text: &str) -> Result<Self> {
        let mut flat = Self::new();
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() || is_comment(line) {
                continue;
            }
            let (key, raw) = match line.split_once(" = ") {
                Some(pair) => pair,
                None => match line.strip_suffix(" =") {
                    Some(key) => (key, ""),
                    None => {
                        return Err(Error::malformed(
                            line,
                            format!("line {} is not a `key = value` pair", number + 1),
                        ))
                    }
                },
            };
            let value = unquote(raw).map_err(|e| {
                Error::malformed(key, format!("line {} has a bad quoted value: {}", number + 1, e))
            })?;
            if flat.insert(key, value).is_some() {
                return Err(Error::malformed(key, format!("duplicate key on line {}", number + 1)));
            }
        }
        Ok(flat)
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') && !(line.starts_with("# = ") || line == "# =")
}

/// Whether a value must be quoted to read back verbatim from a line
fn needs_quoting(value: &str) -> bool {
    value.starts_with('"')
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.chars().any(char::is_control)
}

fn unquote(raw: &str) -> std::result::Result<String, serde_json::Error> {
    if raw.starts_with('"') {
        serde_json::from_str(raw)
    } else {
        Ok(raw.to_string())
    }
}

impl fmt::Display for FlatMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.iter() {
            if needs_quoting(v) {
                let quoted = serde_json::to_string(v).map_err(|_| fmt::Error)?;
                writeln!(f, "{} = {}", k, quoted)?;
            } else {
                writeln!(f, "{} = {}", k, v)?;
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for FlatMap {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ============================================================================
// Encode
// ============================================================================

/// Flatten a value tree
///
/// Pure and deterministic. Fails only with [`Error::UnaddressableKey`] when a
/// map key cannot be addressed unambiguously.
pub fn encode(value: &Value) -> Result<FlatMap> {
    let mut out = BTreeMap::new();
    encode_node(value, "", &mut out)?;
    debug!(entries = out.len(), "Encoded value tree");
    Ok(FlatMap(out))
}

fn encode_node(value: &Value, prefix: &str, out: &mut BTreeMap<String, String>) -> Result<()> {
    match value {
        Value::Leaf(text) => {
            out.insert(prefix.to_string(), text.clone());
        }
        Value::List(items) => {
            out.insert(join_path(prefix, COUNT_KEY), items.len().to_string());
            for (i, item) in items.iter().enumerate() {
                encode_node(item, &join_path(prefix, &i.to_string()), out)?;
            }
        }
        Value::Map(entries) => {
            for (key, child) in entries {
                check_key(prefix, key)?;
                encode_node(child, &join_path(prefix, key), out)?;
            }
        }
    }
    Ok(())
}

/// Check that a map key can be used as a flat path step
pub fn check_key(path: &str, key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "empty keys collide with their parent path"
    } else if key.contains(SEPARATOR) {
        "keys may not contain the '.' separator"
    } else if key.starts_with('#') {
        "a leading '#' marks list counts and comment lines"
    } else if key.contains('=') {
        "keys may not contain '=', which separates keys from values in line form"
    } else if key.chars().any(char::is_control) {
        "keys may not contain control characters"
    } else if is_index(key) {
        "all-digit keys read as list indices"
    } else {
        return Ok(());
    };
    Err(Error::UnaddressableKey {
        path: path.to_string(),
        key: key.to_string(),
        reason,
    })
}

fn is_index(step: &str) -> bool {
    !step.is_empty() && step.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// Decode
// ============================================================================

/// A flat entry split into its remaining path steps and its value
type Entry<'a> = (&'a [&'a str], &'a str);

/// Rebuild a value tree from a flat map
///
/// The exact inverse of [`encode`] for every tree without empty nested maps.
/// An empty flat map decodes to an empty root map.
pub fn decode(flat: &FlatMap) -> Result<Value> {
    let split: Vec<(Vec<&str>, &str)> = flat
        .iter()
        .map(|(k, v)| {
            let steps = if k.is_empty() {
                Vec::new()
            } else {
                k.split(SEPARATOR).collect()
            };
            (steps, v)
        })
        .collect();
    let entries: Vec<Entry<'_>> = split.iter().map(|(steps, v)| (steps.as_slice(), *v)).collect();

    if entries.is_empty() {
        return Ok(Value::default());
    }
    let value = decode_node("", &entries)?;
    debug!(entries = flat.len(), "Decoded flat map");
    Ok(value)
}

fn decode_node<'a>(prefix: &str, entries: &[Entry<'a>]) -> Result<Value> {
    if let Some(&(_, text)) = entries.iter().find(|(steps, _)| steps.is_empty()) {
        if entries.len() > 1 {
            return Err(Error::malformed(prefix, "a scalar entry also has child entries"));
        }
        return Ok(Value::leaf(text));
    }

    let mut groups: BTreeMap<&'a str, Vec<Entry<'a>>> = BTreeMap::new();
    for &(steps, text) in entries {
        groups.entry(steps[0]).or_default().push((&steps[1..], text));
    }

    if let Some(count) = groups.remove(COUNT_KEY) {
        return decode_list(prefix, &count, groups);
    }

    if let Some(step) = groups.keys().find(|step| is_index(step)) {
        return Err(Error::malformed(
            join_path(prefix, step),
            "indexed entry has no matching count entry",
        ));
    }

    let mut map = BTreeMap::new();
    for (step, children) in groups {
        if step.is_empty() {
            return Err(Error::malformed(join_path(prefix, step), "empty path step"));
        }
        let child = decode_node(&join_path(prefix, step), &children)?;
        map.insert(step.to_string(), child);
    }
    Ok(Value::Map(map))
}

fn decode_list<'a>(
    prefix: &str,
    count: &[Entry<'a>],
    elements: BTreeMap<&'a str, Vec<Entry<'a>>>,
) -> Result<Value> {
    let count_key = join_path(prefix, COUNT_KEY);
    let len = match count {
        [(steps, text)] if steps.is_empty() => text
            .parse::<usize>()
            .map_err(|_| Error::malformed(&count_key, format!("count {:?} is not a decimal integer", text)))?,
        _ => return Err(Error::malformed(&count_key, "count entry has child entries")),
    };

    if len != elements.len() {
        return Err(Error::malformed(
            count_key,
            format!("count is {} but {} indexed entries are present", len, elements.len()),
        ));
    }

    let mut slots: Vec<Option<Value>> = vec![None; len];
    for (step, children) in elements {
        let key = join_path(prefix, step);
        let index = parse_index(step)
            .ok_or_else(|| Error::malformed(&key, "list element step is not a canonical index"))?;
        if index >= len {
            return Err(Error::malformed(
                &key,
                format!("index {} is out of range for count {}", index, len),
            ));
        }
        slots[index] = Some(decode_node(&key, &children)?);
    }

    // Distinct canonical indices, all in range, as many as the count: no gaps.
    Ok(Value::List(slots.into_iter().flatten().collect()))
}

/// Parse a canonical list index: decimal digits with no leading zeros
fn parse_index(step: &str) -> Option<usize> {
    if !is_index(step) || (step.len() > 1 && step.starts_with('0')) {
        return None;
    }
    step.parse().ok()
}
