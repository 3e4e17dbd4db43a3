//! Conversion between the typed CVE policy and the configuration value tree
//!
//! The configuration surface models each structurally-optional nested object
//! (`resources`, `condition`, `cves`) as a list capped at one element. That
//! convention lives only here: the domain model uses plain nested structs.
//!
//! # Configuration shape
//!
//! ```text
//! rules = [{
//!   owner, name,
//!   resources = [{ hosts = [..], images = [..], labels = [..], containers = [..] }],
//!   condition = [{
//!     vulnerabilities = [{ id, block, minimum_severity }, ..],
//!     cves = [{ ids = [..], effect, only_fixed }],
//!   }],
//!   block_message, verbose,
//!   previous_name, modified          (emitted on read only, ignored on write)
//! }]
//! ```

use std::collections::BTreeMap;

use chrono::SecondsFormat;
use tracing::debug;

use crate::error::{Error, Result};
use crate::value::{join_path, Value};

use super::model::{Condition, CvePolicy, CveRule, Effect, PolicyRule, Resources, Severity, Vulnerability};

/// Read a typed policy from its configuration form
///
/// A missing `rules` key yields an empty policy.
pub fn policy_to_domain(config: &Value) -> Result<CvePolicy> {
    let fields = Fields::new(config, "")?;
    let mut rules = Vec::new();
    for (path, rule) in fields.list("rules")? {
        rules.push(rule_to_domain(rule, &path)?);
    }
    debug!(rules = rules.len(), "Mapped CVE policy configuration");
    Ok(CvePolicy::new(rules))
}

/// Render a typed policy as its configuration form
pub fn policy_from_domain(policy: &CvePolicy) -> Value {
    Value::map([(
        "rules",
        Value::List(policy.rules.iter().map(rule_from_domain).collect()),
    )])
}

/// Read one rule map; `path` is the rule's field path used in errors
pub fn rule_to_domain(rule: &Value, path: &str) -> Result<PolicyRule> {
    let fields = Fields::new(rule, path)?;

    let resources = match fields.single("resources")? {
        Some(res) => Resources {
            hosts: res.string_list("hosts")?,
            images: res.string_list("images")?,
            labels: res.string_list("labels")?,
            containers: res.string_list("containers")?,
        },
        None => Resources::default(),
    };

    let condition = match fields.single("condition")? {
        Some(cond) => condition_to_domain(&cond)?,
        None => Condition::default(),
    };

    Ok(PolicyRule {
        modified: None,
        owner: fields.required_str("owner")?,
        name: fields.required_str("name")?,
        previous_name: None,
        resources,
        condition,
        block_message: fields.optional_str("block_message")?.unwrap_or_default(),
        verbose: fields.optional_bool("verbose")?.unwrap_or(false),
    })
}

fn condition_to_domain(cond: &Fields<'_>) -> Result<Condition> {
    let mut vulnerabilities = Vec::new();
    for (path, entry) in cond.list("vulnerabilities")? {
        let vuln = Fields::new(entry, &path)?;
        vulnerabilities.push(Vulnerability {
            id: vuln.required_i64("id")?,
            block: vuln.optional_bool("block")?.unwrap_or(false),
            minimum_severity: Severity(vuln.optional_f64("minimum_severity")?.unwrap_or_default()),
        });
    }

    let cves = match cond.single("cves")? {
        Some(cves) => CveRule {
            ids: cves.string_list("ids")?,
            effect: match cves.optional_str("effect")? {
                Some(text) => Effect::parse(&text)
                    .ok_or_else(|| Error::enum_value(cves.path("effect"), text, Effect::VALID))?,
                None => Effect::Unset,
            },
            only_fixed: cves.optional_bool("only_fixed")?.unwrap_or(false),
        },
        None => CveRule::default(),
    };

    Ok(Condition {
        vulnerabilities,
        cves,
    })
}

/// Render one rule as its configuration map
///
/// Every resource list is emitted, even when empty, and the condition is
/// always present. `previous_name` and `modified` are carried through when
/// known so the caller can inspect them.
pub fn rule_from_domain(rule: &PolicyRule) -> Value {
    let mut m = BTreeMap::new();
    m.insert("owner".to_string(), Value::leaf(&rule.owner));
    m.insert("name".to_string(), Value::leaf(&rule.name));
    m.insert("resources".to_string(), wrap(resources_from_domain(&rule.resources)));
    m.insert("condition".to_string(), wrap(condition_from_domain(&rule.condition)));
    m.insert("block_message".to_string(), Value::leaf(&rule.block_message));
    m.insert("verbose".to_string(), Value::from(rule.verbose));

    if let Some(ref previous) = rule.previous_name {
        m.insert("previous_name".to_string(), Value::leaf(previous));
    }
    if let Some(modified) = rule.modified {
        m.insert(
            "modified".to_string(),
            Value::leaf(modified.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
    }

    Value::Map(m)
}

fn resources_from_domain(resources: &Resources) -> Value {
    Value::map([
        ("hosts", Value::list(resources.hosts.iter().map(String::as_str))),
        ("images", Value::list(resources.images.iter().map(String::as_str))),
        ("labels", Value::list(resources.labels.iter().map(String::as_str))),
        ("containers", Value::list(resources.containers.iter().map(String::as_str))),
    ])
}

fn condition_from_domain(condition: &Condition) -> Value {
    let vulnerabilities = condition
        .vulnerabilities
        .iter()
        .map(|v| {
            Value::map([
                ("id", Value::from(v.id)),
                ("block", Value::from(v.block)),
                ("minimum_severity", Value::from(v.minimum_severity.value())),
            ])
        })
        .collect::<Vec<_>>();

    let cves = Value::map([
        ("ids", Value::list(condition.cves.ids.iter().map(String::as_str))),
        ("effect", Value::leaf(condition.cves.effect.as_str())),
        ("only_fixed", Value::from(condition.cves.only_fixed)),
    ]);

    Value::map([
        ("vulnerabilities", Value::List(vulnerabilities)),
        ("cves", wrap(cves)),
    ])
}

/// Wrap an optional nested object in its single-element list
fn wrap(value: Value) -> Value {
    Value::List(vec![value])
}

// ============================================================================
// Field access
// ============================================================================

/// Typed access to the keys of one configuration map
struct Fields<'a> {
    map: &'a BTreeMap<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    fn new(value: &'a Value, path: &str) -> Result<Self> {
        Ok(Self {
            map: value.as_map(path)?,
            path: path.to_string(),
        })
    }

    fn path(&self, key: &str) -> String {
        join_path(&self.path, key)
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    fn required_str(&self, key: &str) -> Result<String> {
        self.optional_str(key)?
            .ok_or_else(|| Error::missing(self.path(key)))
    }

    fn optional_str(&self, key: &str) -> Result<Option<String>> {
        self.get(key)
            .map(|v| v.as_str(&self.path(key)).map(str::to_string))
            .transpose()
    }

    fn optional_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get(key).map(|v| v.as_bool(&self.path(key))).transpose()
    }

    fn required_i64(&self, key: &str) -> Result<i64> {
        match self.get(key) {
            Some(v) => v.as_i64(&self.path(key)),
            None => Err(Error::missing(self.path(key))),
        }
    }

    fn optional_f64(&self, key: &str) -> Result<Option<f64>> {
        self.get(key).map(|v| v.as_f64(&self.path(key))).transpose()
    }

    /// A list of text; absent means empty
    fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key) {
            Some(v) => v.as_string_list(&self.path(key)),
            None => Ok(Vec::new()),
        }
    }

    /// Elements of a list with their field paths; absent means empty
    fn list(&self, key: &str) -> Result<Vec<(String, &'a Value)>> {
        let Some(value) = self.get(key) else {
            return Ok(Vec::new());
        };
        let base = self.path(key);
        Ok(value
            .as_list(&base)?
            .iter()
            .enumerate()
            .map(|(i, item)| (join_path(&base, &i.to_string()), item))
            .collect())
    }

    /// The map inside a single-element wrapper list
    ///
    /// Absent or empty means `None`; more than one element is a type error.
    fn single(&self, key: &str) -> Result<Option<Fields<'a>>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let base = self.path(key);
        match value.as_list(&base)? {
            [] => Ok(None),
            [only] => Fields::new(only, &join_path(&base, "0")).map(Some),
            _ => Err(Error::field_type(base, "list of at most one map", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ROOT_FIELD;
    use crate::flatmap::{decode, encode, FlatMap};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    /// The rule map from the acceptance scenario
    fn scenario_rule() -> Value {
        Value::map([
            ("owner", Value::leaf("sys")),
            ("name", Value::leaf("r1")),
            (
                "resources",
                Value::List(vec![Value::map([
                    ("hosts", Value::list(["*"])),
                    ("images", Value::List(vec![])),
                    ("labels", Value::List(vec![])),
                    ("containers", Value::List(vec![])),
                ])]),
            ),
            (
                "condition",
                Value::List(vec![Value::map([
                    (
                        "vulnerabilities",
                        Value::List(vec![Value::map([
                            ("id", Value::from(46_i64)),
                            ("block", Value::from(true)),
                            ("minimum_severity", Value::from(9.0)),
                        ])]),
                    ),
                    (
                        "cves",
                        Value::List(vec![Value::map([
                            ("ids", Value::list(["CVE-2017-1234"])),
                            ("effect", Value::leaf("alert")),
                            ("only_fixed", Value::from(true)),
                        ])]),
                    ),
                ])]),
            ),
            ("block_message", Value::leaf("")),
            ("verbose", Value::from(true)),
        ])
    }

    fn full_rule() -> PolicyRule {
        PolicyRule {
            modified: None,
            owner: "systems".into(),
            name: "Default - alert all components".into(),
            previous_name: None,
            resources: Resources {
                hosts: vec!["*".into()],
                images: vec!["*".into(), "foo/*".into()],
                labels: vec![],
                containers: vec!["web".into()],
            },
            condition: Condition {
                vulnerabilities: vec![
                    Vulnerability {
                        id: 410,
                        block: false,
                        minimum_severity: Severity(0.0),
                    },
                    Vulnerability {
                        id: 411,
                        block: true,
                        minimum_severity: Severity(6.5),
                    },
                ],
                cves: CveRule {
                    ids: vec!["a".into(), "b".into(), "c".into()],
                    effect: Effect::Ignore,
                    only_fixed: false,
                },
            },
            block_message: "Not permitted".into(),
            verbose: false,
        }
    }

    #[test]
    fn test_scenario_to_domain() {
        let rule = rule_to_domain(&scenario_rule(), "").unwrap();

        assert_eq!(rule.owner, "sys");
        assert_eq!(rule.name, "r1");
        assert_eq!(rule.resources.hosts, vec!["*"]);
        assert!(rule.resources.images.is_empty());
        assert_eq!(
            rule.condition.vulnerabilities,
            vec![Vulnerability {
                id: 46,
                block: true,
                minimum_severity: Severity(9.0),
            }]
        );
        assert_eq!(rule.condition.cves.ids, vec!["CVE-2017-1234"]);
        assert_eq!(rule.condition.cves.effect, Effect::Alert);
        assert!(rule.condition.cves.only_fixed);
        assert!(rule.verbose);
        assert_eq!(rule.block_message, "");
    }

    #[test]
    fn test_scenario_flattened() {
        let rule = rule_to_domain(&scenario_rule(), "").unwrap();
        let flat = encode(&rule_from_domain(&rule)).unwrap();

        assert_eq!(flat.get("resources.0.hosts.#"), Some("1"));
        assert_eq!(flat.get("resources.0.hosts.0"), Some("*"));
        assert_eq!(flat.get("resources.0.images.#"), Some("0"));
        assert_eq!(flat.get("condition.0.cves.0.effect"), Some("alert"));
        assert_eq!(flat.get("condition.0.vulnerabilities.0.minimum_severity"), Some("9"));
        assert_eq!(flat.get("verbose"), Some("true"));
    }

    #[test]
    fn test_missing_condition_defaults_to_zero_value() {
        let rule = Value::map([("owner", "sys"), ("name", "r1")]);
        let rule = rule_to_domain(&rule, "").unwrap();

        assert!(rule.condition.vulnerabilities.is_empty());
        assert_eq!(rule.condition.cves.effect, Effect::Unset);
        assert_eq!(rule.resources, Resources::default());
        assert_eq!(rule.block_message, "");
        assert!(!rule.verbose);
    }

    #[test]
    fn test_empty_wrapper_list_is_absent() {
        let rule = Value::map([
            ("owner", Value::leaf("sys")),
            ("name", Value::leaf("r1")),
            ("condition", Value::List(vec![])),
            ("resources", Value::List(vec![])),
        ]);
        let rule = rule_to_domain(&rule, "").unwrap();
        assert_eq!(rule.condition, Condition::default());
    }

    #[test]
    fn test_partial_resources_default_missing_lists() {
        let rule = Value::map([
            ("owner", Value::leaf("sys")),
            ("name", Value::leaf("r1")),
            (
                "resources",
                Value::List(vec![Value::map([("images", Value::list(["nginx:*"]))])]),
            ),
        ]);
        let rule = rule_to_domain(&rule, "").unwrap();
        assert_eq!(rule.resources.images, vec!["nginx:*"]);
        assert!(rule.resources.hosts.is_empty());
        assert!(rule.resources.containers.is_empty());
    }

    #[test]
    fn test_unknown_effect_is_rejected() {
        let rule = Value::map([
            ("owner", Value::leaf("sys")),
            ("name", Value::leaf("r1")),
            (
                "condition",
                Value::List(vec![Value::map([(
                    "cves",
                    Value::List(vec![Value::map([("effect", "maybe")])]),
                )])]),
            ),
        ]);
        let config = Value::map([("rules", Value::List(vec![rule]))]);

        match policy_to_domain(&config).unwrap_err() {
            Error::InvalidEnumValue { field, value, .. } => {
                assert_eq!(field, "rules.0.condition.0.cves.0.effect");
                assert_eq!(value, "maybe");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_integer_field_holding_text_is_rejected() {
        let rule = Value::map([
            ("owner", Value::leaf("sys")),
            ("name", Value::leaf("r1")),
            (
                "condition",
                Value::List(vec![Value::map([(
                    "vulnerabilities",
                    Value::List(vec![Value::map([("id", "forty-six")])]),
                )])]),
            ),
        ]);

        match rule_to_domain(&rule, "rules.0").unwrap_err() {
            Error::InvalidFieldType { field, expected, .. } => {
                assert_eq!(field, "rules.0.condition.0.vulnerabilities.0.id");
                assert_eq!(expected, "integer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrapper_with_two_elements_is_rejected() {
        let res = Value::map([("hosts", Value::list(["*"]))]);
        let rule = Value::map([
            ("owner", Value::leaf("sys")),
            ("name", Value::leaf("r1")),
            ("resources", Value::List(vec![res.clone(), res])),
        ]);
        assert!(matches!(
            rule_to_domain(&rule, "").unwrap_err(),
            Error::InvalidFieldType { .. }
        ));
    }

    #[test]
    fn test_missing_owner_is_reported() {
        let rule = Value::map([("name", "r1")]);
        match rule_to_domain(&rule, "rules.3").unwrap_err() {
            Error::MissingField { field } => assert_eq!(field, "rules.3.owner"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rule_must_be_a_map() {
        let config = Value::map([("rules", Value::list(["not a rule"]))]);
        assert!(matches!(
            policy_to_domain(&config).unwrap_err(),
            Error::InvalidFieldType { expected: "map", .. }
        ));
    }

    #[test]
    fn test_non_map_root_is_reported_as_root() {
        match policy_to_domain(&Value::leaf("rules")).unwrap_err() {
            Error::InvalidFieldType { field, expected, .. } => {
                assert_eq!(field, ROOT_FIELD);
                assert_eq!(expected, "map");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_rules_is_empty_policy() {
        let policy = policy_to_domain(&Value::default()).unwrap();
        assert!(policy.rules.is_empty());
        assert_eq!(policy.id, "cve");
    }

    #[test]
    fn test_from_domain_emits_full_key_set() {
        let value = rule_from_domain(&PolicyRule {
            owner: "sys".into(),
            name: "r1".into(),
            ..Default::default()
        });
        let flat = encode(&value).unwrap();
        let keys: Vec<&str> = flat.iter().map(|(k, _)| k).collect();

        assert_eq!(
            keys,
            vec![
                "block_message",
                "condition.#",
                "condition.0.cves.#",
                "condition.0.cves.0.effect",
                "condition.0.cves.0.ids.#",
                "condition.0.cves.0.only_fixed",
                "condition.0.vulnerabilities.#",
                "name",
                "owner",
                "resources.#",
                "resources.0.containers.#",
                "resources.0.hosts.#",
                "resources.0.images.#",
                "resources.0.labels.#",
                "verbose",
            ]
        );
        assert_eq!(flat.get("condition.0.cves.0.effect"), Some(""));
    }

    #[test]
    fn test_read_only_fields_are_carried_but_not_read_back() {
        let mut rule = full_rule();
        rule.previous_name = Some("old".into());
        rule.modified = Some(Utc.with_ymd_and_hms(2018, 3, 27, 10, 21, 54).unwrap());

        let value = rule_from_domain(&rule);
        assert_eq!(value.get("previous_name"), Some(&Value::leaf("old")));
        assert_eq!(
            value.get("modified"),
            Some(&Value::leaf("2018-03-27T10:21:54Z"))
        );

        let back = rule_to_domain(&value, "").unwrap();
        assert_eq!(back.previous_name, None);
        assert_eq!(back.modified, None);
    }

    #[test]
    fn test_domain_round_trip() {
        let mut unset = full_rule();
        unset.condition.cves.effect = Effect::Unset;
        unset.condition.vulnerabilities.clear();
        unset.verbose = true;

        let policy = CvePolicy::new(vec![full_rule(), unset]);
        let back = policy_to_domain(&policy_from_domain(&policy)).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_domain_round_trip_through_flatmap() {
        let policy = CvePolicy::new(vec![full_rule()]);
        let flat = encode(&policy_from_domain(&policy)).unwrap();
        let tree = decode(&flat).unwrap();
        assert_eq!(policy_to_domain(&tree).unwrap(), policy);
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    /// Free text, including empty, whitespace-only, unicode and control text
    fn text_strategy() -> impl Strategy<Value = String> {
        prop_oneof!["[ -~]{0,12}", ".{0,8}", "\\s{0,3}", "[a-z =\n]{0,10}"]
    }

    /// Any finite severity, with the breakpoints weighted in
    fn severity_strategy() -> impl Strategy<Value = Severity> {
        prop_oneof![
            prop::num::f64::POSITIVE
                | prop::num::f64::NEGATIVE
                | prop::num::f64::NORMAL
                | prop::num::f64::SUBNORMAL
                | prop::num::f64::ZERO,
            Just(Severity::LOW.value()),
            Just(Severity::MEDIUM.value()),
            Just(Severity::HIGH.value()),
            Just(Severity::CRITICAL.value()),
        ]
        .prop_map(Severity)
    }

    fn effect_strategy() -> impl Strategy<Value = Effect> {
        prop_oneof![
            Just(Effect::Unset),
            Just(Effect::Ignore),
            Just(Effect::Alert),
            Just(Effect::Block),
        ]
    }

    fn texts() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(text_strategy(), 0..3)
    }

    fn rule_strategy() -> impl Strategy<Value = PolicyRule> {
        let resources = (texts(), texts(), texts(), texts()).prop_map(
            |(hosts, images, labels, containers)| Resources {
                hosts,
                images,
                labels,
                containers,
            },
        );
        let vulnerability = (any::<i64>(), any::<bool>(), severity_strategy()).prop_map(
            |(id, block, minimum_severity)| Vulnerability {
                id,
                block,
                minimum_severity,
            },
        );
        let condition = (
            prop::collection::vec(vulnerability, 0..3),
            texts(),
            effect_strategy(),
            any::<bool>(),
        )
            .prop_map(|(vulnerabilities, ids, effect, only_fixed)| Condition {
                vulnerabilities,
                cves: CveRule {
                    ids,
                    effect,
                    only_fixed,
                },
            });
        (
            text_strategy(),
            text_strategy(),
            text_strategy(),
            any::<bool>(),
            resources,
            condition,
        )
            .prop_map(
                |(owner, name, block_message, verbose, resources, condition)| PolicyRule {
                    modified: None,
                    owner,
                    name,
                    previous_name: None,
                    resources,
                    condition,
                    block_message,
                    verbose,
                },
            )
    }

    fn policy_strategy() -> impl Strategy<Value = CvePolicy> {
        prop::collection::vec(rule_strategy(), 0..4).prop_map(CvePolicy::new)
    }

    proptest! {
        /// Property: to_domain(from_domain(p)) == p
        #[test]
        fn prop_domain_round_trip(policy in policy_strategy()) {
            let back = policy_to_domain(&policy_from_domain(&policy)).unwrap();
            prop_assert_eq!(back, policy);
        }

        /// Property: the round trip also holds through the flat map and its line form
        #[test]
        fn prop_domain_round_trip_through_flatmap(policy in policy_strategy()) {
            let flat = encode(&policy_from_domain(&policy)).unwrap();
            let lines = FlatMap::parse_lines(&flat.to_lines()).unwrap();
            prop_assert_eq!(&lines, &flat);
            let back = policy_to_domain(&decode(&lines).unwrap()).unwrap();
            prop_assert_eq!(back, policy);
        }
    }
}
