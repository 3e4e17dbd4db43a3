//! CVE policy domain model
//!
//! Typed form of the remote system's single CVE policy. The serde attributes
//! match the remote REST API's JSON document; fields the remote system sends
//! but this model does not track (`action`, `group`, `namespace`, `readonly`,
//! `device`, `envVars`, `version`) are ignored on input.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::parse::format_float;

/// Fixed identifier of the one CVE policy the remote system holds
pub const CVE_POLICY_ID: &str = "cve";

/// Policy type tag the remote system expects on the CVE policy
pub const CVE_POLICY_TYPE: &str = "cve";

fn cve_tag() -> String {
    CVE_POLICY_ID.to_string()
}

/// The whole CVE policy: an ordered list of rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvePolicy {
    #[serde(default)]
    pub rules: Vec<PolicyRule>,

    /// Always `"cve"`
    #[serde(default = "cve_tag")]
    pub policy_type: String,

    /// Always `"cve"`
    #[serde(rename = "_id", default = "cve_tag")]
    pub id: String,
}

impl Default for CvePolicy {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl CvePolicy {
    /// Create a policy from rules, with the fixed id and type
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules,
            policy_type: CVE_POLICY_TYPE.to_string(),
            id: CVE_POLICY_ID.to_string(),
        }
    }

    /// Parse the remote API's JSON document
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the JSON document sent on write
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One rule of the CVE policy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// Last modification time, assigned by the remote system and never sent
    #[serde(default, skip_serializing)]
    pub modified: Option<DateTime<Utc>>,

    pub owner: String,

    pub name: String,

    /// Name before the last rename, reported on read only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_name: Option<String>,

    #[serde(default)]
    pub resources: Resources,

    #[serde(default)]
    pub condition: Condition,

    #[serde(rename = "blockMsg", default, skip_serializing_if = "String::is_empty")]
    pub block_message: String,

    #[serde(default)]
    pub verbose: bool,
}

/// Resource selector: which hosts, images, labels and containers a rule covers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub containers: Vec<String>,
}

/// What a rule matches on
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub cves: CveRule,
}

/// Action for one vulnerability category
///
/// Categories are numeric ids defined by the remote system.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: i64,
    #[serde(default)]
    pub block: bool,
    #[serde(rename = "minSeverity", default)]
    pub minimum_severity: Severity,
}

/// Rule for explicitly listed CVE identifiers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveRule {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub effect: Effect,
    #[serde(default)]
    pub only_fixed: bool,
}

// ============================================================================
// Severity
// ============================================================================

/// CVSS v3 severity score
///
/// The remote system uses the qualitative breakpoints 0/4/7/9 but stores any
/// value on the scale; a score need not sit exactly on a breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Severity(pub f64);

impl Severity {
    pub const LOW: Severity = Severity(0.0);
    pub const MEDIUM: Severity = Severity(4.0);
    pub const HIGH: Severity = Severity(7.0);
    pub const CRITICAL: Severity = Severity(9.0);

    /// Raw score
    pub fn value(self) -> f64 {
        self.0
    }

    /// Qualitative bucket: the highest breakpoint this score reaches
    pub fn rating(self) -> SeverityRating {
        if self >= Self::CRITICAL {
            SeverityRating::Critical
        } else if self >= Self::HIGH {
            SeverityRating::High
        } else if self >= Self::MEDIUM {
            SeverityRating::Medium
        } else {
            SeverityRating::Low
        }
    }
}

impl From<f64> for Severity {
    fn from(n: f64) -> Self {
        Self(n)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_float(self.0))
    }
}

/// Qualitative severity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityRating {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityRating {
    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Breakpoint score where this bucket starts
    pub fn breakpoint(&self) -> Severity {
        match self {
            Self::Low => Severity::LOW,
            Self::Medium => Severity::MEDIUM,
            Self::High => Severity::HIGH,
            Self::Critical => Severity::CRITICAL,
        }
    }
}

// ============================================================================
// Effect
// ============================================================================

/// Action taken when a CVE identifier rule matches
///
/// `Unset` is the explicit "never set" state; its text form is the empty
/// string, which no real effect uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Effect {
    #[default]
    Unset,
    Ignore,
    Alert,
    Block,
}

impl Effect {
    /// Recognized text forms, for error messages
    pub const VALID: &'static str = "ignore, alert, block, or empty";

    /// Parse the text form; `None` for unrecognized text
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" => Some(Self::Unset),
            "ignore" => Some(Self::Ignore),
            "alert" => Some(Self::Alert),
            "block" => Some(Self::Block),
            _ => None,
        }
    }

    /// Canonical lowercase text form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Ignore => "ignore",
            Self::Alert => "alert",
            Self::Block => "block",
        }
    }

    /// Whether an effect has been chosen
    pub fn is_set(&self) -> bool {
        *self != Self::Unset
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Effect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Effect::parse(&text).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid CVE effect {:?} (valid: {})", text, Effect::VALID))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_effect_text_forms() {
        for effect in [Effect::Unset, Effect::Ignore, Effect::Alert, Effect::Block] {
            assert_eq!(Effect::parse(effect.as_str()), Some(effect));
        }
        assert_eq!(Effect::parse("maybe"), None);
        assert_eq!(Effect::parse("Alert"), None);
        assert!(!Effect::Unset.is_set());
        assert!(Effect::Block.is_set());
    }

    #[test]
    fn test_severity_rating() {
        assert_eq!(Severity(0.0).rating(), SeverityRating::Low);
        assert_eq!(Severity(3.9).rating(), SeverityRating::Low);
        assert_eq!(Severity(4.0).rating(), SeverityRating::Medium);
        assert_eq!(Severity(6.5).rating(), SeverityRating::Medium);
        assert_eq!(Severity(7.0).rating(), SeverityRating::High);
        assert_eq!(Severity(9.0).rating(), SeverityRating::Critical);
        assert_eq!(Severity(10.0).rating(), SeverityRating::Critical);
        assert_eq!(SeverityRating::High.breakpoint(), Severity::HIGH);
        assert_eq!(Severity(9.0).to_string(), "9");
    }

    #[test]
    fn test_deserialize_remote_document() {
        let doc = json!({
            "version": "",
            "rules": [{
                "owner": "test_user",
                "name": "acceptance test CVE policy",
                "modified": "2018-03-27T10:21:54.85Z",
                "previousName": "old name",
                "action": ["*"],
                "resources": {
                    "hosts": ["*"],
                    "images": ["*", "foo/*"],
                    "labels": ["*"],
                    "containers": ["*"]
                },
                "condition": {
                    "readonly": false,
                    "vulnerabilities": [
                        {"id": 46, "block": true, "minSeverity": 9}
                    ],
                    "cves": {
                        "ids": ["CVE-2017-1234"],
                        "effect": "alert",
                        "onlyFixed": true
                    }
                },
                "verbose": true
            }],
            "policyType": "cve",
            "_id": "cve"
        });

        let policy: CvePolicy = serde_json::from_value(doc).unwrap();
        assert_eq!(policy.id, CVE_POLICY_ID);
        let rule = &policy.rules[0];
        assert_eq!(rule.owner, "test_user");
        assert_eq!(rule.previous_name.as_deref(), Some("old name"));
        assert!(rule.modified.is_some());
        assert_eq!(rule.resources.images, vec!["*", "foo/*"]);
        assert_eq!(rule.condition.vulnerabilities[0].minimum_severity, Severity::CRITICAL);
        assert_eq!(rule.condition.cves.effect, Effect::Alert);
        assert!(rule.condition.cves.only_fixed);
        assert_eq!(rule.block_message, "");
    }

    #[test]
    fn test_serialize_omits_read_only_and_empty_fields() {
        let mut policy = CvePolicy::new(vec![PolicyRule {
            modified: Some(Utc::now()),
            owner: "sys".into(),
            name: "r1".into(),
            ..Default::default()
        }]);
        let json = serde_json::to_value(&policy).unwrap();
        let rule = &json["rules"][0];
        assert!(rule.get("modified").is_none());
        assert!(rule.get("previousName").is_none());
        assert!(rule.get("blockMsg").is_none());
        assert_eq!(rule["condition"]["cves"]["effect"], json!(""));
        assert_eq!(json["policyType"], json!("cve"));
        assert_eq!(json["_id"], json!("cve"));

        policy.rules[0].block_message = "Not permitted".into();
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["rules"][0]["blockMsg"], json!("Not permitted"));
    }

    #[test]
    fn test_unknown_effect_is_rejected_on_input() {
        let err = serde_json::from_value::<CveRule>(json!({"effect": "maybe"})).unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }
}
