//! Declarative cross-tree requirements for optional subsystems.
//!
//! Each optional subsystem is described by one [`SubsystemRule`]: a trigger
//! evaluated against the public tree, plus the dotted paths that become
//! mandatory in each tree once the trigger fires. The validator evaluates the
//! rules generically, so adding a subsystem means adding a rule here and
//! nothing else.

use serde_json::Value;

use super::lookup;

/// Condition under which a rule's requirements apply. Paths are dotted and
/// always refer to the public tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// The value at the path is boolean `true`.
    Enabled(String),
    /// The value at the path equals the given value.
    Equals(String, Value),
}

impl Trigger {
    pub fn is_active(&self, public: &Value) -> bool {
        match self {
            Trigger::Enabled(path) => lookup(public, path) == Some(&Value::Bool(true)),
            Trigger::Equals(path, expected) => lookup(public, path) == Some(expected),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Trigger::Enabled(path) | Trigger::Equals(path, _) => path,
        }
    }
}

/// Required fields imposed on both trees by one optional subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsystemRule {
    pub trigger: Trigger,
    pub required_public: Vec<String>,
    pub required_private: Vec<String>,
}

impl SubsystemRule {
    /// Rule that fires when the boolean at `flag_path` is `true`.
    pub fn when_enabled(flag_path: impl Into<String>) -> Self {
        Self {
            trigger: Trigger::Enabled(flag_path.into()),
            required_public: Vec::new(),
            required_private: Vec::new(),
        }
    }

    /// Rule that fires when the value at `path` equals `value`.
    pub fn when_equals(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            trigger: Trigger::Equals(path.into(), value.into()),
            required_public: Vec::new(),
            required_private: Vec::new(),
        }
    }

    pub fn require_public<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_public
            .extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn require_private<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_private
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Public paths this rule requires that are absent from `public`.
    pub fn missing_public(&self, public: &Value) -> Vec<String> {
        self.required_public
            .iter()
            .filter(|path| lookup(public, path).is_none())
            .cloned()
            .collect()
    }

    /// Private paths this rule requires that are absent from `private`,
    /// reported as comma-joined segments.
    ///
    /// When the subtree shared by all required private paths is missing
    /// entirely, that subtree is reported once instead of every leaf.
    pub fn missing_private(&self, private: &Value) -> Vec<String> {
        if self.required_private.is_empty() {
            return Vec::new();
        }

        let subtree = self.private_subtree();
        if !subtree.is_empty() && lookup(private, &subtree.join(".")).is_none() {
            return vec![subtree.join(",")];
        }

        self.required_private
            .iter()
            .filter(|path| lookup(private, path).is_none())
            .map(|path| path.replace('.', ","))
            .collect()
    }

    /// Longest common parent of the required private paths.
    fn private_subtree(&self) -> Vec<&str> {
        let parents: Vec<Vec<&str>> = self
            .required_private
            .iter()
            .map(|path| {
                let mut segments: Vec<&str> = path.split('.').collect();
                segments.pop();
                segments
            })
            .collect();

        let Some((first, rest)) = parents.split_first() else {
            return Vec::new();
        };

        let mut common = first.clone();
        for parent in rest {
            let shared = common
                .iter()
                .zip(parent.iter())
                .take_while(|(a, b)| a == b)
                .count();
            common.truncate(shared);
        }
        common
    }
}

/// Rules shipped with the service.
pub fn builtin_rules() -> Vec<SubsystemRule> {
    vec![
        SubsystemRule::when_enabled("metrics.influx.enabled")
            .require_public([
                "metrics.influx.uri",
                "metrics.influx.timeoutMilliseconds",
                "metrics.influx.intervalSeconds",
            ])
            .require_private(["metrics.influx.username", "metrics.influx.password"]),
        SubsystemRule::when_equals("metrics.influx.instanceIdFrom", "env-var")
            .require_public(["metrics.influx.instanceIdEnvVarName"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn influx_rule() -> SubsystemRule {
        builtin_rules().remove(0)
    }

    #[test]
    fn enabled_trigger_requires_literal_true() {
        let trigger = Trigger::Enabled("metrics.influx.enabled".to_string());
        assert!(trigger.is_active(&json!({"metrics": {"influx": {"enabled": true}}})));
        assert!(!trigger.is_active(&json!({"metrics": {"influx": {"enabled": false}}})));
        assert!(!trigger.is_active(&json!({"metrics": {"influx": {"enabled": "true"}}})));
        assert!(!trigger.is_active(&json!({})));
    }

    #[test]
    fn equals_trigger_compares_values() {
        let trigger = Trigger::Equals("a.b".to_string(), json!("env-var"));
        assert!(trigger.is_active(&json!({"a": {"b": "env-var"}})));
        assert!(!trigger.is_active(&json!({"a": {"b": "random"}})));
        assert_eq!(trigger.path(), "a.b");
    }

    #[test]
    fn missing_public_lists_each_absent_path() {
        let public = json!({"metrics": {"influx": {"enabled": true, "uri": "http://influx"}}});
        assert_eq!(
            influx_rule().missing_public(&public),
            vec![
                "metrics.influx.timeoutMilliseconds".to_string(),
                "metrics.influx.intervalSeconds".to_string()
            ]
        );
    }

    #[test]
    fn absent_private_subtree_collapses_to_subtree_path() {
        assert_eq!(
            influx_rule().missing_private(&json!({})),
            vec!["metrics,influx".to_string()]
        );
        assert_eq!(
            influx_rule().missing_private(&json!({"metrics": {}})),
            vec!["metrics,influx".to_string()]
        );
    }

    #[test]
    fn absent_private_leaf_reports_full_path() {
        let private = json!({"metrics": {"influx": {"password": "secret"}}});
        assert_eq!(
            influx_rule().missing_private(&private),
            vec!["metrics,influx,username".to_string()]
        );
    }

    #[test]
    fn complete_private_tree_reports_nothing() {
        let private = json!({"metrics": {"influx": {"username": "u", "password": "p"}}});
        assert!(influx_rule().missing_private(&private).is_empty());
    }

    #[test]
    fn subtree_of_unrelated_paths_is_empty() {
        let rule = SubsystemRule::when_enabled("x.enabled").require_private(["a.b", "c.d"]);
        assert_eq!(
            rule.missing_private(&json!({})),
            vec!["a,b".to_string(), "c,d".to_string()]
        );
    }
}
