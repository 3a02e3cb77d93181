pub mod config;

use std::net::IpAddr;

use anyhow::Result;
use ipnetwork::IpNetwork;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::authz::object::Object;

use self::config::{parse_network, AccessControlConfig, RuleConfig};

/// Authentication strength a rule demands, from weakest to strictest.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Bypass,
    OneFactor,
    TwoFactor,
    #[serde(rename = "deny")]
    Denied,
}

/// The caller an access decision is made for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub username: String,
    pub groups: Vec<String>,
    pub ip: Option<IpAddr>,
}

impl Subject {
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }
}

pub trait Authorizer: Send + Sync {
    /// Returns whether the matched rule names explicit subjects, and the
    /// level it requires.
    fn required_level(&self, subject: &Subject, object: &Object) -> (bool, Level);
}

/// Evaluates the configured rules in order; the first match wins.
pub struct RuleAuthorizer {
    default_policy: Level,
    rules: Vec<Rule>,
}

struct Rule {
    domains: Vec<String>,
    resources: Vec<String>,
    methods: Vec<String>,
    networks: Vec<IpNetwork>,
    subjects: Vec<SubjectMatcher>,
    policy: Level,
}

enum SubjectMatcher {
    User(String),
    Group(String),
}

impl RuleAuthorizer {
    pub fn new(cfg: &AccessControlConfig) -> Result<Self> {
        let rules = cfg
            .rules
            .iter()
            .map(Rule::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            default_policy: cfg.default_policy,
            rules,
        })
    }
}

impl Authorizer for RuleAuthorizer {
    fn required_level(&self, subject: &Subject, object: &Object) -> (bool, Level) {
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.is_match(subject, object) {
                trace!(
                    "Access rule #{} matched for {} {}, policy {:?}",
                    idx + 1,
                    object.method,
                    object.url,
                    rule.policy
                );
                return (!rule.subjects.is_empty(), rule.policy);
            }
        }

        trace!(
            "No access rule matched for {} {}, using default policy {:?}",
            object.method,
            object.url,
            self.default_policy
        );
        (false, self.default_policy)
    }
}

impl Rule {
    fn new(cfg: &RuleConfig) -> Result<Self> {
        let networks = cfg
            .networks
            .iter()
            .map(|s| parse_network(s))
            .collect::<Result<Vec<_>>>()?;

        let subjects = cfg
            .subjects
            .iter()
            .filter_map(|s| match s.split_once(':') {
                Some(("user", name)) => Some(SubjectMatcher::User(name.to_lowercase())),
                Some(("group", name)) => Some(SubjectMatcher::Group(name.to_string())),
                _ => None,
            })
            .collect();

        Ok(Self {
            domains: cfg.domains.iter().map(|d| d.to_lowercase()).collect(),
            resources: cfg.resources.clone(),
            methods: cfg.methods.iter().map(|m| m.to_uppercase()).collect(),
            networks,
            subjects,
            policy: cfg.policy,
        })
    }

    fn is_match(&self, subject: &Subject, object: &Object) -> bool {
        self.match_domain(object)
            && self.match_resource(object)
            && self.match_method(object)
            && self.match_network(subject)
            && self.match_subject(subject)
    }

    fn match_domain(&self, object: &Object) -> bool {
        let domain = object.domain();
        self.domains.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => suffix.starts_with('.') && domain.ends_with(suffix),
            None => *pattern == domain,
        })
    }

    fn match_resource(&self, object: &Object) -> bool {
        if self.resources.is_empty() {
            return true;
        }
        let path = object.path();
        self.resources.iter().any(|prefix| path.starts_with(prefix))
    }

    fn match_method(&self, object: &Object) -> bool {
        self.methods.is_empty() || self.methods.contains(&object.method)
    }

    fn match_network(&self, subject: &Subject) -> bool {
        if self.networks.is_empty() {
            return true;
        }
        match subject.ip {
            Some(ip) => {
                let ip = ip.to_canonical();
                self.networks.iter().any(|net| net.contains(ip))
            }
            None => false,
        }
    }

    fn match_subject(&self, subject: &Subject) -> bool {
        // An anonymous caller might still become one of the subjects, so the
        // rule is applied and reported as subject-bearing.
        if self.subjects.is_empty() || subject.is_anonymous() {
            return true;
        }
        self.subjects.iter().any(|matcher| match matcher {
            SubjectMatcher::User(name) => subject.username.to_lowercase() == *name,
            SubjectMatcher::Group(group) => subject.groups.contains(group),
        })
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use crate::config::CommonConfig;

    use super::*;

    fn build(s: &str) -> RuleAuthorizer {
        let mut cfg: AccessControlConfig = toml::from_str(s).unwrap();
        cfg.complete().unwrap();
        RuleAuthorizer::new(&cfg).unwrap()
    }

    fn object(url: &str, method: &str) -> Object {
        Object::new(Url::parse(url).unwrap(), method)
    }

    fn subject(username: &str, groups: &[&str], ip: &str) -> Subject {
        Subject {
            username: username.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            ip: Some(ip.parse().unwrap()),
        }
    }

    const RULES: &str = r#"
    default_policy = "deny"

    [[rules]]
    domains = ["public.example.com"]
    policy = "bypass"

    [[rules]]
    domains = ["*.internal.example.com"]
    networks = ["10.0.0.0/8"]
    policy = "bypass"

    [[rules]]
    domains = ["admin.example.com"]
    subjects = ["group:admins"]
    policy = "two_factor"

    [[rules]]
    domains = ["admin.example.com"]
    policy = "deny"

    [[rules]]
    domains = ["app.example.com"]
    resources = ["/api"]
    methods = ["POST"]
    policy = "two_factor"

    [[rules]]
    domains = ["app.example.com", "*.app.example.com"]
    policy = "one_factor"
    "#;

    #[test]
    fn test_required_level() {
        let authorizer = build(RULES);
        let anonymous = Subject {
            ip: Some("203.0.113.5".parse().unwrap()),
            ..Default::default()
        };
        let john = subject("john", &["dev"], "10.1.1.1");
        let harry = subject("harry", &["admins"], "203.0.113.5");

        let cases = [
            (&anonymous, "https://public.example.com/", "GET", (false, Level::Bypass)),
            (&anonymous, "https://PUBLIC.example.com:8443/x", "GET", (false, Level::Bypass)),
            (&john, "https://git.internal.example.com/", "GET", (false, Level::Bypass)),
            (&anonymous, "https://git.internal.example.com/", "GET", (false, Level::Denied)),
            (&anonymous, "https://internal.example.com/", "GET", (false, Level::Denied)),
            (&anonymous, "https://admin.example.com/", "GET", (true, Level::TwoFactor)),
            (&harry, "https://admin.example.com/", "GET", (true, Level::TwoFactor)),
            (&john, "https://admin.example.com/", "GET", (false, Level::Denied)),
            (&john, "https://app.example.com/api/items", "POST", (false, Level::TwoFactor)),
            (&john, "https://app.example.com/api/items", "GET", (false, Level::OneFactor)),
            (&john, "https://app.example.com/", "POST", (false, Level::OneFactor)),
            (&john, "https://x.app.example.com/", "GET", (false, Level::OneFactor)),
            (&john, "https://unknown.example.org/", "GET", (false, Level::Denied)),
        ];
        for (subject, url, method, expect) in cases {
            let result = authorizer.required_level(subject, &object(url, method));
            assert_eq!(result, expect, "{} {method} {url}", subject.username);
        }
    }

    #[test]
    fn test_user_subject() {
        let authorizer = build(
            r#"
            [[rules]]
            domains = ["example.com"]
            subjects = ["user:John"]
            policy = "deny"
            "#,
        );
        let obj = object("https://example.com/", "GET");

        let john = subject("JOHN", &[], "127.0.0.1");
        assert_eq!(authorizer.required_level(&john, &obj), (true, Level::Denied));

        let bob = subject("bob", &[], "127.0.0.1");
        assert_eq!(authorizer.required_level(&bob, &obj), (false, Level::OneFactor));
    }

    #[test]
    fn test_missing_ip() {
        let authorizer = build(
            r#"
            [[rules]]
            domains = ["example.com"]
            networks = ["0.0.0.0/0"]
            policy = "bypass"
            "#,
        );
        let obj = object("https://example.com/", "GET");
        let subject = Subject::default();
        assert_eq!(
            authorizer.required_level(&subject, &obj),
            (false, Level::OneFactor)
        );
    }

    #[test]
    fn test_mapped_network() {
        let authorizer = build(RULES);
        let obj = object("https://git.internal.example.com/", "GET");

        let mapped = subject("john", &[], "::ffff:10.1.1.1");
        assert_eq!(authorizer.required_level(&mapped, &obj), (false, Level::Bypass));

        let outside = subject("john", &[], "::ffff:192.168.1.1");
        assert_eq!(authorizer.required_level(&outside, &obj), (false, Level::Denied));
    }

    #[test]
    fn test_level_order() {
        assert!(Level::Bypass < Level::OneFactor);
        assert!(Level::OneFactor < Level::TwoFactor);
        assert!(Level::TwoFactor < Level::Denied);
    }
}
