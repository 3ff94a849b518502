//! robots.txt rules as they apply to "all agents" (`User-agent: *`).

use crate::root::path_and_query;

/// One `Allow`/`Disallow` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    path: String,
    allow: bool,
}

impl RuleLine {
    fn new(path: &str, allow: bool) -> Self {
        // An empty Disallow means "everything is allowed"
        let allow = allow || path.is_empty();
        Self {
            path: path.to_string(),
            allow,
        }
    }

    fn matches(&self, target: &str) -> bool {
        self.path == "*" || target.starts_with(&self.path)
    }
}

#[derive(Debug, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<RuleLine>,
}

/// Access rules for the wildcard user agent.
///
/// Only the first `User-agent: *` group is consulted. Within it, rule lines
/// are checked in file order and the first prefix match decides; a URL no
/// rule matches is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsRules {
    AllowAll,
    DisallowAll,
    Rules(Vec<RuleLine>),
}

impl RobotsRules {
    pub fn allow_all() -> Self {
        RobotsRules::AllowAll
    }

    pub fn disallow_all() -> Self {
        RobotsRules::DisallowAll
    }

    pub fn parse(content: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut current = Group::default();
        let mut in_rules = false;

        for line in content.lines() {
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            }
            .trim();

            if line.is_empty() {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if in_rules {
                        groups.push(std::mem::take(&mut current));
                        in_rules = false;
                    }
                    current.agents.push(value.to_lowercase());
                }
                "disallow" | "allow" => {
                    // Rules before any User-agent line belong to no group
                    if current.agents.is_empty() {
                        continue;
                    }
                    current.rules.push(RuleLine::new(value, directive == "allow"));
                    in_rules = true;
                }
                _ => {}
            }
        }

        if !current.agents.is_empty() {
            groups.push(current);
        }

        match groups
            .into_iter()
            .find(|group| group.agents.iter().any(|agent| agent == "*"))
        {
            Some(group) => RobotsRules::Rules(group.rules),
            None => RobotsRules::AllowAll,
        }
    }

    /// Whether a crawler identifying as `*` may fetch `url`.
    pub fn is_allowed(&self, url: &str) -> bool {
        match self {
            RobotsRules::AllowAll => true,
            RobotsRules::DisallowAll => false,
            RobotsRules::Rules(rules) => {
                let target = path_and_query(url);
                rules
                    .iter()
                    .find(|rule| rule.matches(target))
                    .map(|rule| rule.allow)
                    .unwrap_or(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let content = r#"
User-agent: *
Disallow: /private/
Disallow: /admin/
"#;

        let rules = RobotsRules::parse(content);
        assert!(rules.is_allowed("http://example.com/"));
        assert!(rules.is_allowed("http://example.com/public/page"));
        assert!(!rules.is_allowed("http://example.com/private/secret"));
        assert!(!rules.is_allowed("http://example.com/admin/"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let content = r#"
User-agent: *
Allow: /private/open
Disallow: /private
"#;

        let rules = RobotsRules::parse(content);
        assert!(rules.is_allowed("http://example.com/private/open/page"));
        assert!(!rules.is_allowed("http://example.com/private/closed"));

        let reversed = RobotsRules::parse("User-agent: *\nDisallow: /private\nAllow: /private/open\n");
        assert!(!reversed.is_allowed("http://example.com/private/open/page"));
    }

    #[test]
    fn test_only_wildcard_group_applies() {
        let content = r#"
User-agent: googlebot
Disallow: /

User-agent: *
Disallow: /tmp  # scratch space
"#;

        let rules = RobotsRules::parse(content);
        assert!(rules.is_allowed("http://example.com/"));
        assert!(!rules.is_allowed("http://example.com/tmp/file"));
    }

    #[test]
    fn test_shared_group_and_empty_disallow() {
        let content = "User-agent: bingbot\nUser-agent: *\nDisallow:\n";
        let rules = RobotsRules::parse(content);
        assert!(rules.is_allowed("http://example.com/anything"));
    }

    #[test]
    fn test_no_wildcard_group_allows_everything() {
        let rules = RobotsRules::parse("User-agent: googlebot\nDisallow: /\n");
        assert_eq!(rules, RobotsRules::AllowAll);
        assert!(rules.is_allowed("http://example.com/page"));
    }

    #[test]
    fn test_query_is_part_of_the_match() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /search?\n");
        assert!(rules.is_allowed("http://example.com/search"));
        assert!(!rules.is_allowed("http://example.com/search?q=rust"));
    }

    #[test]
    fn test_disallow_all() {
        assert!(!RobotsRules::disallow_all().is_allowed("http://example.com/"));
        assert!(RobotsRules::allow_all().is_allowed("http://example.com/"));
    }
}
