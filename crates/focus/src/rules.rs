//! Declarative redirect rules
//!
//! Each blocked site produces two rules, one for the bare host and one for
//! the `www.` host, both redirecting top-level navigations to the blocked
//! page. Ids are fixed by site position: site `i` owns ids `2i + 1` and
//! `2i + 2`, so the whole set always occupies `1..=2N`.

use serde::{Deserialize, Serialize};

/// Priority given to every generated rule
pub const RULE_PRIORITY: u32 = 1;

/// Resource types a rule condition can match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
}

/// What a matching rule does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAction {
    Redirect { redirect: Redirect },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub url: String,
}

/// When a rule matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

/// A single declarative rule as consumed by the rule engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl Rule {
    /// Redirect main-frame navigations to `host` towards `target`
    pub fn redirect(id: u32, host: &str, target: &str) -> Self {
        Self {
            id,
            priority: RULE_PRIORITY,
            action: RuleAction::Redirect {
                redirect: Redirect {
                    url: target.to_string(),
                },
            },
            condition: RuleCondition {
                url_filter: url_filter(host),
                resource_types: vec![ResourceType::MainFrame],
            },
        }
    }

    /// Redirect target of this rule
    pub fn redirect_url(&self) -> &str {
        match &self.action {
            RuleAction::Redirect { redirect } => &redirect.url,
        }
    }
}

/// Host-anchored filter: `||host^`
pub fn url_filter(host: &str) -> String {
    format!("||{}^", host)
}

/// The fixed id range owned by the blocker for `site_count` sites
pub fn rule_ids(site_count: usize) -> Vec<u32> {
    (1..=(site_count as u32 * 2)).collect()
}

/// Generate the complete rule set for `sites`
pub fn generate_rules(sites: &[String], blocked_page_url: &str) -> Vec<Rule> {
    sites
        .iter()
        .enumerate()
        .flat_map(|(index, site)| {
            let base = index as u32 * 2;
            [
                Rule::redirect(base + 1, site, blocked_page_url),
                Rule::redirect(base + 2, &format!("www.{}", site), blocked_page_url),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "file:///data/blocked.html";

    #[test]
    fn test_two_sites_give_four_rules() {
        let sites = vec!["example.com".to_string(), "news.example.org".to_string()];
        let rules = generate_rules(&sites, PAGE);

        assert_eq!(rules.len(), 4);
        let ids: Vec<u32> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, rule_ids(2));

        let filters: Vec<&str> = rules.iter().map(|r| r.condition.url_filter.as_str()).collect();
        assert_eq!(
            filters,
            vec![
                "||example.com^",
                "||www.example.com^",
                "||news.example.org^",
                "||www.news.example.org^",
            ]
        );

        for rule in &rules {
            assert_eq!(rule.priority, RULE_PRIORITY);
            assert_eq!(rule.redirect_url(), PAGE);
            assert_eq!(rule.condition.resource_types, vec![ResourceType::MainFrame]);
        }
    }

    #[test]
    fn test_no_sites_no_rules() {
        assert!(generate_rules(&[], PAGE).is_empty());
        assert!(rule_ids(0).is_empty());
    }

    #[test]
    fn test_wire_shape() {
        let rule = Rule::redirect(1, "example.com", PAGE);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "priority": 1,
                "action": { "type": "redirect", "redirect": { "url": PAGE } },
                "condition": { "urlFilter": "||example.com^", "resourceTypes": ["main_frame"] }
            })
        );
    }
}
