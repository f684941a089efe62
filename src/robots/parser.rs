//! Robots.txt parser implementation
//!
//! Only the `User-agent: *` group is read, and only its `Allow` and `Disallow`
//! lines. Each rule becomes one or more glob patterns over the URL path:
//!
//! | Rule | Patterns |
//! |------|----------|
//! | `/private/` | `/private/`, `/private/**` |
//! | `/admin` | `/admin`, `/admin/**` |
//! | `/page.html` | `/page.html` |
//! | `/*/drafts/` | `/*/drafts/`, `/*/drafts/**` (`*` is one path segment) |
//! | `/tmp*` | `/tmp*`, `/tmp*/**` |
//! | `/exact$` | `/exact` |

use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Allow/disallow patterns for one origin
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    disallowed: Vec<Pattern>,
    allowed: Vec<Pattern>,
    sitemaps: Vec<String>,
}

impl RobotsPolicy {
    /// A policy that disallows nothing
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses robots.txt content
    pub fn parse(content: &str) -> Self {
        let mut policy = Self::default();
        let mut in_star_group = false;
        let mut star_group_done = false;

        for raw_line in content.lines() {
            let line = raw_line.split('#').next().unwrap_or_default().trim();
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();

            match field.as_str() {
                // Sitemap directives are global, whatever group they sit in
                "sitemap" if !value.is_empty() => policy.sitemaps.push(value.to_string()),
                "user-agent" => {
                    if in_star_group {
                        in_star_group = false;
                        star_group_done = true;
                    } else if value == "*" && !star_group_done {
                        in_star_group = true;
                    }
                }
                "disallow" if in_star_group && !value.is_empty() => {
                    policy.disallowed.extend(rule_patterns(value));
                }
                "allow" if in_star_group && !value.is_empty() => {
                    policy.allowed.extend(rule_patterns(value));
                }
                _ => {}
            }
        }

        policy
    }

    /// True iff the path matches a disallow pattern and no allow pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_sweep::robots::RobotsPolicy;
    ///
    /// let policy = RobotsPolicy::parse("User-agent: *\nDisallow: /private/\nAllow: /private/public.html\n");
    /// assert!(policy.is_disallowed("/private/x.html"));
    /// assert!(!policy.is_disallowed("/private/public.html"));
    /// ```
    pub fn is_disallowed(&self, path: &str) -> bool {
        let path = if path.is_empty() { "/" } else { path };
        let hit = |patterns: &[Pattern]| patterns.iter().any(|p| p.matches_with(path, MATCH_OPTIONS));

        hit(&self.disallowed) && !hit(&self.allowed)
    }

    /// `Sitemap:` URLs listed anywhere in the file
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    pub fn is_empty(&self) -> bool {
        self.disallowed.is_empty()
    }
}

/// Expands one robots rule into glob patterns
fn rule_patterns(rule: &str) -> Vec<Pattern> {
    let rule = if rule.starts_with('/') || rule.starts_with('*') {
        rule.to_string()
    } else {
        format!("/{}", rule)
    };

    let mut sources = Vec::with_capacity(2);
    if let Some(exact) = rule.strip_suffix('$') {
        sources.push(to_glob(exact));
    } else if rule == "/" {
        sources.push("/**".to_string());
    } else {
        let glob = to_glob(&rule);
        if looks_like_file(&rule) {
            sources.push(glob);
        } else {
            let recursive = if glob.ends_with('/') {
                format!("{}**", glob)
            } else {
                format!("{}/**", glob)
            };
            sources.push(glob);
            sources.push(recursive);
        }
    }

    sources
        .into_iter()
        .filter_map(|source| match Pattern::new(&source) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::debug!("Ignoring robots rule {}: {}", rule, e);
                None
            }
        })
        .collect()
}

/// Escapes everything but `*`, which keeps its wildcard meaning
fn to_glob(rule: &str) -> String {
    rule.split('*')
        .map(Pattern::escape)
        .collect::<Vec<_>>()
        .join("*")
}

/// A rule naming a single file: its last segment has an extension and no wildcard
fn looks_like_file(rule: &str) -> bool {
    if rule.ends_with('/') || rule.ends_with('*') {
        return false;
    }
    rule.rsplit('/')
        .next()
        .map(|last| !last.contains('*') && last.contains('.'))
        .unwrap_or(false)
}
