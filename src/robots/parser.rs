//! Robots.txt parser implementation
//!
//! Allow/disallow matching is delegated to the robotstxt crate (longest match wins,
//! ties resolve to Allow, `*` and `$` wildcards). Crawl-delay and Sitemap lines are
//! parsed here since the matcher does not expose them.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
///
/// Wraps the raw content and the directives the matcher does not cover.
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = parse content)
    allow_all: bool,
    /// Absolute sitemap URLs declared with `Sitemap:`
    sitemaps: Vec<String>,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    ///
    /// # Returns
    ///
    /// A ParsedRobots instance that can be used to check URL permissions
    pub fn from_content(content: &str) -> Self {
        let sitemaps = content
            .lines()
            .filter_map(|line| {
                let (key, value) = strip_comment(line).split_once(':')?;
                if key.trim().eq_ignore_ascii_case("sitemap") {
                    let value = value.trim();
                    (!value.is_empty()).then(|| value.to_string())
                } else {
                    None
                }
            })
            .collect();

        Self {
            content: content.to_string(),
            allow_all: false,
            sitemaps,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt cannot be fetched, is not a 200, or when robots
    /// compliance is switched off.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
            sitemaps: Vec::new(),
        }
    }

    /// Returns true if this instance permits everything unconditionally
    pub fn is_allow_all(&self) -> bool {
        self.allow_all || self.content.trim().is_empty()
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL (or path) to check
    /// * `user_agent` - The crawler's product token (e.g. "SurfaceRipple")
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Sitemap URLs declared in this robots.txt
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// A group that names the agent takes precedence over the wildcard group.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - The crawler's product token
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no crawl delay applies
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.is_allow_all() {
            return None;
        }

        let normalized_agent = user_agent.to_lowercase();

        let mut group_agents: Vec<String> = Vec::new();
        // A user-agent line after any rule line opens a new group
        let mut in_rules = false;
        let mut crawl_delay_for_wildcard: Option<f64> = None;
        let mut crawl_delay_for_agent: Option<f64> = None;

        for line in self.content.lines() {
            let trimmed = strip_comment(line);
            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }

                    let names_agent = group_agents
                        .iter()
                        .any(|ua| ua != "*" && !ua.is_empty() && normalized_agent.contains(ua));
                    if names_agent {
                        crawl_delay_for_agent.get_or_insert(delay);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        crawl_delay_for_wildcard.get_or_insert(delay);
                    }
                }
                "sitemap" => {}
                _ => in_rules = true,
            }
        }

        crawl_delay_for_agent.or(crawl_delay_for_wildcard)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}
