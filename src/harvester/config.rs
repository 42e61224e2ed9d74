//! # Harvester Configuration Module
//!
//! Configuration for the documentation harvesters, including seed URLs, the
//! allowed domain, politeness controls, and the per-harvester file naming
//! scheme. Uses a builder pattern for flexible configuration.

use std::path::PathBuf;

/// How a harvested page URL maps to an output file
#[derive(Debug, Clone)]
pub enum NamingScheme {
    /// Derive the file name from the last meaningful path segment
    /// (`.../strategydev/index.html` becomes `strategydev.md`).
    Slug,

    /// Map the section segment of the URL path onto a fixed file name.
    SectionMap(SectionMap),
}

/// Fixed section-to-file mapping for reference documentation
///
/// The section is the path segment following `skip_segments` leading segments
/// (the private URL fragment). Pages in the `api` section fan out to one file
/// per page under `api/`; unmapped sections collapse into `unknown.md`.
#[derive(Debug, Clone)]
pub struct SectionMap {
    entries: Vec<(String, String)>,
    skip_segments: usize,
}

impl SectionMap {
    pub fn new(entries: Vec<(&str, &str)>, skip_segments: usize) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            skip_segments,
        }
    }

    pub fn skip_segments(&self) -> usize {
        self.skip_segments
    }

    pub fn lookup(&self, section: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == section)
            .map(|(_, v)| v.as_str())
    }
}

/// Configuration for a documentation harvester
#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    /// Name used for logging
    pub name: String,

    /// URLs the crawl starts from
    pub seeds: Vec<String>,

    /// Only pages on this domain are persisted
    pub allowed_domain: String,

    /// Directory receiving one Markdown file per page
    pub output_dir: PathBuf,

    /// File naming scheme
    pub naming: NamingScheme,

    /// Required substring in persisted page URLs (the secret path segment)
    pub required_fragment: Option<String>,

    /// User agent for requests
    pub user_agent: String,

    /// Politeness delay between requests in milliseconds
    pub delay_ms: u64,

    /// Whether to respect robots.txt
    pub respect_robots_txt: bool,

    /// Page cap per seed; 0 leaves the crawl unbounded
    pub max_pages: u32,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            name: "harvester".to_string(),
            seeds: Vec::new(),
            allowed_domain: String::new(),
            output_dir: PathBuf::from("docs"),
            naming: NamingScheme::Slug,
            required_fragment: None,
            user_agent: format!("quantgpt-harvester/{}", env!("CARGO_PKG_VERSION")),
            delay_ms: 250,
            respect_robots_txt: true,
            max_pages: 0,
        }
    }
}

/// Builder for HarvesterConfig
#[derive(Debug, Default)]
pub struct HarvesterConfigBuilder {
    config: HarvesterConfig,
}

impl HarvesterConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HarvesterConfig::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn seeds(mut self, seeds: Vec<String>) -> Self {
        self.config.seeds = seeds;
        self
    }

    pub fn allowed_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.allowed_domain = domain.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn naming(mut self, naming: NamingScheme) -> Self {
        self.config.naming = naming;
        self
    }

    pub fn required_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.config.required_fragment = Some(fragment.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.delay_ms = delay_ms;
        self
    }

    pub fn respect_robots_txt(mut self, respect: bool) -> Self {
        self.config.respect_robots_txt = respect;
        self
    }

    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    pub fn build(self) -> HarvesterConfig {
        self.config
    }
}

impl HarvesterConfig {
    pub fn builder() -> HarvesterConfigBuilder {
        HarvesterConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = HarvesterConfig::builder().name("blog").build();
        assert_eq!(config.name, "blog");
        assert_eq!(config.max_pages, 0);
        assert!(config.respect_robots_txt);
        assert!(config.required_fragment.is_none());
    }

    #[test]
    fn test_section_map_lookup() {
        let map = SectionMap::new(vec![("features", "features.md"), ("api", "api.md")], 1);
        assert_eq!(map.lookup("features"), Some("features.md"));
        assert_eq!(map.lookup("missing"), None);
        assert_eq!(map.skip_segments(), 1);
    }
}
