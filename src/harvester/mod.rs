//! # Documentation Harvester Module
//!
//! Crawls documentation sites, extracts the main readable content of each page
//! as Markdown, and persists one file per distinct URL. This is the web-facing
//! half of corpus collection; the git collector covers the tutorial repo.
//!
//! ## Key Components
//!
//! - `HarvesterConfig`: seeds, allowed domain, politeness, and file naming
//! - `run_harvester`: crawl the seeds and write the Markdown corpus
//! - `blog_harvester` / `reference_harvester`: the two predefined harvesters
//!
//! Crawl traversal, deduplication within a seed, and request politeness are
//! delegated to the `spider` crate; readability extraction and HTML-to-Markdown
//! conversion come from `spider_utils` transformations.

mod config;
mod error;

pub use config::{HarvesterConfig, HarvesterConfigBuilder, NamingScheme, SectionMap};
pub use error::HarvestError;

use scraper::{Html, Selector};
use spider::website::Website;
use spider_utils::spider_transformations::transformation::content::{
    transform_content, ReturnFormat, TransformConfig,
};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, info_span, instrument, warn};
use url::Url;

/// Pages whose extracted Markdown is shorter than this are dropped as chrome
const MIN_CONTENT_LEN: usize = 100;

/// A page captured during a crawl, before it is written to disk
#[derive(Debug, Clone)]
pub struct CrawledDoc {
    /// URL the page was fetched from
    pub url: String,

    /// Page title, when the HTML carried one
    pub title: Option<String>,

    /// Main content converted to Markdown
    pub markdown: String,
}

/// A page written to the corpus
#[derive(Debug, Clone)]
pub struct HarvestedDoc {
    pub url: String,
    pub path: PathBuf,
    pub title: Option<String>,
}

/// The blog harvester: fixed tutorial posts on qubitquants.github.io.
pub fn blog_harvester() -> HarvesterConfig {
    let seeds = [
        "https://qubitquants.github.io/aligning-mtf-data/index.html",
        "https://qubitquants.github.io/strategydev/index.html",
        "https://qubitquants.github.io/vbt_plot_strategy/index.html",
        "https://qubitquants.github.io/multi_asset_portfolio_simulation/index.html",
        "https://qubitquants.github.io/parameter-optimization/index.html",
        "https://qubitquants.github.io/customsim_0/index.html",
        "https://qubitquants.github.io/customsim_1/index.html",
        "https://qubitquants.github.io/customsim_2/index.html",
        "https://qubitquants.github.io/customsim_3/index.html",
    ];
    HarvesterConfig::builder()
        .name("qubit_quants_blog")
        .seeds(seeds.iter().map(|s| s.to_string()).collect())
        .allowed_domain("qubitquants.github.io")
        .output_dir("docs/qubit_quants_blog")
        .naming(NamingScheme::Slug)
        .build()
}

/// The reference harvester: private vectorbt.pro documentation sections,
/// parameterized by the secret URL fragment.
pub fn reference_harvester(secret_url: &str) -> HarvesterConfig {
    let seeds = ["features", "tutorials", "documentation", "api", "cookbook"]
        .iter()
        .map(|section| format!("https://vectorbt.pro/{}/{}/", secret_url, section))
        .collect();
    let map = SectionMap::new(
        vec![
            ("features", "features.md"),
            ("tutorials", "tutorials.md"),
            ("documentation", "documentation.md"),
            ("api", "api.md"),
            ("cookbook", "cookbook.md"),
        ],
        // The secret fragment occupies the first path segment.
        1,
    );
    HarvesterConfig::builder()
        .name("vbt_pro")
        .seeds(seeds)
        .allowed_domain("vectorbt.pro")
        .output_dir("docs/vbt_pro")
        .naming(NamingScheme::SectionMap(map))
        .required_fragment(secret_url)
        .build()
}

/// Crawl every seed and persist one Markdown file per distinct page.
///
/// Re-harvesting overwrites existing files. URLs already written during this
/// run are skipped when later seeds reach them again.
#[instrument(skip(config), fields(harvester = %config.name))]
pub async fn run_harvester(config: &HarvesterConfig) -> Result<Vec<HarvestedDoc>, HarvestError> {
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let mut written: HashSet<String> = HashSet::new();
    let mut docs = Vec::new();

    for seed in &config.seeds {
        info!("Harvesting seed {}", seed);
        let pages = crawl_seed(seed, config).await?;

        for page in pages {
            if !written.insert(page.url.clone()) {
                debug!("Already written this run: {}", page.url);
                continue;
            }

            let path = target_path(config, &page.url)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &page.markdown).await?;
            debug!("Wrote {} -> {}", page.url, path.display());

            docs.push(HarvestedDoc {
                url: page.url,
                path,
                title: page.title,
            });
        }
    }

    info!("Harvested {} pages", docs.len());
    Ok(docs)
}

/// Crawl one seed URL, collecting pages that pass the domain and fragment
/// filters with enough readable content.
async fn crawl_seed(seed: &str, config: &HarvesterConfig) -> Result<Vec<CrawledDoc>, HarvestError> {
    let mut website = Website::new(seed);
    website
        .configuration
        .with_respect_robots_txt(config.respect_robots_txt)
        .with_user_agent(Some(&config.user_agent))
        .with_delay(config.delay_ms);
    if config.max_pages > 0 {
        website.configuration.with_limit(config.max_pages);
    }

    let mut rx = website
        .subscribe(16)
        .ok_or_else(|| HarvestError::Subscribe("failed to subscribe to website".to_string()))?;

    let allowed_domain = config.allowed_domain.clone();
    let required_fragment = config.required_fragment.clone();
    let handle = tokio::spawn(async move {
        let mut pages = Vec::new();
        while let Ok(page) = rx.recv().await {
            let _page_span = info_span!("process_page", url = %page.get_url());
            let url = page.get_url().to_string();

            if !page_allowed(&url, &allowed_domain, required_fragment.as_deref()) {
                debug!("Filtered out {}", url);
                continue;
            }

            let transform_config = TransformConfig {
                return_format: ReturnFormat::Markdown,
                readability: true,
                main_content: true,
                ..Default::default()
            };
            let markdown = transform_content(&page, &transform_config, &None, &None, &None);
            if markdown.len() < MIN_CONTENT_LEN {
                debug!("Skipping near-empty page: {}", url);
                continue;
            }

            let title = extract_title(&page.get_html());
            pages.push(CrawledDoc {
                url,
                title,
                markdown,
            });
        }
        pages
    });

    website.crawl().await;
    website.unsubscribe();

    handle
        .await
        .map_err(|e| HarvestError::Task(format!("crawl task join error: {}", e)))
}

/// Whether a crawled URL belongs to the corpus.
fn page_allowed(url: &str, allowed_domain: &str, required_fragment: Option<&str>) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        warn!("Unparseable crawled URL: {}", url);
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    if host != allowed_domain && !host.ends_with(&format!(".{}", allowed_domain)) {
        return false;
    }
    match required_fragment {
        Some(fragment) => url.contains(fragment),
        None => true,
    }
}

/// Extract the `<title>` text from raw page HTML.
fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Map a page URL onto its output file according to the naming scheme.
fn target_path(config: &HarvesterConfig, url: &str) -> Result<PathBuf, HarvestError> {
    let parsed = Url::parse(url)?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let file = match &config.naming {
        NamingScheme::Slug => {
            let mut segments = segments;
            if segments
                .last()
                .is_some_and(|last| last.ends_with(".html"))
            {
                segments.pop();
            }
            let slug = segments.last().copied().unwrap_or("index");
            PathBuf::from(format!("{}.md", slug))
        }
        NamingScheme::SectionMap(map) => {
            let section = segments.get(map.skip_segments()).copied();
            match section {
                Some("api") => {
                    // One file per API page, named after the last segment.
                    let page = segments.last().copied().unwrap_or("api");
                    PathBuf::from("api").join(format!("{}.md", page))
                }
                Some(section) => PathBuf::from(map.lookup(section).unwrap_or("unknown.md")),
                None => PathBuf::from("unknown.md"),
            }
        }
    };

    Ok(config.output_dir.join(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blog_harvester_fixture() {
        let config = blog_harvester();
        assert_eq!(config.seeds.len(), 9);
        assert_eq!(config.allowed_domain, "qubitquants.github.io");
        assert!(matches!(config.naming, NamingScheme::Slug));
        assert!(config.required_fragment.is_none());
    }

    #[test]
    fn test_reference_harvester_fixture() {
        let config = reference_harvester("pvt-secret");
        assert_eq!(config.seeds.len(), 5);
        assert!(config.seeds[0].starts_with("https://vectorbt.pro/pvt-secret/"));
        assert_eq!(config.required_fragment.as_deref(), Some("pvt-secret"));
    }

    #[test]
    fn test_slug_naming() {
        let config = blog_harvester();
        let path = target_path(
            &config,
            "https://qubitquants.github.io/strategydev/index.html",
        )
        .unwrap();
        assert_eq!(
            path,
            PathBuf::from("docs/qubit_quants_blog/strategydev.md")
        );
    }

    #[test]
    fn test_slug_naming_without_index_html() {
        let config = blog_harvester();
        let path =
            target_path(&config, "https://qubitquants.github.io/customsim_0/").unwrap();
        assert_eq!(
            path,
            PathBuf::from("docs/qubit_quants_blog/customsim_0.md")
        );
    }

    #[test]
    fn test_section_map_naming() {
        let config = reference_harvester("pvt");
        let features = target_path(&config, "https://vectorbt.pro/pvt/features/").unwrap();
        assert_eq!(features, PathBuf::from("docs/vbt_pro/features.md"));

        let cookbook = target_path(&config, "https://vectorbt.pro/pvt/cookbook/").unwrap();
        assert_eq!(cookbook, PathBuf::from("docs/vbt_pro/cookbook.md"));
    }

    #[test]
    fn test_api_pages_fan_out() {
        let config = reference_harvester("pvt");
        let page =
            target_path(&config, "https://vectorbt.pro/pvt/api/portfolio/").unwrap();
        assert_eq!(page, PathBuf::from("docs/vbt_pro/api/portfolio.md"));

        let root = target_path(&config, "https://vectorbt.pro/pvt/api/").unwrap();
        assert_eq!(root, PathBuf::from("docs/vbt_pro/api/api.md"));
    }

    #[test]
    fn test_unknown_section() {
        let config = reference_harvester("pvt");
        let path = target_path(&config, "https://vectorbt.pro/pvt/blog/").unwrap();
        assert_eq!(path, PathBuf::from("docs/vbt_pro/unknown.md"));
    }

    #[test]
    fn test_page_allowed_domain_filter() {
        assert!(page_allowed(
            "https://qubitquants.github.io/post/",
            "qubitquants.github.io",
            None
        ));
        assert!(!page_allowed(
            "https://example.com/post/",
            "qubitquants.github.io",
            None
        ));
    }

    #[test]
    fn test_page_allowed_fragment_filter() {
        assert!(page_allowed(
            "https://vectorbt.pro/pvt/api/",
            "vectorbt.pro",
            Some("pvt")
        ));
        assert!(!page_allowed(
            "https://vectorbt.pro/public/about/",
            "vectorbt.pro",
            Some("pvt")
        ));
    }

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title> Strategy Dev </title></head><body></body></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Strategy Dev"));
        assert_eq!(extract_title("<html><body>no title</body></html>"), None);
    }
}
