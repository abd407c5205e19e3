use serde::Deserialize;

/// Package index and cache options shared by the installer and the legacy
/// installer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IndexOptions {
    /// Every `--index-url` occurrence, in order.
    #[serde(default, rename = "index_url", deserialize_with = "one_or_many")]
    pub index_urls: Vec<String>,
    /// Every `--find-links` occurrence, in order.
    #[serde(default, deserialize_with = "one_or_many")]
    pub find_links: Vec<String>,
    #[serde(default)]
    pub no_index: bool,
    #[serde(default)]
    pub no_cache_dir: bool,
}

impl IndexOptions {
    /// Arguments forwarded verbatim to `pip install`.
    pub fn installer_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for url in &self.index_urls {
            args.push(format!("--index-url={url}"));
        }
        for url in &self.find_links {
            args.push(format!("--find-links={url}"));
        }
        if self.no_index {
            args.push("--no-index".to_string());
        }
        if self.no_cache_dir {
            args.push("--no-cache-dir".to_string());
        }
        args
    }

    /// Renders the `[easy_install]` section honoured by the legacy installer,
    /// or `None` when no index option needs forwarding.
    pub fn legacy_config_text(&self) -> Option<String> {
        if self.index_urls.is_empty() && self.find_links.is_empty() && !self.no_index {
            return None;
        }

        let mut text = String::from("[easy_install]\n");
        // The legacy installer reads a single index.
        if let Some(url) = self.index_urls.last() {
            text.push_str(&format!("index_url = {url}\n"));
        }
        if !self.find_links.is_empty() {
            text.push_str(&format!("find_links = {}\n", self.find_links.join(" ")));
        }
        if self.no_index {
            text.push_str("allow_hosts = localhost\n");
        }
        Some(text)
    }

    /// Overlays `other` on top of `self`: lists from `other` replace ours
    /// when non-empty, switches are OR-ed.
    pub fn merged_with(&self, other: &IndexOptions) -> IndexOptions {
        IndexOptions {
            index_urls: pick_list(&other.index_urls, &self.index_urls),
            find_links: pick_list(&other.find_links, &self.find_links),
            no_index: self.no_index || other.no_index,
            no_cache_dir: self.no_cache_dir || other.no_cache_dir,
        }
    }
}

fn pick_list(preferred: &[String], fallback: &[String]) -> Vec<String> {
    if preferred.is_empty() {
        fallback.to_vec()
    } else {
        preferred.to_vec()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}
