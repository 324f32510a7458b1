use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use url::Url;

use crate::{
    classifier::classify,
    error::{Error, Result},
    highwire::{TagMap, extract_tags_with},
    record::CitationRecord,
    report::{Reporter, TracingReporter},
};

/// Desktop browser agent sent on the second attempt, for publishers that turn away
/// non-browser clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Gets the raw text of a page.
pub trait PageFetcher {
    /// Never fails: an unreachable page is returned as empty text.
    fn fetch(&self, url: &Url, reporter: &dyn Reporter) -> String;
}

/// Timeouts and agent used by [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub connect_timeout: Duration,
    pub global_timeout: Duration,
    pub browser_user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            connect_timeout: Duration::from_secs(5),
            global_timeout: Duration::from_secs(15),
            browser_user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Blocking HTTP fetcher. Tries a plain request, then once more as a browser.
pub struct HttpFetcher {
    agent: ureq::Agent,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let cfg = ureq::Agent::config_builder()
            .timeout_connect(Some(config.connect_timeout))
            .timeout_global(Some(config.global_timeout))
            .build();
        HttpFetcher {
            agent: ureq::Agent::new_with_config(cfg),
            config,
        }
    }

    fn get(&self, url: &Url, user_agent: Option<&str>) -> std::result::Result<String, ureq::Error> {
        let mut req = self.agent.get(url.as_str());
        if let Some(ua) = user_agent {
            req = req.header("User-Agent", ua);
        }
        req.call()?.into_body().read_to_string()
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        HttpFetcher::new(FetchConfig::default())
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &Url, reporter: &dyn Reporter) -> String {
        let attempts = [None, Some(self.config.browser_user_agent.as_str())];
        for (i, ua) in attempts.into_iter().enumerate() {
            match self.get(url, ua) {
                Ok(body) => return body,
                Err(e) => reporter.fetch_failed(url.as_str(), i as u8 + 1, &e),
            }
        }
        String::new()
    }
}

/// Read a locally saved page.
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Ties a page fetcher and a reporter to the extraction and classification steps.
pub struct Resolver<F = HttpFetcher, R = TracingReporter> {
    fetcher: F,
    reporter: R,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(HttpFetcher::default(), TracingReporter)
    }
}

impl<F: PageFetcher, R: Reporter> Resolver<F, R> {
    pub fn new(fetcher: F, reporter: R) -> Self {
        Resolver { fetcher, reporter }
    }

    /// Classify an already extracted mapping.
    pub fn from_mapping<I, S>(
        &self,
        map: TagMap,
        name: &str,
        tags: I,
    ) -> Result<CitationRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        classify(map, name, tags, &self.reporter)
    }

    /// Extract and classify raw page text.
    pub fn from_html<I, S>(&self, html: &str, name: &str, tags: I) -> Result<CitationRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = extract_tags_with(html, &self.reporter)?;
        classify(map, name, tags, &self.reporter)
    }

    /// Fetch `url` and classify the article it shows.
    pub fn from_url<I, S>(&self, name: &str, url: &str, tags: I) -> Result<CitationRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let url = Url::parse(url.trim()).map_err(|source| Error::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let html = self.fetcher.fetch(&url, &self.reporter);
        self.from_html(&html, name, tags)
    }

    /// Read `filename` (inside `dir` when given) and classify the article it holds.
    ///
    /// `dir` is kept as the record's library path.
    pub fn from_file<I, S>(
        &self,
        name: &str,
        filename: &str,
        dir: Option<&Path>,
        tags: I,
    ) -> Result<CitationRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = match dir {
            Some(d) => d.join(filename),
            None => PathBuf::from(filename),
        };
        let html = read_source(&path)?;
        let mut record = self.from_html(&html, name, tags)?;
        if let Some(d) = dir {
            record.library_path = d.display().to_string();
        }
        Ok(record)
    }
}

/// Fetch `url` over HTTP and classify it, logging through `tracing`.
pub fn classify_from_url<I, S>(name: &str, url: &str, tags: I) -> Result<CitationRecord>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    <Resolver>::default().from_url(name, url, tags)
}

/// Read a saved page and classify it, logging through `tracing`.
pub fn classify_from_file<I, S>(
    name: &str,
    filename: &str,
    dir: Option<&Path>,
    tags: I,
) -> Result<CitationRecord>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    <Resolver>::default().from_file(name, filename, dir, tags)
}
