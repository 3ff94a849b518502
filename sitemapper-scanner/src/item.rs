use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often a page is expected to change. `Unset` renders as an empty field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    #[default]
    #[serde(rename = "")]
    Unset,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Always,
    Never,
}

impl ChangeFreq {
    pub const ALL: [ChangeFreq; 8] = [
        ChangeFreq::Unset,
        ChangeFreq::Hourly,
        ChangeFreq::Daily,
        ChangeFreq::Weekly,
        ChangeFreq::Monthly,
        ChangeFreq::Yearly,
        ChangeFreq::Always,
        ChangeFreq::Never,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFreq::Unset => "",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Always => "always",
            ChangeFreq::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeFreq {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChangeFreq::ALL
            .iter()
            .find(|freq| freq.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown change frequency: {}", s))
    }
}

/// One entry of the generated sitemap.
///
/// `lastmod` is `YYYY-MM-DD` or empty, `priority` a decimal string in
/// `0.0..=1.0` or empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapItem {
    pub url: String,
    pub lastmod: String,
    pub changefreq: ChangeFreq,
    pub priority: String,
}

impl SitemapItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            lastmod: String::new(),
            changefreq: ChangeFreq::Unset,
            priority: String::new(),
        }
    }
}
