//! Honkai Impact 3 official news: a paginated JSON listing whose article pages
//! embed their body in an inline script

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};

use onion_reader_domain::{FeedSpec, PagedItem, PagedSource, SourceError};

use super::{
    SOURCE_OFFSET, default_games_category, default_priority, default_true, parse_timestamp,
};
use crate::embedded::extract_embedded_content;
use crate::http::{build_client, get_json, get_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Honkai3Config {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Content list endpoint; also the feed's natural key
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Root that article links are built on (`<root>/news/<contentId>`)
    #[serde(default = "default_article_base_url")]
    pub article_base_url: String,

    #[serde(default = "default_website")]
    pub website: String,

    #[serde(default = "default_channel_id")]
    pub channel_id: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Stop paginating after this many pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,

    #[serde(default = "default_feed_name")]
    pub feed_name: String,

    #[serde(default = "default_priority")]
    pub priority: i8,

    #[serde(default = "default_games_category")]
    pub category: String,
}

fn default_api_url() -> String {
    "https://www.bh3.com/content/bh3Cn/getContentList".to_string()
}

fn default_article_base_url() -> String {
    "https://www.bh3.com".to_string()
}

fn default_website() -> String {
    "https://www.bh3.com/news/cate/171".to_string()
}

fn default_channel_id() -> u32 {
    171
}

fn default_page_size() -> u32 {
    10
}

fn default_feed_name() -> String {
    "Honkai Impact 3".to_string()
}

impl Default for Honkai3Config {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_api_url(),
            article_base_url: default_article_base_url(),
            website: default_website(),
            channel_id: default_channel_id(),
            page_size: default_page_size(),
            max_pages: None,
            feed_name: default_feed_name(),
            priority: default_priority(),
            category: default_games_category(),
        }
    }
}

impl Honkai3Config {
    /// Point the API and article URLs at `base` (a mirror or a test server)
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_url: format!("{}/content/bh3Cn/getContentList", base),
            article_base_url: base.to_string(),
            website: format!("{}/news/cate/171", base),
            ..Self::default()
        }
    }
}

/// Envelope of the content list endpoint
#[derive(Debug, Deserialize)]
struct ContentResponse {
    retcode: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    message: String,
    data: Option<ContentList>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ContentList {
    #[serde(default, deserialize_with = "null_as_default")]
    list: Vec<ContentItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    total: u64,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ContentItem {
    #[serde(default, deserialize_with = "null_as_default")]
    author: String,
    #[serde(rename = "channelId", default, deserialize_with = "null_as_default")]
    channel_id: Vec<String>,
    #[serde(rename = "contentId")]
    content_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    ext: Vec<Attribute>,
    #[serde(default, deserialize_with = "null_as_default")]
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    intro: String,
    start_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    tag: String,
    title: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    url: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Attribute {
    #[serde(rename = "keyId", default, deserialize_with = "null_as_default")]
    key_id: i64,
    #[serde(rename = "arrtName", default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    value: AttributeValue,
}

/// Attribute payload; the API sends a placeholder string where no images exist
#[derive(Debug, Default, Deserialize)]
#[serde(from = "RawAttributeValue")]
#[allow(dead_code)]
struct AttributeValue {
    images: Vec<Image>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAttributeValue {
    Placeholder(#[allow(dead_code)] String),
    Images(Vec<Image>),
}

impl From<RawAttributeValue> for AttributeValue {
    fn from(raw: RawAttributeValue) -> Self {
        match raw {
            RawAttributeValue::Placeholder(_) => Self::default(),
            RawAttributeValue::Images(images) => Self { images },
        }
    }
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Image {
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    url: String,
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Honkai Impact 3 news source
pub struct Honkai3Source {
    client: Client,
    api_url: String,
    article_base_url: String,
    channel_id: u32,
    page_size: u32,
    feed: FeedSpec,
}

impl Honkai3Source {
    pub fn new(config: &Honkai3Config, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_url: config.api_url.clone(),
            article_base_url: config.article_base_url.trim_end_matches('/').to_string(),
            channel_id: config.channel_id,
            page_size: config.page_size,
            feed: FeedSpec {
                name: config.feed_name.clone(),
                priority: config.priority,
                url: config.api_url.clone(),
                website: config.website.clone(),
                category: config.category.clone(),
            },
        })
    }

    fn to_paged_item(&self, item: ContentItem) -> Result<PagedItem, SourceError> {
        let link = format!("{}/news/{}", self.article_base_url, item.content_id);
        Ok(PagedItem {
            guid: link.clone(),
            link,
            title: item.title,
            author: item.author,
            date: parse_timestamp(&item.start_time, SOURCE_OFFSET)?,
        })
    }
}

#[async_trait]
impl PagedSource for Honkai3Source {
    fn feed(&self) -> &FeedSpec {
        &self.feed
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    async fn fetch_page(&self, page_num: u32) -> Result<Vec<PagedItem>, SourceError> {
        let request = self.client.get(&self.api_url).query(&[
            ("pageSize", self.page_size),
            ("pageNum", page_num),
            ("channelId", self.channel_id),
        ]);
        let response: ContentResponse = get_json(request, &self.api_url).await?;

        if response.retcode != 0 {
            return Err(SourceError::Upstream(format!(
                "retcode {}: {}",
                response.retcode, response.message
            )));
        }

        let Some(data) = response.data else {
            return Ok(Vec::new());
        };

        data.list
            .into_iter()
            .map(|item| self.to_paged_item(item))
            .collect()
    }

    async fn fetch_content(&self, item: &PagedItem) -> Result<String, SourceError> {
        let body = get_text(&self.client, &item.link).await?;
        extract_embedded_content(&body)
    }
}
