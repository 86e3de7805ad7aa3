//! Arknights official news: an HTML listing plus one HTML detail page per article

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use onion_reader_domain::{EntryDraft, FeedSpec, ListingSource, RawListItem, SourceError};

use super::{SOURCE_OFFSET, default_games_category, default_priority, default_true, parse_day};
use crate::html_tokens::{Token, Tokens};
use crate::http::{build_client, get_text};

const ITEM_LINK_CLASS: &str = "articleItemLink";
const ITEM_DATE_CLASS: &str = "articleItemDate";
const ITEM_CATEGORY_CLASS: &str = "articleItemCate";
const ITEM_TITLE_CLASS: &str = "articleItemTitle";

static ARTICLE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/news/([^/?#]+)\.html$").expect("valid href pattern"));
static AUTHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.article-author").expect("valid author selector"));
static CONTENT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.article-content").expect("valid content selector"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArknightsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Site root, used to build article links and guids
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Listing page; also the feed's natural key
    #[serde(default = "default_list_url")]
    pub list_url: String,

    #[serde(default = "default_feed_name")]
    pub feed_name: String,

    #[serde(default = "default_priority")]
    pub priority: i8,

    #[serde(default = "default_games_category")]
    pub category: String,
}

fn default_site_url() -> String {
    "https://ak.hypergryph.com".to_string()
}

fn default_list_url() -> String {
    "https://ak.hypergryph.com/news.html".to_string()
}

fn default_feed_name() -> String {
    "Arknights".to_string()
}

impl Default for ArknightsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            site_url: default_site_url(),
            list_url: default_list_url(),
            feed_name: default_feed_name(),
            priority: default_priority(),
            category: default_games_category(),
        }
    }
}

impl ArknightsConfig {
    /// Point every URL at `base` (a mirror or a test server)
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            site_url: base.to_string(),
            list_url: format!("{}/news.html", base),
            ..Self::default()
        }
    }
}

/// Arknights news source
pub struct ArknightsSource {
    client: Client,
    site_url: String,
    feed: FeedSpec,
}

impl ArknightsSource {
    pub fn new(config: &ArknightsConfig, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(timeout)?,
            site_url: config.site_url.trim_end_matches('/').to_string(),
            feed: FeedSpec {
                name: config.feed_name.clone(),
                priority: config.priority,
                url: config.list_url.clone(),
                website: config.list_url.clone(),
                category: config.category.clone(),
            },
        })
    }

    fn link_for(&self, item: &RawListItem) -> String {
        format!("{}/news/{}.html", self.site_url, item.id)
    }
}

#[async_trait]
impl ListingSource for ArknightsSource {
    fn feed(&self) -> &FeedSpec {
        &self.feed
    }

    fn guid_for(&self, item: &RawListItem) -> String {
        format!("{}/news/{}", self.site_url, item.id)
    }

    async fn fetch_listing(&self) -> Result<Vec<RawListItem>, SourceError> {
        let body = get_text(&self.client, &self.feed.url).await?;
        let items = parse_listing(&body)?;
        tracing::debug!(feed = %self.feed.name, count = items.len(), "Parsed listing");
        Ok(items)
    }

    async fn resolve(&self, item: &RawListItem) -> Result<EntryDraft, SourceError> {
        let date = parse_day(&item.date, SOURCE_OFFSET)?;
        let link = self.link_for(item);
        let body = get_text(&self.client, &link).await?;
        let detail = parse_detail(&body)?;

        Ok(EntryDraft {
            guid: self.guid_for(item),
            link,
            title: item.title.clone(),
            author: detail.author,
            content: detail.content,
            date,
        })
    }
}

/// Field of a listing item the next text token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemField {
    None,
    Date,
    Category,
    Title,
}

impl ItemField {
    fn for_class(class: &str) -> Option<Self> {
        match class {
            ITEM_DATE_CLASS => Some(Self::Date),
            ITEM_CATEGORY_CLASS => Some(Self::Category),
            ITEM_TITLE_CLASS => Some(Self::Title),
            _ => None,
        }
    }
}

fn format_error(message: impl Into<String>) -> SourceError {
    SourceError::Format(message.into())
}

/// Scrape every article item from the listing page, in page order
pub(crate) fn parse_listing(html: &str) -> Result<Vec<RawListItem>, SourceError> {
    let document = Html::parse_document(html);
    let mut tokens = Tokens::new(&document);
    let mut items = Vec::new();

    while let Some(token) = tokens.next() {
        let Token::Start(element) = token else {
            continue;
        };
        if element.name() != "a" || !element.classes().any(|c| c == ITEM_LINK_CLASS) {
            continue;
        }
        let href = element
            .attr("href")
            .ok_or_else(|| format_error("article link without href"))?;
        items.push(parse_item(&mut tokens, href)?);
    }

    Ok(items)
}

/// Consume the tokens of one article link, up to its closing tag
fn parse_item<'a, I>(tokens: &mut I, href: &str) -> Result<RawListItem, SourceError>
where
    I: Iterator<Item = Token<'a>>,
{
    let id = ARTICLE_HREF
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| format_error(format!("unexpected article href {:?}", href)))?;

    let mut item = RawListItem {
        id,
        ..RawListItem::default()
    };
    let mut depth = 1usize;
    let mut field = ItemField::None;

    while depth > 0 {
        let token = tokens
            .next()
            .ok_or_else(|| format_error("listing ended inside an article item"))?;

        match token {
            Token::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let slot = match field {
                    ItemField::Date => &mut item.date,
                    ItemField::Category => &mut item.category,
                    ItemField::Title => &mut item.title,
                    ItemField::None => {
                        return Err(format_error(format!(
                            "text {:?} outside any article field",
                            text
                        )));
                    }
                };
                *slot = text.to_string();
            }
            Token::Start(element) => {
                depth += 1;
                if element.attrs().next().is_none() {
                    return Err(format_error(format!(
                        "<{}> without attributes inside article item",
                        element.name()
                    )));
                }
                let class = element.attr("class").ok_or_else(|| {
                    format_error(format!("<{}> without class inside article item", element.name()))
                })?;
                if let Some(next) = class.split_whitespace().find_map(ItemField::for_class) {
                    field = next;
                }
            }
            Token::End(_) => depth -= 1,
        }
    }

    Ok(item)
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ArticleDetail {
    pub(crate) author: String,
    pub(crate) content: String,
}

/// Locate the author and content containers of an article page
pub(crate) fn parse_detail(html: &str) -> Result<ArticleDetail, SourceError> {
    let document = Html::parse_document(html);

    let author = document
        .select(&AUTHOR_SELECTOR)
        .next()
        .ok_or_else(|| format_error("article-author not found"))?;
    let content = document
        .select(&CONTENT_SELECTOR)
        .next()
        .ok_or_else(|| format_error("article-content not found"))?;

    let author = author
        .children()
        .next()
        .and_then(|node| node.value().as_text().map(|t| t.trim().to_string()))
        .ok_or_else(|| format_error("article-author is empty"))?;

    Ok(ArticleDetail {
        author,
        content: content.inner_html(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use onion_reader_domain::usecases::ListingIngest;
    use std::sync::Arc;
    use time::macros::datetime;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::store::InMemoryEntryStore;

    fn listing_item(id: &str, date: &str, title: &str) -> String {
        format!(
            r#"<li><a class="articleItemLink" href="/news/{id}.html"><div class="articleItemDate">{date}</div><div class="articleItemCate">公告</div><div class="articleItemTitle">{title}</div></a></li>"#
        )
    }

    fn listing_page(items: &[String]) -> String {
        format!(
            r#"<html><body><a class="nav" href="/index.html">Home</a><ul class="articleList">{}</ul></body></html>"#,
            items.join("\n")
        )
    }

    fn detail_page(author: &str, body: &str) -> String {
        format!(
            r#"<html><body><div class="article"><div class="article-author">{author}</div><div class="article-content">{body}</div></div></body></html>"#
        )
    }

    #[test]
    fn test_parse_listing_extracts_items_in_page_order() {
        let html = listing_page(&[
            listing_item("8176", "2021-06-01", "闪断更新公告"),
            listing_item("8175", "2021-05-31", "活动预告"),
        ]);

        let items = parse_listing(&html).unwrap();

        assert_eq!(
            items,
            vec![
                RawListItem {
                    id: "8176".to_string(),
                    date: "2021-06-01".to_string(),
                    category: "公告".to_string(),
                    title: "闪断更新公告".to_string(),
                },
                RawListItem {
                    id: "8175".to_string(),
                    date: "2021-05-31".to_string(),
                    category: "公告".to_string(),
                    title: "活动预告".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_listing_tolerates_formatting_whitespace() {
        let html = r#"<ul>
            <a class="articleItemLink" href="/news/42.html">
                <div class="articleItemDate"> 2021-01-02 </div>
                <div class="articleItemTitle">Title</div>
            </a>
        </ul>"#;

        let items = parse_listing(html).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].date, "2021-01-02");
        assert_eq!(items[0].title, "Title");
        assert_eq!(items[0].category, "");
    }

    #[test]
    fn test_parse_listing_rejects_unexpected_href() {
        let html = r#"<a class="articleItemLink" href="/events/42"><div class="articleItemTitle">x</div></a>"#;
        assert!(matches!(parse_listing(html), Err(SourceError::Format(_))));
    }

    #[test]
    fn test_parse_listing_rejects_link_without_href() {
        let html = r#"<a class="articleItemLink"><div class="articleItemTitle">x</div></a>"#;
        assert!(matches!(parse_listing(html), Err(SourceError::Format(_))));
    }

    #[test]
    fn test_parse_listing_rejects_bare_nested_tag() {
        let html = r#"<a class="articleItemLink" href="/news/1.html"><div class="articleItemTitle"><span>x</span></div></a>"#;
        assert!(matches!(parse_listing(html), Err(SourceError::Format(_))));
    }

    #[test]
    fn test_parse_listing_rejects_nested_tag_without_class() {
        let html = r#"<a class="articleItemLink" href="/news/1.html"><div id="x">x</div></a>"#;
        assert!(matches!(parse_listing(html), Err(SourceError::Format(_))));
    }

    #[test]
    fn test_parse_listing_rejects_text_outside_fields() {
        let html = r#"<a class="articleItemLink" href="/news/1.html">stray<div class="articleItemTitle">x</div></a>"#;
        assert!(matches!(parse_listing(html), Err(SourceError::Format(_))));
    }

    #[test]
    fn test_parse_detail_returns_inner_markup() {
        let html = detail_page("  鹰角网络  ", "<p>第一段</p><p><img src=\"a.png\"></p>");

        let detail = parse_detail(&html).unwrap();

        assert_eq!(detail.author, "鹰角网络");
        assert_eq!(detail.content, "<p>第一段</p><p><img src=\"a.png\"></p>");
    }

    #[test]
    fn test_parse_detail_requires_both_containers() {
        let html = r#"<div class="article-content"><p>body</p></div>"#;
        assert!(matches!(parse_detail(html), Err(SourceError::Format(_))));
    }

    #[tokio::test]
    async fn test_ingest_commits_oldest_first_with_day_offsets() {
        let mock_server = MockServer::start().await;

        let listing = listing_page(&[
            listing_item("3", "2021-06-01", "Third"),
            listing_item("2", "2021-06-01", "Second"),
            listing_item("1", "2021-06-01", "First"),
        ]);
        Mock::given(method("GET"))
            .and(path("/news.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .expect(2)
            .mount(&mock_server)
            .await;

        for id in ["1", "2", "3"] {
            Mock::given(method("GET"))
                .and(path(format!("/news/{}.html", id)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(detail_page("Staff", &format!("<p>{}</p>", id))),
                )
                .expect(1)
                .mount(&mock_server)
                .await;
        }

        let config = ArknightsConfig::with_base_url(&mock_server.uri());
        let source = Arc::new(ArknightsSource::new(&config, Duration::from_secs(5)).unwrap());
        let store = Arc::new(InMemoryEntryStore::new());
        let ingest = ListingIngest::new(source, store.clone());

        let first = ingest.ingest().await.unwrap();
        let second = ingest.ingest().await.unwrap();

        assert_eq!(first.inserted, 3);
        assert_eq!(second.inserted, 0);

        let entries = store.entries();
        let titles: Vec<_> = entries.iter().map(|e| e.entry.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);

        let day = datetime!(2021-06-01 0:00 +8);
        for (n, stored) in entries.iter().enumerate() {
            assert_eq!(stored.entry.date, day + time::Duration::seconds(n as i64));
        }
        assert_eq!(
            entries[0].entry.guid,
            format!("{}/news/1", mock_server.uri())
        );
        assert_eq!(entries[0].entry.content, "<p>1</p>");
    }

    #[tokio::test]
    async fn test_ingest_fails_on_malformed_listing() {
        let mock_server = MockServer::start().await;

        let listing = listing_page(&[
            listing_item("2", "2021-06-02", "Fine"),
            r#"<a class="articleItemLink" href="/notice?id=1"><div class="articleItemTitle">Bad</div></a>"#
                .to_string(),
        ]);
        Mock::given(method("GET"))
            .and(path("/news.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .mount(&mock_server)
            .await;

        let config = ArknightsConfig::with_base_url(&mock_server.uri());
        let source = Arc::new(ArknightsSource::new(&config, Duration::from_secs(5)).unwrap());
        let store = Arc::new(InMemoryEntryStore::new());

        let result = ListingIngest::new(source, store.clone()).ingest().await;

        assert!(result.is_err());
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_surfaces_as_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/news.html"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let config = ArknightsConfig::with_base_url(&mock_server.uri());
        let source = ArknightsSource::new(&config, Duration::from_secs(5)).unwrap();

        let result = source.fetch_listing().await;

        assert!(matches!(result, Err(SourceError::Http { status: 502, .. })));
    }
}
