/// Client for API sites.
///
/// API sites speak the common "vod" JSON API:
///   `{api}?ac=videolist&wd=<query>&pg=<n>`  search
///   `{api}?ac=videolist&ids=<id>`           detail
/// and answer with `{"code":1,"page":1,"pagecount":N,"list":[{vod_*}]}`.
/// Numeric fields are sent as numbers or strings depending on the site.
use futures_util::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    http::HttpClient,
    metadata::loose_string,
    models::{ApiSite, SearchResult},
};

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

/// Search one site, following pagination up to `max_page` pages. The first
/// page must succeed; later pages are fetched in parallel and a failing
/// page is skipped.
pub async fn search_site(
    http: &HttpClient,
    site: &ApiSite,
    query: &str,
    max_page: u32,
) -> anyhow::Result<Vec<SearchResult>> {
    let first: Value = http
        .get_json_once(|c| c.get(&site.api).query(&[("ac", "videolist"), ("wd", query)]))
        .await?;

    let mut results = parse_vod_list(&first, site);

    let page_count = page_count(&first).min(max_page.max(1));
    if page_count > 1 {
        debug!("Site {} has {page_count} page(s) for {query:?}", site.key);
        let pages = (2..=page_count).map(|pg| {
            let pg = pg.to_string();
            async move {
                http.get_json_once::<Value, _>(|c| {
                    c.get(&site.api)
                        .query(&[("ac", "videolist"), ("wd", query), ("pg", pg.as_str())])
                })
                .await
            }
        });
        for (i, page) in join_all(pages).await.into_iter().enumerate() {
            match page {
                Ok(json) => results.extend(parse_vod_list(&json, site)),
                Err(e) => warn!("Site {} page {} failed: {e:#}", site.key, i + 2),
            }
        }
    }

    Ok(results)
}

/// Fetch a single title by id. `None` when the site does not know it.
pub async fn get_detail(
    http: &HttpClient,
    site: &ApiSite,
    id: &str,
) -> anyhow::Result<Option<SearchResult>> {
    let json: Value = http
        .get_json(|c| c.get(&site.api).query(&[("ac", "videolist"), ("ids", id)]))
        .await?;
    Ok(parse_vod_list(&json, site).into_iter().next())
}

fn page_count(json: &Value) -> u32 {
    loose_string(&json["pagecount"]).parse().unwrap_or(1)
}

/// Normalise a `list` of vod items. Items without playable episodes are dropped.
pub fn parse_vod_list(json: &Value, site: &ApiSite) -> Vec<SearchResult> {
    let Some(items) = json["list"].as_array() else {
        return Vec::new();
    };
    items.iter().filter_map(|it| parse_vod(it, site)).collect()
}

fn parse_vod(it: &Value, site: &ApiSite) -> Option<SearchResult> {
    let id = loose_string(&it["vod_id"]);
    let title = loose_string(&it["vod_name"]).trim().to_string();
    if id.is_empty() || title.is_empty() {
        return None;
    }

    let (episodes, episode_titles) = parse_play_urls(it["vod_play_url"].as_str().unwrap_or_default());
    if episodes.is_empty() {
        return None;
    }

    let year = RE_YEAR
        .find(&loose_string(&it["vod_year"]))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let desc = it["vod_content"]
        .as_str()
        .map(strip_html)
        .filter(|s| !s.is_empty());

    let douban_id = match loose_string(&it["vod_douban_id"]) {
        s if s.is_empty() || s == "0" => None,
        s => Some(s),
    };

    let non_empty = |v: &Value| Some(loose_string(v)).filter(|s| !s.is_empty());

    Some(SearchResult {
        id,
        title,
        poster: loose_string(&it["vod_pic"]),
        episodes,
        episode_titles,
        source: site.key.clone(),
        source_name: site.name.clone(),
        class: non_empty(&it["vod_class"]),
        year,
        desc,
        type_name: non_empty(&it["type_name"]),
        douban_id,
    })
}

/// Parse `vod_play_url`: player groups separated by `$$$`, episodes by `#`,
/// each `name$url` or a bare URL. The first group with m3u8 links wins,
/// otherwise the first group. Only http(s) URLs are kept.
pub fn parse_play_urls(raw: &str) -> (Vec<String>, Vec<String>) {
    let groups: Vec<&str> = raw.split("$$$").filter(|g| !g.trim().is_empty()).collect();
    let Some(group) = groups
        .iter()
        .find(|g| g.contains(".m3u8"))
        .or_else(|| groups.first())
    else {
        return (Vec::new(), Vec::new());
    };

    let mut episodes = Vec::new();
    let mut titles = Vec::new();
    for entry in group.split('#').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, url) = match entry.split_once('$') {
            Some((name, url)) => (name.trim(), url.trim()),
            None => ("", entry),
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            continue;
        }
        episodes.push(url.to_string());
        titles.push(if name.is_empty() {
            episodes.len().to_string()
        } else {
            name.to_string()
        });
    }
    (episodes, titles)
}

pub fn strip_html(s: &str) -> String {
    RE_TAGS
        .replace_all(s, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}
