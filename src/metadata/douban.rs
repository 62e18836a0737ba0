use serde_json::Value;

use super::{MediaCard, find_year, loose_string};
use crate::http::HttpClient;

const SEARCH_SUBJECTS_URL: &str = "https://movie.douban.com/j/search_subjects";
const RECENT_HOT_URL: &str = "https://m.douban.com/rexxar/api/v2/subject/recent_hot";
const REFERER: &str = "https://movie.douban.com/";

pub struct TagQuery<'a> {
    /// `movie` or `tv`.
    pub kind: &'a str,
    pub tag: &'a str,
    pub page_limit: u32,
    pub page_start: u32,
}

/// Douban's tag listing (热门, 最新, 豆瓣高分, …).
pub async fn by_tag(http: &HttpClient, q: TagQuery<'_>) -> anyhow::Result<Vec<MediaCard>> {
    let limit = q.page_limit.to_string();
    let start = q.page_start.to_string();
    let json: Value = http
        .get_json(|c| {
            c.get(SEARCH_SUBJECTS_URL)
                .header("Referer", REFERER)
                .query(&[
                    ("type", q.kind),
                    ("tag", q.tag),
                    ("sort", "recommend"),
                    ("page_limit", limit.as_str()),
                    ("page_start", start.as_str()),
                ])
        })
        .await?;
    Ok(parse_subjects(&json))
}

pub struct CategoryQuery<'a> {
    /// `movie` or `tv`.
    pub kind: &'a str,
    pub category: &'a str,
    pub r#type: &'a str,
    pub limit: u32,
    pub start: u32,
}

/// Mobile "recent hot" listing, filterable by category/type.
pub async fn recent_hot(http: &HttpClient, q: CategoryQuery<'_>) -> anyhow::Result<Vec<MediaCard>> {
    let url = format!("{RECENT_HOT_URL}/{}", q.kind);
    let limit = q.limit.to_string();
    let start = q.start.to_string();
    let json: Value = http
        .get_json(|c| {
            c.get(&url)
                .header("Referer", "https://movie.douban.com/explore")
                .query(&[
                    ("start", start.as_str()),
                    ("limit", limit.as_str()),
                    ("category", q.category),
                    ("type", q.r#type),
                ])
        })
        .await?;
    Ok(parse_recent_hot(&json))
}

pub fn parse_subjects(json: &Value) -> Vec<MediaCard> {
    json["subjects"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|it| MediaCard {
                    id: loose_string(&it["id"]),
                    title: loose_string(&it["title"]),
                    poster: loose_string(&it["cover"]),
                    rate: loose_string(&it["rate"]),
                    year: find_year(it["title"].as_str().unwrap_or_default())
                        .unwrap_or_default(),
                    media_type: None,
                })
                .filter(|c| !c.id.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_recent_hot(json: &Value) -> Vec<MediaCard> {
    json["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|it| {
                    let year = it["year"]
                        .as_str()
                        .filter(|y| !y.is_empty())
                        .map(str::to_string)
                        .or_else(|| find_year(it["card_subtitle"].as_str().unwrap_or_default()))
                        .unwrap_or_default();
                    let poster = it["pic"]["normal"]
                        .as_str()
                        .or_else(|| it["pic"]["large"].as_str())
                        .unwrap_or_default()
                        .to_string();
                    let rate = match &it["rating"]["value"] {
                        Value::Null => String::new(),
                        v => loose_string(v),
                    };
                    MediaCard {
                        id: loose_string(&it["id"]),
                        title: loose_string(&it["title"]),
                        poster,
                        rate,
                        year,
                        media_type: it["type"].as_str().map(str::to_string),
                    }
                })
                .filter(|c| !c.id.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subjects_parse() {
        let json = json!({
            "subjects": [
                { "id": "35267208", "title": "流浪地球2", "cover": "https://img1.doubanio.com/p.jpg", "rate": "8.3" },
                { "id": "", "title": "skipped" }
            ]
        });
        let cards = parse_subjects(&json);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "35267208");
        assert_eq!(cards[0].rate, "8.3");
        assert_eq!(cards[0].year, "");
    }

    #[test]
    fn recent_hot_parse() {
        let json = json!({
            "items": [{
                "id": "1",
                "title": "Show",
                "type": "tv",
                "card_subtitle": "2024 / 美国 / 剧情",
                "pic": { "large": "https://img/large.jpg" },
                "rating": { "value": 7.9 }
            }]
        });
        let cards = parse_recent_hot(&json);
        assert_eq!(cards[0].year, "2024");
        assert_eq!(cards[0].poster, "https://img/large.jpg");
        assert_eq!(cards[0].rate, "7.9");
        assert_eq!(cards[0].media_type.as_deref(), Some("tv"));
    }

    #[test]
    fn garbage_yields_empty() {
        assert!(parse_subjects(&json!({"msg": "bot"})).is_empty());
        assert!(parse_recent_hot(&json!([])).is_empty());
    }
}
