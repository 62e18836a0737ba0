use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::HttpClient;

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YoutubeVideo {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
    pub published_at: String,
}

pub async fn search(
    http: &HttpClient,
    api_key: &str,
    query: &str,
    max_results: u32,
) -> anyhow::Result<Vec<YoutubeVideo>> {
    let max = max_results.to_string();
    let json: Value = http
        .get_json(|c| {
            c.get(SEARCH_URL).query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("q", query),
                ("maxResults", max.as_str()),
                ("key", api_key),
            ])
        })
        .await?;
    Ok(parse_search(&json))
}

pub fn parse_search(json: &Value) -> Vec<YoutubeVideo> {
    json["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|it| {
                    let id = it["id"]["videoId"].as_str()?;
                    let sn = &it["snippet"];
                    let thumbs = &sn["thumbnails"];
                    let thumbnail = ["high", "medium", "default"]
                        .iter()
                        .find_map(|k| thumbs[*k]["url"].as_str())
                        .unwrap_or_default();
                    Some(YoutubeVideo {
                        id: id.to_string(),
                        title: sn["title"].as_str().unwrap_or_default().to_string(),
                        channel: sn["channelTitle"].as_str().unwrap_or_default().to_string(),
                        thumbnail: thumbnail.to_string(),
                        published_at: sn["publishedAt"].as_str().unwrap_or_default().to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
