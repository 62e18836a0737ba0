use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::loose_string;
use crate::{http::HttpClient, identity::normalize_imdb_id};

const WMDB_URL: &str = "https://api.wmdb.tv/movie/api";

/// Cross-reference between a Douban subject and its IMDb entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WmdbInfo {
    pub douban_id: String,
    pub imdb_id: Option<String>,
    pub title: String,
    pub year: String,
    pub poster: String,
}

pub async fn lookup(http: &HttpClient, douban_id: &str) -> anyhow::Result<WmdbInfo> {
    let json: Value = http
        .get_json(|c| c.get(WMDB_URL).query(&[("id", douban_id)]))
        .await?;
    parse(&json, douban_id)
}

pub fn parse(json: &Value, douban_id: &str) -> anyhow::Result<WmdbInfo> {
    if !json.is_object() || (json.get("data").is_none() && json.get("imdbId").is_none()) {
        anyhow::bail!("WMDB has no entry for {douban_id}");
    }
    // `data` holds one entry per language; prefer Chinese.
    let entries = json["data"].as_array().cloned().unwrap_or_default();
    let entry = entries
        .iter()
        .find(|e| e["lang"].as_str() == Some("Cn"))
        .or_else(|| entries.first())
        .cloned()
        .unwrap_or(Value::Null);

    Ok(WmdbInfo {
        douban_id: douban_id.to_string(),
        imdb_id: json["imdbId"].as_str().and_then(normalize_imdb_id),
        title: loose_string(&entry["name"]),
        year: loose_string(&json["year"]),
        poster: loose_string(&entry["poster"]),
    })
}
