use serde_json::Value;

use super::{MediaCard, find_year, loose_string};
use crate::http::HttpClient;

const TMDB_API: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE: &str = "https://image.tmdb.org/t/p/w500";

/// Trending titles. `media` is `movie` or `tv`, `window` is `day` or `week`.
pub async fn trending(
    http: &HttpClient,
    api_key: &str,
    media: &str,
    window: &str,
    language: &str,
) -> anyhow::Result<Vec<MediaCard>> {
    let url = format!("{TMDB_API}/trending/{media}/{window}");
    let json: Value = http
        .get_json(|c| c.get(&url).query(&[("api_key", api_key), ("language", language)]))
        .await?;
    Ok(parse_trending(&json, media))
}

pub fn parse_trending(json: &Value, media: &str) -> Vec<MediaCard> {
    json["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|it| {
                    // Movies use title/release_date, TV uses name/first_air_date.
                    let title = it["title"].as_str().or_else(|| it["name"].as_str());
                    let date = it["release_date"]
                        .as_str()
                        .or_else(|| it["first_air_date"].as_str())
                        .unwrap_or_default();
                    let rate = it["vote_average"]
                        .as_f64()
                        .map(|v| format!("{v:.1}"))
                        .unwrap_or_default();
                    MediaCard {
                        id: loose_string(&it["id"]),
                        title: title.unwrap_or_default().to_string(),
                        poster: it["poster_path"]
                            .as_str()
                            .map(|p| format!("{TMDB_IMAGE}{p}"))
                            .unwrap_or_default(),
                        rate,
                        year: find_year(date).unwrap_or_default(),
                        media_type: Some(
                            it["media_type"].as_str().unwrap_or(media).to_string(),
                        ),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn movie_and_tv_shapes() {
        let json = json!({
            "results": [
                { "id": 1, "title": "Dune", "release_date": "2021-09-15", "poster_path": "/d.jpg", "vote_average": 7.81 },
                { "id": 2, "name": "Shogun", "first_air_date": "2024-02-27", "media_type": "tv" }
            ]
        });
        let cards = parse_trending(&json, "movie");
        assert_eq!(cards[0].id, "1");
        assert_eq!(cards[0].poster, "https://image.tmdb.org/t/p/w500/d.jpg");
        assert_eq!(cards[0].rate, "7.8");
        assert_eq!(cards[0].year, "2021");
        assert_eq!(cards[0].media_type.as_deref(), Some("movie"));
        assert_eq!(cards[1].title, "Shogun");
        assert_eq!(cards[1].poster, "");
        assert_eq!(cards[1].media_type.as_deref(), Some("tv"));
    }
}
