use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/original";
pub const PLACEHOLDER_POSTER: &str = "/placeholder-movie.jpg";
const YOUTUBE_EMBED: &str = "https://www.youtube.com/embed";

/// A movie as returned by TMDB list, search and detail endpoints.
///
/// Some responses use the TV-show field names (`name`, `first_air_date`),
/// so both spellings are kept and the display helpers fall back between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<VideoList>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub site: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub video_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub official: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub published_at: String,
}

/// Paginated wrapper returned by list-style endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MovieResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Movie>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_pages: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_results: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingWindow {
    Day,
    #[default]
    Week,
}

impl TrendingWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendingWindow::Day => "day",
            TrendingWindow::Week => "week",
        }
    }
}

impl Movie {
    pub fn display_title(&self) -> &str {
        non_empty(self.title.as_deref())
            .or_else(|| non_empty(self.name.as_deref()))
            .unwrap_or("Untitled")
    }

    pub fn year(&self) -> Option<i32> {
        non_empty(self.release_date.as_deref())
            .or_else(|| non_empty(self.first_air_date.as_deref()))
            .and_then(extract_year)
    }

    /// Rating with one decimal, or "N/A" when TMDB has no votes.
    pub fn rating_label(&self) -> String {
        match self.vote_average {
            Some(v) if v > 0.0 => format!("{:.1}", v),
            _ => "N/A".to_string(),
        }
    }

    pub fn poster_url(&self) -> String {
        match non_empty(self.poster_path.as_deref()) {
            Some(path) => format!("{POSTER_BASE}{path}"),
            None => PLACEHOLDER_POSTER.to_string(),
        }
    }

    pub fn backdrop_url(&self) -> Option<String> {
        non_empty(self.backdrop_path.as_deref()).map(|p| format!("{BACKDROP_BASE}{p}"))
    }

    pub fn trailer(&self) -> Option<&Video> {
        self.videos.as_ref().and_then(|v| select_trailer(&v.results))
    }

    /// Returns a new record carrying the given video list.
    pub fn with_videos(self, videos: VideoList) -> Movie {
        Movie {
            videos: Some(videos),
            ..self
        }
    }
}

impl Video {
    pub fn embed_url(&self) -> String {
        format!("{YOUTUBE_EMBED}/{}", self.key)
    }
}

pub fn select_trailer(videos: &[Video]) -> Option<&Video> {
    videos
        .iter()
        .find(|v| v.video_type == "Trailer" && v.site == "YouTube" && !v.key.is_empty())
}

/// TMDB sends `null` for blank fields as often as it omits them.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn extract_year(date: &str) -> Option<i32> {
    date.parse::<NaiveDate>().ok().map(|d| d.year())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
