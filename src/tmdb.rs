use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{Genre, GenreList, Movie, MovieResponse, TrendingWindow, VideoList};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors callers need to tell apart; everything else travels as plain `anyhow` context.
#[derive(Debug, thiserror::Error)]
pub enum TmdbError {
    #[error("request failed: {endpoint} -> {status}")]
    RequestFailed { endpoint: String, status: StatusCode },
    #[error("unexpected response body from {endpoint}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TmdbError {
    /// Upstream status carried by an error chain, if any.
    pub fn status_of(err: &anyhow::Error) -> Option<StatusCode> {
        match err.downcast_ref::<TmdbError>() {
            Some(TmdbError::RequestFailed { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// Popular movies for a page, each backfilled with its video list.
    async fn popular_movies(&self, page: u32) -> Result<MovieResponse>;
    async fn movie(&self, id: u64) -> Result<Movie>;
    async fn search_movies(&self, query: &str, page: u32) -> Result<MovieResponse>;
    async fn trending_movies(&self, window: TrendingWindow) -> Result<Vec<Movie>>;
    async fn movies_by_genre(&self, genre_id: u64, page: u32) -> Result<MovieResponse>;
    async fn genres(&self) -> Result<Vec<Genre>>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(config: &Config) -> Result<Self> {
        let user_agent = format!("movieflix/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        })
    }

    /// Fetches the video list for one movie and returns a new record carrying it.
    /// Any failure hands back the original record untouched.
    async fn enrich(&self, movie: Movie) -> Movie {
        let path = format!("/movie/{}/videos", movie.id);
        match self.get_json::<VideoList>(&path, "").await {
            Ok(videos) => movie.with_videos(videos),
            Err(e) => {
                warn!("Failed to fetch videos for movie {}: {:#}", movie.id, e);
                movie
            }
        }
    }

    /// GET `{base}{path}?api_key=..{query}`. `query` is either empty or starts with `&`.
    /// Errors name the path only so the key never reaches logs.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        let url = format!(
            "{}{}?api_key={}{}",
            self.base_url,
            path,
            urlencoding::encode(&self.api_key),
            query
        );
        debug!("GET {}", path);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("request to {} failed", path))?;
        let status = res.status();
        if !status.is_success() {
            return Err(TmdbError::RequestFailed {
                endpoint: path.to_string(),
                status,
            }
            .into());
        }
        let bytes = res
            .bytes()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("reading body from {} failed", path))?;
        let parsed = serde_json::from_slice(&bytes).map_err(|source| TmdbError::Decode {
            endpoint: path.to_string(),
            source,
        })?;
        Ok(parsed)
    }

    async fn get_page(&self, path: &str, query: &str) -> Result<MovieResponse> {
        let data: MovieResponse = self.get_json(path, query).await?;
        debug!(
            "{} -> page {} of {} ({} results)",
            path,
            data.page,
            data.total_pages,
            data.results.len()
        );
        Ok(data)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn popular_movies(&self, page: u32) -> Result<MovieResponse> {
        // append_to_response is ignored by list endpoints in practice; videos are
        // backfilled per movie below.
        let query = format!("&language=en-US&page={page}&append_to_response=videos");
        let mut data = self.get_page("/movie/popular", &query).await?;
        let movies = std::mem::take(&mut data.results);
        data.results = join_all(movies.into_iter().map(|m| self.enrich(m))).await;
        Ok(data)
    }

    async fn movie(&self, id: u64) -> Result<Movie> {
        self.get_json(&format!("/movie/{id}"), "&append_to_response=videos")
            .await
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<MovieResponse> {
        let params = format!(
            "&language=en-US&query={}&page={page}",
            urlencoding::encode(query)
        );
        self.get_page("/search/movie", &params).await
    }

    async fn trending_movies(&self, window: TrendingWindow) -> Result<Vec<Movie>> {
        let data = self
            .get_page(&format!("/trending/movie/{}", window.as_str()), "")
            .await?;
        Ok(data.results)
    }

    async fn movies_by_genre(&self, genre_id: u64, page: u32) -> Result<MovieResponse> {
        let params = format!("&with_genres={genre_id}&page={page}");
        self.get_page("/discover/movie", &params).await
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        let list: GenreList = self
            .get_json("/genre/movie/list", "&language=en-US")
            .await?;
        Ok(list.genres)
    }
}
