use crate::config::Config;
use crate::models::{Movie, MovieResponse, TrendingWindow};
use crate::pages::{
    render, GenresPage, Grid, ListPage, MoviePage, Pager, SearchPage, PLACEHOLDER_SVG,
};
use crate::tmdb::{TmdbApi, TmdbClient, TmdbError};
use crate::view_state::{RequestToken, ViewSlot};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

const CACHE_HOUR: &str = "public, max-age=3600";
const CACHE_DAY: &str = "public, max-age=86400";

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    window: Option<TrendingWindow>,
}

pub async fn run_server(config: Config) -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(&config)?);
    info!("Using TMDB at {}", config.base_url);

    let app = build_router(AppState { tmdb });

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(popular))
        .route("/search", get(search))
        .route("/movie/:id", get(movie_detail))
        .route("/trending", get(trending))
        .route("/genres", get(genres))
        .route("/genre/:id", get(genre))
        .route("/placeholder-movie.jpg", get(placeholder))
        .route("/health", get(health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn placeholder() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/svg+xml")),
            (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_DAY)),
        ],
        PLACEHOLDER_SVG,
    )
}

async fn popular(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    let page = page_number(query.page);
    let mut slot = ViewSlot::new();
    let token = slot.begin();
    let (result, total_pages) = split_page(state.tmdb.popular_movies(page).await);
    let status = settle(
        &mut slot,
        token,
        result,
        "Failed to load movies. Please try again later.",
    );

    let page_view = ListPage {
        heading: "Popular Movies".to_string(),
        query: String::new(),
        grid: Grid::from_state(slot.state(), "", &page_href("/", page)),
        pager: Pager::new("/", page, total_pages),
    };
    cached(render(status, &page_view), CACHE_HOUR)
}

async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Response {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default().to_string();
    let page = page_number(query.page);
    let mut slot = ViewSlot::new();
    let mut status = StatusCode::OK;
    let mut total_pages = 0;

    if !q.is_empty() {
        let token = slot.begin();
        debug!("Searching for '{}' (page {})", q, page);
        let (result, pages) = split_page(state.tmdb.search_movies(&q, page).await);
        total_pages = pages;
        status = settle(
            &mut slot,
            token,
            result,
            "Failed to search movies. Please try again.",
        );
    }

    let base = format!("/search?q={}", urlencoding::encode(&q));
    let page_view = SearchPage {
        grid: Grid::from_state(
            slot.state(),
            "Enter a search term to find movies",
            &page_href(&base, page),
        )
        .with_empty_query(&q),
        pager: Pager::new(&base, page, total_pages),
        query: q,
    };
    render(status, &page_view)
}

async fn movie_detail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut slot: ViewSlot<Movie> = ViewSlot::new();
    let token = slot.begin();

    let status = match id.parse::<u64>() {
        Ok(id) => match state.tmdb.movie(id).await {
            Ok(movie) => {
                slot.settle(token, Ok(movie));
                StatusCode::OK
            }
            Err(e) => {
                error!("Error fetching movie {}: {:#}", id, e);
                let status = upstream_status(&e);
                let message = if status == StatusCode::NOT_FOUND {
                    "Movie not found"
                } else {
                    "Failed to load movie details. Please try again."
                };
                slot.settle(token, Err(message.to_string()));
                status
            }
        },
        Err(_) => {
            debug!("Rejecting non-numeric movie id '{}'", id);
            slot.settle(token, Err("Movie not found".to_string()));
            StatusCode::NOT_FOUND
        }
    };

    cached(render(status, &MoviePage::from_state(slot.state())), CACHE_HOUR)
}

async fn trending(State(state): State<AppState>, Query(query): Query<TrendingQuery>) -> Response {
    let window = query.window.unwrap_or_default();
    let mut slot = ViewSlot::new();
    let token = slot.begin();
    let result = state.tmdb.trending_movies(window).await;
    let status = settle(
        &mut slot,
        token,
        result,
        "Failed to load trending movies. Please try again later.",
    );

    let heading = match window {
        TrendingWindow::Day => "Trending Today",
        TrendingWindow::Week => "Trending This Week",
    };
    let page_view = ListPage {
        heading: heading.to_string(),
        query: String::new(),
        grid: Grid::from_state(
            slot.state(),
            "",
            &format!("/trending?window={}", window.as_str()),
        ),
        pager: Pager::default(),
    };
    cached(render(status, &page_view), CACHE_HOUR)
}

async fn genres(State(state): State<AppState>) -> Response {
    let mut slot = ViewSlot::new();
    let token = slot.begin();
    let result = state.tmdb.genres().await;
    let status = settle(
        &mut slot,
        token,
        result,
        "Failed to load genres. Please try again later.",
    );
    cached(render(status, &GenresPage::from_state(slot.state())), CACHE_DAY)
}

async fn genre(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = page_number(query.page);
    let base = format!("/genre/{}", id);
    let mut slot = ViewSlot::new();
    let token = slot.begin();

    let Ok(genre_id) = id.parse::<u64>() else {
        slot.settle(token, Err("Genre not found".to_string()));
        let page_view = ListPage {
            heading: "Movies by Genre".to_string(),
            query: String::new(),
            grid: Grid::from_state(slot.state(), "", "/genres"),
            pager: Pager::default(),
        };
        return render(StatusCode::NOT_FOUND, &page_view);
    };

    let (movies, genre_list) = tokio::join!(
        state.tmdb.movies_by_genre(genre_id, page),
        state.tmdb.genres(),
    );
    let (movies, total_pages) = split_page(movies);
    let status = settle(
        &mut slot,
        token,
        movies,
        "Failed to load movies for this genre. Please try again later.",
    );

    // The heading is cosmetic; a failed genre lookup keeps the generic one.
    let heading = genre_list
        .ok()
        .and_then(|list| list.into_iter().find(|g| g.id == genre_id))
        .map(|g| format!("{} Movies", g.name))
        .unwrap_or_else(|| "Movies by Genre".to_string());

    let page_view = ListPage {
        heading,
        query: String::new(),
        grid: Grid::from_state(slot.state(), "", &page_href(&base, page)),
        pager: Pager::new(&base, page, total_pages),
    };
    cached(render(status, &page_view), CACHE_HOUR)
}

/// Applies a primary fetch outcome to the view and picks the response status.
fn settle<T>(
    slot: &mut ViewSlot<T>,
    token: RequestToken,
    result: Result<T>,
    message: &str,
) -> StatusCode {
    match result {
        Ok(value) => {
            slot.settle(token, Ok(value));
            StatusCode::OK
        }
        Err(e) => {
            error!("{} ({:#})", message, e);
            slot.settle(token, Err(message.to_string()));
            upstream_status(&e)
        }
    }
}

fn upstream_status(err: &anyhow::Error) -> StatusCode {
    match TmdbError::status_of(err) {
        Some(StatusCode::NOT_FOUND) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn cached(mut response: Response, value: &'static str) -> Response {
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(value));
    }
    response
}

fn page_number(raw: Option<u32>) -> u32 {
    raw.unwrap_or(1).max(1)
}

fn page_href(base: &str, page: u32) -> String {
    if page <= 1 {
        return base.to_string();
    }
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}page={page}")
}

/// Splits a list envelope into its records and the upstream page count.
fn split_page(result: Result<MovieResponse>) -> (Result<Vec<Movie>>, u32) {
    match result {
        Ok(data) => (Ok(data.results), data.total_pages),
        Err(e) => (Err(e), 0),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_defaults_and_clamps() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some(0)), 1);
        assert_eq!(page_number(Some(4)), 4);
    }

    #[test]
    fn page_href_keeps_first_page_bare() {
        assert_eq!(page_href("/", 1), "/");
        assert_eq!(page_href("/", 3), "/?page=3");
        assert_eq!(page_href("/search?q=up", 2), "/search?q=up&page=2");
    }

    #[test]
    fn split_page_keeps_page_count_only_on_success() {
        let data = MovieResponse {
            page: 2,
            total_pages: 7,
            ..MovieResponse::default()
        };
        let (movies, total) = split_page(Ok(data));
        assert!(movies.unwrap().is_empty());
        assert_eq!(total, 7);

        let (movies, total) = split_page(Err(anyhow::anyhow!("boom")));
        assert!(movies.is_err());
        assert_eq!(total, 0);
    }

    #[test]
    fn only_upstream_404_maps_to_404() {
        let not_found: anyhow::Error = TmdbError::RequestFailed {
            endpoint: "/movie/1".into(),
            status: StatusCode::NOT_FOUND,
        }
        .into();
        assert_eq!(upstream_status(&not_found), StatusCode::NOT_FOUND);

        let unauthorized: anyhow::Error = TmdbError::RequestFailed {
            endpoint: "/movie/popular".into(),
            status: StatusCode::UNAUTHORIZED,
        }
        .into();
        assert_eq!(upstream_status(&unauthorized), StatusCode::BAD_GATEWAY);
        assert_eq!(
            upstream_status(&anyhow::anyhow!("timed out")),
            StatusCode::BAD_GATEWAY
        );
    }
}
