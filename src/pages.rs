//! HTML pages rendered with askama.
//!
//! Handlers never hand raw records to templates. They build the view models
//! below from a settled [`ViewState`], which keeps every fallback ("N/A",
//! "Unknown", placeholder poster) in one place.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use crate::models::{Genre, Movie};
use crate::view_state::ViewState;

pub const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="500" height="750" viewBox="0 0 500 750"><rect width="500" height="750" fill="#374151"/><text x="250" y="375" fill="#9ca3af" font-family="sans-serif" font-size="32" text-anchor="middle">No Image</text></svg>"##;

/// One grid entry.
#[derive(Debug, Clone)]
pub struct MovieCard {
    pub id: u64,
    pub title: String,
    pub poster_url: String,
    pub rating: String,
    pub year: String,
    pub trailer_key: Option<String>,
}

impl From<&Movie> for MovieCard {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.display_title().to_string(),
            poster_url: movie.poster_url(),
            rating: movie.rating_label(),
            year: movie.year().map(|y| y.to_string()).unwrap_or_default(),
            trailer_key: movie.trailer().map(|t| t.key.clone()),
        }
    }
}

/// Body of any grid page, flattened from a [`ViewState`].
///
/// Handlers render after their fetch has settled, so server-rendered pages
/// only ever see `Idle`, `Error` or `Populated`. `loading` is set when a
/// slot is rendered mid-fetch.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    pub prompt: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub retry_href: Option<String>,
    pub cards: Vec<MovieCard>,
    /// Set on search pages so the empty result names the query.
    pub empty_query: Option<String>,
}

impl Grid {
    pub fn from_state(state: &ViewState<Vec<Movie>>, prompt: &str, retry_href: &str) -> Self {
        let mut grid = Grid::default();
        match state {
            ViewState::Idle => grid.prompt = Some(prompt.to_string()),
            ViewState::Loading => grid.loading = true,
            ViewState::Error(message) => {
                grid.error = Some(message.clone());
                grid.retry_href = Some(retry_href.to_string());
            }
            ViewState::Populated(movies) => grid.cards = movies.iter().map(MovieCard::from).collect(),
        }
        grid
    }

    pub fn with_empty_query(mut self, query: &str) -> Self {
        self.empty_query = Some(query.to_string());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pager {
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl Pager {
    /// Raw page-number links; `next` only while pages remain upstream.
    pub fn new(base: &str, page: u32, total_pages: u32) -> Self {
        let sep = if base.contains('?') { '&' } else { '?' };
        let next = page
            .checked_add(1)
            .filter(|next| *next <= total_pages)
            .map(|next| format!("{base}{sep}page={next}"));
        Pager {
            prev: (page > 1).then(|| format!("{base}{sep}page={}", page - 1)),
            next,
        }
    }
}

#[derive(Template)]
#[template(path = "list.html")]
pub struct ListPage {
    pub heading: String,
    /// Pre-fills the search box; empty on list pages.
    pub query: String,
    pub grid: Grid,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchPage {
    pub query: String,
    pub grid: Grid,
    pub pager: Pager,
}

#[derive(Debug, Clone)]
pub struct MovieDetail {
    pub title: String,
    pub poster_url: String,
    pub backdrop_url: Option<String>,
    pub rating: String,
    pub year: String,
    pub overview: String,
    pub release_date: String,
    pub trailer_embed: Option<String>,
}

impl From<&Movie> for MovieDetail {
    fn from(movie: &Movie) -> Self {
        let overview = if movie.overview.trim().is_empty() {
            "No overview available.".to_string()
        } else {
            movie.overview.clone()
        };
        Self {
            title: movie.display_title().to_string(),
            poster_url: movie.poster_url(),
            backdrop_url: movie.backdrop_url(),
            rating: movie.rating_label(),
            year: movie
                .year()
                .map(|y| y.to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            overview,
            release_date: movie
                .release_date
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            trailer_embed: movie.trailer().map(|t| t.embed_url()),
        }
    }
}

/// Detail page. `loading` follows the same rule as [`Grid`].
#[derive(Template)]
#[template(path = "movie.html")]
pub struct MoviePage {
    pub loading: bool,
    pub error: Option<String>,
    pub movie: Option<MovieDetail>,
}

impl MoviePage {
    pub fn from_state(state: &ViewState<Movie>) -> Self {
        let mut page = MoviePage {
            loading: false,
            error: None,
            movie: None,
        };
        match state {
            ViewState::Loading => page.loading = true,
            ViewState::Error(message) => page.error = Some(message.clone()),
            ViewState::Populated(movie) => page.movie = Some(MovieDetail::from(movie)),
            ViewState::Idle => page.error = Some("Movie not found".to_string()),
        }
        page
    }
}

#[derive(Template)]
#[template(path = "genres.html")]
pub struct GenresPage {
    pub error: Option<String>,
    pub genres: Vec<Genre>,
}

impl GenresPage {
    pub fn from_state(state: &ViewState<Vec<Genre>>) -> Self {
        match state {
            ViewState::Populated(genres) => GenresPage {
                error: None,
                genres: genres.clone(),
            },
            ViewState::Error(message) => GenresPage {
                error: Some(message.clone()),
                genres: Vec::new(),
            },
            ViewState::Idle | ViewState::Loading => GenresPage {
                error: None,
                genres: Vec::new(),
            },
        }
    }
}

/// Renders a template with the given status.
pub fn render<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template rendering failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
