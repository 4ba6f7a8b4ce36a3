use movieflix::config::Config;
use movieflix::models::TrendingWindow;
use movieflix::tmdb::{TmdbApi, TmdbClient, TmdbError};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn client_for(server: &MockServer) -> TmdbClient {
    let base_url = server.uri();
    let config = Config::from_lookup(|key| match key {
        "TMDB_API_KEY" => Some(API_KEY.to_string()),
        "TMDB_BASE_URL" => Some(base_url.clone()),
        _ => None,
    })
    .expect("config builds");
    TmdbClient::new(&config).expect("client builds")
}

fn list_body(ids: &[u64]) -> Value {
    let results: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "title": format!("Movie {id}"),
                "overview": "overview",
                "poster_path": format!("/poster-{id}.jpg"),
                "backdrop_path": null,
                "vote_average": 7.5,
                "release_date": "2008-07-18"
            })
        })
        .collect();
    json!({
        "page": 1,
        "results": results,
        "total_pages": 10,
        "total_results": 200
    })
}

fn videos_body(id: u64, key: &str) -> Value {
    json!({
        "id": id,
        "results": [
            {
                "id": format!("vid-{id}"),
                "key": key,
                "name": "Official Trailer",
                "site": "YouTube",
                "type": "Trailer",
                "official": true,
                "published_at": "2008-06-16T00:00:00.000Z"
            }
        ]
    })
}

async fn mount_popular(server: &MockServer, ids: &[u64]) {
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .and(query_param("api_key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(ids)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_videos(server: &MockServer, id: u64, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/movie/{id}/videos")))
        .and(query_param("api_key", API_KEY))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|r| r.len())
        .unwrap_or_default()
}

#[tokio::test]
async fn popular_attaches_videos_to_every_movie_in_order() {
    let server = MockServer::start().await;
    mount_popular(&server, &[11, 22, 33]).await;
    // Earlier items answer slower so completion order differs from list order.
    mount_videos(
        &server,
        11,
        ResponseTemplate::new(200)
            .set_body_json(videos_body(11, "k11"))
            .set_delay(Duration::from_millis(150)),
    )
    .await;
    mount_videos(
        &server,
        22,
        ResponseTemplate::new(200)
            .set_body_json(videos_body(22, "k22"))
            .set_delay(Duration::from_millis(75)),
    )
    .await;
    mount_videos(
        &server,
        33,
        ResponseTemplate::new(200).set_body_json(videos_body(33, "k33")),
    )
    .await;

    let movies = client_for(&server).popular_movies(1).await.unwrap().results;

    let ids: Vec<u64> = movies.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![11, 22, 33]);
    let keys: Vec<&str> = movies
        .iter()
        .map(|m| m.trailer().map(|t| t.key.as_str()).unwrap_or(""))
        .collect();
    assert_eq!(keys, vec!["k11", "k22", "k33"]);
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn popular_fetches_videos_concurrently() {
    let server = MockServer::start().await;
    mount_popular(&server, &[1, 2, 3]).await;
    for id in [1, 2, 3] {
        mount_videos(
            &server,
            id,
            ResponseTemplate::new(200)
                .set_body_json(videos_body(id, &format!("k{id}")))
                .set_delay(Duration::from_millis(150)),
        )
        .await;
    }

    let client = client_for(&server);
    let started = Instant::now();
    let movies = client.popular_movies(1).await.unwrap().results;
    let elapsed = started.elapsed();

    assert_eq!(movies.len(), 3);
    assert!(movies.iter().all(|m| m.trailer().is_some()));
    // Sequential requests would need at least 450ms.
    assert!(
        elapsed < Duration::from_millis(300),
        "video requests took {:?}",
        elapsed
    );
}

#[tokio::test]
async fn popular_passes_failed_items_through_unchanged() {
    let server = MockServer::start().await;
    mount_popular(&server, &[1, 2, 3]).await;
    mount_videos(
        &server,
        1,
        ResponseTemplate::new(200).set_body_json(videos_body(1, "ok")),
    )
    .await;
    mount_videos(&server, 2, ResponseTemplate::new(500)).await;
    mount_videos(
        &server,
        3,
        ResponseTemplate::new(200).set_body_string("not json"),
    )
    .await;

    let movies = client_for(&server).popular_movies(1).await.unwrap().results;

    assert_eq!(movies.len(), 3);
    assert_eq!(movies[0].trailer().map(|t| t.key.as_str()), Some("ok"));
    for movie in &movies[1..] {
        assert!(movie.videos.is_none());
        assert_eq!(movie.display_title(), format!("Movie {}", movie.id));
        assert_eq!(movie.year(), Some(2008));
    }
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn popular_sends_page_and_append_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .and(query_param("page", "3"))
        .and(query_param("language", "en-US"))
        .and(query_param("append_to_response", "videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let data = client_for(&server).popular_movies(3).await.unwrap();
    assert!(data.results.is_empty());
    assert_eq!(data.total_pages, 10);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn popular_failure_carries_status_and_skips_enrichment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status_code": 7,
            "status_message": "Invalid API key"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).popular_movies(1).await.unwrap_err();

    assert_eq!(TmdbError::status_of(&err), Some(StatusCode::UNAUTHORIZED));
    assert!(err.to_string().starts_with("request failed"));
    assert!(!format!("{:#}", err).contains(API_KEY));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn malformed_list_body_is_an_error_without_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).popular_movies(1).await.unwrap_err();
    assert_eq!(TmdbError::status_of(&err), None);
    assert!(matches!(
        err.downcast_ref::<TmdbError>(),
        Some(TmdbError::Decode { .. })
    ));
}

#[tokio::test]
async fn movie_detail_appends_videos() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/155"))
        .and(query_param("append_to_response", "videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 155,
            "title": "The Dark Knight",
            "overview": "Batman raises the stakes.",
            "poster_path": "/qJ2tW6WMUDux911r6m7haRef0WH.jpg",
            "backdrop_path": "/nMKdUUepR0i5zn0y1T4CsSB5chy.jpg",
            "vote_average": 8.5,
            "release_date": "2008-07-16",
            "runtime": 152,
            "videos": videos_body(155, "EXeTwQWrcwY")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let movie = client_for(&server).movie(155).await.unwrap();
    assert_eq!(movie.display_title(), "The Dark Knight");
    assert_eq!(
        movie.trailer().map(|t| t.embed_url()).as_deref(),
        Some("https://www.youtube.com/embed/EXeTwQWrcwY")
    );
}

#[tokio::test]
async fn movie_detail_not_found_carries_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/999999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).movie(999999).await.unwrap_err();
    assert_eq!(TmdbError::status_of(&err), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn search_encodes_query_and_does_not_enrich() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("query", "fast & furious 7"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&[5, 6])))
        .expect(1)
        .mount(&server)
        .await;

    let movies = client_for(&server)
        .search_movies("fast & furious 7", 2)
        .await
        .unwrap()
        .results;

    assert_eq!(movies.len(), 2);
    assert!(movies.iter().all(|m| m.videos.is_none()));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn search_keeps_records_with_null_overview() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "results": [
                { "id": 1, "title": "Heat", "overview": "Cops and robbers." },
                { "id": 2, "title": "Ronin", "overview": null, "poster_path": null }
            ],
            "total_pages": 1,
            "total_results": 2
        })))
        .mount(&server)
        .await;

    let data = client_for(&server).search_movies("heat", 1).await.unwrap();

    assert_eq!(data.results.len(), 2);
    assert_eq!(data.results[1].display_title(), "Ronin");
    assert_eq!(data.results[1].overview, "");
}

#[tokio::test]
async fn search_failure_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search_movies("batman", 1)
        .await
        .unwrap_err();
    assert_eq!(
        TmdbError::status_of(&err),
        Some(StatusCode::SERVICE_UNAVAILABLE)
    );
}

#[tokio::test]
async fn trending_uses_window_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trending/movie/day"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&[42])))
        .expect(1)
        .mount(&server)
        .await;

    let movies = client_for(&server)
        .trending_movies(TrendingWindow::Day)
        .await
        .unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].id, 42);
}

#[tokio::test]
async fn movies_by_genre_filters_on_genre_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("with_genres", "28"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(&[7, 8, 9])))
        .expect(1)
        .mount(&server)
        .await;

    let data = client_for(&server).movies_by_genre(28, 2).await.unwrap();
    assert_eq!(data.results.len(), 3);
    assert_eq!(data.total_pages, 10);
}

#[tokio::test]
async fn genres_returns_the_genre_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/genre/movie/list"))
        .and(query_param("language", "en-US"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "genres": [
                { "id": 28, "name": "Action" },
                { "id": 35, "name": "Comedy" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let genres = client_for(&server).genres().await.unwrap();
    let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Action", "Comedy"]);
}
