use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use photo_carousel::Error;
use photo_carousel::clock::{CalendarZone, Clock};
use photo_carousel::config::Configuration;
use photo_carousel::sources::Fetcher;
use photo_carousel::tasks::loader::load_sequence;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

type RequestLog = Arc<Mutex<Vec<String>>>;

/// Serve one fixed response to every connection, recording each request line.
async fn serve(status: &'static str, content_type: &'static str, body: &'static str) -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let log: RequestLog = Arc::default();
    let seen = Arc::clone(&log);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let text = String::from_utf8_lossy(&request);
            let line = text.lines().next().unwrap_or_default().to_string();
            seen.lock().unwrap().push(line);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    (base, log)
}

fn fetcher(timeout: Duration) -> Fetcher {
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .unwrap();
    Fetcher::new(client)
}

fn utc_clock() -> Clock {
    let now = Utc.with_ymd_and_hms(2024, 6, 10, 15, 30, 0).unwrap();
    Clock::frozen(CalendarZone::Named(chrono_tz::UTC), now)
}

fn cfg_from(yaml: &str) -> Configuration {
    serde_yaml::from_str::<Configuration>(yaml)
        .unwrap()
        .validated()
        .unwrap()
}

#[tokio::test]
async fn json_content_type_selects_json_and_request_is_cache_busted() {
    let (base, log) = serve(
        "200 OK",
        "application/json; charset=utf-8",
        r#"[{"img": "remote.jpg", "desc": "Remote"}]"#,
    )
    .await;
    let cfg = cfg_from(&format!("description_file_path: {base}/list\n"));

    let seq = load_sequence(&cfg, &fetcher(Duration::from_secs(5)), &utc_clock())
        .await
        .unwrap();
    assert_eq!(seq.len(), 1);
    assert_eq!(seq[0].img, "remote.jpg");
    assert_eq!(seq[0].desc, "Remote");

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET /list?_t="), "{}", requests[0]);
}

#[tokio::test]
async fn text_response_keeps_existing_query() {
    let (base, log) = serve("200 OK", "text/plain", "a.jpg|Alpha\n").await;
    let cfg = cfg_from(&format!(
        "description_file_path: \"{base}/list.txt?v=2\"\nfolder_path: /media\n"
    ));

    let seq = load_sequence(&cfg, &fetcher(Duration::from_secs(5)), &utc_clock())
        .await
        .unwrap();
    assert_eq!(seq[0].img, "/media/a.jpg");
    assert_eq!(seq[0].desc, "Alpha");

    let requests = log.lock().unwrap().clone();
    assert!(requests[0].starts_with("GET /list.txt?v=2&_t="), "{}", requests[0]);
}

#[tokio::test]
async fn error_status_falls_back_to_inline_photos() {
    let (base, _log) = serve("404 Not Found", "text/plain", "gone").await;
    let url = format!("{base}/photos.json");

    let err = fetcher(Duration::from_secs(5)).fetch(&url).await.unwrap_err();
    match err {
        Error::HttpStatus { status, location } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(location, url);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let cfg = cfg_from(&format!(
        "description_file_path: {url}\nphotos:\n  - img: inline.jpg\n"
    ));
    let seq = load_sequence(&cfg, &fetcher(Duration::from_secs(5)), &utc_clock())
        .await
        .unwrap();
    assert_eq!(seq.len(), 1);
    assert_eq!(seq[0].img, "inline.jpg");
}

#[tokio::test]
async fn stalled_server_hits_the_fetch_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/photos.json", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        fetcher(Duration::from_millis(200)).fetch(&url),
    )
    .await
    .expect("fetch did not honour its timeout");
    assert!(matches!(result, Err(Error::Fetch { .. })), "got {result:?}");
}

#[test]
fn fetcher_timeout_comes_from_config() {
    let cfg = cfg_from("fetch_timeout: 2s\n");
    assert_eq!(cfg.fetch_timeout(), Duration::from_secs(2));
    assert!(Fetcher::with_timeout(cfg.fetch_timeout()).is_ok());
    assert_eq!(
        Configuration::default().fetch_timeout(),
        Duration::from_secs(30)
    );
}
