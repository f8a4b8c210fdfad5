use fetchback_core::probe::ProbeSettings;
use fetchback_core::{HttpProbe, UrlProbe, UrlType};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

/// Serve a single canned response and return the URL to hit plus the
/// request line that was received.
fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
        }
        let mut stream = stream;
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        request_line
    });
    (format!("http://{}/x.zip", addr), handle)
}

fn probe() -> HttpProbe {
    HttpProbe::new(ProbeSettings::with_timeout(Duration::from_secs(5))).unwrap()
}

#[test]
fn test_ok_response_captures_validators() {
    let (url, server) = serve_once(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/zip\r\n\
         ETag: \"d41d8cd98f00b204e9800998ecf8427e\"\r\n\
         Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\r\n",
    );

    let result = probe().probe(&url);
    let request_line = server.join().unwrap();

    assert!(request_line.starts_with("HEAD /x.zip"));
    assert!(result.accessible);
    assert_eq!(result.status_code, Some(200));
    assert_eq!(result.url_type, UrlType::File);
    assert_eq!(
        result.etag.as_deref(),
        Some("\"d41d8cd98f00b204e9800998ecf8427e\"")
    );
    assert_eq!(
        result.last_modified.as_deref(),
        Some("Wed, 21 Oct 2015 07:28:00 GMT")
    );
    assert_eq!(result.error, None);
}

#[test]
fn test_html_page_is_a_site() {
    let (url, server) = serve_once(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\r\n",
    );
    let result = probe().probe(&url);
    server.join().unwrap();
    assert!(result.accessible);
    assert_eq!(result.url_type, UrlType::Site);
}

#[test]
fn test_attachment_disposition_is_a_file() {
    let (url, server) = serve_once(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/plain\r\n\
         Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\r\n",
    );
    let result = probe().probe(&url);
    server.join().unwrap();
    assert_eq!(result.url_type, UrlType::File);
}

#[test]
fn test_redirect_is_accessible_and_not_followed() {
    let (url, server) = serve_once(
        "HTTP/1.1 302 Found\r\n\
         Location: http://127.0.0.1:1/elsewhere\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\r\n",
    );
    let result = probe().probe(&url);
    server.join().unwrap();
    assert!(result.accessible);
    assert_eq!(result.status_code, Some(302));
}

#[test]
fn test_not_found_is_inaccessible() {
    let (url, server) = serve_once(
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    );
    let result = probe().probe(&url);
    server.join().unwrap();
    assert!(!result.accessible);
    assert_eq!(result.status_code, Some(404));
    assert!(result.error.is_some());
}

#[test]
fn test_server_error_is_inaccessible() {
    let (url, server) = serve_once(
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    );
    let result = probe().probe(&url);
    server.join().unwrap();
    assert!(!result.accessible);
    assert_eq!(result.status_code, Some(500));
}

#[test]
fn test_connection_refused_is_folded_into_result() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let result = probe().probe(&format!("http://127.0.0.1:{}/x.zip", port));
    assert!(!result.accessible);
    assert_eq!(result.status_code, None);
    assert!(result.error.is_some());
}

#[test]
fn test_invalid_and_empty_urls() {
    let probe = probe();

    let invalid = probe.probe("not a url");
    assert!(!invalid.accessible);
    assert!(invalid.error.is_some());

    let empty = probe.probe("  ");
    assert!(!empty.accessible);
    assert_eq!(empty.error.as_deref(), Some("empty URL"));
}
