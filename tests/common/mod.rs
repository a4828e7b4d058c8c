#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

const MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// A value from the form-encoded request body.
    pub fn form_value(&self, name: &str) -> Option<String> {
        url::form_urlencoded::parse(&self.body)
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.to_string())
    }
}

/// Serves exactly one request, then hands it back for assertions.
pub async fn serve_once(response: impl AsRef<[u8]>) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = oneshot::channel();
    let response = response.as_ref().to_vec();

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            if let Some(req) = read_request(&mut stream).await {
                let _ = tx.send(req);
            }
            let _ = stream.write_all(&response).await;
        }
    });

    (format!("http://{}", addr), rx)
}

/// One scripted endpoint: requests matching method+path consume the
/// response sequence in order; the last response repeats.
pub struct Route {
    method: &'static str,
    path: String,
    responses: Mutex<Vec<String>>,
}

pub fn route(method: &'static str, path: &str, response: impl Into<String>) -> Route {
    Route {
        method,
        path: path.to_string(),
        responses: Mutex::new(vec![response.into()]),
    }
}

pub fn route_seq(method: &'static str, path: &str, responses: Vec<String>) -> Route {
    assert!(!responses.is_empty(), "route needs at least one response");
    Route {
        method,
        path: path.to_string(),
        responses: Mutex::new(responses),
    }
}

impl Route {
    fn next_response(&self) -> String {
        let mut responses = self.responses.lock().expect("route lock");
        if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses[0].clone()
        }
    }
}

#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<CapturedRequest>>>);

impl RequestLog {
    pub fn all(&self) -> Vec<CapturedRequest> {
        self.0.lock().expect("log lock").clone()
    }

    pub fn matching(&self, method: &str, path: &str) -> Vec<CapturedRequest> {
        self.all()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

/// Serves any number of sequential requests against a fixed route table.
/// Unrouted requests get a 404. The server task lives until the test's
/// runtime shuts down.
pub async fn serve_routes(routes: Vec<Route>) -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let log = RequestLog::default();
    let task_log = log.clone();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let Some(req) = read_request(&mut stream).await else {
                continue;
            };
            let response = routes
                .iter()
                .find(|r| r.method == req.method && r.path == req.path)
                .map(Route::next_response)
                .unwrap_or_else(|| empty_response("404 Not Found"));
            task_log.0.lock().expect("log lock").push(req);
            let _ = stream.write_all(response.as_bytes()).await;
        }
    });

    (format!("http://{}", addr), log)
}

pub fn response_with_body(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {status}\r\nConnection: close\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
    response
}

pub fn json_response(status: &str, body: &str) -> String {
    response_with_body(status, &[("Content-Type", "application/json")], body)
}

pub fn empty_response(status: &str) -> String {
    format!("HTTP/1.1 {status}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n")
}

/// Wraps a data payload in the two-level envelope with an "ok" meta block.
pub fn envelope_ok(data: &str) -> String {
    json_response(
        "200 OK",
        &format!(
            r#"{{"ocs":{{"meta":{{"status":"ok","statuscode":200,"message":"OK"}},"data":{data}}}}}"#
        ),
    )
}

/// An envelope-shaped failure body with the given HTTP status and meta
/// message.
pub fn envelope_failure(status: &str, statuscode: u32, message: &str) -> String {
    json_response(
        status,
        &format!(
            r#"{{"ocs":{{"meta":{{"status":"failure","statuscode":{statuscode},"message":"{message}"}},"data":[]}}}}"#
        ),
    )
}

async fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if buf.len() >= MAX_REQUEST_BYTES {
            return None;
        }
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..read]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos;
        }
    };

    let header_str = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = header_str.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let full_path = parts.next().unwrap_or("");

    let mut path_parts = full_path.splitn(2, '?');
    let path = path_parts.next().unwrap_or("").to_string();
    let query_str = path_parts.next().unwrap_or("");
    let query = url::form_urlencoded::parse(query_str.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_string();
            let value = value.trim().to_string();
            if name.eq_ignore_ascii_case("Content-Length") {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Some(CapturedRequest {
        method,
        path,
        headers,
        query,
        body,
    })
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
