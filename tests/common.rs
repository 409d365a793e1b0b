#![allow(dead_code)]

use image::{DynamicImage, ImageFormat};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tiny_squeeze::ServiceConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Uploads starting with this marker are rejected by the fake store endpoint
pub const REJECT_MARKER: &[u8] = b"REJECT";
pub const REJECT_BODY: &str = "Internal failure";

/// Uploads starting with this marker are stored but refused by the process endpoint
pub const PROCESS_REJECT_MARKER: &[u8] = b"PROCESS-REJECT";
pub const PROCESS_REJECT_MESSAGE: &str = "Input file has an unsupported format";

/// Uploads starting with this marker are processed into bytes that are no image
pub const GARBAGE_MARKER: &[u8] = b"GARBAGE";

/// Uploads starting with this marker are processed but their output is never served
pub const VANISH_MARKER: &[u8] = b"VANISH";

fn key_prefix(upload: &[u8]) -> &'static str {
    if upload.starts_with(PROCESS_REJECT_MARKER) {
        "reject"
    } else if upload.starts_with(GARBAGE_MARKER) {
        "garbage"
    } else if upload.starts_with(VANISH_MARKER) {
        "vanish"
    } else {
        "key"
    }
}

pub fn encode_image(format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(4, 4);
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

pub fn write_image(dir: &Path, name: &str, format: ImageFormat) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, encode_image(format)).unwrap();
    path
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub store_calls: usize,
    pub process_bodies: Vec<serde_json::Value>,
    pub forwarded_for: Vec<String>,
}

#[derive(Default)]
struct State {
    recorded: Recorded,
    uploads: HashMap<String, usize>,
    outputs: HashMap<String, Vec<u8>>,
    next_key: usize,
}

/// In-process stand-in for the TinyPNG web backend
pub struct FakeService {
    pub base_url: String,
    state: Arc<Mutex<State>>,
}

impl FakeService {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(State::default()));

        let server_state = Arc::clone(&state);
        let server_base = base_url.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = Arc::clone(&server_state);
                let base = server_base.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state, base).await;
                });
            }
        });

        Self { base_url, state }
    }

    pub fn config(&self) -> ServiceConfig {
        ServiceConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn store_calls(&self) -> usize {
        self.state.lock().unwrap().recorded.store_calls
    }

    pub fn process_bodies(&self) -> Vec<serde_json::Value> {
        self.state.lock().unwrap().recorded.process_bodies.clone()
    }

    pub fn forwarded_for(&self) -> Vec<String> {
        self.state.lock().unwrap().recorded.forwarded_for.clone()
    }
}

struct Request {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Request> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = buffer[header_end..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(Request {
        method,
        path,
        headers,
        body,
    })
}

async fn respond(stream: &mut TcpStream, status: u16, content_type: &str, body: &[u8]) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        _ => "Error",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        content_type,
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.shutdown().await
}

fn format_for_mime(mime: &str) -> ImageFormat {
    match mime {
        "image/jpeg" => ImageFormat::Jpeg,
        "image/webp" => ImageFormat::WebP,
        _ => ImageFormat::Png,
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<Mutex<State>>, base: String) -> std::io::Result<()> {
    let request = read_request(&mut stream).await?;
    if let Some(ip) = request.headers.get("x-forwarded-for") {
        state.lock().unwrap().recorded.forwarded_for.push(ip.clone());
    }

    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/backend/opt/store") => {
            if request.body.starts_with(REJECT_MARKER) {
                state.lock().unwrap().recorded.store_calls += 1;
                return respond(&mut stream, 500, "text/plain", REJECT_BODY.as_bytes()).await;
            }
            let key = {
                let mut state = state.lock().unwrap();
                state.recorded.store_calls += 1;
                state.next_key += 1;
                let key = format!("{}{}", key_prefix(&request.body), state.next_key);
                state.uploads.insert(key.clone(), request.body.len());
                key
            };
            let reply = serde_json::json!({
                "key": key,
                "url": format!("{}/input/{}", base, key),
                "size": request.body.len(),
            });
            respond(&mut stream, 201, "application/json", reply.to_string().as_bytes()).await
        }
        ("POST", "/backend/opt/process") => {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
            let key = body["key"].as_str().unwrap_or_default().to_string();
            let known = state.lock().unwrap().uploads.contains_key(&key);
            state.lock().unwrap().recorded.process_bodies.push(body.clone());
            if !known {
                let reply = serde_json::json!({"error": "Unknown", "message": "Unknown key"});
                return respond(&mut stream, 400, "application/json", reply.to_string().as_bytes()).await;
            }
            if key.starts_with("reject") {
                let reply = serde_json::json!({"error": "Unsupported", "message": PROCESS_REJECT_MESSAGE});
                return respond(&mut stream, 415, "application/json", reply.to_string().as_bytes()).await;
            }

            let mime = body["convert"]["type"]
                .as_str()
                .or_else(|| body["originalType"].as_str())
                .unwrap_or("image/png")
                .to_string();
            let output = if key.starts_with("garbage") {
                b"these bytes are not an image".to_vec()
            } else {
                encode_image(format_for_mime(&mime))
            };
            let reply = serde_json::json!({
                "key": key,
                "size": output.len(),
                "type": mime,
                "width": 4,
                "height": 4,
                "url": format!("{}/output/{}", base, key),
            });
            if !key.starts_with("vanish") {
                state.lock().unwrap().outputs.insert(key, output);
            }
            respond(&mut stream, 201, "application/json", reply.to_string().as_bytes()).await
        }
        ("GET", path) if path.starts_with("/output/") => {
            let key = path.trim_start_matches("/output/");
            let output = state.lock().unwrap().outputs.get(key).cloned();
            match output {
                Some(bytes) => respond(&mut stream, 200, "application/octet-stream", &bytes).await,
                None => respond(&mut stream, 404, "text/plain", b"missing").await,
            }
        }
        _ => respond(&mut stream, 404, "text/plain", b"not found").await,
    }
}
