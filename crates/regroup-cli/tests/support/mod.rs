//! In-process HTTP stub standing in for the issue service.

#![allow(dead_code)]

use assert_cmd::Command;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

/// Path prefix the stub serves under.
pub const API_PREFIX: &str = "/api/0";

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub link: Option<String>,
}

impl Reply {
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            link: None,
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }
}

/// One request as the stub received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path with [`API_PREFIX`] stripped.
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn query_values(&self, key: &str) -> Vec<String> {
        self.query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .collect()
    }
}

pub struct StubServer {
    pub base_url: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    /// Serve `routes`, keyed by `"METHOD /path"`. Unknown routes answer 404.
    pub fn start(routes: Vec<(&str, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let routes: HashMap<String, Reply> = routes
            .into_iter()
            .map(|(key, reply)| (key.to_string(), reply))
            .collect();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                handle(stream, &routes, &sink);
            }
        });

        Self {
            base_url: format!("http://{addr}{API_PREFIX}"),
            recorded,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().expect("lock").clone()
    }

    pub fn requests_with(&self, method: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }
}

fn handle(stream: TcpStream, routes: &HashMap<String, Reply>, sink: &Mutex<Vec<Recorded>>) {
    let mut writer = stream.try_clone().expect("clone stream");
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            match name.to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse().unwrap_or(0),
                "authorization" => authorization = Some(value.to_string()),
                _ => {}
            }
        }
    }

    let mut body = vec![0u8; content_length];
    let _ = reader.read_exact(&mut body);

    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    let path = path.strip_prefix(API_PREFIX).unwrap_or(path).to_string();

    let reply = routes
        .get(&format!("{method} {path}"))
        .cloned()
        .unwrap_or_else(|| Reply::json(404, &serde_json::json!({"detail": "not found"})));

    sink.lock().expect("lock").push(Recorded {
        method,
        path,
        query: query.to_string(),
        authorization,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let mut head = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reply.body.len()
    );
    if let Some(link) = &reply.link {
        head.push_str(&format!("Link: {link}\r\n"));
    }
    head.push_str("\r\n");
    let _ = writer.write_all(head.as_bytes());
    let _ = writer.write_all(reply.body.as_bytes());
    let _ = writer.flush();
}

/// `regroup` rooted in `dir`, isolated from the caller's config and env.
pub fn regroup_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("regroup"));
    cmd.current_dir(dir);
    cmd.env("REGROUP_LOG", "error");
    cmd.env("HOME", dir);
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    for var in [
        "REGROUP_API_URL",
        "REGROUP_ORG",
        "REGROUP_PROJECT",
        "REGROUP_AUTH_TOKEN",
        "FORMAT",
        "DEBUG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Three merged fingerprints on issue 1; `f3` is locked.
pub fn merged_page() -> serde_json::Value {
    serde_json::json!([
        {"id": "f1", "eventCount": 12, "lastSeen": "2024-03-01T10:00:00Z", "latestEvent": {"id": "e1"}},
        {"id": "f2", "eventCount": 3, "latestEvent": {"id": "e2"}},
        {"id": "f3", "eventCount": 1, "latestEvent": {"id": "e3"}, "state": "locked"},
    ])
}

/// Two similar issues on issue 1; `3` scores below the threshold.
pub fn similar_page() -> serde_json::Value {
    serde_json::json!([
        [
            {"id": "2", "shortId": "WEB-2", "title": "TypeError in checkout"},
            {"exception:message:character-shingles": 0.92, "message:message:character-shingles": null}
        ],
        [
            {"id": "3", "shortId": "WEB-3", "title": "Timeout in search"},
            {"exception:message:character-shingles": 0.12}
        ],
    ])
}
