#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use link_validator_lib::HttpConfig;

#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
    pub location: Option<String>,
}

impl Route {
    pub fn ok(body: &str) -> Self {
        Route { status: 200, body: body.to_string(), delay: Duration::ZERO, location: None }
    }

    pub fn status(status: u16) -> Self {
        Route { status, body: String::new(), delay: Duration::ZERO, location: None }
    }

    pub fn redirect(to: &str) -> Self {
        Route { status: 301, body: String::new(), delay: Duration::ZERO, location: Some(to.to_string()) }
    }

    pub fn slow(delay: Duration) -> Self {
        Route { status: 200, body: "late".to_string(), delay, location: None }
    }
}

/// Minimal HTTP/1.1 server on a random local port. Unknown paths get 404.
pub struct StubServer {
    pub base: String,
}

impl StubServer {
    pub fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<HashMap<String, Route>> =
            Arc::new(routes.into_iter().map(|(p, r)| (p.to_string(), r)).collect());

        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                thread::spawn(move || handle(stream, &routes));
            }
        });
        StubServer { base }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    });
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) if line == "\r\n" || line == "\n" => break,
            Ok(_) => {}
        }
    }

    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string();
    let route = routes.get(&path).cloned().unwrap_or_else(|| Route::status(404));

    thread::sleep(route.delay);
    let location = route
        .location
        .map(|l| format!("Location: {}\r\n", l))
        .unwrap_or_default();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        route.status,
        reason(route.status),
        route.body.len(),
        location,
        route.body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// A local URL nothing listens on.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/privacy", addr)
}

pub fn test_config() -> HttpConfig {
    HttpConfig::default()
        .with_timeout(Duration::from_millis(1500))
        .with_delay(Duration::ZERO)
        .without_system_proxy()
}
