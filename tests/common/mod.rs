#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "eyJraWQiOiJ0ZXN0In0.access.sig";

pub fn public_tool(server: &MockServer) -> Value {
    json!({
        "name": "get_unprotected_data",
        "description": "Returns public data",
        "inputs": {"type": "object", "properties": {}},
        "tags": ["public"],
        "tool_provider": {
            "provider_type": "http",
            "url": format!("{}/unprotected", server.uri()),
            "http_method": "GET",
            "content_type": "application/json"
        }
    })
}

pub fn protected_tool(server: &MockServer) -> Value {
    json!({
        "name": "get_protected_data",
        "description": "Returns protected data",
        "inputs": {
            "type": "object",
            "properties": {"authorization": {"type": "string"}},
            "required": ["authorization"]
        },
        "tags": ["protected", "auth"],
        "tool_provider": {
            "provider_type": "http",
            "url": format!("{}/protected", server.uri()),
            "http_method": "GET",
            "content_type": "application/json",
            "auth": {"auth_type": "api_key", "location": "header", "var_name": "Authorization"}
        }
    })
}

fn has_auth(req: &Request) -> bool {
    req.headers.contains_key("authorization")
}

/// A server that serves tiered manifests and enforces auth on the protected tool.
pub async fn tiered_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/utcp"))
        .and(header("Authorization", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "1.0",
            "tools": [public_tool(&server), protected_tool(&server)]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/utcp"))
        .and(|req: &Request| !has_auth(req))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "1.0",
            "tools": [public_tool(&server)]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/unprotected"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "public"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/protected"))
        .and(header("Authorization", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "secret"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/protected"))
        .and(|req: &Request| !has_auth(req))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthorized"})))
        .mount(&server)
        .await;

    server
}

/// Base URI of a local port with nothing listening on it.
pub fn closed_port_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
