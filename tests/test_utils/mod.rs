#![allow(dead_code)]

use envoy_actions::http::{Method, Request, Response, Url};
use envoy_actions::Server;

pub fn request(method: Method, path: &str) -> Request {
    Request::new(
        method,
        Url::parse(&format!("http://example.com{}", path)).unwrap(),
    )
}

#[async_trait::async_trait]
pub trait ServerTestingExt {
    async fn send(&self, req: Request) -> Response;

    async fn get(&self, path: &str) -> Response {
        self.send(request(Method::Get, path)).await
    }

    async fn get_json(&self, path: &str) -> Response {
        let mut req = request(Method::Get, path);
        req.insert_header("Accept", "application/json");
        self.send(req).await
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Response {
        let mut req = request(Method::Post, path);
        req.insert_header("Accept", "application/json");
        req.set_body(envoy_actions::Body::from_json(&body).unwrap());
        self.send(req).await
    }

    async fn recv_string(&self, path: &str) -> String {
        self.get(path).await.body_string().await.unwrap()
    }
}

#[async_trait::async_trait]
impl ServerTestingExt for Server {
    async fn send(&self, req: Request) -> Response {
        self.respond(req).await.unwrap()
    }
}
