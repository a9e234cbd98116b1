use async_trait::async_trait;
use std::time::Instant;
use surf::middleware::{Middleware, Next};
use surf::{Client, Request, Response};

/// Logs every outgoing request with its status and latency.
#[derive(Debug, Default)]
pub struct RequestLogging;

#[async_trait]
impl Middleware for RequestLogging {
    async fn handle(&self, req: Request, client: Client, next: Next<'_>) -> surf::Result<Response> {
        let method = req.method();
        let url = req.url().to_string();
        let started = Instant::now();
        log::debug!("--> {} {}", method, url);

        match next.run(req, client).await {
            Ok(res) => {
                log::debug!("<-- {} {} {} ({:?})", res.status(), method, url, started.elapsed());
                Ok(res)
            }
            Err(e) => {
                log::warn!("<-- {} {} failed after {:?}: {}", method, url, started.elapsed(), e);
                Err(e)
            }
        }
    }
}
