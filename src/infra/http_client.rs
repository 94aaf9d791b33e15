use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::error::Result;

pub struct ReqwestHttp {
    client: reqwest::blocking::Client,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpClientPort for ReqwestHttp {
    fn get(&self, url: &str) -> Result<HttpGetResult> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send()?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let bytes = resp.bytes()?.to_vec();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let content_length: u64 = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(bytes.len() as u64);
        Ok(HttpGetResult { status, bytes, content_type, content_length })
    }
}
