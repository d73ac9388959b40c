//! In-memory `Fetcher` stand-in for tests: URL -> canned response, with a
//! call log for asserting request order and counts.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::fetch::{FetchResponse, Fetcher};

enum Script {
    Response(FetchResponse),
    Timeout,
}

#[derive(Default)]
pub struct ScriptedFetcher {
    gets: HashMap<String, Script>,
    heads: HashMap<String, u16>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a 200 response with the given body.
    pub fn ok(mut self, url: &str, body: &str) -> Self {
        self.gets.insert(
            url.to_string(),
            Script::Response(FetchResponse {
                status: 200,
                body: body.to_string(),
                final_url: url.to_string(),
            }),
        );
        self
    }

    /// Script a non-200 status with an empty body.
    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.gets.insert(
            url.to_string(),
            Script::Response(FetchResponse {
                status,
                body: String::new(),
                final_url: url.to_string(),
            }),
        );
        self
    }

    /// Script a 200 response that landed somewhere else after redirects.
    pub fn redirected(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.gets.insert(
            url.to_string(),
            Script::Response(FetchResponse {
                status: 200,
                body: body.to_string(),
                final_url: final_url.to_string(),
            }),
        );
        self
    }

    pub fn timeout(mut self, url: &str) -> Self {
        self.gets.insert(url.to_string(), Script::Timeout);
        self
    }

    pub fn head_status(mut self, url: &str, status: u16) -> Self {
        self.heads.insert(url.to_string(), status);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.calls.lock().unwrap().push(format!("GET {url}"));
        match self.gets.get(url) {
            Some(Script::Response(response)) => Ok(response.clone()),
            Some(Script::Timeout) => Err(FetchError::Timeout {
                url: url.to_string(),
                attempts: 2,
            }),
            // Anything unscripted is a plain miss.
            None => Ok(FetchResponse {
                status: 404,
                body: String::new(),
                final_url: url.to_string(),
            }),
        }
    }

    async fn head(&self, url: &str) -> Result<u16, FetchError> {
        self.calls.lock().unwrap().push(format!("HEAD {url}"));
        Ok(self.heads.get(url).copied().unwrap_or(404))
    }
}
