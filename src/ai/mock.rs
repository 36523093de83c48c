use super::{VisionModel, VisionRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

type Canned = std::result::Result<String, String>;

/// Scripted vision model: answers each schema with queued responses.
///
/// The last queued response for a schema is repeated once the queue drains.
#[derive(Clone, Default)]
pub struct MockVisionModel {
    responses: Arc<Mutex<HashMap<&'static str, VecDeque<Canned>>>>,
    fail_all: Option<String>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl MockVisionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON answer for `schema_name`.
    pub fn with_response(self, schema_name: &'static str, json: serde_json::Value) -> Self {
        self.push(schema_name, Ok(json.to_string()));
        self
    }

    /// Queue raw text (possibly not JSON) for `schema_name`.
    pub fn with_raw_response(self, schema_name: &'static str, text: &str) -> Self {
        self.push(schema_name, Ok(text.to_string()));
        self
    }

    /// Queue a provider failure for `schema_name`.
    pub fn with_error(self, schema_name: &'static str, message: &str) -> Self {
        self.push(schema_name, Err(message.to_string()));
        self
    }

    /// Fail every request regardless of schema.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_all: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Schema names requested so far, in order.
    pub fn get_calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, schema_name: &'static str, canned: Canned) {
        self.responses
            .lock()
            .unwrap()
            .entry(schema_name)
            .or_default()
            .push_back(canned);
    }
}

#[async_trait]
impl VisionModel for MockVisionModel {
    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn generate_json(&self, request: &VisionRequest<'_>) -> Result<String> {
        self.calls.lock().unwrap().push(request.schema_name);

        if let Some(message) = &self.fail_all {
            return Err(Error::AiProvider(message.clone()));
        }

        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(request.schema_name).ok_or_else(|| {
            Error::AiProvider(format!("No mock response for '{}'", request.schema_name))
        })?;

        let canned = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match canned {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(Error::AiProvider(message)),
            None => Err(Error::AiProvider(format!(
                "No mock response for '{}'",
                request.schema_name
            ))),
        }
    }
}
