//! Test doubles shared by the integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use plant_doctor::services::{AnalysisSession, DiagnosisClient};
use plant_doctor_core::{ImageFile, PreviewHandle, PreviewHost};
use plant_doctor_llm::{
    LlmError, LlmProvider, LlmResponse, LlmResult, Message, MessageContent, StopReason, UsageStats,
};

pub const LEAF_BLIGHT_REPLY: &str = r#"Based on the image, here is my assessment:
{"disease": "Leaf Blight", "severity": "High", "confidence": 92, "recommendations": ["Remove affected leaves", "Apply copper fungicide"]}"#;

/// Provider that answers from a script, one entry per call.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<LlmResult<String>>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<Message>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<LlmResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most calls that were ever running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// `(media_type, base64 payload)` of every image sent so far
    pub fn images_sent(&self) -> Vec<(String, String)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|c| match c {
                MessageContent::Image { media_type, data } => {
                    Some((media_type.clone(), data.clone()))
                }
                MessageContent::Text { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-vision"
    }

    fn supports_multimodal(&self) -> bool {
        true
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        _system: Option<String>,
    ) -> LlmResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        self.requests.lock().unwrap().extend(messages);

        // Give other tasks a chance to start a competing call
        tokio::task::yield_now().await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(LlmError::Other {
                message: "script exhausted".to_string(),
            })
        });

        next.map(|text| LlmResponse {
            content: Some(text),
            stop_reason: StopReason::EndTurn,
            usage: UsageStats {
                input_tokens: 1500,
                output_tokens: 60,
            },
            model: "scripted-vision".to_string(),
        })
    }
}

/// Preview host that records every create and release.
#[derive(Default)]
pub struct CountingPreviews {
    next_id: AtomicU64,
    created: AtomicUsize,
    released: Mutex<Vec<u64>>,
}

impl CountingPreviews {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> Vec<u64> {
        self.released.lock().unwrap().clone()
    }
}

impl PreviewHost for CountingPreviews {
    fn create_preview(&self, _file: &ImageFile) -> PreviewHandle {
        self.created.fetch_add(1, Ordering::SeqCst);
        PreviewHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn release_preview(&self, handle: PreviewHandle) {
        self.released.lock().unwrap().push(handle.id());
    }
}

pub fn session_with(
    provider: Arc<ScriptedProvider>,
    previews: Arc<CountingPreviews>,
) -> AnalysisSession {
    AnalysisSession::new(Arc::new(DiagnosisClient::new(provider)), previews)
}

/// In-memory JPEG of the given size (starts with the JPEG magic bytes).
pub fn jpeg(name: &str, size: usize) -> ImageFile {
    let mut bytes = vec![0u8; size.max(4)];
    bytes[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
    bytes.truncate(size);
    ImageFile::from_bytes(name, "image/jpeg", bytes)
}
