//! ScreenCapture - the out-of-scope external collaborator seam for screenshots
//!
//! `spec.md` 5: "the screenshot directory is process-wide state with a cap
//! on retained files...capture is append-only and serialized per-session
//! through the capture service."

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

use crate::vision::CaptureMode;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture service unavailable")]
    Unavailable,
}

#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self, session_id: &str, mode: CaptureMode) -> Result<String, CaptureError>;
}

/// Retains at most `max_stored` paths, evicting the oldest first, and
/// serializes capture per session so two visual attempts for the same
/// item never overlap (`spec.md` 5).
pub struct RetainingScreenCapture {
    max_stored: usize,
    directory: String,
    retained: Mutex<VecDeque<String>>,
    session_lock: AsyncMutex<()>,
    next_id: Mutex<u64>,
}

impl RetainingScreenCapture {
    pub fn new(directory: impl Into<String>, max_stored: usize) -> Self {
        Self { max_stored, directory: directory.into(), retained: Mutex::new(VecDeque::new()), session_lock: AsyncMutex::new(()), next_id: Mutex::new(0) }
    }

    pub fn retained_paths(&self) -> Vec<String> {
        self.retained.lock().expect("retained paths poisoned").iter().cloned().collect()
    }

    fn record(&self, path: String) {
        let mut retained = self.retained.lock().expect("retained paths poisoned");
        retained.push_back(path);
        while retained.len() > self.max_stored {
            retained.pop_front();
        }
    }
}

#[async_trait]
impl ScreenCapture for RetainingScreenCapture {
    async fn capture(&self, session_id: &str, mode: CaptureMode) -> Result<String, CaptureError> {
        let _guard = self.session_lock.lock().await;
        let mut next_id = self.next_id.lock().expect("capture id counter poisoned");
        *next_id += 1;
        let suffix = match mode {
            CaptureMode::ActiveWindow => "active",
            CaptureMode::FullScreen => "full",
            CaptureMode::DesktopOnly => "desktop",
        };
        let path = format!("{}/{}-{}-{}.png", self.directory, session_id, suffix, *next_id);
        drop(next_id);
        self.record(path.clone());
        Ok(path)
    }
}
