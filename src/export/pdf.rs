//! PDF rendering via headless Chromium
//!
//! Each export launches a browser, loads the rendered document page, prints
//! it to an A4 PDF, and releases the browser exactly once. Every suspension
//! point on the browser is bounded by the configured timeout, and a browser
//! that fails to close gracefully is killed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::ExportConfig;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to render document: {0}")]
    Render(String),

    #[error("render timed out after {0}s")]
    Timeout(u64),

    #[error("conversion failed: {0}")]
    Conversion(String),
}

/// Grace period for the shutdown handshake with the browser process. A
/// close or wait still pending after this escalates to a kill.
const RELEASE_GRACE: Duration = Duration::from_secs(5);

/// Run a graceful-close future under the release grace period. Returns
/// whether the kill escalation is needed: a close that errors or is still
/// pending at the deadline cannot be trusted to have ended the process.
/// A hung renderer never acknowledges the CDP close command, so this bound
/// is what keeps the kill path reachable.
async fn close_needs_kill<F, T, E>(close: F) -> bool
where
    F: std::future::Future<Output = std::result::Result<T, E>>,
{
    !matches!(timeout(RELEASE_GRACE, close).await, Ok(Ok(_)))
}

/// One browser lifetime: print a page, then release the process.
#[async_trait]
pub trait RenderSession: Send {
    async fn print(&mut self, html: &str) -> Result<Vec<u8>, ExportError>;
    async fn release(&mut self) -> Result<(), ExportError>;
}

/// Print a document through a session, releasing it exactly once whatever
/// the print outcome. A release failure after a successful print is logged
/// rather than surfaced; the PDF bytes are already in hand.
pub(crate) async fn run_session<S: RenderSession>(
    mut session: S,
    html: &str,
    limit: Duration,
) -> Result<Vec<u8>, ExportError> {
    let rendered = match timeout(limit, session.print(html)).await {
        Ok(result) => result,
        Err(_) => Err(ExportError::Timeout(limit.as_secs())),
    };

    if let Err(e) = session.release().await {
        tracing::warn!(error = %e, "browser release failed");
    }

    rendered
}

/// Resolve the browser binary. An explicit `CHROME_EXECUTABLE` always wins;
/// production deployments fall back to the packaged chromium, local ones
/// probe well-known install paths and otherwise let the launcher auto-detect.
fn resolve_executable(config: &ExportConfig) -> Option<PathBuf> {
    if let Some(path) = &config.chrome_executable {
        return Some(PathBuf::from(path));
    }
    if config.production {
        return Some(PathBuf::from("/usr/bin/chromium-browser"));
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"]
    } else if cfg!(target_os = "windows") {
        &[r"C:\Program Files\Google\Chrome\Application\chrome.exe"]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
            "/snap/bin/chromium",
        ]
    };
    candidates
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// A4 print parameters: 30pt top/bottom and 20pt left/right margins,
/// expressed in inches as the protocol requires.
fn print_params() -> PrintToPdfParams {
    PrintToPdfParams {
        landscape: Some(false),
        print_background: Some(true),
        paper_width: Some(8.27),
        paper_height: Some(11.7),
        margin_top: Some(30.0 / 72.0),
        margin_bottom: Some(30.0 / 72.0),
        margin_left: Some(20.0 / 72.0),
        margin_right: Some(20.0 / 72.0),
        ..Default::default()
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    async fn launch(config: &ExportConfig) -> Result<Self, ExportError> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if let Some(path) = resolve_executable(config) {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(ExportError::Launch)?;

        let launch = Browser::launch(browser_config);
        let (browser, mut handler) = timeout(
            Duration::from_secs(config.render_timeout_secs),
            launch,
        )
        .await
        .map_err(|_| ExportError::Timeout(config.render_timeout_secs))?
        .map_err(|e| ExportError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn print(&mut self, html: &str) -> Result<Vec<u8>, ExportError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ExportError::Render(e.to_string()))?;

        page.set_content(html)
            .await
            .map_err(|e| ExportError::Render(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ExportError::Render(e.to_string()))?;

        let bytes = page
            .pdf(print_params())
            .await
            .map_err(|e| ExportError::Conversion(e.to_string()))?;

        let _ = page.close().await;
        Ok(bytes)
    }

    async fn release(&mut self) -> Result<(), ExportError> {
        if close_needs_kill(self.browser.close()).await {
            self.browser.kill().await;
        }
        // A hung process must not outlive the export.
        if timeout(RELEASE_GRACE, self.browser.wait()).await.is_err() {
            self.browser.kill().await;
        }
        self.handler_task.abort();
        Ok(())
    }
}

/// PDF engine backed by headless Chromium. One browser per render; nothing
/// is shared between exports.
pub struct ChromiumExporter {
    config: ExportConfig,
}

impl ChromiumExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub async fn render(&self, html: &str) -> Result<Vec<u8>, ExportError> {
        let session = ChromiumSession::launch(&self.config).await?;
        run_session(
            session,
            html,
            Duration::from_secs(self.config.render_timeout_secs),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockSession {
        outcome: MockOutcome,
        releases: Arc<AtomicUsize>,
    }

    enum MockOutcome {
        Bytes(Vec<u8>),
        Fail,
        Hang,
    }

    #[async_trait]
    impl RenderSession for MockSession {
        async fn print(&mut self, _html: &str) -> Result<Vec<u8>, ExportError> {
            match &self.outcome {
                MockOutcome::Bytes(b) => Ok(b.clone()),
                MockOutcome::Fail => Err(ExportError::Render("boom".to_string())),
                MockOutcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(600)).await;
                    unreachable!("print should have been timed out")
                }
            }
        }

        async fn release(&mut self) -> Result<(), ExportError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session(outcome: MockOutcome) -> (MockSession, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        (
            MockSession {
                outcome,
                releases: releases.clone(),
            },
            releases,
        )
    }

    #[tokio::test]
    async fn test_successful_print_releases_once() {
        let (mock, releases) = session(MockOutcome::Bytes(vec![1, 2]));
        let bytes = run_session(mock, "<p>x</p>", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2]);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_print_still_releases_once() {
        let (mock, releases) = session(MockOutcome::Fail);
        let err = run_session(mock, "<p>x</p>", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Render(_)));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_print_times_out_and_releases() {
        let (mock, releases) = session(MockOutcome::Hang);
        let err = run_session(mock, "<p>x</p>", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Timeout(2)));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clean_close_skips_kill() {
        let needs_kill = close_needs_kill(async { Ok::<(), ExportError>(()) }).await;
        assert!(!needs_kill);
    }

    #[tokio::test]
    async fn test_failed_close_escalates_to_kill() {
        let needs_kill =
            close_needs_kill(async { Err::<(), _>(ExportError::Render("gone".to_string())) })
                .await;
        assert!(needs_kill);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_close_escalates_to_kill() {
        // A hung process never answers the close command; the deadline must
        // fire so the caller can kill it.
        let needs_kill =
            close_needs_kill(std::future::pending::<std::result::Result<(), ExportError>>())
                .await;
        assert!(needs_kill);
    }

    #[test]
    fn test_explicit_executable_wins() {
        let config = ExportConfig {
            production: true,
            chrome_executable: Some("/opt/chrome".to_string()),
            render_timeout_secs: 30,
        };
        assert_eq!(resolve_executable(&config), Some(PathBuf::from("/opt/chrome")));
    }

    #[test]
    fn test_production_pins_packaged_chromium() {
        let config = ExportConfig {
            production: true,
            chrome_executable: None,
            render_timeout_secs: 30,
        };
        assert_eq!(
            resolve_executable(&config),
            Some(PathBuf::from("/usr/bin/chromium-browser"))
        );
    }

    #[test]
    fn test_a4_geometry() {
        let params = print_params();
        assert_eq!(params.paper_width, Some(8.27));
        assert_eq!(params.paper_height, Some(11.7));
        assert_eq!(params.margin_top, Some(30.0 / 72.0));
        assert_eq!(params.margin_left, Some(20.0 / 72.0));
    }
}
