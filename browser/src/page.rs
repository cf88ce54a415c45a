use crate::BrowserError;
use crate::Result;
use crate::config::BrowserConfig;
use crate::config::WaitStrategy;
use base64::Engine as _;
use chromiumoxide::cdp::browser_protocol::input::DispatchKeyEventParams;
use chromiumoxide::cdp::browser_protocol::input::DispatchKeyEventType;
use chromiumoxide::cdp::browser_protocol::network;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotParams;
use chromiumoxide::page::Page as CdpPage;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing::info;

pub struct Page {
    cdp_page: Arc<CdpPage>,
    config: BrowserConfig,
}

impl Page {
    pub fn new(cdp_page: CdpPage, config: BrowserConfig) -> Self {
        Self {
            cdp_page: Arc::new(cdp_page),
            config,
        }
    }

    /// Returns the current page title, if available.
    pub async fn get_title(&self) -> Option<String> {
        self.cdp_page.get_title().await.ok().flatten()
    }

    /// Install an HTTP Basic `Authorization` header for every request this
    /// page makes. The portal sits behind plain basic auth; the credential
    /// pair is passed straight through.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        self.cdp_page.execute(network::EnableParams::default()).await?;

        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{username}:{password}"));
        let headers = network::Headers::new(serde_json::json!({
            "Authorization": format!("Basic {token}"),
        }));
        self.cdp_page
            .execute(network::SetExtraHttpHeadersParams::new(headers))
            .await?;

        Ok(())
    }

    pub async fn goto(&self, url: &str, wait: Option<WaitStrategy>) -> Result<GotoResult> {
        info!("Navigating to {url}");

        let wait_strategy = wait.unwrap_or_else(|| self.config.wait.clone());

        self.cdp_page.goto(url).await?;

        match wait_strategy {
            WaitStrategy::Event(event) => match event.as_str() {
                "domcontentloaded" => {
                    self.cdp_page.wait_for_navigation().await?;
                }
                "load" => {
                    self.cdp_page.wait_for_navigation().await?;
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                _ => {
                    return Err(BrowserError::ConfigError(format!(
                        "Unknown wait event: {event}"
                    )));
                }
            },
            WaitStrategy::Delay { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        let title = self.cdp_page.get_title().await.ok().flatten();

        // The URL is not always immediately available after navigation
        let mut final_url = None;
        for _ in 0..3 {
            if let Ok(Some(url)) = self.cdp_page.url().await {
                final_url = Some(url);
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let final_url = final_url.unwrap_or_else(|| url.to_string());

        Ok(GotoResult {
            url: final_url,
            title,
        })
    }

    /// Block until the document reports the next navigation has completed.
    pub async fn wait_for_navigation(&self) -> Result<()> {
        self.cdp_page.wait_for_navigation().await?;
        Ok(())
    }

    pub async fn inject_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.cdp_page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Attempt to focus the element addressed by `selector`. Returns false
    /// when the selector currently resolves to nothing; callers poll.
    pub async fn focus(&self, selector: &str) -> Result<bool> {
        let sel = js_string(selector);
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; el.focus(); return document.activeElement === el; }})()"
        );
        Ok(self.inject_js(&script).await?.as_bool().unwrap_or(false))
    }

    /// Empty the value of the element addressed by `selector`, firing the
    /// input/change events the portal's listeners hang off. No-op when the
    /// field is already empty.
    pub async fn clear_value(&self, selector: &str) -> Result<()> {
        let sel = js_string(selector);
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el || !el.value) return; el.value = ''; el.dispatchEvent(new Event('input', {{ bubbles: true }})); el.dispatchEvent(new Event('change', {{ bubbles: true }})); }})()"
        );
        self.inject_js(&script).await?;
        Ok(())
    }

    /// Type text into the currently focused element, one CDP key event per
    /// character. The inter-keystroke delay keeps the portal's incremental
    /// filtering listeners fed the way a human would.
    pub async fn type_text(&self, text: &str, per_char_delay: Duration) -> Result<()> {
        debug!("Typing text: {text}");

        for ch in text.chars() {
            let params = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::Char)
                .text(ch.to_string())
                .build()
                .map_err(BrowserError::CdpError)?;
            self.cdp_page.execute(params).await?;
            if !per_char_delay.is_zero() {
                tokio::time::sleep(per_char_delay).await;
            }
        }

        Ok(())
    }

    /// Press a key (e.g., "Enter", "Tab", "Escape", "ArrowDown")
    pub async fn press_key(&self, key: &str) -> Result<()> {
        debug!("Pressing key: {key}");

        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key.to_string());
        // Editing keys only take effect with their virtual key codes set
        match key {
            "Enter" => {
                down = down.code("Enter").text("\r").windows_virtual_key_code(13);
            }
            "Backspace" => {
                down = down.code("Backspace").windows_virtual_key_code(8);
            }
            _ => {}
        }
        let down_params = down.build().map_err(BrowserError::CdpError)?;
        self.cdp_page.execute(down_params).await?;

        let up_params = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key.to_string())
            .build()
            .map_err(BrowserError::CdpError)?;
        self.cdp_page.execute(up_params).await?;

        Ok(())
    }

    /// Trimmed text content of every node matching `selector`, in document
    /// order.
    pub async fn query_text_all(&self, selector: &str) -> Result<Vec<String>> {
        let sel = js_string(selector);
        let script = format!(
            "Array.from(document.querySelectorAll({sel})).map(el => (el.textContent || '').trim())"
        );
        let value = self.inject_js(&script).await?;
        serde_json::from_value(value)
            .map_err(|e| BrowserError::CdpError(format!("unexpected DOM query result: {e}")))
    }

    /// Whether the element addressed by `selector` exists and takes up
    /// layout space right now.
    pub async fn is_visible(&self, selector: &str) -> Result<bool> {
        let sel = js_string(selector);
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); return !!(el && (el.offsetParent !== null || el.getClientRects().length > 0)); }})()"
        );
        Ok(self.inject_js(&script).await?.as_bool().unwrap_or(false))
    }

    /// Simulate a click on the element addressed by `selector` through the
    /// DOM, returning false when the selector resolves to nothing.
    pub async fn click_element(&self, selector: &str) -> Result<bool> {
        let sel = js_string(selector);
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; el.click(); return true; }})()"
        );
        Ok(self.inject_js(&script).await?.as_bool().unwrap_or(false))
    }

    /// Capture the current viewport as a PNG.
    pub async fn screenshot_viewport(&self) -> Result<Vec<u8>> {
        debug!("Taking viewport screenshot");

        let probe = self
            .inject_js(
                "(() => ({ w: (document.documentElement.clientWidth|0), h: (document.documentElement.clientHeight|0) }))()",
            )
            .await
            .unwrap_or(serde_json::Value::Null);

        let doc_w = probe.get("w").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let doc_h = probe.get("h").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        // Fall back to configured viewport if the probe failed
        let vw = if doc_w > 0 { doc_w } else { self.config.viewport.width };
        let vh = if doc_h > 0 { doc_h } else { self.config.viewport.height };

        let params_builder = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(true)
            .clip(chromiumoxide::cdp::browser_protocol::page::Viewport {
                x: 0.0,
                y: 0.0,
                width: vw as f64,
                height: vh as f64,
                scale: 1.0,
            });

        let resp = self.capture_screenshot_with_retry(params_builder).await?;
        let data_b64: &str = resp.data.as_ref();
        base64::engine::general_purpose::STANDARD
            .decode(data_b64.as_bytes())
            .map_err(|e| BrowserError::ScreenshotError(format!("base64 decode failed: {e}")))
    }

    /// First tries with from_surface(false) to avoid flashing; if that fails
    /// (window not visible), retries with from_surface(true).
    async fn capture_screenshot_with_retry(
        &self,
        params_builder: chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotParamsBuilder,
    ) -> Result<chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotReturns> {
        let params = params_builder.clone().from_surface(false).build();

        match self.cdp_page.execute(params).await {
            Ok(resp) => Ok(resp.result),
            Err(e) => {
                debug!("Screenshot with from_surface(false) failed: {e}. Retrying with from_surface(true)...");
                let retry_params = params_builder.from_surface(true).build();
                match self.cdp_page.execute(retry_params).await {
                    Ok(resp) => Ok(resp.result),
                    Err(retry_err) => {
                        debug!("Screenshot retry with from_surface(true) also failed: {retry_err}");
                        Err(retry_err.into())
                    }
                }
            }
        }
    }
}

/// Embed a selector into generated JS as a properly quoted string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[derive(Debug, serde::Serialize)]
pub struct GotoResult {
    pub url: String,
    pub title: Option<String>,
}
