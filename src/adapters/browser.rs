//! Headless Chromium screenshots of the pin map and the HoodMaps region map.

use crate::adapters::geocode::GeocodeClient;
use crate::adapters::map_page::{generate_map_html, MapPageServer};
use crate::config::toml_config::MapsConfig;
use crate::domain::ports::ScreenshotProvider;
use crate::utils::error::{AgentError, Result};
use crate::utils::validation;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const PIN_MAP_FILE: &str = "google_screenshot.png";
pub const REGION_MAP_FILE: &str = "hoodmaps_screenshot.png";

const TOGGLE_TAGS_SELECTOR: &str = "div.action-toggle-tags";
const TOGGLE_SHAPES_SELECTOR: &str = "div.action-toggle-shapes";

fn browser_error(context: &str, e: impl std::fmt::Display) -> AgentError {
    AgentError::BrowserError {
        message: format!("{}: {}", context, e),
    }
}

/// Locate a Chrome/Chromium binary. `None` leaves detection to the driver.
pub fn find_chrome(configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = configured.map(PathBuf::from).filter(|p| p.exists()) {
        return Some(path);
    }

    if let Ok(p) = std::env::var("HOOD_AGENT_CHROME_PATH") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    ["google-chrome", "chromium", "chromium-browser"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
}

/// One headless Chromium process and its CDP event loop.
pub struct HeadlessBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl HeadlessBrowser {
    pub async fn launch(chrome_path: Option<&str>, navigation_timeout: Duration) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(1280, 1024)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");

        if let Some(path) = find_chrome(chrome_path) {
            tracing::debug!("Using Chrome at {}", path.display());
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| browser_error("invalid browser config", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_error("failed to launch Chromium", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            navigation_timeout,
        })
    }

    pub async fn open(&self, url: &str) -> Result<Page> {
        tracing::debug!("Navigating to {}", url);
        let page = tokio::time::timeout(self.navigation_timeout, self.browser.new_page(url))
            .await
            .map_err(|_| {
                browser_error(
                    "navigation timed out",
                    format!("{} after {:?}", url, self.navigation_timeout),
                )
            })?
            .map_err(|e| browser_error("navigation failed", e))?;
        Ok(page)
    }

    pub async fn click(page: &Page, selector: &str) -> Result<()> {
        let element = page
            .find_element(selector)
            .await
            .map_err(|e| browser_error(&format!("element {} not found", selector), e))?;
        element
            .click()
            .await
            .map_err(|e| browser_error(&format!("click on {} failed", selector), e))?;
        Ok(())
    }

    pub async fn full_page_screenshot(page: &Page, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        page.save_screenshot(params, output)
            .await
            .map_err(|e| browser_error("screenshot failed", e))?;
        Ok(())
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Failed to wait for browser exit: {}", e);
        }
        // 連線關閉後事件迴圈會自行結束
        if let Err(e) = self.handler.await {
            tracing::warn!("CDP handler task ended abnormally: {}", e);
        }
    }
}

/// Live screenshots through headless Chromium.
pub struct BrowserCapture {
    config: MapsConfig,
}

impl BrowserCapture {
    pub fn new(config: MapsConfig) -> Self {
        Self { config }
    }

    fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.navigation_timeout_seconds)
    }

    async fn screenshot_served_page(&self, url: &str, output: &Path) -> Result<()> {
        let browser =
            HeadlessBrowser::launch(self.config.chrome_path.as_deref(), self.navigation_timeout())
                .await?;

        let result = async {
            let page = browser.open(url).await?;
            tokio::time::sleep(Duration::from_millis(self.config.page_settle_ms)).await;
            HeadlessBrowser::full_page_screenshot(&page, output).await
        }
        .await;

        browser.close().await;
        result
    }

    async fn screenshot_hoodmaps(&self, output: &Path) -> Result<()> {
        let browser =
            HeadlessBrowser::launch(self.config.chrome_path.as_deref(), self.navigation_timeout())
                .await?;

        let settle = Duration::from_millis(self.config.page_settle_ms);
        let toggle_settle = Duration::from_millis(self.config.toggle_settle_ms);

        let result = async {
            let page = browser.open(&self.config.hoodmaps_url).await?;
            tokio::time::sleep(settle).await;

            // 關掉標籤，再切換兩次色塊讓圖層重新繪製
            HeadlessBrowser::click(&page, TOGGLE_TAGS_SELECTOR).await?;
            tokio::time::sleep(toggle_settle).await;
            HeadlessBrowser::click(&page, TOGGLE_SHAPES_SELECTOR).await?;
            tokio::time::sleep(toggle_settle).await;
            HeadlessBrowser::click(&page, TOGGLE_SHAPES_SELECTOR).await?;
            tokio::time::sleep(toggle_settle).await;

            HeadlessBrowser::full_page_screenshot(&page, output).await
        }
        .await;

        browser.close().await;
        result
    }
}

#[async_trait]
impl ScreenshotProvider for BrowserCapture {
    async fn capture_pin_map(&self, address: &str) -> Result<PathBuf> {
        let api_key = self.config.resolved_google_api_key();
        let api_key = validation::validate_required_field("GOOGLE_MAP_API_KEY", &api_key)?;

        let geocoder = GeocodeClient::new(&self.config.geocode_endpoint, api_key.as_str());
        let coords = geocoder.geocode(address).await?;
        tracing::info!("📍 Coordinates: lat={}, lng={}", coords.lat, coords.lng);

        let html = generate_map_html(coords, api_key, self.config.zoom);
        let server =
            MapPageServer::start(&format!("127.0.0.1:{}", self.config.html_port), html).await?;

        tokio::time::sleep(Duration::from_millis(self.config.server_warmup_ms)).await;

        let output = self.config.output_path(PIN_MAP_FILE);
        let result = self.screenshot_served_page(&server.url(), &output).await;

        if let Err(e) = server.shutdown().await {
            tracing::warn!("Map server did not shut down cleanly: {}", e);
        }
        result?;

        tracing::info!("📸 Screenshot saved to {}", output.display());
        Ok(output)
    }

    async fn capture_region_map(&self) -> Result<PathBuf> {
        let output = self.config.output_path(REGION_MAP_FILE);
        self.screenshot_hoodmaps(&output).await?;

        tracing::info!("📸 Screenshot saved to {}", output.display());
        Ok(output)
    }
}
