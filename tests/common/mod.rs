//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use pdfveil::error::{Error, Result};
use pdfveil::model::encode_png;
use pdfveil::publish::{ContentStore, MemoryStore, Sleeper};
use pdfveil::raster::Rasterizer;
use pdfveil::ContentId;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A page image with enough detail that blurring visibly changes it.
pub fn textured_page(width: u32, height: u32, seed: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let on = ((x / 4) + (y / 4) + seed) % 2 == 0;
        let v = if on { 230 } else { 20 };
        Rgba([v, ((x * 7 + seed) % 256) as u8, ((y * 3) % 256) as u8, 255])
    })
}

/// Rasterizer that writes synthetic `page-<n>.png` files.
pub struct FakeRasterizer {
    pages: Vec<(u32, u32)>,
    fail: bool,
    corrupt: HashSet<u32>,
    written: Mutex<HashMap<u32, Vec<u8>>>,
    out_dirs: Mutex<Vec<PathBuf>>,
}

impl FakeRasterizer {
    /// Produce one page per `(width, height)`.
    pub fn new(pages: Vec<(u32, u32)>) -> Self {
        Self {
            pages,
            fail: false,
            corrupt: HashSet::new(),
            written: Mutex::new(HashMap::new()),
            out_dirs: Mutex::new(Vec::new()),
        }
    }

    /// Produce `count` pages of the same size.
    pub fn uniform(count: usize, width: u32, height: u32) -> Self {
        Self::new(vec![(width, height); count])
    }

    /// A rasterizer whose converter always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    /// Write bytes that do not decode as an image for page `index`.
    pub fn corrupt_page(mut self, index: u32) -> Self {
        self.corrupt.insert(index);
        self
    }

    /// Bytes written for a page.
    pub fn written(&self, index: u32) -> Vec<u8> {
        self.written.lock().unwrap()[&index].clone()
    }

    /// Directories pages were written to.
    pub fn out_dirs(&self) -> Vec<PathBuf> {
        self.out_dirs.lock().unwrap().clone()
    }
}

impl Rasterizer for FakeRasterizer {
    fn name(&self) -> &str {
        "fake"
    }

    fn rasterize(&self, _source: &Path, _dpi: u32, out_dir: &Path) -> Result<()> {
        self.out_dirs.lock().unwrap().push(out_dir.to_path_buf());
        // Leave a stray file behind so cleanup has something to remove.
        std::fs::write(out_dir.join("page-0.partial"), b"tmp")?;
        if self.fail {
            return Err(Error::Conversion("pdftoppm exited with status 1".into()));
        }

        for (i, &(width, height)) in self.pages.iter().enumerate() {
            let index = i as u32 + 1;
            let bytes = if self.corrupt.contains(&index) {
                b"\x89PNG truncated".to_vec()
            } else {
                encode_png(&textured_page(width, height, index))?
            };
            std::fs::write(out_dir.join(format!("page-{}.png", index)), &bytes)?;
            self.written.lock().unwrap().insert(index, bytes);
        }
        Ok(())
    }
}

/// Delays requested by the retry loop, without sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Store that fails on demand and tracks concurrent calls.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_names: HashSet<String>,
    fail_first: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always fail uploads named `name`.
    pub fn failing_name(mut self, name: &str) -> Self {
        self.fail_names.insert(name.to_string());
        self
    }

    /// Fail the next `count` calls, whatever their name.
    pub fn failing_first(self, count: u32) -> Self {
        self.fail_first.store(count, Ordering::SeqCst);
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn guarded<T>(&self, name: &str, put: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Yield so sibling uploads in the same window overlap.
        tokio::time::sleep(Duration::from_millis(5)).await;

        let failing_first = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let result = if failing_first || self.fail_names.contains(name) {
            Err(Error::Store(format!("upload of {} refused", name)))
        } else {
            put.await
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn put_bytes(&self, payload: &[u8], name: &str) -> Result<ContentId> {
        self.guarded(name, self.inner.put_bytes(payload, name)).await
    }

    async fn put_json(&self, value: &serde_json::Value, name: Option<&str>) -> Result<ContentId> {
        let label = name.unwrap_or("data.json");
        self.guarded(label, self.inner.put_json(value, name)).await
    }
}

/// Number of entries left in a directory.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
