// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for integration tests: in-memory detector, classifier and
//! registry stand-ins, image builders and multipart bodies.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use pill_identifier::{
    recognition::{Classification, ClassifierError, PillClassifier, Recognizer},
    registry::{DrugRegistry, Enricher, RegistryError, RegistryItem},
    vision::{BoundingBox, DetectionService, PillBox, PillDetector},
    PillAnalyzer,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BOUNDARY: &str = "pill-test-boundary";

/// Solid-color PNG
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 180, 160])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn pill(x1: f32, y1: f32, x2: f32, y2: f32) -> PillBox {
    PillBox {
        bbox: BoundingBox { x1, y1, x2, y2 },
        confidence: 0.9,
        class_id: 0,
    }
}

/// Three pills in a 200x100 photo whose crops are 20, 30 and 40 pixels wide
pub fn three_pills() -> Vec<PillBox> {
    vec![
        pill(0.0, 0.0, 20.0, 20.0),
        pill(30.0, 0.0, 60.0, 20.0),
        pill(70.0, 0.0, 110.0, 20.0),
    ]
}

pub struct FixedDetector(pub Vec<PillBox>);

impl PillDetector for FixedDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<PillBox>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

pub struct BrokenDetector;

impl PillDetector for BrokenDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<PillBox>> {
        anyhow::bail!("model session unavailable")
    }
}

/// Scripted classifier reply
#[derive(Debug, Clone)]
pub enum Reply {
    Label {
        label: &'static str,
        score: f32,
        delay_ms: u64,
    },
    Status(u16),
}

impl Reply {
    pub fn label(label: &'static str, score: f32) -> Self {
        Reply::Label {
            label,
            score,
            delay_ms: 0,
        }
    }

    pub fn delayed(label: &'static str, delay_ms: u64) -> Self {
        Reply::Label {
            label,
            score: 0.9,
            delay_ms,
        }
    }
}

/// Counts calls in flight and remembers the highest count seen
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

pub struct InFlightGuard<'a>(&'a InFlight);

impl InFlight {
    pub fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Answers by crop width, which is how the tests tell the crops apart
pub struct WidthClassifier {
    replies: HashMap<u32, Reply>,
    completed: Mutex<Vec<&'static str>>,
    in_flight: InFlight,
}

impl WidthClassifier {
    pub fn new(replies: impl IntoIterator<Item = (u32, Reply)>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            completed: Mutex::new(Vec::new()),
            in_flight: InFlight::default(),
        }
    }

    /// Most classify calls that were running at once
    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak()
    }

    /// Labels in the order their calls finished
    pub fn completion_order(&self) -> Vec<&'static str> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PillClassifier for WidthClassifier {
    async fn classify(&self, image_jpeg: Bytes) -> Result<Classification, ClassifierError> {
        let _guard = self.in_flight.enter();
        let width = crop_width(&image_jpeg);
        match self.replies.get(&width) {
            Some(Reply::Label {
                label,
                score,
                delay_ms,
            }) => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                self.completed.lock().unwrap().push(label);
                Ok(Classification {
                    label: label.to_string(),
                    score: *score,
                })
            }
            Some(Reply::Status(status)) => Err(ClassifierError::ApiError {
                status: *status,
                message: "scripted failure".to_string(),
            }),
            None => Err(ClassifierError::EmptyPrediction),
        }
    }

    fn name(&self) -> &'static str {
        "width"
    }
}

pub fn crop_width(jpeg: &[u8]) -> u32 {
    image::load_from_memory(jpeg)
        .map(|img| img.dimensions().0)
        .unwrap_or(0)
}

/// In-memory registry that counts lookups
#[derive(Default)]
pub struct MapRegistry {
    items: HashMap<String, RegistryItem>,
    failing: Vec<String>,
    lookups: AtomicUsize,
}

impl MapRegistry {
    pub fn with_item(mut self, item: RegistryItem) -> Self {
        let name = item.item_name.clone().unwrap_or_default();
        self.items.insert(name, item);
        self
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DrugRegistry for MapRegistry {
    async fn find_item(&self, item_name: &str) -> Result<Option<RegistryItem>, RegistryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|n| n == item_name) {
            return Err(RegistryError::ApiError {
                status: 500,
                message: "registry down".to_string(),
            });
        }
        Ok(self.items.get(item_name).cloned())
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

/// Registry whose lookups take a per-name delay; records completion order
#[derive(Default)]
pub struct DelayedRegistry {
    delays: HashMap<String, u64>,
    completed: Mutex<Vec<String>>,
    in_flight: InFlight,
}

impl DelayedRegistry {
    pub fn new<'a>(delays: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        Self {
            delays: delays
                .into_iter()
                .map(|(name, ms)| (name.to_string(), ms))
                .collect(),
            ..Default::default()
        }
    }

    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak()
    }
}

#[async_trait]
impl DrugRegistry for DelayedRegistry {
    async fn find_item(&self, item_name: &str) -> Result<Option<RegistryItem>, RegistryError> {
        let _guard = self.in_flight.enter();
        let delay = self.delays.get(item_name).copied().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.completed.lock().unwrap().push(item_name.to_string());
        Ok(Some(registry_item(item_name)))
    }

    fn name(&self) -> &'static str {
        "delayed"
    }
}

pub fn registry_item(name: &str) -> RegistryItem {
    RegistryItem {
        item_name: Some(name.to_string()),
        entp_name: Some("삼진제약".to_string()),
        efcy_qesitm: Some(format!("{} 효능", name)),
        use_method_qesitm: Some("1일 3회 복용".to_string()),
        atpn_qesitm: Some("과량 복용 금지".to_string()),
        deposit_method_qesitm: Some("실온 보관".to_string()),
    }
}

pub fn analyzer(
    detector: impl PillDetector + 'static,
    classifier: Arc<dyn PillClassifier>,
    registry: Arc<dyn DrugRegistry>,
) -> PillAnalyzer {
    analyzer_with_limit(detector, classifier, registry, 8)
}

pub fn analyzer_with_limit(
    detector: impl PillDetector + 'static,
    classifier: Arc<dyn PillClassifier>,
    registry: Arc<dyn DrugRegistry>,
    max_concurrency: usize,
) -> PillAnalyzer {
    PillAnalyzer::new(
        DetectionService::new(Arc::new(detector), None),
        Recognizer::new(classifier, max_concurrency),
        Enricher::new(registry, max_concurrency),
    )
}

/// Multipart form body with one file field
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Serve a router on an ephemeral local port
pub async fn spawn_stub(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
