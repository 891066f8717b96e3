// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Best-effort dataset snapshots of uploads and detected crops
//!
//! Every analyzed upload and its crops are written to disk for later
//! dataset curation. Nothing here may fail a request: write errors are
//! logged and skipped.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

const ORIGINALS_DIR: &str = "originals";
const CROPS_DIR: &str = "crops";

/// Writes request snapshots under `<base>/originals` and `<base>/crops`
#[derive(Debug, Clone)]
pub struct SnapshotRecorder {
    origin_dir: PathBuf,
    crop_dir: PathBuf,
}

impl SnapshotRecorder {
    /// Create the recorder and its directories
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let origin_dir = base_dir.join(ORIGINALS_DIR);
        let crop_dir = base_dir.join(CROPS_DIR);

        for dir in [&origin_dir, &crop_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        }

        Ok(Self {
            origin_dir,
            crop_dir,
        })
    }

    pub fn crop_dir(&self) -> &Path {
        &self.crop_dir
    }

    pub fn origin_dir(&self) -> &Path {
        &self.origin_dir
    }

    /// Save the uploaded image. Returns the written path, if any.
    pub fn save_original(&self, request_id: &str, image: &DynamicImage) -> Option<PathBuf> {
        let path = self.origin_dir.join(format!("{}_original.jpg", request_id));
        save_jpeg(image, &path)
    }

    /// Save crops in detection order. Returns the paths that were written.
    pub fn save_crops(&self, request_id: &str, crops: &[DynamicImage]) -> Vec<PathBuf> {
        crops
            .iter()
            .enumerate()
            .filter_map(|(i, crop)| {
                let path = self.crop_dir.join(format!("{}_crop_{}.jpg", request_id, i));
                save_jpeg(crop, &path)
            })
            .collect()
    }
}

fn save_jpeg(image: &DynamicImage, path: &Path) -> Option<PathBuf> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    match rgb.save_with_format(path, ImageFormat::Jpeg) {
        Ok(()) => {
            debug!("Snapshot saved: {}", path.display());
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!("Failed to save snapshot {}: {}", path.display(), e);
            None
        }
    }
}
