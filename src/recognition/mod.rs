// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pill recognition: names each detected crop via a remote classifier

pub mod classifier;
pub mod recognizer;

pub use classifier::{
    Classification, ClassifierError, HuggingFaceClassifier, PillClassifier,
    DEFAULT_CLASSIFIER_TIMEOUT,
};
pub use recognizer::{RecognitionResult, Recognizer, DEFAULT_MAX_CONCURRENCY, UNKNOWN_LABEL};
