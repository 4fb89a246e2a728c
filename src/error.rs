//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! [`RenderError`] covers failures that prevent producing any image at all.
//! Failures that merely degrade fidelity (a missing texture, a model parent
//! cycle, an unresolved selector, a skin that fails to decode) are *not*
//! represented here — they are recorded as [`Warning`]s on the render result
//! instead, and the renderer substitutes a sentinel and keeps going.
//!
//! ```rust,ignore
//! use mcrender::error::{RenderError, Result};
//!
//! fn load_model() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The fatal error type for the renderer.
///
/// Every variant here surfaces to the caller as `Err` and aborts the render
/// in progress; nothing partially-rendered is returned.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // Options Errors
    // ========================================================================
    /// A `RenderOptions` field failed validation before any work began.
    #[error("invalid render option `{field}`: {reason}")]
    OptionsInvalid {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    // ========================================================================
    // Item Errors
    // ========================================================================
    /// The item id was empty or had a malformed namespace.
    #[error("invalid item id: {0}")]
    InvalidItemId(String),

    // ========================================================================
    // Model Errors
    // ========================================================================
    /// A model JSON document failed to parse or had an invalid shape.
    #[error("failed to parse model `{path}`: {reason}")]
    ModelParseError {
        /// The model path being parsed.
        path: String,
        /// Human-readable reason.
        reason: String,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error while warming a cache.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ========================================================================
    // Image Errors
    // ========================================================================
    /// Image decoding error.
    #[error("image decode error: {0}")]
    ImageDecodeError(String),

    // ========================================================================
    // Network Errors (skin fetching, feature = "http")
    // ========================================================================
    /// HTTP request error while fetching a player skin.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::ImageDecodeError(err.to_string())
    }
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;

/// A non-fatal degradation recorded on a render result.
///
/// These correspond to the "fidelity-reducing" error kinds in the design:
/// the renderer substitutes a sentinel value and continues, but tells the
/// caller what it had to paper over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A resource id could not be resolved to a texture; the missing-texture
    /// sentinel (`minecraft:missingno`) was substituted.
    MissingAsset(String),
    /// A model `parent` chain or `#slot` chain cycled back on itself; a
    /// default cube with missing-texture faces was substituted.
    ModelCycleDetected(String),
    /// A player-skin image could not be decoded; the default Steve skin was
    /// substituted.
    SkinDecodeFailed(String),
    /// No selector branch matched; the item's default model path was used.
    SelectorUnresolved(String),
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::MissingAsset(id) => write!(f, "missing asset: {id}"),
            Warning::ModelCycleDetected(path) => write!(f, "model cycle detected at {path}"),
            Warning::SkinDecodeFailed(reason) => write!(f, "skin decode failed: {reason}"),
            Warning::SelectorUnresolved(item) => {
                write!(f, "selector unresolved for {item}, used default model")
            }
        }
    }
}
