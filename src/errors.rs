//! Error Types
//!
//! The main error type [`RenderError`] covers every failure mode the render
//! core can report: invalid handles or arguments at a boundary, invalid draw
//! operations, and capacity violations.
//!
//! Public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, RenderError>`. No error crosses the render-core
//! boundary as a panic: recoverable failures are reported on the `log`
//! channel and the offending entity or draw is skipped.

use thiserror::Error;

/// The main error type for the render core.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // Boundary validation
    // ========================================================================
    /// A handle did not resolve in its arena (stale or foreign key).
    #[error("invalid {kind} handle")]
    InvalidHandle {
        /// Resource kind the handle was expected to address.
        kind: &'static str,
    },

    /// A resource of the wrong kind was handed to an operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // ========================================================================
    // Draw-time failures
    // ========================================================================
    /// Drawing without bound buffers, out-of-range index ranges, and the like.
    /// Aborts only the offending draw call; the frame continues.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Buffer map/unmap misuse (double map, unmap without map).
    #[error("buffer map error: {0}")]
    BufferMap(String),

    // ========================================================================
    // Capacity violations
    // ========================================================================
    /// A model declares more bones than the shared bone buffer can hold.
    /// Fatal for that model; bone data cannot be truncated safely.
    #[error("model declares {count} bones, limit is {limit}")]
    BoneCapacity {
        /// Declared bone count.
        count: usize,
        /// Fixed capacity of the shared bone buffer.
        limit: usize,
    },

    /// A bone hierarchy is not a forward-ordered DAG.
    #[error("bone {index} has parent {parent}; parents must precede children")]
    BoneHierarchy {
        /// Offending bone index.
        index: usize,
        /// Its declared parent index.
        parent: usize,
    },

    // ========================================================================
    // Initialization
    // ========================================================================
    /// Shader compilation or linking failed. Fatal at context creation only.
    #[error("shader compile error: {0}")]
    ShaderCompile(String),
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
