// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Setup errors.
//!
//! Only [`Gui::new`](crate::gui::Gui::new) can fail with an error. Everything
//! after setup reports resource exhaustion as `None`/`false` and leaves prior
//! state untouched.

use core::fmt;

use crate::heap::HeapError;

/// Why a [`Gui`](crate::gui::Gui) could not be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitError {
    /// The memory regions were rejected.
    Heap(HeapError),
    /// The display driver reported zero layers.
    NoDisplayLayers,
    /// The display driver failed to initialize.
    DisplayInit,
    /// The heap could not hold the input queues or the desktop widget.
    OutOfMemory,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heap(e) => write!(f, "heap setup failed: {e}"),
            Self::NoDisplayLayers => f.write_str("display driver has no layers"),
            Self::DisplayInit => f.write_str("display driver failed to initialize"),
            Self::OutOfMemory => f.write_str("heap too small for runtime state"),
        }
    }
}

impl core::error::Error for InitError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Heap(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HeapError> for InitError {
    fn from(e: HeapError) -> Self {
        Self::Heap(e)
    }
}
