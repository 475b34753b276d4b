// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link (edge) definitions for the graph.

use crate::pin::PinId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId(pub Uuid);

impl LinkId {
    /// Create a new random link ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed connection from an output pin to an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Unique link ID
    pub id: LinkId,
    /// Output pin the link leaves from
    pub start_pin: PinId,
    /// Input pin the link terminates at
    pub end_pin: PinId,
}

impl Link {
    /// Create a new link
    pub fn new(start_pin: PinId, end_pin: PinId) -> Self {
        Self {
            id: LinkId::new(),
            start_pin,
            end_pin,
        }
    }

    /// Check if this link touches a specific pin
    pub fn involves_pin(&self, pin: PinId) -> bool {
        self.start_pin == pin || self.end_pin == pin
    }

    /// The endpoint opposite to `pin`, if `pin` is one of the endpoints
    pub fn other_end(&self, pin: PinId) -> Option<PinId> {
        if self.start_pin == pin {
            Some(self.end_pin)
        } else if self.end_pin == pin {
            Some(self.start_pin)
        } else {
            None
        }
    }
}
