//! Component health status registry
//!
//! A process-wide, last-write-wins map from a component to its current
//! [`HealthLevel`] and a free-text message. Writers overwrite unconditionally;
//! readers (status endpoints, liveness checks) see whole entries only.
//!
//! # Usage
//!
//! ```
//! use pelican_advertise::metrics::health::{HealthComponent, HealthLevel, HealthRegistry};
//!
//! let registry = HealthRegistry::new();
//! registry.set_status(HealthComponent::Federation, HealthLevel::Warning, "starting up");
//!
//! let status = registry.get_status(HealthComponent::Federation).unwrap();
//! assert_eq!(status.level, HealthLevel::Warning);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

// ============================================================================
// Health Level
// ============================================================================

/// Tri-state health level plus `Unknown` for components never reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    /// Component is operating normally
    Ok,
    /// Component is degraded or still starting up
    Warning,
    /// Component is failing
    Critical,
    /// No status has been reported
    Unknown,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }

    /// Numeric encoding used by the Prometheus gauge
    pub fn metric_value(&self) -> f64 {
        match self {
            Self::Critical => 1.0,
            Self::Warning => 2.0,
            Self::Ok => 3.0,
            Self::Unknown => 4.0,
        }
    }

    /// Ordering used when folding many components into one overall level.
    /// Higher is worse.
    fn severity(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Unknown => 1,
            Self::Warning => 2,
            Self::Critical => 3,
        }
    }

    /// Return the worse of two levels
    pub fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Health Component
// ============================================================================

/// Components that report health through the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthComponent {
    /// Advertisement of origin/cache servers to the director
    Federation,
}

impl HealthComponent {
    pub fn all() -> [Self; 1] {
        [Self::Federation]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Federation => "federation",
        }
    }
}

impl fmt::Display for HealthComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthComponent {
    type Err = UnknownComponent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownComponent(s.to_string()))
    }
}

/// Returned when a component name does not match any [`HealthComponent`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown health component: {0}")]
pub struct UnknownComponent(pub String);

// ============================================================================
// Component Status
// ============================================================================

/// Latest reported status of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    #[serde(rename = "status")]
    pub level: HealthLevel,
    pub message: String,
    pub last_update: DateTime<Utc>,
}

// ============================================================================
// Health Registry
// ============================================================================

/// Concurrency-safe component health map
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    entries: Arc<RwLock<HashMap<HealthComponent, ComponentStatus>>>,
    export_metrics: bool,
}

impl HealthRegistry {
    /// Create an empty, private registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the status of `component`. Never fails.
    pub fn set_status(
        &self,
        component: HealthComponent,
        level: HealthLevel,
        message: impl Into<String>,
    ) {
        let status = ComponentStatus {
            level,
            message: message.into(),
            last_update: Utc::now(),
        };

        // A writer that panicked can only have left a complete entry behind.
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(component, status);

        if self.export_metrics {
            super::set_component_health(component, level);
        }

        tracing::trace!(component = %component, level = %level, "Component health updated");
    }

    /// Latest status of `component`, or `None` if it was never written
    pub fn get_status(&self, component: HealthComponent) -> Option<ComponentStatus> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&component)
            .cloned()
    }

    /// Level of `component`, `Unknown` if absent
    pub fn level(&self, component: HealthComponent) -> HealthLevel {
        self.get_status(component)
            .map(|s| s.level)
            .unwrap_or(HealthLevel::Unknown)
    }

    /// Copy of every entry
    pub fn snapshot(&self) -> HashMap<HealthComponent, ComponentStatus> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Worst level across all components, `Unknown` if nothing was reported
    pub fn overall(&self) -> HealthLevel {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        entries
            .values()
            .map(|s| s.level)
            .reduce(HealthLevel::worst)
            .unwrap_or(HealthLevel::Unknown)
    }
}

static GLOBAL_REGISTRY: OnceLock<HealthRegistry> = OnceLock::new();

/// The process-wide registry
///
/// Writes to this registry are mirrored into the
/// `pelican_component_health_status` gauge once metrics are initialized.
pub fn global() -> HealthRegistry {
    GLOBAL_REGISTRY
        .get_or_init(|| HealthRegistry {
            entries: Arc::default(),
            export_metrics: true,
        })
        .clone()
}

// ============================================================================
// Tests
// ============================================================================
