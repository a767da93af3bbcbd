//! Target ABI configuration.
//!
//! Everything target-dependent that layout and classification read lives
//! here: the pointer width and the budgets that decide when a value stops
//! travelling in registers.
//!
//! Target triples follow the format `<arch>-<vendor>-<os>[-<env>]`. Only the
//! architecture affects the defaults:
//!
//! | Arch | Pointer | Param budget | Result budget | Members |
//! |------|---------|--------------|---------------|---------|
//! | `x86_64`, `aarch64` | 8 | 32 | 32 | 4 |
//! | `wasm32` | 4 | 16 | 8 | 4 |

use std::fmt;

use crate::ConfigError;

/// Target triples the ABI tables know about.
pub const SUPPORTED_TARGETS: &[&str] = &[
    // Linux
    "x86_64-unknown-linux-gnu",
    "x86_64-unknown-linux-musl",
    "aarch64-unknown-linux-gnu",
    "aarch64-unknown-linux-musl",
    // macOS
    "x86_64-apple-darwin",
    "aarch64-apple-darwin",
    // Windows
    "x86_64-pc-windows-msvc",
    "x86_64-pc-windows-gnu",
    // WebAssembly
    "wasm32-unknown-unknown",
    "wasm32-unknown-wasi",
];

const FALLBACK_HOST: &str = "x86_64-unknown-linux-gnu";

/// Parsed components of a target triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetTripleComponents {
    /// CPU architecture (e.g., `x86_64`, `aarch64`, `wasm32`)
    pub arch: String,
    pub vendor: String,
    pub os: String,
    /// Environment/ABI (e.g., `gnu`, `musl`, `msvc`) - optional
    pub env: Option<String>,
}

impl TargetTripleComponents {
    /// Parse `<arch>-<vendor>-<os>[-<env>]`.
    pub fn parse(triple: &str) -> Result<Self, ConfigError> {
        let mut parts = triple.split('-');
        let (Some(arch), Some(vendor), Some(os)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ConfigError::InvalidTripleFormat {
                triple: triple.to_string(),
                reason: "expected at least 3 components: <arch>-<vendor>-<os>".to_string(),
            });
        };
        if [arch, vendor, os].iter().any(|part| part.is_empty()) {
            return Err(ConfigError::InvalidTripleFormat {
                triple: triple.to_string(),
                reason: "empty component".to_string(),
            });
        }

        Ok(Self {
            arch: arch.to_string(),
            vendor: vendor.to_string(),
            os: os.to_string(),
            env: parts.next().map(str::to_string),
        })
    }

    #[must_use]
    pub fn is_wasm(&self) -> bool {
        self.arch == "wasm32" || self.arch == "wasm64"
    }

    /// Pointer width in bytes for this architecture.
    #[must_use]
    pub fn pointer_width(&self) -> u64 {
        if self.arch == "wasm32" {
            4
        } else {
            8
        }
    }
}

impl fmt::Display for TargetTripleComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.arch, self.vendor, self.os)?;
        if let Some(env) = &self.env {
            write!(f, "-{env}")?;
        }
        Ok(())
    }
}

/// ABI parameters for one target.
///
/// Immutable once handed to a provider. Budgets can be overridden with the
/// `with_*` builders, which is mostly useful in tests and for experimenting
/// with register pressure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct AbiConfig {
    triple: TargetTripleComponents,
    pointer_width: u64,
    max_direct_param_bytes: u64,
    max_direct_result_bytes: u64,
    max_direct_members: usize,
}

impl AbiConfig {
    /// Configuration for a supported target triple.
    pub fn from_triple(triple: &str) -> Result<Self, ConfigError> {
        if !SUPPORTED_TARGETS.contains(&triple) {
            return Err(ConfigError::UnsupportedTarget {
                triple: triple.to_string(),
                supported: SUPPORTED_TARGETS.to_vec(),
            });
        }
        let components = TargetTripleComponents::parse(triple)?;
        Ok(Self::for_components(components))
    }

    /// Configuration for the machine running the compiler.
    ///
    /// Unknown hosts get the `x86_64-unknown-linux-gnu` tables.
    pub fn host() -> Self {
        let triple = host_triple();
        tracing::debug!(triple, "selecting host ABI configuration");
        Self::from_triple(triple).unwrap_or_else(|_| {
            Self::for_components(TargetTripleComponents {
                arch: "x86_64".to_string(),
                vendor: "unknown".to_string(),
                os: "linux".to_string(),
                env: Some("gnu".to_string()),
            })
        })
    }

    fn for_components(triple: TargetTripleComponents) -> Self {
        let pointer_width = triple.pointer_width();
        let (param_bytes, result_bytes) = if triple.is_wasm() {
            (4 * pointer_width, 2 * pointer_width)
        } else {
            (4 * pointer_width, 4 * pointer_width)
        };
        Self {
            triple,
            pointer_width,
            max_direct_param_bytes: param_bytes,
            max_direct_result_bytes: result_bytes,
            max_direct_members: 4,
        }
    }

    #[must_use]
    pub fn with_max_direct_param_bytes(mut self, bytes: u64) -> Self {
        self.max_direct_param_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_max_direct_result_bytes(mut self, bytes: u64) -> Self {
        self.max_direct_result_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_max_direct_members(mut self, members: usize) -> Self {
        self.max_direct_members = members;
        self
    }

    /// Reject configurations no target could have.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pointer_width.is_power_of_two() {
            return Err(ConfigError::InvalidBudget {
                field: "pointer_width",
                reason: "must be a power of two",
            });
        }
        if self.max_direct_members == 0 {
            return Err(ConfigError::InvalidBudget {
                field: "max_direct_members",
                reason: "at least one member must be passable directly",
            });
        }
        Ok(())
    }

    // -- Accessors --

    #[must_use]
    pub fn triple(&self) -> &TargetTripleComponents {
        &self.triple
    }

    #[must_use]
    pub fn pointer_width(&self) -> u64 {
        self.pointer_width
    }

    #[must_use]
    pub fn max_direct_param_bytes(&self) -> u64 {
        self.max_direct_param_bytes
    }

    #[must_use]
    pub fn max_direct_result_bytes(&self) -> u64 {
        self.max_direct_result_bytes
    }

    #[must_use]
    pub fn max_direct_members(&self) -> usize {
        self.max_direct_members
    }
}

fn host_triple() -> &'static str {
    match (std::env::consts::ARCH, std::env::consts::OS) {
        ("x86_64", "linux") => "x86_64-unknown-linux-gnu",
        ("aarch64", "linux") => "aarch64-unknown-linux-gnu",
        ("x86_64", "macos") => "x86_64-apple-darwin",
        ("aarch64", "macos") => "aarch64-apple-darwin",
        ("x86_64", "windows") => "x86_64-pc-windows-msvc",
        ("wasm32", _) => "wasm32-unknown-unknown",
        _ => FALLBACK_HOST,
    }
}
