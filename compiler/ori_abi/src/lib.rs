//! ABI lowering queries for the Ori compiler.
//!
//! Given a type-checked [`Module`](ori_abi_ir::Module), this crate answers
//! how its declarations look at the native calling-convention level:
//!
//! - **Layout** ([`layout`]): size, alignment, and address-only-ness of every
//!   type with a fixed layout.
//! - **Classification** ([`classify`]): whether a value is passed or returned
//!   in registers or through memory.
//! - **Flattening** ([`flatten`]): the primitive members a record decomposes
//!   into for direct passing.
//! - **Signatures** ([`signature`]): the full physical parameter list of a
//!   function, including implicit generic context, receiver, and error slot.
//! - **Enums** ([`enum_tags`]): stable case tags and per-case global symbols.
//! - **Metadata access** ([`metadata`]): the fixed accessor signature and the
//!   generic arguments an accessor takes.
//!
//! Everything is reached through one [`AbiDetailsProvider`] per module and
//! target. Queries are independent; the provider memoizes internally and is
//! `Sync`.
//!
//! # Crate Dependencies
//!
//! `ori_abi` depends only on `ori_abi_ir` for the resolved program model. No
//! LLVM dependency: results are plain data for whichever backend emits code.

pub mod classify;
pub mod config;
pub mod enum_tags;
mod error;
pub mod flatten;
pub mod implicit;
pub mod layout;
pub mod mangle;
pub mod metadata;
pub mod provider;
pub mod signature;

use std::sync::Once;

pub use classify::{IndirectReason, Passing, Position};
pub use config::{AbiConfig, TargetTripleComponents, SUPPORTED_TARGETS};
pub use enum_tags::{EnumElementInfo, EnumTagMapping};
pub use error::{ConfigError, LayoutError, LowerError};
pub use flatten::{RecordItem, RecordMember, RecordMembers, Unrepresentable};
pub use implicit::{AbiAdditionalParam, AdditionalParams};
pub use layout::{SizeAndAlignment, TypeLayout, MAX_LAYOUT_DEPTH};
pub use metadata::{FunctionABISignature, TypeRecordABIRepresentation};
pub use provider::AbiDetailsProvider;
pub use signature::{
    AbiParameter, DirectParameter, DirectResultType, IndirectParameter, IndirectResultValue,
    LoweredFunctionSignature,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=ori_abi=debug` or `RUST_LOG=ori_abi=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
