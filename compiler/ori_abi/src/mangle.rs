//! Symbol names for ABI-level globals.
//!
//! Uses the Ori mangling scheme:
//!
//! ```text
//! _ori_<module>$<type path>$$<marker>$<member>
//! ```
//!
//! - `_ori_` is the prefix identifying Ori symbols
//! - `<module>` is the module path with `/`, `.` and `:` replaced by `$`
//! - `<type path>` is the chain of enclosing declarations, `$`-separated
//! - `$$<marker>$` introduces the kind of global (`case` for enum cases)
//!
//! | Declaration | Mangled Name |
//! |-------------|--------------|
//! | case `north` of `Direction` in `geo` | `_ori_geo$Direction$$case$north` |
//! | case `a` of `Outer.Inner` in `data/x` | `_ori_data$x$Outer$Inner$$case$a` |

use std::fmt::Write;

use ori_abi_ir::{EnumCaseId, Module};

/// The prefix for all Ori mangled symbols.
pub const MANGLE_PREFIX: &str = "_ori_";

/// Separator for path components.
const MODULE_SEP: char = '$';

/// Marker for per-case enum globals.
const CASE_MARKER: &str = "$$case$";

/// Symbol mangler for generating unique linker names.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mangler;

impl Mangler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Name of the global holding metadata for one enum case.
    ///
    /// Returns `None` if `case` does not name a case of an enum in `module`.
    #[must_use]
    #[allow(
        clippy::unused_self,
        reason = "stateless mangler; method form matches the other symbol manglers"
    )]
    pub fn mangle_enum_case(&self, module: &Module, case: EnumCaseId) -> Option<String> {
        let decl = module.nominal(case.decl)?;
        let case_decl = decl.enum_cases()?.get(case.index as usize)?;

        let mut result = String::with_capacity(64);
        result.push_str(MANGLE_PREFIX);

        let module_path = module.lookup(module.name());
        if !module_path.is_empty() {
            Self::encode_module_path(&mut result, module_path);
            result.push(MODULE_SEP);
        }

        for (i, ctx) in module.context_chain(case.decl).into_iter().enumerate() {
            if i > 0 {
                result.push(MODULE_SEP);
            }
            let name = module.nominal(ctx).map_or("", |d| module.lookup(d.name));
            Self::encode_identifier(&mut result, name);
        }

        result.push_str(CASE_MARKER);
        Self::encode_identifier(&mut result, module.lookup(case_decl.name));
        Some(result)
    }

    // -- Internal encoding helpers --
    //
    // Alphanumeric and '_' pass through unchanged, a few characters get
    // named escapes, everything else is hex-escaped.

    /// Encode a character as hex escape (e.g., '@' -> "$40").
    #[inline]
    fn encode_char_hex(out: &mut String, c: char) {
        let _ = write!(out, "${:02x}", c as u32);
    }

    fn encode_module_path(out: &mut String, path: &str) {
        for c in path.chars() {
            match c {
                '/' | '\\' | '.' | ':' => out.push(MODULE_SEP),
                c if c.is_alphanumeric() || c == '_' => out.push(c),
                _ => Self::encode_char_hex(out, c),
            }
        }
    }

    fn encode_identifier(out: &mut String, name: &str) {
        for c in name.chars() {
            match c {
                c if c.is_alphanumeric() || c == '_' => out.push(c),
                '<' => out.push_str("$LT"),
                '>' => out.push_str("$GT"),
                ',' => out.push_str("$C"),
                ' ' => out.push('_'),
                '-' => out.push_str("$D"),
                _ => Self::encode_char_hex(out, c),
            }
        }
    }
}

#[cfg(test)]
mod tests;
