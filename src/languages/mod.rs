//! Bundled languages.
//!
//! Each language is built once on first use; the accessors hand out clones
//! of the shared `Arc`.

pub mod cstml;
pub mod instruction;
pub mod number;
pub mod regexp;
pub mod spamex;
pub mod string;

pub use cstml::{cstml, read_tree};
pub use instruction::instruction;
pub use number::number;
pub use regexp::regex;
pub use spamex::spamex;
pub use string::string;

/// Token node types shared by the bundled grammars.
pub const PUNCTUATOR: &str = "Punctuator";
pub const KEYWORD: &str = "Keyword";
pub const ESCAPE: &str = "Escape";

/// Cooks the hex digits of `\xHH`, `\uHHHH` or `\u{H..}` into a character.
pub(crate) fn code_point(hex: &str) -> Result<String, String> {
    u32::from_str_radix(hex, 16)
        .ok()
        .and_then(char::from_u32)
        .map(String::from)
        .ok_or_else(|| format!("{hex:?} is not a valid code point"))
}

/// Splits the body of a `\x`/`\u` escape into its hex digits, if it is one.
pub(crate) fn hex_escape(body: &str) -> Option<&str> {
    if let Some(hex) = body.strip_prefix('x') {
        return Some(hex);
    }
    let rest = body.strip_prefix('u')?;
    Some(
        rest.strip_prefix('{')
            .and_then(|braced| braced.strip_suffix('}'))
            .unwrap_or(rest),
    )
}
