//! `vcpkg_abi_info.txt`-equivalent manifest text (`spec.md` §4.2.4): the
//! exact serialization §4.2.2 hashed over, kept around for reproducibility
//! audits.

use crate::inputs::AbiEntry;

/// Render the manifest text: one `key value` pair per line, in the same
/// order the combining rule folded them.
#[must_use]
pub fn render_manifest(entries: &[AbiEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.key);
        out.push(' ');
        out.push_str(&entry.value);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_entry() {
        let entries = vec![AbiEntry::new("features", "core"), AbiEntry::new("version", "relaxed:1.2#0")];
        let text = render_manifest(&entries);
        assert_eq!(text, "features core\nversion relaxed:1.2#0\n");
    }
}
