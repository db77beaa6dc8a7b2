//! Delivery naming convention for derivative artifacts.

/// Suffix inserted before the extension of a delivered derivative.
pub const SIGNED_SUFFIX: &str = "-signed";

/// `report.pdf` -> `report-signed.pdf`.
///
/// The suffix goes before the last extension, so `a.b.pdf` becomes
/// `a.b-signed.pdf`. Names without an extension (including dotfiles like
/// `.env`) get the suffix appended.
pub fn signed_file_name(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => {
            let (stem, ext) = name.split_at(idx);
            format!("{stem}{SIGNED_SUFFIX}{ext}")
        }
        _ => format!("{name}{SIGNED_SUFFIX}"),
    }
}
