//! Multi-volume archive naming rules.
//!
//! Split RAR archives are named `<name>.partN.rar`. Only the first volume is
//! handed to the extractor; the library walks the remaining volumes itself.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static PART_VOLUME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)part(\d+)\.rar$").ok());

/// Volume number of a `partN.rar` file, `None` for anything else
pub fn volume_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let captures = PART_VOLUME.as_ref()?.captures(name)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Whether the file is a multi-volume part at all
pub fn is_volume_part(path: &Path) -> bool {
    volume_number(path).is_some()
}

/// Whether the file should be submitted for extraction
///
/// `part1.rar`, `part01.rar` and `part001.rar` are first volumes. Files that
/// are not volume parts are always submitted.
pub fn is_first_volume(path: &Path) -> bool {
    match volume_number(path) {
        Some(n) => n == 1,
        None => !has_part_suffix(path),
    }
}

// A part number too large for u32 is still a volume part, just never the first one
fn has_part_suffix(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .zip(PART_VOLUME.as_ref())
        .is_some_and(|(name, re)| re.is_match(name))
}
