//! Output naming contract.
//!
//! Every original lands at `<root>/<label>/<stem>.jpg` and its augmented
//! derivative at `<root>/<label>/<stem>_augmented.jpg`, where `<stem>` is the
//! input file name with its last four characters removed. Consumers of the
//! output tree rely on these names, so nothing here is configurable.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Number of trailing characters dropped from a file name (dot + extension).
pub const EXTENSION_LEN: usize = 4;

/// Suffix appended to the stem of augmented outputs.
pub const AUGMENTED_SUFFIX: &str = "_augmented";

/// Extension of every written image.
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Returns `file_name` without its last four characters.
///
/// Counting is done in characters, so multi-byte names never split a code
/// point. Names that would leave an empty stem, or that contain a path
/// separator, are rejected.
pub fn file_stem(file_name: &str) -> Result<&str> {
    if file_name.contains(['/', '\\']) {
        return Err(Error::InvalidInput(format!(
            "file name '{}' must be a single path component",
            file_name
        )));
    }

    let char_count = file_name.chars().count();
    if char_count <= EXTENSION_LEN {
        return Err(Error::InvalidInput(format!(
            "file name '{}' is too short to strip a {}-character extension",
            file_name, EXTENSION_LEN
        )));
    }

    let cut = file_name
        .char_indices()
        .nth(char_count - EXTENSION_LEN)
        .map(|(idx, _)| idx)
        .unwrap_or(file_name.len());

    Ok(&file_name[..cut])
}

/// Checks that a label can be used as a single directory component.
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::InvalidInput("label must not be empty".to_string()));
    }
    if label == "." || label == ".." || label.contains(['/', '\\']) {
        return Err(Error::InvalidInput(format!(
            "label '{}' is not a valid directory name",
            label
        )));
    }
    Ok(())
}

/// `<stem>.jpg`
pub fn original_file_name(file_name: &str) -> Result<String> {
    Ok(format!("{}.{}", file_stem(file_name)?, OUTPUT_EXTENSION))
}

/// `<stem>_augmented.jpg`
pub fn augmented_file_name(file_name: &str) -> Result<String> {
    Ok(format!(
        "{}{}.{}",
        file_stem(file_name)?,
        AUGMENTED_SUFFIX,
        OUTPUT_EXTENSION
    ))
}

/// Path of the persisted original under `root`.
pub fn original_path(root: &Path, label: &str, file_name: &str) -> Result<PathBuf> {
    validate_label(label)?;
    Ok(root.join(label).join(original_file_name(file_name)?))
}

/// Path of the persisted augmented derivative under `root`.
pub fn augmented_path(root: &Path, label: &str, file_name: &str) -> Result<PathBuf> {
    validate_label(label)?;
    Ok(root.join(label).join(augmented_file_name(file_name)?))
}
