//! Output path derivation and path identity.

use std::path::{Component, Path, PathBuf};

const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Make a path absolute and lexically clean (`.` and `..` resolved).
///
/// Symlinks are not resolved and the path need not exist.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut clean = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other.as_os_str()),
        }
    }
    clean
}

/// Text after the last dot of the file name, without the dot.
///
/// Unlike [`Path::extension`], a dotfile such as `.png` has extension `png`.
pub fn dotted_extension(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.rfind('.').map(|i| &name[i + 1..])
}

/// Whether a path already carries a JPEG-family extension.
pub fn has_jpeg_extension(path: &Path) -> bool {
    dotted_extension(path)
        .is_some_and(|ext| JPEG_EXTENSIONS.iter().any(|j| j.eq_ignore_ascii_case(ext)))
}

fn with_jpg_extension(path: &Path) -> PathBuf {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => {
            let stem = name.rfind('.').map_or(name, |i| &name[..i]);
            path.with_file_name(format!("{stem}.jpg"))
        }
        None => path.with_extension("jpg"),
    }
}

/// Mirror `input` (found under `input_root`) into `output_root`.
///
/// The extension becomes `.jpg` unless it already is `.jpg`/`.jpeg`.
pub fn derive_output_path(input_root: &Path, output_root: &Path, input: &Path) -> PathBuf {
    let relative = input.strip_prefix(input_root).unwrap_or(input);
    let output = output_root.join(relative);
    if has_jpeg_extension(&output) {
        normalize_path(&output)
    } else {
        normalize_path(&with_jpg_extension(&output))
    }
}
