//! Base-directory containment guard for client-supplied file names.
//!
//! The contract is a bare file name, never a sub-path. Lexical gates run
//! first; the surviving candidate is then joined to the base directory and
//! canonicalized against the real filesystem, because only the resolved
//! path tells the truth once symlinks are involved. Containment is proven
//! component-wise on the canonical result — a raw string prefix would let
//! `/a/b` match `/a/bevil`.

use std::path::{Path, PathBuf};

use super::DenyReason;

/// Resolve `candidate` under `base`, or say why it must not be opened.
///
/// On allow the returned path is absolute, canonical, and contained in the
/// canonicalized base directory. A name that does not exist yet still
/// resolves (it is a proven-bare segment under the canonical base), so the
/// caller can produce its own not-found response.
pub fn resolve(candidate: &str, base: &Path) -> Result<PathBuf, DenyReason> {
    if candidate.contains("..") {
        return Err(DenyReason::TraversalSequence);
    }
    if Path::new(candidate).is_absolute() {
        return Err(DenyReason::AbsolutePath);
    }
    if candidate.contains('/') || candidate.contains('\\') {
        return Err(DenyReason::PathSeparator);
    }
    if candidate.contains('\0') {
        return Err(DenyReason::PathSeparator);
    }

    let canonical_base = base.canonicalize().map_err(|_| DenyReason::OutsideBase)?;

    let joined = canonical_base.join(candidate);
    let resolved = match joined.canonicalize() {
        Ok(path) => path,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => joined,
        Err(_) => return Err(DenyReason::OutsideBase),
    };

    if resolved == canonical_base || resolved.starts_with(&canonical_base) {
        Ok(resolved)
    } else {
        Err(DenyReason::OutsideBase)
    }
}
