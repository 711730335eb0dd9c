use crate::catalog::{self, FontEntry};
use crate::font::{BitmapFont, FaceData, FontHandle, OutlineFont};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// How deep the recursive search descends below each search directory.
const MAX_SEARCH_DEPTH: usize = 6;

/// Finds catalog fonts on disk.
///
/// Search order is candidate-major: for each candidate file of the entry, every
/// search directory is tried in order, first as a direct path and then with a
/// recursive case-insensitive walk. The first file that parses wins.
///
/// Results (including "not found") are cached per catalog key for the life of
/// the resolver.
#[derive(Debug)]
pub struct FontResolver {
    search_dirs: Vec<PathBuf>,
    cache: RwLock<HashMap<&'static str, Option<Arc<FaceData>>>>,
}

impl FontResolver {
    /// Search `bundled_dir` first, then the platform font directories.
    pub fn new(bundled_dir: impl Into<PathBuf>) -> Self {
        let mut dirs = vec![bundled_dir.into()];
        dirs.extend(system_font_dirs());
        Self::with_search_dirs(dirs)
    }

    /// Search exactly `dirs`, in order.
    pub fn with_search_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs: dirs,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Resolve a font key at `size` pixels.
    ///
    /// Unknown keys use the default catalog entry; if no candidate file is
    /// found the built-in bitmap font is returned.
    pub fn resolve(&self, key: &str, size: f32) -> FontHandle {
        let entry = catalog::lookup(key).unwrap_or_else(|| {
            tracing::debug!(key, "Unknown font key, using default");
            catalog::default_entry()
        });
        match self.face_for(entry) {
            Some(face) => FontHandle::Outline(OutlineFont::new(face, size)),
            None => {
                tracing::warn!(
                    key = entry.key,
                    size,
                    dirs = ?self.search_dirs,
                    "No font file found, using built-in bitmap font"
                );
                FontHandle::Bitmap(BitmapFont::default())
            }
        }
    }

    /// Path of the file a key resolves to, or `None` if it falls back to the bitmap font.
    pub fn locate(&self, key: &str) -> Option<PathBuf> {
        self.face_for(catalog::entry_or_default(key))
            .map(|face| face.path.clone())
    }

    fn face_for(&self, entry: &'static FontEntry) -> Option<Arc<FaceData>> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = cache.get(entry.key) {
                return cached.clone();
            }
        }

        let found = self.search(entry).map(Arc::new);
        match &found {
            Some(face) => {
                tracing::debug!(key = entry.key, path = %face.path.display(), "Font resolved")
            }
            None => tracing::debug!(key = entry.key, "Font not found in any search directory"),
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.entry(entry.key).or_insert(found).clone()
    }

    fn search(&self, entry: &FontEntry) -> Option<FaceData> {
        entry.files.iter().find_map(|file| {
            self.search_dirs
                .iter()
                .find_map(|dir| find_in_dir(dir, file))
        })
    }
}

fn find_in_dir(dir: &Path, file: &str) -> Option<FaceData> {
    if !dir.is_dir() {
        return None;
    }
    let direct = dir.join(file);
    if direct.is_file() {
        if let Some(face) = FaceData::load(&direct) {
            return Some(face);
        }
    }
    find_recursive(dir, file, 0)
}

/// Depth-first walk in name order. Directory symlinks are not followed.
fn find_recursive(dir: &Path, file: &str, depth: usize) -> Option<FaceData> {
    let mut entries: Vec<_> = fs::read_dir(dir).ok()?.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_dir() {
            if depth < MAX_SEARCH_DEPTH {
                if let Some(face) = find_recursive(&path, file, depth + 1) {
                    return Some(face);
                }
            }
            continue;
        }

        let is_file = file_type.is_file() || (file_type.is_symlink() && path.is_file());
        let name_matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case(file));
        if is_file && name_matches {
            if let Some(face) = FaceData::load(&path) {
                return Some(face);
            }
        }
    }
    None
}

/// Platform font directories: Linux, then macOS, then Windows.
pub fn system_font_dirs() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);

    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
    ];
    if let Some(home) = &home {
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join(".fonts"));
    }

    dirs.push(PathBuf::from("/Library/Fonts"));
    dirs.push(PathBuf::from("/System/Library/Fonts"));
    if let Some(home) = &home {
        dirs.push(home.join("Library/Fonts"));
    }

    let windir = std::env::var_os("WINDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
    dirs.push(windir.join("Fonts"));
    dirs
}
