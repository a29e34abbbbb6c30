//! Icon lookup for profiles.
//!
//! Resolves a desktop entry's `Icon` value to a file on disk together with
//! the `sizes` and `type` members a web app manifest expects.

use crate::error::{LauncherError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Icon extensions we can serve, best first for equal sizes.
const ICON_EXTENSIONS: [&str; 4] = ["png", "webp", "svg", "xpm"];

/// A locally resolved icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIcon {
    pub path: PathBuf,
    /// Manifest size descriptor, e.g. `"128x128"` or `"any"`.
    pub sizes: String,
    pub mime_type: String,
}

/// Finds the icon file for a desktop entry `Icon` value.
pub trait IconResolver: Send + Sync {
    fn find(&self, name: &str) -> Result<ResolvedIcon>;
}

/// Resolver that walks icon theme and pixmap directories.
pub struct ThemeIconResolver {
    roots: Vec<PathBuf>,
}

impl ThemeIconResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Describe a specific file as an icon.
    pub fn describe(path: &Path) -> Option<ResolvedIcon> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        let mime_type = mime_for_extension(&ext)?;
        let sizes = match size_from_path(path) {
            Some(px) if ext != "svg" => format!("{0}x{0}", px),
            _ => "any".to_string(),
        };

        Some(ResolvedIcon {
            path: path.to_path_buf(),
            sizes,
            mime_type: mime_type.to_string(),
        })
    }

    /// Rank a candidate; higher is better.
    ///
    /// Raster icons with a known size beat scalable ones (browsers install
    /// raster icons more reliably), larger beats smaller.
    fn rank(path: &Path) -> (u32, u32, usize) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let ext_rank = ICON_EXTENSIONS.len()
            - ICON_EXTENSIONS
                .iter()
                .position(|e| *e == ext)
                .unwrap_or(ICON_EXTENSIONS.len());

        match size_from_path(path) {
            Some(px) if ext != "svg" => (2, px, ext_rank),
            _ if ext == "svg" => (1, 0, ext_rank),
            _ => (0, 0, ext_rank),
        }
    }
}

impl IconResolver for ThemeIconResolver {
    fn find(&self, name: &str) -> Result<ResolvedIcon> {
        let direct = Path::new(name);
        if direct.is_absolute() {
            return direct
                .is_file()
                .then(|| Self::describe(direct))
                .flatten()
                .ok_or_else(|| LauncherError::IconNotFound {
                    name: name.to_string(),
                });
        }

        let stem = icon_stem(name);
        let mut best: Option<(PathBuf, (u32, u32, usize))> = None;

        for root in self.roots.iter().filter(|r| r.is_dir()) {
            let walker = WalkDir::new(root).follow_links(true).max_depth(6);
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                let stem_matches = path.file_stem().and_then(|s| s.to_str()) == Some(stem);
                let ext_supported = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| ICON_EXTENSIONS.contains(&e.to_lowercase().as_str()));
                if !stem_matches || !ext_supported {
                    continue;
                }

                let rank = Self::rank(path);
                if best.as_ref().map_or(true, |(_, r)| rank > *r) {
                    best = Some((path.to_path_buf(), rank));
                }
            }
        }

        let (path, _) = best.ok_or_else(|| LauncherError::IconNotFound {
            name: name.to_string(),
        })?;
        debug!("Resolved icon '{}' to {}", name, path.display());

        Self::describe(&path).ok_or_else(|| LauncherError::IconNotFound {
            name: name.to_string(),
        })
    }
}

/// `Icon=` value without a supported image extension (`foo.png` -> `foo`).
/// Other dots are part of the name, as in `org.gnome.gedit`.
fn icon_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if ICON_EXTENSIONS.contains(&ext.to_lowercase().as_str()) => stem,
        _ => name,
    }
}

/// Pixel size from a theme directory such as `48x48` or `48x48@2`.
fn size_from_path(path: &Path) -> Option<u32> {
    path.ancestors().skip(1).find_map(|dir| {
        let name = dir.file_name()?.to_str()?;
        let name = name.split('@').next()?;
        let (w, h) = name.split_once('x')?;
        let (w, h): (u32, u32) = (w.parse().ok()?, h.parse().ok()?);
        (w == h).then_some(w)
    })
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "xpm" => Some("image/x-xpixmap"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "icon").unwrap();
    }

    #[test]
    fn test_prefers_largest_raster() {
        let temp_dir = TempDir::new().unwrap();
        let hicolor = temp_dir.path().join("hicolor");
        touch(&hicolor.join("48x48/apps/gimp.png"));
        touch(&hicolor.join("256x256/apps/gimp.png"));
        touch(&hicolor.join("scalable/apps/gimp.svg"));
        touch(&hicolor.join("256x256/apps/other.png"));

        let resolver = ThemeIconResolver::new(vec![temp_dir.path().to_path_buf()]);
        let icon = resolver.find("gimp").unwrap();

        assert_eq!(icon.path, hicolor.join("256x256/apps/gimp.png"));
        assert_eq!(icon.sizes, "256x256");
        assert_eq!(icon.mime_type, "image/png");
    }

    #[test]
    fn test_falls_back_to_svg() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("hicolor/scalable/apps/inkscape.svg"));

        let resolver = ThemeIconResolver::new(vec![temp_dir.path().to_path_buf()]);
        let icon = resolver.find("inkscape").unwrap();

        assert_eq!(icon.sizes, "any");
        assert_eq!(icon.mime_type, "image/svg+xml");
    }

    #[test]
    fn test_icon_name_with_extension() {
        let temp_dir = TempDir::new().unwrap();
        let pixmaps = temp_dir.path().join("pixmaps");
        touch(&pixmaps.join("foo.png"));
        touch(&pixmaps.join("org.gnome.gedit.svg"));

        let resolver = ThemeIconResolver::new(vec![temp_dir.path().to_path_buf()]);
        assert_eq!(resolver.find("foo.png").unwrap().path, pixmaps.join("foo.png"));
        assert_eq!(resolver.find("foo.PNG").unwrap().path, pixmaps.join("foo.png"));
        assert_eq!(
            resolver.find("org.gnome.gedit").unwrap().path,
            pixmaps.join("org.gnome.gedit.svg")
        );
        assert!(resolver.find("org.gnome").is_err());
    }

    #[test]
    fn test_icon_stem() {
        assert_eq!(icon_stem("foo.png"), "foo");
        assert_eq!(icon_stem("foo.xpm"), "foo");
        assert_eq!(icon_stem("org.gnome.gedit"), "org.gnome.gedit");
        assert_eq!(icon_stem("gimp"), "gimp");
    }

    #[test]
    fn test_absolute_icon_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pixmaps/tool.png");
        touch(&path);

        let resolver = ThemeIconResolver::new(vec![]);
        let icon = resolver.find(path.to_str().unwrap()).unwrap();
        assert_eq!(icon.path, path);
        assert_eq!(icon.mime_type, "image/png");
    }

    #[test]
    fn test_missing_icon() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = ThemeIconResolver::new(vec![temp_dir.path().to_path_buf()]);

        let err = resolver.find("nothing").unwrap_err();
        assert!(matches!(err, LauncherError::IconNotFound { .. }));
    }

    #[test]
    fn test_size_from_path() {
        assert_eq!(size_from_path(Path::new("/i/64x64/apps/a.png")), Some(64));
        assert_eq!(size_from_path(Path::new("/i/32x32@2/apps/a.png")), Some(32));
        assert_eq!(size_from_path(Path::new("/usr/share/pixmaps/a.png")), None);
    }
}
