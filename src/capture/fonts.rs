use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::CaptureError;

/// Families the card design pulls from a remote stylesheet.
pub const REMOTE_FAMILIES: [&str; 2] = ["Montserrat", "Playfair Display"];

/// Fonts visible to the rasterizer, plus the families it must never try to resolve.
#[derive(Clone)]
pub struct FontEnvironment {
    db: Arc<usvg::fontdb::Database>,
    remote_families: BTreeSet<String>,
}

impl FontEnvironment {
    /// System fonts plus every font file found in `extra_dirs` (and their `fonts/` subdirectory).
    pub fn system(extra_dirs: &[PathBuf]) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        for dir in extra_dirs {
            load_fonts_from_dir(&mut db, dir);
            load_fonts_from_dir(&mut db, &dir.join("fonts"));
        }
        tracing::debug!(faces = db.len(), dirs = extra_dirs.len(), "font database built");
        Self::from_db(db)
    }

    /// Environment without any faces. Text renders nothing but the remote-font rules still apply.
    pub fn empty() -> Self {
        Self::from_db(usvg::fontdb::Database::new())
    }

    fn from_db(db: usvg::fontdb::Database) -> Self {
        Self {
            db: Arc::new(db),
            remote_families: REMOTE_FAMILIES.iter().map(|f| f.to_ascii_lowercase()).collect(),
        }
    }

    /// Replace the remote family list.
    pub fn with_remote_families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.remote_families = families
            .into_iter()
            .map(|f| f.as_ref().trim().to_ascii_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        self
    }

    pub fn db(&self) -> Arc<usvg::fontdb::Database> {
        Arc::clone(&self.db)
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    pub fn is_remote(&self, family: &str) -> bool {
        self.remote_families.contains(&family.trim().to_ascii_lowercase())
    }

    /// Fail on the first referenced family that would require reading remote font rules.
    pub fn check_local<'a>(
        &self,
        families: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), CaptureError> {
        match families.into_iter().find(|f| self.is_remote(f)) {
            Some(family) => Err(CaptureError::RemoteFont {
                family: family.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FontEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontEnvironment")
            .field("faces", &self.db.len())
            .field("remote_families", &self.remote_families)
            .finish()
    }
}

/// Add every `.ttf`/`.otf`/`.ttc` file directly inside `dir`. Returns the number of faces added.
fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    let before = db.len();

    let font_files = entries.flatten().map(|e| e.path()).filter(|p| {
        p.is_file()
            && p.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"))
    });
    for path in font_files {
        if let Err(e) = db.load_font_file(&path) {
            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable font file");
        }
    }

    let added = db.len() - before;
    if added > 0 {
        tracing::debug!(dir = %dir.display(), faces = added, "loaded card fonts");
    }
    added
}

/// Query order for a text run: requested families minus remote ones, then the generic sans and
/// serif fallbacks.
pub(crate) fn query_families<'a>(
    requested: &'a [usvg::FontFamily],
    remote: &BTreeSet<String>,
) -> Vec<usvg::fontdb::Family<'a>> {
    use usvg::fontdb::Family;

    let mut out: Vec<Family<'a>> = requested
        .iter()
        .filter_map(|family| match family {
            usvg::FontFamily::Named(name) if remote.contains(&name.trim().to_ascii_lowercase()) => {
                tracing::debug!(family = %name, "not resolving remote font family");
                None
            }
            usvg::FontFamily::Named(name) => Some(Family::Name(name.as_str())),
            usvg::FontFamily::Serif => Some(Family::Serif),
            usvg::FontFamily::SansSerif => Some(Family::SansSerif),
            usvg::FontFamily::Cursive => Some(Family::Cursive),
            usvg::FontFamily::Fantasy => Some(Family::Fantasy),
            usvg::FontFamily::Monospace => Some(Family::Monospace),
        })
        .collect();
    out.push(Family::SansSerif);
    out.push(Family::Serif);
    out
}

impl FontEnvironment {
    /// Face selection for card text. Remote families are never matched, so a run that names one
    /// falls through to local faces; any face at all is the last resort.
    pub(crate) fn resolver(&self) -> usvg::FontResolver<'static> {
        let remote = self.remote_families.clone();
        usvg::FontResolver {
            select_font: Box::new(move |font, fontdb| {
                let families = query_families(font.families(), &remote);
                let style = match font.style() {
                    usvg::FontStyle::Normal => usvg::fontdb::Style::Normal,
                    usvg::FontStyle::Italic => usvg::fontdb::Style::Italic,
                    usvg::FontStyle::Oblique => usvg::fontdb::Style::Oblique,
                };
                let query = usvg::fontdb::Query {
                    families: &families,
                    weight: usvg::fontdb::Weight(font.weight()),
                    stretch: usvg::fontdb::Stretch::Normal,
                    style,
                };
                fontdb
                    .query(&query)
                    .or_else(|| fontdb.faces().next().map(|f| f.id))
            }),
            select_fallback: usvg::FontResolver::default_fallback_selector(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/fonts.rs"]
mod tests;
