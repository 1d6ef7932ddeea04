//! Sequential export of rendered cards to image files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use resvg::usvg;
use serde::{Deserialize, Serialize};
use tiny_skia::{Pixmap, Transform};

use crate::error::{Error, Result};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);
pub const DEFAULT_PIXEL_RATIO: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub out_dir: PathBuf,
    pub prefix: String,
    pub format: ImageFormat,
    /// Raster scale for PNG, and raster effects resolution for PDF.
    pub pixel_ratio: f32,
    /// Reload fonts before every page instead of reusing the loaded set.
    pub cache_bust: bool,
    /// Pause between consecutive pages.
    pub delay: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            prefix: "card".to_string(),
            format: ImageFormat::Png,
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            cache_bust: true,
            delay: DEFAULT_DELAY,
        }
    }
}

/// Turns one card's SVG into file bytes.
///
/// Implementations may keep shared state between pages (font databases),
/// so an [`Exporter`] never calls them concurrently.
pub trait Backend {
    /// Called once before the first page; failure aborts the export.
    fn prepare(&mut self, _opts: &ExportOptions) -> Result<()> {
        Ok(())
    }

    fn encode(&mut self, svg: &str, opts: &ExportOptions) -> std::result::Result<Vec<u8>, String>;
}

/// File name for page `index` (zero-based) out of `count`.
pub fn file_name(prefix: &str, index: usize, count: usize, timestamp_ms: u128, ext: &str) -> String {
    if count > 1 {
        format!("{}-{}.{}", prefix, index + 1, ext)
    } else {
        format!("{}-{}.{}", prefix, timestamp_ms, ext)
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Writes pages one at a time. Holding the backend lock is what "exporting"
/// means; a second call while one runs is rejected.
pub struct Exporter<B> {
    backend: Mutex<B>,
}

impl<B: Backend> Exporter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.backend.is_locked()
    }

    /// Encode and write every page in order, returning the written paths.
    ///
    /// The first failing page aborts the rest; files already written stay.
    pub fn export(&self, pages: &[String], opts: &ExportOptions) -> Result<Vec<PathBuf>> {
        let mut backend = self.backend.try_lock().ok_or(Error::ExportInProgress)?;
        if pages.is_empty() {
            return Err(Error::NothingToExport);
        }
        backend.prepare(opts)?;

        std::fs::create_dir_all(&opts.out_dir).map_err(|source| Error::Write {
            path: opts.out_dir.clone(),
            source,
        })?;

        let timestamp = unix_millis();
        let count = pages.len();
        let mut written = Vec::with_capacity(count);

        for (index, svg) in pages.iter().enumerate() {
            if index > 0 && !opts.delay.is_zero() {
                std::thread::sleep(opts.delay);
            }

            let bytes = backend.encode(svg, opts).map_err(|reason| {
                log::warn!("page {} of {} failed to encode: {}", index + 1, count, reason);
                Error::ExportFailed {
                    page: index + 1,
                    reason,
                }
            })?;

            let path = opts.out_dir.join(file_name(
                &opts.prefix,
                index,
                count,
                timestamp,
                opts.format.extension(),
            ));
            std::fs::write(&path, bytes).map_err(|source| Error::Write {
                path: path.clone(),
                source,
            })?;
            log::info!("saved {}", path.display());
            written.push(path);
        }

        Ok(written)
    }
}

/// Encodes with `resvg`/`tiny-skia` (PNG) and `svg2pdf` (PDF); SVG is
/// passed through.
#[derive(Default)]
pub struct ResvgBackend {
    png_fonts: Option<Arc<usvg::fontdb::Database>>,
    pdf_fonts: Option<Arc<svg2pdf::usvg::fontdb::Database>>,
}

impl ResvgBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn png_fonts(&mut self, reload: bool) -> Arc<usvg::fontdb::Database> {
        if reload {
            self.png_fonts = None;
        }
        self.png_fonts
            .get_or_insert_with(|| {
                let mut db = usvg::fontdb::Database::new();
                db.load_system_fonts();
                load_local_fonts(|dir| db.load_fonts_dir(dir));
                let families = FallbackFamilies::pick(
                    db.faces().flat_map(|face| face.families.iter().map(|(f, _)| f.as_str())),
                );
                if let Some(f) = &families.sans {
                    db.set_sans_serif_family(f.as_str());
                }
                if let Some(f) = &families.serif {
                    db.set_serif_family(f.as_str());
                }
                if let Some(f) = &families.mono {
                    db.set_monospace_family(f.as_str());
                }
                Arc::new(db)
            })
            .clone()
    }

    fn pdf_fonts(&mut self, reload: bool) -> Arc<svg2pdf::usvg::fontdb::Database> {
        if reload {
            self.pdf_fonts = None;
        }
        self.pdf_fonts
            .get_or_insert_with(|| {
                let mut db = svg2pdf::usvg::fontdb::Database::new();
                db.load_system_fonts();
                load_local_fonts(|dir| db.load_fonts_dir(dir));
                let families = FallbackFamilies::pick(
                    db.faces().flat_map(|face| face.families.iter().map(|(f, _)| f.as_str())),
                );
                if let Some(f) = &families.sans {
                    db.set_sans_serif_family(f.as_str());
                }
                if let Some(f) = &families.serif {
                    db.set_serif_family(f.as_str());
                }
                if let Some(f) = &families.mono {
                    db.set_monospace_family(f.as_str());
                }
                Arc::new(db)
            })
            .clone()
    }

    fn encode_png(&mut self, svg: &str, opts: &ExportOptions) -> std::result::Result<Vec<u8>, String> {
        let scale = opts.pixel_ratio;
        let mut usvg_opts = usvg::Options::default();
        usvg_opts.fontdb = self.png_fonts(opts.cache_bust);

        let tree =
            usvg::Tree::from_str(svg, &usvg_opts).map_err(|e| format!("Failed to parse SVG: {}", e))?;

        let width = (tree.size().width() * scale).ceil() as u32;
        let height = (tree.size().height() * scale).ceil() as u32;
        let mut pixmap = Pixmap::new(width, height).ok_or("Failed to create pixmap")?;
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| format!("Failed to encode PNG: {}", e))
    }

    fn encode_pdf(&mut self, svg: &str, opts: &ExportOptions) -> std::result::Result<Vec<u8>, String> {
        let mut usvg_opts = svg2pdf::usvg::Options::default();
        usvg_opts.fontdb = self.pdf_fonts(opts.cache_bust);

        let tree = svg2pdf::usvg::Tree::from_str(svg, &usvg_opts)
            .map_err(|e| format!("Failed to parse SVG: {}", e))?;

        // Text as paths: no dependency on font embedding in the viewer.
        let mut conversion = svg2pdf::ConversionOptions::default();
        conversion.embed_text = false;
        conversion.raster_scale = opts.pixel_ratio;

        svg2pdf::to_pdf(&tree, conversion, svg2pdf::PageOptions::default())
            .map_err(|e| format!("Failed to convert SVG to PDF: {}", e))
    }
}

impl Backend for ResvgBackend {
    fn prepare(&mut self, opts: &ExportOptions) -> Result<()> {
        if opts.format == ImageFormat::Svg {
            return Ok(());
        }
        if !opts.pixel_ratio.is_finite() || opts.pixel_ratio <= 0.0 {
            return Err(Error::BackendUnavailable(format!(
                "invalid pixel ratio {}",
                opts.pixel_ratio
            )));
        }
        let faces = match opts.format {
            ImageFormat::Pdf => self.pdf_fonts(false).len(),
            _ => self.png_fonts(false).len(),
        };
        if faces == 0 {
            return Err(Error::BackendUnavailable(
                "no fonts found on this system".to_string(),
            ));
        }
        log::debug!("export backend ready with {} font faces", faces);
        Ok(())
    }

    fn encode(&mut self, svg: &str, opts: &ExportOptions) -> std::result::Result<Vec<u8>, String> {
        match opts.format {
            ImageFormat::Svg => Ok(svg.as_bytes().to_vec()),
            ImageFormat::Png => self.encode_png(svg, opts),
            ImageFormat::Pdf => self.encode_pdf(svg, opts),
        }
    }
}

fn load_local_fonts(mut load: impl FnMut(&Path)) {
    let local = Path::new("fonts");
    if local.is_dir() {
        load(local);
    }
}

/// Concrete families to stand in for the generic `sans-serif`, `serif` and
/// `monospace` names the cards use.
#[derive(Debug, Default, PartialEq)]
struct FallbackFamilies {
    sans: Option<String>,
    serif: Option<String>,
    mono: Option<String>,
}

impl FallbackFamilies {
    fn pick<'a>(families: impl IntoIterator<Item = &'a str>) -> Self {
        let mut sans: Option<&str> = None;
        let mut serif: Option<&str> = None;
        let mut mono: Option<&str> = None;
        let mut first: Option<&str> = None;

        for family in families {
            first.get_or_insert(family);
            let lower = family.to_ascii_lowercase();
            if sans.is_none() && lower.contains("sans") {
                sans = Some(family);
            }
            // "Sans Serif" is not a serif.
            if serif.is_none() && lower.contains("serif") && !lower.contains("sans") {
                serif = Some(family);
            }
            if mono.is_none() && (lower.contains("mono") || lower.contains("code")) {
                mono = Some(family);
            }
        }

        Self {
            sans: sans.or(first).map(str::to_string),
            serif: serif.or(first).map(str::to_string),
            mono: mono.or(sans).or(first).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[derive(Default)]
    struct Recording {
        fail_on: Option<usize>,
        calls: usize,
    }

    impl Backend for Recording {
        fn encode(&mut self, svg: &str, _opts: &ExportOptions) -> std::result::Result<Vec<u8>, String> {
            self.calls += 1;
            if self.fail_on == Some(self.calls) {
                return Err("boom".to_string());
            }
            Ok(svg.as_bytes().to_vec())
        }
    }

    fn options(dir: &Path) -> ExportOptions {
        ExportOptions {
            out_dir: dir.to_path_buf(),
            prefix: "card".to_string(),
            format: ImageFormat::Svg,
            delay: Duration::ZERO,
            ..ExportOptions::default()
        }
    }

    fn pages(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("<svg>{i}</svg>")).collect()
    }

    #[test]
    fn names_depend_on_page_count() {
        assert_eq!(file_name("card", 0, 3, 42, "png"), "card-1.png");
        assert_eq!(file_name("card", 2, 3, 42, "png"), "card-3.png");
        assert_eq!(file_name("card", 0, 1, 42, "pdf"), "card-42.pdf");
    }

    #[test]
    fn writes_every_page_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Recording::default());
        let written = exporter.export(&pages(3), &options(dir.path())).unwrap();
        assert_eq!(written.len(), 3);
        for (i, path) in written.iter().enumerate() {
            assert_eq!(path.file_name().unwrap(), format!("card-{}.svg", i + 1).as_str());
            assert_eq!(std::fs::read_to_string(path).unwrap(), format!("<svg>{i}</svg>"));
        }
        assert!(!exporter.is_exporting());
    }

    #[test]
    fn failure_aborts_the_rest_and_keeps_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Recording {
            fail_on: Some(2),
            calls: 0,
        });
        let err = exporter.export(&pages(3), &options(dir.path())).unwrap_err();
        assert!(matches!(err, Error::ExportFailed { page: 2, .. }));
        assert!(dir.path().join("card-1.svg").exists());
        assert!(!dir.path().join("card-2.svg").exists());
        assert!(!dir.path().join("card-3.svg").exists());
        assert!(!exporter.is_exporting());
        assert_eq!(exporter.backend.lock().calls, 2);
    }

    #[test]
    fn empty_page_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Recording::default());
        let err = exporter.export(&[], &options(dir.path())).unwrap_err();
        assert!(matches!(err, Error::NothingToExport));
    }

    #[test]
    fn prepare_failure_writes_nothing() {
        struct Unavailable;
        impl Backend for Unavailable {
            fn prepare(&mut self, _opts: &ExportOptions) -> Result<()> {
                Err(Error::BackendUnavailable("not loaded".to_string()))
            }
            fn encode(&mut self, _svg: &str, _opts: &ExportOptions) -> std::result::Result<Vec<u8>, String> {
                unreachable!()
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let err = Exporter::new(Unavailable).export(&pages(2), &options(&out)).unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
        assert!(!out.exists());
    }

    struct Blocking {
        started: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl Backend for Blocking {
        fn encode(&mut self, svg: &str, _opts: &ExportOptions) -> std::result::Result<Vec<u8>, String> {
            self.started.send(()).map_err(|e| e.to_string())?;
            self.release.recv().map_err(|e| e.to_string())?;
            Ok(svg.as_bytes().to_vec())
        }
    }

    #[test]
    fn concurrent_export_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let exporter = Arc::new(Exporter::new(Blocking {
            started: started_tx,
            release: release_rx,
        }));

        let opts = options(dir.path());
        let worker = {
            let exporter = Arc::clone(&exporter);
            let opts = opts.clone();
            std::thread::spawn(move || exporter.export(&pages(1), &opts))
        };

        started_rx.recv().unwrap();
        assert!(exporter.is_exporting());
        let err = exporter.export(&pages(1), &opts).unwrap_err();
        assert!(matches!(err, Error::ExportInProgress));

        release_tx.send(()).unwrap();
        let written = worker.join().unwrap().unwrap();
        assert_eq!(written.len(), 1);
        assert!(!exporter.is_exporting());
    }

    #[test]
    fn fallbacks_prefer_matching_names() {
        let picked = FallbackFamilies::pick(["Arial", "Noto Sans", "Noto Serif", "Fira Code"]);
        assert_eq!(
            picked,
            FallbackFamilies {
                sans: Some("Noto Sans".to_string()),
                serif: Some("Noto Serif".to_string()),
                mono: Some("Fira Code".to_string()),
            }
        );
    }

    #[test]
    fn fallbacks_use_the_first_family_when_nothing_matches() {
        let picked = FallbackFamilies::pick(["Arial", "Helvetica"]);
        assert_eq!(picked.sans.as_deref(), Some("Arial"));
        assert_eq!(picked.serif.as_deref(), Some("Arial"));
        assert_eq!(picked.mono.as_deref(), Some("Arial"));
        assert_eq!(FallbackFamilies::pick(Vec::<&str>::new()), FallbackFamilies::default());
    }

    #[test]
    fn svg_backend_passes_markup_through() {
        let opts = ExportOptions {
            format: ImageFormat::Svg,
            ..ExportOptions::default()
        };
        let mut backend = ResvgBackend::new();
        backend.prepare(&opts).unwrap();
        assert_eq!(backend.encode("<svg/>", &opts).unwrap(), b"<svg/>");
    }
}
