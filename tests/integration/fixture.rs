use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use skin_manager::{
    BundleOpener, DefaultPaths, PackageError, PackageOpener, ResolverConfig, ResourcePackage,
    TargetId, ThemeResolver, ThemeSink, ThemeUpdate,
};

pub(crate) const NS: &str = "com.github.skin";

pub(crate) fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("Failed to encode png");
    out.into_inner()
}

/// Smallest parseable TrueType font: `head`, `hhea` and `maxp`.
pub(crate) fn font_bytes() -> Vec<u8> {
    let mut head = vec![0u8; 54];
    head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
    head[18..20].copy_from_slice(&1000u16.to_be_bytes());
    let mut hhea = vec![0u8; 36];
    hhea[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    hhea[34..36].copy_from_slice(&1u16.to_be_bytes());
    let mut maxp = vec![0u8; 6];
    maxp[0..4].copy_from_slice(&0x0000_5000u32.to_be_bytes());
    maxp[4..6].copy_from_slice(&1u16.to_be_bytes());

    let tables: [(&[u8; 4], Vec<u8>); 3] = [(b"head", head), (b"hhea", hhea), (b"maxp", maxp)];
    let directory_len = 12 + 16 * tables.len();

    let mut out = vec![0x00, 0x01, 0x00, 0x00];
    out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0u8; 6]);
    let mut body = Vec::new();
    for (tag, data) in &tables {
        let offset = (directory_len + body.len()) as u32;
        out.extend_from_slice(*tag);
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&offset.to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
    }
    out.extend(body);
    out
}

/// Writes a directory bundle.
pub(crate) struct BundleWriter {
    root: PathBuf,
    colors: HashMap<String, HashMap<String, String>>,
    drawables: HashMap<String, HashMap<String, String>>,
}

impl BundleWriter {
    pub(crate) fn new(root: &Path) -> Self {
        std::fs::create_dir_all(root.join("assets")).expect("Failed to create bundle dir");
        Self {
            root: root.to_path_buf(),
            colors: HashMap::new(),
            drawables: HashMap::new(),
        }
    }

    pub(crate) fn color(mut self, namespace: &str, name: &str, literal: &str) -> Self {
        self.colors
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), literal.to_string());
        self
    }

    pub(crate) fn drawable(mut self, namespace: &str, name: &str, value: &str) -> Self {
        self.drawables
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Write `bytes` to `relative` under the bundle root.
    pub(crate) fn file(self, relative: &str, bytes: &[u8]) -> Self {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create asset dir");
        }
        std::fs::write(path, bytes).expect("Failed to write asset");
        self
    }

    pub(crate) fn asset(self, relative: &str, bytes: &[u8]) -> Self {
        self.file(&format!("assets/{}", relative), bytes)
    }

    pub(crate) fn write(self) -> String {
        let mut resources = serde_json::Map::new();
        let namespaces: Vec<&String> = self.colors.keys().chain(self.drawables.keys()).collect();
        for namespace in namespaces {
            resources.insert(
                namespace.clone(),
                json!({
                    "color": self.colors.get(namespace).cloned().unwrap_or_default(),
                    "drawable": self.drawables.get(namespace).cloned().unwrap_or_default(),
                }),
            );
        }
        let manifest = json!({ "package": NS, "resources": resources });
        std::fs::write(
            self.root.join("resources.json"),
            serde_json::to_vec_pretty(&manifest).expect("Failed to encode manifest"),
        )
        .expect("Failed to write manifest");
        self.root.display().to_string()
    }
}

/// Records every applied update.
#[derive(Default)]
pub(crate) struct RecordingSink {
    updates: Mutex<Vec<(TargetId, ThemeUpdate)>>,
}

impl RecordingSink {
    pub(crate) fn updates(&self) -> Vec<(TargetId, ThemeUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    pub(crate) fn for_target(&self, target: TargetId) -> Vec<ThemeUpdate> {
        self.updates()
            .into_iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, update)| update)
            .collect()
    }

    /// Wait until at least `count` updates have been applied.
    pub(crate) async fn wait_for(&self, count: usize) {
        for _ in 0..200 {
            if self.updates.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "Timed out waiting for {} updates, got {}",
            count,
            self.updates.lock().unwrap().len()
        );
    }
}

impl ThemeSink for RecordingSink {
    fn apply(&self, target: TargetId, update: ThemeUpdate) {
        self.updates.lock().unwrap().push((target, update));
    }
}

/// Counts opens per path, optionally slowing or breaking them.
pub(crate) struct CountingOpener {
    inner: BundleOpener,
    opens: Mutex<HashMap<PathBuf, usize>>,
    delay: Duration,
    panic_on: Option<String>,
}

impl CountingOpener {
    pub(crate) fn new() -> Self {
        Self {
            inner: BundleOpener,
            opens: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            panic_on: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panic while opening any path containing `fragment`.
    pub(crate) fn panicking_on(mut self, fragment: &str) -> Self {
        self.panic_on = Some(fragment.to_string());
        self
    }

    pub(crate) fn opens(&self, path: &str) -> usize {
        self.opens
            .lock()
            .unwrap()
            .get(Path::new(path))
            .copied()
            .unwrap_or(0)
    }
}

impl PackageOpener for CountingOpener {
    fn exists(&self, path: &Path) -> bool {
        match &self.panic_on {
            Some(fragment) if path.to_string_lossy().contains(fragment.as_str()) => true,
            _ => path.exists(),
        }
    }

    fn open(&self, path: &Path) -> Result<Arc<dyn ResourcePackage>, PackageError> {
        *self
            .opens
            .lock()
            .unwrap()
            .entry(path.to_path_buf())
            .or_default() += 1;
        if let Some(fragment) = &self.panic_on {
            if path.to_string_lossy().contains(fragment.as_str()) {
                panic!("broken package {}", path.display());
            }
        }
        std::thread::sleep(self.delay);
        self.inner.open(path)
    }
}

pub(crate) struct Harness {
    pub(crate) resolver: Arc<ThemeResolver>,
    pub(crate) sink: Arc<RecordingSink>,
    pub(crate) opener: Arc<CountingOpener>,
}

pub(crate) fn config(default_path: &str) -> ResolverConfig {
    ResolverConfig {
        default_paths: DefaultPaths {
            base: default_path.to_string(),
            ..Default::default()
        },
        compatible_namespaces: vec!["com.github.legacy".to_string()],
        diagnostic: false,
        ..Default::default()
    }
}

pub(crate) fn harness(default_path: &str, opener: CountingOpener) -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let opener = Arc::new(opener);
    let resolver = ThemeResolver::new(config(default_path), opener.clone(), sink.clone())
        .expect("Failed to create resolver");
    Harness {
        resolver,
        sink,
        opener,
    }
}
