//! On-disk resource bundles.
//!
//! A bundle is either a directory or a `.tar.gz` archive with this layout:
//!
//! ```text
//! resources.json          symbolic resource table
//! assets/<folder>/...     images addressed by folder and file name
//! assets/Typeface/...     font files
//! res/...                 images referenced from resources.json
//! ```

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use serde::Deserialize;
use tar::Archive;

use super::{Category, Color, PackageError, PackageOpener, RawDrawable, ResourceId, ResourcePackage};

const MANIFEST_FILE: &str = "resources.json";
const ASSET_ROOT: &str = "assets";

#[derive(Debug, Deserialize)]
struct Manifest {
    package: String,
    #[serde(default)]
    resources: HashMap<String, NamespaceTable>,
}

#[derive(Debug, Default, Deserialize)]
struct NamespaceTable {
    #[serde(default)]
    color: HashMap<String, String>,
    #[serde(default)]
    drawable: HashMap<String, String>,
}

#[derive(Debug, Clone)]
enum Entry {
    Color(Color),
    DrawableColor(Color),
    DrawableFile(String),
}

#[derive(Debug)]
enum Storage {
    Directory(PathBuf),
    Archive(HashMap<String, Vec<u8>>),
}

impl Storage {
    fn read(&self, relative_path: &str) -> io::Result<Vec<u8>> {
        let relative_path = relative_path.trim_start_matches('/');
        if relative_path.split('/').any(|part| part == "..") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path escapes bundle: {}", relative_path),
            ));
        }

        match self {
            Self::Directory(root) => std::fs::read(root.join(relative_path)),
            Self::Archive(files) => files.get(relative_path).cloned().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not in archive", relative_path),
                )
            }),
        }
    }
}

/// A resource bundle opened from a directory or an archive.
#[derive(Debug)]
pub struct Bundle {
    origin: PathBuf,
    namespace: String,
    storage: Storage,
    entries: Vec<Entry>,
    index: HashMap<(Category, String, String), ResourceId>,
}

impl Bundle {
    /// Open a bundle from a directory or a `.tar.gz` file.
    pub fn open(path: &Path) -> Result<Self, PackageError> {
        let storage = if path.is_dir() {
            Storage::Directory(path.to_path_buf())
        } else if path.is_file() {
            let content = std::fs::read(path)?;
            Storage::Archive(read_archive(&content)?)
        } else {
            return Err(PackageError::Unavailable(path.to_path_buf()));
        };

        let manifest_bytes = storage.read(MANIFEST_FILE).map_err(|e| PackageError::Malformed {
            path: path.to_path_buf(),
            reason: format!("missing {}: {}", MANIFEST_FILE, e),
        })?;
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)?;

        let mut bundle = Self {
            origin: path.to_path_buf(),
            namespace: manifest.package,
            storage,
            entries: Vec::new(),
            index: HashMap::new(),
        };

        for (namespace, table) in manifest.resources {
            for (name, literal) in table.color {
                match literal.parse::<Color>() {
                    Ok(color) => bundle.insert(Category::Color, &namespace, name, Entry::Color(color)),
                    Err(e) => log::warn!("Skipping color '{}' in {:?}: {}", name, path, e),
                }
            }
            for (name, value) in table.drawable {
                let entry = if value.starts_with('#') {
                    match value.parse::<Color>() {
                        Ok(color) => Entry::DrawableColor(color),
                        Err(e) => {
                            log::warn!("Skipping drawable '{}' in {:?}: {}", name, path, e);
                            continue;
                        }
                    }
                } else {
                    Entry::DrawableFile(value)
                };
                bundle.insert(Category::Drawable, &namespace, name, entry);
            }
        }

        log::debug!(
            "Opened bundle {:?} ({} resources, namespace {})",
            bundle.origin,
            bundle.entries.len(),
            bundle.namespace
        );
        Ok(bundle)
    }

    fn insert(&mut self, category: Category, namespace: &str, name: String, entry: Entry) {
        let id = ResourceId(self.entries.len() as u32);
        self.entries.push(entry);
        self.index.insert((category, namespace.to_string(), name), id);
    }

    fn entry(&self, id: ResourceId) -> Option<&Entry> {
        self.entries.get(id.0 as usize)
    }
}

impl ResourcePackage for Bundle {
    fn origin(&self) -> &Path {
        &self.origin
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn open_asset(&self, relative_path: &str) -> io::Result<Vec<u8>> {
        self.storage
            .read(&format!("{}/{}", ASSET_ROOT, relative_path.trim_start_matches('/')))
    }

    fn identifier(&self, category: Category, name: &str, namespace: &str) -> Option<ResourceId> {
        self.index
            .get(&(category, namespace.to_string(), name.to_string()))
            .copied()
    }

    fn color(&self, id: ResourceId) -> Option<Color> {
        match self.entry(id)? {
            Entry::Color(color) => Some(*color),
            _ => None,
        }
    }

    fn drawable(&self, id: ResourceId) -> Option<RawDrawable> {
        match self.entry(id)? {
            Entry::DrawableColor(color) => Some(RawDrawable::Color(*color)),
            Entry::DrawableFile(file) => match self.storage.read(file) {
                Ok(bytes) => Some(RawDrawable::Encoded(bytes)),
                Err(e) => {
                    log::debug!("Drawable file {} unreadable in {:?}: {}", file, self.origin, e);
                    None
                }
            },
            Entry::Color(_) => None,
        }
    }
}

/// Read every regular file of a `.tar.gz` archive into memory.
fn read_archive(content: &[u8]) -> Result<HashMap<String, Vec<u8>>, PackageError> {
    let decoder = GzDecoder::new(content);
    let mut archive = Archive::new(decoder);
    let mut files = HashMap::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?.to_string_lossy().to_string();
        if path.starts_with('/') || path.contains("..") {
            return Err(PackageError::UnsafeEntry(path));
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        files.insert(path.trim_start_matches("./").to_string(), data);
    }

    Ok(files)
}

/// Opens [`Bundle`]s from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundleOpener;

impl PackageOpener for BundleOpener {
    fn open(&self, path: &Path) -> Result<Arc<dyn ResourcePackage>, PackageError> {
        Ok(Arc::new(Bundle::open(path)?))
    }
}
