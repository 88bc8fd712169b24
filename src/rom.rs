use crate::error::LoadError;
use log::{debug, info};
use std::fs;
use std::io::{self, Read};
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// A program image, exactly as read from its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomImage {
    bytes: Box<[u8]>,
}

impl RomImage {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        RomImage {
            bytes: bytes.into(),
        }
    }

    /// read unknown len of data to the end
    pub fn read_from(reader: &mut impl io::Read) -> Result<Self, io::Error> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(RomImage::new(buf))
    }

    pub fn into_bytes(self) -> Box<[u8]> {
        self.bytes
    }
}

impl Deref for RomImage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

/// read a user-selected ROM file fully into memory
pub fn read_file(path: Option<&Path>) -> Result<RomImage, LoadError> {
    let path = path.ok_or(LoadError::NoFileSelected)?;
    let rom = fs::File::open(path)
        .and_then(|mut f| RomImage::read_from(&mut f))
        .map_err(|source| LoadError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    info!("read {} bytes from {}", rom.len(), path.display());
    Ok(rom)
}

/// A named collection of ROMs that can be fetched one at a time.
pub trait Catalog: Send + Sync {
    /// fetch one ROM by name, fully into memory
    fn fetch(&self, name: &str) -> Result<RomImage, LoadError>;

    /// names to offer in the picker
    fn entries(&self) -> Vec<String>;
}

/// Catalog names are plain file names. Anything that would reach outside
/// the catalog, or change a URL's meaning, names nothing in it.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '?', '#', '%'])
}

fn not_in_catalog(name: &str) -> LoadError {
    LoadError::FetchHttp {
        name: name.to_string(),
        status: 404,
    }
}

/// default catalog location, as served alongside the host page
pub const DEFAULT_CATALOG_URL: &str = "http://localhost:8080/c8games/";

/// Catalog served over HTTP as `<base>/<name>`.
pub struct HttpCatalog {
    base: String,
    names: Vec<String>,
    agent: ureq::Agent,
}

impl HttpCatalog {
    pub fn new(base: &str, names: Vec<String>) -> Self {
        HttpCatalog {
            base: base.trim_end_matches('/').to_string(),
            names,
            agent: ureq::Agent::new(),
        }
    }

    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base, name)
    }
}

impl Catalog for HttpCatalog {
    fn fetch(&self, name: &str) -> Result<RomImage, LoadError> {
        if !is_plain_name(name) {
            return Err(not_in_catalog(name));
        }
        let url = self.url_for(name);
        debug!("GET {}", url);
        let response = self.agent.get(&url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => LoadError::FetchHttp {
                name: name.to_string(),
                status,
            },
            ureq::Error::Transport(t) => LoadError::FetchTransport {
                name: name.to_string(),
                reason: t.to_string(),
            },
        })?;
        let rom = RomImage::read_from(&mut response.into_reader()).map_err(|e| {
            LoadError::FetchTransport {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;
        info!("fetched {} bytes for {}", rom.len(), name);
        Ok(rom)
    }

    fn entries(&self) -> Vec<String> {
        self.names.clone()
    }
}

/// Catalog kept in a local directory, one file per ROM.
pub struct DirCatalog {
    root: PathBuf,
}

impl DirCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirCatalog { root: root.into() }
    }
}

impl Catalog for DirCatalog {
    fn fetch(&self, name: &str) -> Result<RomImage, LoadError> {
        if !is_plain_name(name) {
            return Err(not_in_catalog(name));
        }
        let path = self.root.join(name);
        let result = fs::File::open(&path).and_then(|mut f| {
            let mut buf = Vec::new();
            f.read_to_end(&mut buf)?;
            Ok(buf)
        });
        match result {
            Ok(buf) => {
                info!("fetched {} bytes for {} from {}", buf.len(), name, path.display());
                Ok(RomImage::new(buf))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_in_catalog(name)),
            Err(e) => Err(LoadError::FetchTransport {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(&self.root) {
            Ok(dir) => dir
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect(),
            Err(e) => {
                debug!("can't list {}: {}", self.root.display(), e);
                Vec::new()
            }
        };
        names.sort();
        names
    }
}
