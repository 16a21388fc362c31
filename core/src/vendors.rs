//! MAC vendor resolution.
//!
//! Two datasets are consulted in order: the IEEE MA-L registry (downloaded and
//! cached on disk) and the database bundled with `mac_oui`. Either may be
//! missing; a repository with neither still answers, just never successfully.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use std::time::SystemTime;

use mac_oui::Oui;
use pnet::util::MacAddr;
use tracing::{debug, info, warn};

use quietmap_common::config::VendorConfig;
use quietmap_common::error::LookupError;
use quietmap_common::network::mac;
use quietmap_common::vendors::VendorRepository;

use crate::report::tmp_path;

const ASSIGNMENT_COLUMN: &str = "Assignment";
const ORGANIZATION_COLUMN: &str = "Organization Name";

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("Built-in vendor database unavailable: {e}");
                None
            }
        })
        .as_ref()
}

/// OUI prefix to organization name, parsed from the IEEE CSV export.
#[derive(Debug, Clone, Default)]
pub struct OuiTable {
    entries: HashMap<[u8; 3], String>,
}

impl OuiTable {
    /// Parses the IEEE `oui.csv` format. Rows with a malformed assignment are
    /// skipped; a file without a single usable row is an error.
    pub fn parse<R: Read>(reader: R) -> Result<Self, LookupError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| LookupError::Parse(e.to_string()))?
            .clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| LookupError::Parse(format!("missing '{name}' column")))
        };
        let assignment_idx = column(ASSIGNMENT_COLUMN)?;
        let organization_idx = column(ORGANIZATION_COLUMN)?;

        let mut entries = HashMap::new();
        for row in rdr.records() {
            let row = row.map_err(|e| LookupError::Parse(e.to_string()))?;
            let (Some(assignment), Some(organization)) =
                (row.get(assignment_idx), row.get(organization_idx))
            else {
                continue;
            };
            let organization = organization.trim();
            if organization.is_empty() {
                continue;
            }
            if let Some(prefix) = parse_assignment(assignment) {
                entries.entry(prefix).or_insert_with(|| organization.to_string());
            }
        }

        if entries.is_empty() {
            return Err(LookupError::Parse("no vendor rows found".to_string()));
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let file = std::fs::File::open(path)?;
        Self::parse(file)
    }

    pub fn get(&self, prefix: &[u8; 3]) -> Option<&str> {
        self.entries.get(prefix).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// "001A2B" -> [0x00, 0x1A, 0x2B]
fn parse_assignment(assignment: &str) -> Option<[u8; 3]> {
    let hex = assignment.trim();
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([byte(0)?, byte(2)?, byte(4)?])
}

pub struct OuiVendorRepo {
    ieee: Option<OuiTable>,
    builtin: Option<&'static Oui>,
}

impl OuiVendorRepo {
    /// No dataset at all. Every lookup fails with `DatasetUnavailable`.
    pub fn empty() -> Self {
        Self {
            ieee: None,
            builtin: None,
        }
    }

    /// Only the database bundled with the binary.
    pub fn builtin() -> Self {
        Self {
            ieee: None,
            builtin: get_oui_db(),
        }
    }

    pub fn with_table(mut self, table: OuiTable) -> Self {
        self.ieee = Some(table);
        self
    }

    /// Built-in database plus the refreshed IEEE dataset when one is available.
    pub async fn prepare(cfg: &VendorConfig) -> Self {
        Self::builtin().load_refreshed(cfg).await
    }

    /// Attaches the cached IEEE dataset, downloading it first when refresh is
    /// enabled and the cache is missing or stale. Never fails; problems are
    /// logged and the repository keeps whatever it already had.
    pub async fn load_refreshed(mut self, cfg: &VendorConfig) -> Self {
        if cfg.refresh && !is_fresh(&cfg.cache_path, cfg) {
            match download(cfg).await {
                Ok(count) => info!("Vendor dataset refreshed ({count} prefixes)"),
                Err(e) => warn!("Vendor dataset refresh failed, continuing without it: {e}"),
            }
        }

        if !cfg.cache_path.exists() {
            return self;
        }
        match OuiTable::load(&cfg.cache_path) {
            Ok(table) => {
                debug!(
                    "Loaded {} vendor prefixes from {}",
                    table.len(),
                    cfg.cache_path.display()
                );
                self.ieee = Some(table);
            }
            Err(e) => warn!("Ignoring vendor cache {}: {e}", cfg.cache_path.display()),
        }
        self
    }

    pub fn has_dataset(&self) -> bool {
        self.ieee.is_some() || self.builtin.is_some()
    }
}

impl VendorRepository for OuiVendorRepo {
    fn get_vendor(&self, mac_addr: MacAddr) -> Result<String, LookupError> {
        if !self.has_dataset() {
            return Err(LookupError::DatasetUnavailable);
        }

        let not_found = || LookupError::NotFound {
            mac: mac::to_canonical(mac_addr),
        };
        if mac::is_locally_administered(mac_addr) {
            return Err(not_found());
        }

        if let Some(name) = self
            .ieee
            .as_ref()
            .and_then(|table| table.get(&mac::oui_prefix(mac_addr)))
        {
            return Ok(name.to_string());
        }

        if let Some(db) = self.builtin {
            let entry = db
                .lookup_by_mac(&mac::to_canonical(mac_addr))
                .map_err(|e| LookupError::Parse(e.to_string()))?;
            if let Some(entry) = entry {
                return Ok(entry.company_name.clone());
            }
        }

        Err(not_found())
    }
}

fn is_fresh(path: &Path, cfg: &VendorConfig) -> bool {
    let Ok(modified) = std::fs::metadata(path).and_then(|meta| meta.modified()) else {
        return false;
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age < cfg.max_age)
        .unwrap_or(true)
}

/// Fetches the registry, validates it, and swaps it into the cache path.
async fn download(cfg: &VendorConfig) -> Result<usize, LookupError> {
    debug!("Downloading vendor dataset from {}", cfg.source_url);
    let refresh_err = |e: reqwest::Error| LookupError::Refresh(e.to_string());

    let client = reqwest::Client::builder()
        .timeout(cfg.fetch_timeout)
        .user_agent(concat!("quietmap/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(refresh_err)?;
    let body = client
        .get(&cfg.source_url)
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(refresh_err)?
        .bytes()
        .await
        .map_err(refresh_err)?;

    let table = OuiTable::parse(body.as_ref())?;

    let tmp = tmp_path(&cfg.cache_path);
    tokio::fs::write(&tmp, &body).await?;
    if let Err(e) = tokio::fs::rename(&tmp, &cfg.cache_path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(table.len())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
