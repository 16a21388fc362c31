//! Inventory report output.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use csv::Writer;
use tracing::debug;

use quietmap_common::error::SinkError;
use quietmap_common::network::host::HostRecord;

pub const CSV_HEADER: [&str; 4] = ["IP", "MAC", "Vendor", "Open Ports"];

/// Destination for the finished inventory.
pub trait ReportSink: Send {
    /// Persists every record, in order, and returns how many were written.
    fn write(&mut self, records: &[HostRecord]) -> Result<usize, SinkError>;
}

/// Writes `IP,MAC,Vendor,Open Ports` rows to a CSV file.
///
/// Rows go to `<path>.tmp` first, which is renamed over `path` once complete.
#[derive(Debug, Clone)]
pub struct CsvReportSink {
    path: PathBuf,
}

impl CsvReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_rows(&self, tmp: &Path, records: &[HostRecord]) -> Result<(), SinkError> {
        let file = File::create(tmp).map_err(|source| self.io_error(source))?;
        let mut wtr = Writer::from_writer(BufWriter::new(file));

        wtr.write_record(CSV_HEADER).map_err(|e| self.csv_error(e))?;
        for record in records {
            wtr.write_record([
                record.ip.to_string(),
                record.mac_string(),
                record.vendor.clone(),
                record.open_ports_string(),
            ])
            .map_err(|e| self.csv_error(e))?;
        }

        wtr.flush().map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, e: csv::Error) -> SinkError {
        match e.into_kind() {
            csv::ErrorKind::Io(source) => self.io_error(source),
            other => SinkError::Encode {
                path: self.path.clone(),
                message: format!("{other:?}"),
            },
        }
    }
}

impl ReportSink for CsvReportSink {
    fn write(&mut self, records: &[HostRecord]) -> Result<usize, SinkError> {
        let tmp = tmp_path(&self.path);

        if let Err(e) = self.write_rows(&tmp, records) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            self.io_error(source)
        })?;

        debug!("Wrote {} row(s) to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}

/// `<path>.tmp`, next to `path`.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
