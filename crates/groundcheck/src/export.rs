//! Tabular export of verified records for the admin dashboard.

use std::io::Write;

use serde::Serialize;

use crate::verification::VerificationRecord;

/// `DD/MM/YYYY HH:MM:SS`, civil time as stored.
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// One exported spreadsheet row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "IDSBR")]
    pub idsbr: String,
    #[serde(rename = "Business Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
    #[serde(rename = "Officer Name")]
    pub officer_name: String,
    #[serde(rename = "Officer Email")]
    pub officer_email: String,
    #[serde(rename = "Verified At")]
    pub verified_at: String,
}

impl From<&VerificationRecord> for ExportRow {
    fn from(record: &VerificationRecord) -> Self {
        let (officer_name, officer_email) = record
            .owner
            .as_ref()
            .map(|owner| (owner.name.clone(), owner.email.clone()))
            .unwrap_or_default();

        Self {
            idsbr: record.idsbr.to_string(),
            name: record.name.clone(),
            address: record.address.clone(),
            status: record
                .status
                .as_ref()
                .map(|status| status.as_str().to_string())
                .unwrap_or_default(),
            latitude: record.coordinate.map(|c| c.latitude),
            longitude: record.coordinate.map(|c| c.longitude),
            officer_name,
            officer_email,
            verified_at: record
                .verified_at
                .map(|at| at.format(EXPORT_TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

/// Write `rows` as CSV with a header line, even when there are no rows.
pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record([
        "IDSBR",
        "Business Name",
        "Address",
        "Status",
        "Latitude",
        "Longitude",
        "Officer Name",
        "Officer Email",
        "Verified At",
    ])?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(rows: &[ExportRow]) -> Result<Vec<u8>, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(rows, &mut buffer)?;
    Ok(buffer)
}
