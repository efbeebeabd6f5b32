//! CSV and Excel exports of the bibliometric table.

use crate::bibliometrics::{Record, RECORD_COLUMNS};
use crate::error::{BiblioError, Result};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tracing::info;

/// Download file stem used by the dashboard and the CLI
pub const EXPORT_FILE_STEM: &str = "bibliometria_scopus";

/// Worksheet name inside the XLSX export
pub const SHEET_NAME: &str = "bibliometria";

pub const CSV_CONTENT_TYPE: &str = "text/csv";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Records as UTF-8 CSV with a header row
pub fn to_csv_bytes(records: &[Record]) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    // Written explicitly so an empty table still carries its header
    wtr.write_record(RECORD_COLUMNS)?;
    for record in records {
        wtr.serialize(record)?;
    }

    wtr.into_inner().map_err(|e| BiblioError::Io(e.into_error()))
}

/// Records as a single-sheet XLSX workbook
pub fn to_xlsx_bytes(records: &[Record]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, name) in RECORD_COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        worksheet.write_string(row, 0, &record.titulo)?;
        worksheet.write_string(row, 1, &record.autor)?;
        worksheet.write_string(row, 2, &record.data)?;
        worksheet.write_string(row, 3, &record.periodico)?;
        worksheet.write_string(row, 4, &record.tipo)?;
        worksheet.write_number(row, 5, record.citacoes as f64)?;
        worksheet.write_string(row, 6, &record.doi)?;
        worksheet.write_string(row, 7, &record.url_scopus)?;
        if let Some(year) = record.ano {
            worksheet.write_number(row, 8, year as f64)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Write both exports into `dir`, returning their paths
pub fn save_exports(dir: &Path, records: &[Record]) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;

    let csv_path = dir.join(format!("{}.csv", EXPORT_FILE_STEM));
    std::fs::write(&csv_path, to_csv_bytes(records)?)?;

    let xlsx_path = dir.join(format!("{}.xlsx", EXPORT_FILE_STEM));
    std::fs::write(&xlsx_path, to_xlsx_bytes(records)?)?;

    info!(
        records = records.len(),
        csv = %csv_path.display(),
        xlsx = %xlsx_path.display(),
        "Saved exports"
    );
    Ok((csv_path, xlsx_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn records() -> Vec<Record> {
        vec![
            Record {
                titulo: "Bibliotecas, dados e IA".to_string(),
                autor: "Silva J.".to_string(),
                data: "2022-03-01".to_string(),
                citacoes: 3,
                ano: Some(2022),
                ..Default::default()
            },
            Record {
                titulo: "Sem data".to_string(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let bytes = to_csv_bytes(&records()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "titulo,autor,data,periodico,tipo,citacoes,doi,url_scopus,ano");
        assert_eq!(lines[1], "\"Bibliotecas, dados e IA\",Silva J.,2022-03-01,,,3,,,2022");
        assert_eq!(lines[2], "Sem data,,,,,0,,,");
    }

    #[test]
    fn test_csv_empty_table_keeps_header() {
        let text = String::from_utf8(to_csv_bytes(&[]).unwrap()).unwrap();
        assert_eq!(text.trim_end(), RECORD_COLUMNS.join(","));
    }

    #[test]
    fn test_xlsx_is_zip() {
        let bytes = to_xlsx_bytes(&records()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_save_exports() -> Result<()> {
        let dir = TempDir::new()?;
        let (csv_path, xlsx_path) = save_exports(dir.path(), &records())?;
        assert!(csv_path.ends_with("bibliometria_scopus.csv"));
        assert!(std::fs::metadata(&csv_path)?.len() > 0);
        assert!(std::fs::metadata(&xlsx_path)?.len() > 0);
        Ok(())
    }
}
