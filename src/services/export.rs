use crate::core::error::ExportError;
use crate::models::student::Student;
use crate::utils::time::export_stamp;
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "students";
const HEADERS: [&str; 5] = ["id", "username", "cohort", "mat", "created_at"];

/// A rendered workbook ready to send as an attachment
pub struct Export {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// `akathon_students_<YYYYMMDD_HHMMSS>.xlsx`
pub fn export_filename(at: DateTime<Utc>) -> String {
    format!("akathon_students_{}.xlsx", export_stamp(at))
}

/// Render students into a single-sheet workbook, rows in the given order.
/// The password hash is not part of [`Student`] and never reaches the file.
pub fn render_workbook(students: &[Student], at: DateTime<Utc>) -> Result<Export, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (i, student) in students.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_number(row, 0, student.id as f64)?;
        worksheet.write_string(row, 1, &student.username)?;
        worksheet.write_number(row, 2, student.cohort as f64)?;
        // Text, so leading zeros survive
        worksheet.write_string(row, 3, &student.mat)?;
        worksheet.write_string(row, 4, &student.created_at)?;
    }

    let bytes = workbook.save_to_buffer()?;

    Ok(Export {
        filename: export_filename(at),
        bytes,
    })
}
