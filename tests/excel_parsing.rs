#![cfg(feature = "excel_test_writer")]

use financehub_engine::ingestion::excel::parse_spreadsheet_bytes;
use financehub_engine::ingestion::{parse_upload, UploadFormat, XLSX_CONTENT_TYPE};
use financehub_engine::EngineError;

fn write_report_xlsx(with_banner: bool) -> Vec<u8> {
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Report").unwrap();

    let mut row = 0u32;
    if with_banner {
        ws.write_string(row, 0, "Posicoes em aberto").unwrap();
        row += 1;
    }

    // header
    ws.write_string(row, 0, "RptDt").unwrap();
    ws.write_string(row, 1, "TckrSymb").unwrap();
    ws.write_string(row, 2, "OpnIntrst").unwrap();
    ws.write_string(row, 3, "XprtnDt").unwrap();
    row += 1;

    let date_fmt = Format::new().set_num_format("yyyy-mm-dd");
    let expiry = ExcelDateTime::from_ymd(2024, 6, 15).unwrap();

    ws.write_string(row, 0, "15/02/2024").unwrap();
    ws.write_string(row, 1, "PETR4").unwrap();
    ws.write_number(row, 2, 1200.0).unwrap();
    ws.write_datetime_with_format(row, 3, &expiry, &date_fmt).unwrap();
    row += 1;

    // Fully empty row in between is skipped.
    row += 1;

    ws.write_string(row, 0, "2024-01-01").unwrap();
    ws.write_string(row, 1, "VALE3").unwrap();
    ws.write_number(row, 2, 12.5).unwrap();

    wb.save_to_buffer().unwrap()
}

#[test]
fn spreadsheet_header_on_first_row() {
    let t = parse_spreadsheet_bytes(&write_report_xlsx(false)).unwrap();
    assert_eq!(t.headers, vec!["RptDt", "TckrSymb", "OpnIntrst", "XprtnDt"]);
    assert_eq!(t.row_count(), 2);
    assert_eq!(t.rows[0], vec!["15/02/2024", "PETR4", "1200", "2024-06-15"]);
    assert_eq!(t.rows[1], vec!["2024-01-01", "VALE3", "12.5", ""]);
}

#[test]
fn spreadsheet_banner_row_is_skipped() {
    let t = parse_spreadsheet_bytes(&write_report_xlsx(true)).unwrap();
    assert_eq!(t.headers[0], "RptDt");
    assert_eq!(t.row_count(), 2);
}

#[test]
fn spreadsheet_dispatch_by_content_type() {
    let (format, t) = parse_upload(XLSX_CONTENT_TYPE, &write_report_xlsx(true)).unwrap();
    assert_eq!(format, UploadFormat::Spreadsheet);
    assert_eq!(t.row_count(), 2);
}

#[test]
fn corrupt_workbook_is_a_parse_error() {
    let err = parse_spreadsheet_bytes(b"definitely not a zip archive").unwrap_err();
    assert!(matches!(err, EngineError::Parse { format: "spreadsheet", .. }));
}
