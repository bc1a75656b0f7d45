use rust_xlsxwriter::{Format, Workbook};

use crate::error::{Result, TallyError};
use crate::statement::Statement;

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> TallyError {
    TallyError::Xlsx(e.to_string())
}

/// Two-sheet workbook: a summary page and the full transaction listing.
/// Amounts on the transaction sheet are signed, expenses negative, so the
/// column sums to the statement balance in a spreadsheet.
pub fn render_statement(statement: &Statement) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");

    let summary = workbook.add_worksheet();
    summary.set_name("Summary").map_err(xlsx_err)?;
    summary.set_column_width(0, 20).map_err(xlsx_err)?;
    summary.set_column_width(1, 28).map_err(xlsx_err)?;
    summary.write_with_format(0, 0, "Account", &bold).map_err(xlsx_err)?;
    summary.write(0, 1, statement.account.name.as_str()).map_err(xlsx_err)?;
    summary.write_with_format(1, 0, "Currency", &bold).map_err(xlsx_err)?;
    summary.write(1, 1, statement.account.currency.as_str()).map_err(xlsx_err)?;
    summary.write_with_format(2, 0, "Period", &bold).map_err(xlsx_err)?;
    summary.write(2, 1, statement.period_label.as_str()).map_err(xlsx_err)?;
    summary.write_with_format(3, 0, "Generated", &bold).map_err(xlsx_err)?;
    summary.write(3, 1, statement.generated_at.as_str()).map_err(xlsx_err)?;
    summary.write_with_format(5, 0, "Total Income", &bold).map_err(xlsx_err)?;
    summary
        .write_with_format(5, 1, statement.total_income, &money)
        .map_err(xlsx_err)?;
    summary.write_with_format(6, 0, "Total Expense", &bold).map_err(xlsx_err)?;
    summary
        .write_with_format(6, 1, statement.total_expense, &money)
        .map_err(xlsx_err)?;
    summary.write_with_format(7, 0, "Balance", &bold).map_err(xlsx_err)?;
    summary
        .write_with_format(7, 1, statement.balance, &money)
        .map_err(xlsx_err)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Transactions").map_err(xlsx_err)?;
    sheet.set_column_width(0, 20).map_err(xlsx_err)?;
    sheet.set_column_width(1, 32).map_err(xlsx_err)?;
    sheet.set_column_width(2, 18).map_err(xlsx_err)?;
    let headers = ["Date", "Text", "Category", "Amount", "Type", "Transfer", "Currency"];
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_with_format(0, col as u16, *header, &bold)
            .map_err(xlsx_err)?;
    }

    for (i, row) in statement.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let signed = if row.is_income { row.amount } else { -row.amount };
        let kind = if row.is_income { "income" } else { "expense" };
        sheet.write(r, 0, row.created_at.as_str()).map_err(xlsx_err)?;
        sheet.write(r, 1, row.text.as_str()).map_err(xlsx_err)?;
        sheet
            .write(r, 2, row.category.as_deref().unwrap_or("N/A"))
            .map_err(xlsx_err)?;
        sheet.write_with_format(r, 3, signed, &money).map_err(xlsx_err)?;
        sheet.write(r, 4, kind).map_err(xlsx_err)?;
        sheet
            .write(r, 5, row.transfer.as_deref().unwrap_or(""))
            .map_err(xlsx_err)?;
        sheet.write(r, 6, row.currency.as_str()).map_err(xlsx_err)?;
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}
