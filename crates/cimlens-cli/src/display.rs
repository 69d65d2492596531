//! Terminal rendering for result lists and the detail card.

use cimlens_core::RatingToken;
use cimlens_store::{Detail, ResultRow, UploadReceipt};

const TITLE_WIDTH: usize = 56;

// ── Result list ──

pub fn print_result_table(rows: &[ResultRow]) {
    if rows.is_empty() {
        println!("No results yet. Upload a CIM to get started.");
        return;
    }
    println!(
        "{:<8} {:<width$} {:<20} {:<6} {:>5}",
        "ID",
        "TITLE",
        "UPLOADED",
        "RATING",
        "CONF",
        width = TITLE_WIDTH
    );
    for row in rows {
        println!("{}", format_row(row));
    }
}

pub(crate) fn format_row(row: &ResultRow) -> String {
    format!(
        "{:<8} {:<width$} {:<20} {:<6} {:>5}",
        row.id.as_str(),
        truncate(&row.title, TITLE_WIDTH),
        row.timestamp.to_string(),
        rating_label(row.rating),
        row.confidence.to_string(),
        width = TITLE_WIDTH
    )
}

fn rating_label(rating: Option<RatingToken>) -> &'static str {
    rating.map_or("-", RatingToken::as_str)
}

/// Cut to `max` characters, marking the cut with "...".
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

// ── Detail card ──

pub fn print_detail(detail: &Detail) {
    println!("=== {} ===", detail.filename);
    println!("  {:<10} {}", "id", detail.id);
    println!("  {:<10} {}", "uploaded", detail.timestamp);
    println!();

    if let Some(preview) = &detail.preview_text {
        println!("Preview");
        println!("  {}", preview.trim());
        println!();
    }

    print!("{}", detail.analysis);
}

pub fn print_upload_receipt(receipt: &UploadReceipt) {
    println!(
        "{}",
        receipt
            .message
            .as_deref()
            .unwrap_or("File uploaded and analyzed!")
    );
    println!("  {:<10} {}", "file", receipt.filename);
    if let Some(note) = &receipt.note {
        println!("  {:<10} {}", "note", note);
    }
    println!();
}

pub(crate) fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
