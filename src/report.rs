use crate::batch::BatchOutcome;
use crate::client::CompressionOutcome;
use crate::constants::{ERROR_PREFIX, INFO_PREFIX, SUCCESS_PREFIX};
use crate::locale::{Language, Message};
use crate::utils::{calculate_compression_ratio, format_file_size};
use std::fmt::Write;

fn describe(outcome: &CompressionOutcome, language: Language) -> String {
    match outcome {
        CompressionOutcome::Success(metrics) => format!(
            "{}: {}, {}: {}, {}: {:.2}%",
            language.text(Message::OriginalSize),
            format_file_size(metrics.original_size),
            language.text(Message::CompressedSize),
            format_file_size(metrics.compressed_size),
            language.text(Message::CompressionRatio),
            calculate_compression_ratio(metrics.original_size, metrics.compressed_size),
        ),
        CompressionOutcome::Failure { message } => {
            format!("{}: {}", language.text(Message::CompressionFailure), message)
        }
    }
}

/// Render the results table, one row per outcome in path order
pub fn render_results(batch: &BatchOutcome, language: Language) -> String {
    let rows: Vec<(String, String, bool)> = batch
        .outcomes
        .iter()
        .map(|(path, outcome)| {
            (
                path.display().to_string(),
                describe(outcome, language),
                outcome.is_success(),
            )
        })
        .collect();

    let header = (
        language.text(Message::Address),
        language.text(Message::CompressionDetails),
    );
    let path_width = rows
        .iter()
        .map(|(path, _, _)| path.chars().count())
        .chain(std::iter::once(header.0.chars().count()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "{} {:<width$}  {}", INFO_PREFIX, header.0, header.1, width = path_width);
    let _ = writeln!(out, "{}", "─".repeat(path_width + 40));
    for (path, details, success) in &rows {
        let mark = if *success { SUCCESS_PREFIX } else { ERROR_PREFIX };
        let _ = writeln!(out, "{} {:<width$}  {}", mark, path, details, width = path_width);
    }

    let (before, after) = batch
        .outcomes
        .values()
        .filter_map(|outcome| match outcome {
            CompressionOutcome::Success(m) => Some((m.original_size, m.compressed_size)),
            CompressionOutcome::Failure { .. } => None,
        })
        .fold((0u64, 0u64), |(b, a), (ob, oa)| (b + ob, a + oa));

    let _ = writeln!(
        out,
        "\n📊 {} ✅ / {} ❌  {} → {} ({:.1}%)",
        batch.succeeded(),
        batch.failed(),
        format_file_size(before),
        format_file_size(after),
        calculate_compression_ratio(before, after)
    );
    out
}
