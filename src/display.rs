//! User-facing formatting helpers

/// Explorer page of a transaction: `{base}/txn/{tx}?network={network}`
pub fn explorer_link(explorer_base: &str, transaction_id: &str, network: &str) -> String {
    format!(
        "{}/txn/{}?network={}",
        explorer_base.trim_end_matches('/'),
        transaction_id,
        urlencoding::encode(network)
    )
}

/// Human-readable size in powers of 1024, two decimals at most
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
