/// Renders an amount of euro cents for human-readable messages, e.g. `€54.00`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}€{}.{:02}", sign, abs / 100, abs % 100)
}
