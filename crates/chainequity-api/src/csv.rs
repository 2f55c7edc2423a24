use chainequity_captable::CapTableSnapshot;

/// Serializes a snapshot to CSV: a header row, one row per holder, a blank
/// separator line, and a summary footer. `generated_at` is injected by the
/// caller (rather than read from the clock in here) so that re-exporting the
/// same snapshot twice produces identical bytes modulo `Generated At`,
/// verifiable in tests without faking time.
pub fn export_csv(snapshot: &CapTableSnapshot, generated_at: u64) -> String {
    let mut out = String::from("Address,Balance,Ownership %,Last Updated\n");
    for holder in &snapshot.holders {
        out.push_str(&format!(
            "{},{},{:.6},{}\n",
            holder.address,
            holder.balance,
            holder.percentage,
            holder.last_updated.map(|t| t.to_string()).unwrap_or_default(),
        ));
    }
    out.push('\n');
    out.push_str("Total Supply,Total Holders,Split Multiplier,Generated At\n");
    out.push_str(&format!(
        "{},{},{},{}\n",
        snapshot.total_supply_formatted, snapshot.holder_count, snapshot.split_multiplier, generated_at
    ));
    out
}

#[cfg(test)]
pub(crate) fn parse_csv(csv: &str) -> Vec<(String, String, f64, String)> {
    csv.lines()
        .skip(1)
        .take_while(|line| !line.is_empty())
        .map(|line| {
            let mut parts = line.splitn(4, ',');
            let address = parts.next().unwrap().to_string();
            let balance = parts.next().unwrap().to_string();
            let percentage: f64 = parts.next().unwrap().parse().unwrap();
            let last_updated = parts.next().unwrap().to_string();
            (address, balance, percentage, last_updated)
        })
        .collect()
}
