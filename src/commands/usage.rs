use anyhow::Error;
use chrono::{TimeZone, Utc};

use crate::args::UsageSubCommand;
use crate::models::UsageRecord;
use crate::repos::usage::UsageRepository;

fn render(record: &UsageRecord) -> String {
    let last_used = record
        .last_used
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "Calls:         {}\nInput tokens:  {}\nOutput tokens: {}\nTotal tokens:  {}\nTotal cost:    ${:.4}\nThis month:    ${:.4} ({})\nLast used:     {}",
        record.total_calls,
        record.input_tokens,
        record.output_tokens,
        record.total_tokens,
        record.total_cost,
        record.monthly_cost,
        record.month,
        last_used
    )
}

pub fn run(usage: &UsageRepository, cmd: &UsageSubCommand) -> Result<(), Error> {
    if cmd.reset {
        usage.reset()?;
        println!("Usage counters reset");
        return Ok(());
    }
    let mut record = usage.load()?;
    // Display only; the stored record rolls over on the next call.
    record.roll_month(Utc::now());
    println!("{}", render(&record));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fresh_record() {
        let mut record = UsageRecord::default();
        record.roll_month(Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap());
        let text = render(&record);
        assert!(text.contains("Calls:         0"));
        assert!(text.contains("This month:    $0.0000 (2026-03)"));
        assert!(text.ends_with("Last used:     never"));
    }

    #[test]
    fn test_render_records_last_use() {
        let mut record = UsageRecord::default();
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 12, 30, 0).unwrap();
        record.record(1000, 500, 0.0012, now);
        let text = render(&record);
        assert!(text.contains("Total tokens:  1500"));
        assert!(text.contains("Total cost:    $0.0012"));
        assert!(text.contains("2026-03-09 12:30 UTC"));
    }
}
