//! `ual list`: filtered, paginated record listing, newest first.

use anyhow::Result;
use chrono::{DateTime, NaiveDate};
use clap::Args;
use std::io::Write;
use ual_core::ledger::{PageCursor, RecordFilter, list_records};

use super::LedgerContext;
use crate::output::{
    OutputMode, RECORD_ROW_HEADERS, pretty_kv, pretty_rule, record_row, render_mode,
    state_transition,
};

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Case-insensitive substring of the description or target item.
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Exact department.
    #[arg(short, long)]
    pub department: Option<String>,

    /// Exact action type.
    #[arg(short, long = "action")]
    pub action_type: Option<String>,

    /// Case-insensitive substring of the target item.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Exact target type.
    #[arg(long)]
    pub target_type: Option<String>,

    /// Exact acting user.
    #[arg(long = "by", value_name = "ACTOR")]
    pub by: Option<String>,

    /// Inclusive lower bound: RFC 3339, YYYY-MM-DD (UTC), or epoch micros.
    #[arg(long, value_parser = parse_time_us)]
    pub since: Option<i64>,

    /// Exclusive upper bound: RFC 3339, YYYY-MM-DD (UTC), or epoch micros.
    #[arg(long, value_parser = parse_time_us)]
    pub until: Option<i64>,

    /// Include voided records.
    #[arg(long)]
    pub include_voided: bool,

    /// Maximum records per page (clamped to the configured maximum).
    #[arg(short = 'n', long)]
    pub limit: Option<u32>,

    /// Rows to skip. Shifts under concurrent appends; prefer --after.
    #[arg(long, conflicts_with = "after")]
    pub offset: Option<u32>,

    /// Continue after a cursor printed by a previous page (`MICROS:SEQ`).
    #[arg(long, value_parser = parse_cursor)]
    pub after: Option<PageCursor>,
}

impl ListArgs {
    fn to_filter(&self) -> RecordFilter {
        RecordFilter {
            keyword: self.keyword.clone(),
            department: self.department.clone(),
            action_type: self.action_type.clone(),
            target_item: self.target.clone(),
            actor: self.by.clone(),
            target_type: self.target_type.clone(),
            since_us: self.since,
            until_us: self.until,
            include_voided: self.include_voided,
            limit: self.limit,
            offset: self.offset,
            cursor: self.after,
        }
    }
}

fn parse_time_us(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if let Ok(us) = raw.parse::<i64>() {
        return Ok(us);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.timestamp_micros());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_micros())
        .ok_or_else(|| format!("invalid time '{raw}': expected RFC 3339, YYYY-MM-DD, or micros"))
}

fn parse_cursor(raw: &str) -> Result<PageCursor, String> {
    let invalid = || format!("invalid cursor '{raw}': expected MICROS:SEQ");
    let (ts, seq) = raw.trim().split_once(':').ok_or_else(invalid)?;
    Ok(PageCursor {
        created_at_us: ts.parse().map_err(|_| invalid())?,
        seq: seq.parse().map_err(|_| invalid())?,
    })
}

fn cursor_arg(cursor: PageCursor) -> String {
    format!("{}:{}", cursor.created_at_us, cursor.seq)
}

/// Execute `ual list`.
///
/// # Errors
///
/// Returns an error for an inverted time range, a zero limit, or a failed query.
pub fn run_list(args: &ListArgs, ctx: &LedgerContext, output: OutputMode) -> Result<()> {
    let conn = ctx.open()?;
    let page = list_records(&conn, &args.to_filter(), &ctx.config.list)?;

    render_mode(
        output,
        &page,
        |p, w| {
            if !p.records.is_empty() {
                writeln!(w, "{RECORD_ROW_HEADERS}")?;
            }
            for record in &p.records {
                record_row(w, record)?;
            }
            writeln!(w, "total\t{}", p.total)?;
            if let Some(cursor) = p.next_cursor {
                writeln!(w, "next\t{}", cursor_arg(cursor))?;
            }
            Ok(())
        },
        |p, w| {
            if p.records.is_empty() {
                return writeln!(w, "No records match.");
            }
            for record in &p.records {
                let voided = if record.is_voided { "  [voided]" } else { "" };
                writeln!(
                    w,
                    "{}  {:<12} {:<16} {:<12} {}{voided}",
                    record.id,
                    record.action_type,
                    record.target_item,
                    record.department,
                    state_transition(record),
                )?;
            }
            pretty_rule(w)?;
            pretty_kv(w, "Showing", format!("{} of {}", p.records.len(), p.total))?;
            if let Some(cursor) = p.next_cursor {
                pretty_kv(w, "Next page", format!("--after {}", cursor_arg(cursor)))?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn defaults_are_unfiltered() {
        let w = Wrapper::parse_from(["test"]);
        assert_eq!(w.args.to_filter(), RecordFilter::default());
    }

    #[test]
    fn time_formats() {
        assert_eq!(parse_time_us("1700000000000000"), Ok(1_700_000_000_000_000));
        assert_eq!(parse_time_us("1970-01-02"), Ok(86_400_000_000));
        assert_eq!(
            parse_time_us("1970-01-01T00:00:01+00:00"),
            Ok(1_000_000)
        );
        assert!(parse_time_us("yesterday").is_err());
    }

    #[test]
    fn cursor_round_trips_through_arg_text() {
        let cursor = PageCursor {
            created_at_us: 1_700_000_000_123_456,
            seq: 42,
        };
        assert_eq!(parse_cursor(&cursor_arg(cursor)), Ok(cursor));
        assert!(parse_cursor("42").is_err());
        assert!(parse_cursor("a:b").is_err());
    }

    #[test]
    fn offset_conflicts_with_cursor() {
        assert!(Wrapper::try_parse_from(["test", "--offset", "5", "--after", "1:2"]).is_err());
    }

    #[test]
    fn filter_flags_map_to_fields() {
        let w = Wrapper::parse_from([
            "test", "-d", "finance", "-a", "approve", "--by", "alice", "-n", "10",
            "--include-voided",
        ]);
        let filter = w.args.to_filter();
        assert_eq!(filter.department.as_deref(), Some("finance"));
        assert_eq!(filter.action_type.as_deref(), Some("approve"));
        assert_eq!(filter.actor.as_deref(), Some("alice"));
        assert_eq!(filter.limit, Some(10));
        assert!(filter.include_voided);
    }
}
