//! Record reads: fetch by id and filtered, paginated listings.
//!
//! Listings are reverse-chronological by `(created_at_us, seq)`. The page and
//! its `total` are read inside one transaction so they describe the same
//! snapshot even while other connections append.

use rusqlite::{Connection, params, params_from_iter, types::ToSql};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ListConfig;
use crate::db::rows::{self, RECORD_COLUMNS, row_to_record};
use crate::error::{LedgerError, Result};
use crate::model::{ActionDependency, LedgerRecord};

use super::link::dependencies_of;

/// Position after which the next page starts (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub created_at_us: i64,
    pub seq: i64,
}

impl PageCursor {
    #[must_use]
    pub const fn after(record: &LedgerRecord) -> Self {
        Self {
            created_at_us: record.created_at_us,
            seq: record.seq,
        }
    }
}

/// Filter criteria for record listings.
///
/// All fields are optional and combine with AND semantics. Text matches
/// are case-insensitive substrings; classification matches are exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Substring of `description` or `target_item`.
    pub keyword: Option<String>,
    pub department: Option<String>,
    pub action_type: Option<String>,
    /// Substring of `target_item`.
    pub target_item: Option<String>,
    pub actor: Option<String>,
    pub target_type: Option<String>,
    /// Inclusive lower creation bound.
    pub since_us: Option<i64>,
    /// Exclusive upper creation bound.
    pub until_us: Option<i64>,
    pub include_voided: bool,
    pub limit: Option<u32>,
    /// Row offset. Unstable while other writers append; prefer `cursor`.
    pub offset: Option<u32>,
    pub cursor: Option<PageCursor>,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPage {
    pub records: Vec<LedgerRecord>,
    /// Rows matching the predicates, ignoring limit, offset and cursor.
    pub total: u64,
    /// Set when the page is full and more rows may follow.
    pub next_cursor: Option<PageCursor>,
}

/// A record plus its outgoing dependency edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDetail {
    #[serde(flatten)]
    pub record: LedgerRecord,
    pub dependencies: Vec<ActionDependency>,
}

/// Fetch a record by id, voided or not.
///
/// # Errors
///
/// Returns [`LedgerError::RecordNotFound`] for unknown or malformed ids.
pub fn get_record(conn: &Connection, id: &str) -> Result<LedgerRecord> {
    rows::fetch_record(conn, id)?.ok_or_else(|| LedgerError::RecordNotFound(id.to_string()))
}

/// Fetch a record together with its outgoing dependencies.
///
/// # Errors
///
/// Returns [`LedgerError::RecordNotFound`] for unknown or malformed ids.
pub fn get_record_detail(conn: &Connection, id: &str) -> Result<RecordDetail> {
    let tx = conn.unchecked_transaction()?;
    let record = get_record(&tx, id)?;
    let dependencies = dependencies_of(&tx, &record.id)?;
    tx.finish()?;
    Ok(RecordDetail {
        record,
        dependencies,
    })
}

/// List records matching `filter`, newest first.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] for an inverted time range or a zero
/// limit, and [`LedgerError::Storage`] if a query fails.
pub fn list_records(
    conn: &Connection,
    filter: &RecordFilter,
    config: &ListConfig,
) -> Result<RecordPage> {
    if let (Some(since), Some(until)) = (filter.since_us, filter.until_us) {
        if since >= until {
            return Err(LedgerError::validation(
                "since must be earlier than until",
            ));
        }
    }
    if filter.limit == Some(0) {
        return Err(LedgerError::validation("limit must be at least 1"));
    }
    let limit = config.effective_limit(filter.limit);

    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();

    if !filter.include_voided {
        conditions.push("a.is_voided = 0".to_string());
    }

    if let Some(keyword) = non_blank(filter.keyword.as_deref()) {
        param_values.push(Box::new(like_pattern(keyword)));
        let n = param_values.len();
        conditions.push(format!(
            "(a.description LIKE ?{n} ESCAPE '\\' OR a.target_item LIKE ?{n} ESCAPE '\\')"
        ));
    }

    if let Some(department) = non_blank(filter.department.as_deref()) {
        param_values.push(Box::new(department.to_string()));
        conditions.push(format!("a.department = ?{}", param_values.len()));
    }

    if let Some(action_type) = non_blank(filter.action_type.as_deref()) {
        param_values.push(Box::new(action_type.to_string()));
        conditions.push(format!("a.action_type = ?{}", param_values.len()));
    }

    if let Some(target) = non_blank(filter.target_item.as_deref()) {
        param_values.push(Box::new(like_pattern(target)));
        conditions.push(format!(
            "a.target_item LIKE ?{} ESCAPE '\\'",
            param_values.len()
        ));
    }

    if let Some(actor) = non_blank(filter.actor.as_deref()) {
        param_values.push(Box::new(actor.to_string()));
        conditions.push(format!("a.actor = ?{}", param_values.len()));
    }

    if let Some(target_type) = non_blank(filter.target_type.as_deref()) {
        param_values.push(Box::new(target_type.to_string()));
        conditions.push(format!("a.target_type = ?{}", param_values.len()));
    }

    if let Some(since) = filter.since_us {
        param_values.push(Box::new(since));
        conditions.push(format!("a.created_at_us >= ?{}", param_values.len()));
    }

    if let Some(until) = filter.until_us {
        param_values.push(Box::new(until));
        conditions.push(format!("a.created_at_us < ?{}", param_values.len()));
    }

    let count_where = where_clause(&conditions);
    let count_params = param_values.len();

    if let Some(cursor) = filter.cursor {
        param_values.push(Box::new(cursor.created_at_us));
        let ts = param_values.len();
        param_values.push(Box::new(cursor.seq));
        let seq = param_values.len();
        conditions.push(format!(
            "(a.created_at_us < ?{ts} OR (a.created_at_us = ?{ts} AND a.seq < ?{seq}))"
        ));
    }

    let page_where = where_clause(&conditions);
    let offset_clause = filter
        .offset
        .filter(|offset| *offset > 0)
        .map(|offset| format!(" OFFSET {offset}"))
        .unwrap_or_default();

    let page_sql = format!(
        "SELECT {RECORD_COLUMNS} FROM actions a{page_where} \
         ORDER BY a.created_at_us DESC, a.seq DESC LIMIT {limit}{offset_clause}"
    );
    let count_sql = format!("SELECT COUNT(*) FROM actions a{count_where}");
    debug!(sql = %page_sql, "list_records");

    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(AsRef::as_ref).collect();

    let tx = conn.unchecked_transaction()?;
    let records = {
        let mut stmt = tx.prepare(&page_sql)?;
        let rows = stmt.query_map(params_from_iter(params_ref.iter()), row_to_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };
    let total: i64 = tx.query_row(
        &count_sql,
        params_from_iter(params_ref[..count_params].iter()),
        |row| row.get(0),
    )?;
    tx.finish()?;

    let next_cursor = if u32::try_from(records.len()).is_ok_and(|n| n == limit) {
        records.last().map(PageCursor::after)
    } else {
        None
    };

    Ok(RecordPage {
        records,
        total: u64::try_from(total).unwrap_or_default(),
        next_cursor,
    })
}

/// Active records for one exact target item, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn records_for_target(conn: &Connection, target_item: &str) -> Result<Vec<LedgerRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM actions a \
         WHERE a.target_item = ?1 AND a.is_voided = 0 \
         ORDER BY a.created_at_us ASC, a.seq ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![target_item], row_to_record)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `%needle%` with LIKE wildcards in `needle` escaped by `\`.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::clock::ManualClock;
    use crate::config::AppendConfig;
    use crate::db::open_in_memory;
    use crate::ledger::append::append_with_clock;
    use crate::ledger::void::void_record;
    use crate::model::NewRecord;

    fn seed(conn: &mut Connection) -> Vec<LedgerRecord> {
        let actor = Actor::new("alice").expect("actor");
        let clock = ManualClock::new(1_000_000);
        let cfg = AppendConfig::default();
        let payloads = [
            NewRecord::new("submit", "PO-1023", "purchase_order", "finance")
                .description("Submitted PO for laptops"),
            NewRecord::new("approve", "PO-1023", "purchase_order", "finance")
                .description("Manager approval"),
            NewRecord::new("file", "RPT-7", "report", "ops").description("Quarterly 50%_done"),
            NewRecord::new("approve", "TCK-9", "ticket", "support"),
        ];
        payloads
            .iter()
            .map(|p| {
                clock.advance_secs(60);
                append_with_clock(conn, &actor, p, &cfg, &clock).expect("append")
            })
            .collect()
    }

    #[test]
    fn get_record_missing_and_malformed() {
        let conn = open_in_memory().expect("db");
        assert!(matches!(
            get_record(&conn, "act-0000000000000000"),
            Err(LedgerError::RecordNotFound(_))
        ));
        assert!(matches!(
            get_record(&conn, "garbage"),
            Err(LedgerError::RecordNotFound(_))
        ));
    }

    #[test]
    fn list_is_newest_first_and_excludes_voided() {
        let mut conn = open_in_memory().expect("db");
        let seeded = seed(&mut conn);
        let bob = Actor::new("bob").expect("actor");
        void_record(&conn, &bob, &seeded[3].id, "duplicate").expect("void");

        let page = list_records(&conn, &RecordFilter::default(), &ListConfig::default())
            .expect("list");
        let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, [&seeded[2].id, &seeded[1].id, &seeded[0].id]);
        assert_eq!(page.total, 3);
        assert_eq!(page.next_cursor, None);

        let with_voided = RecordFilter {
            include_voided: true,
            ..RecordFilter::default()
        };
        let page = list_records(&conn, &with_voided, &ListConfig::default()).expect("list");
        assert_eq!(page.total, 4);
    }

    #[test]
    fn filters_compose_with_and() {
        let mut conn = open_in_memory().expect("db");
        seed(&mut conn);
        let cfg = ListConfig::default();

        let filter = RecordFilter {
            department: Some("finance".into()),
            action_type: Some("approve".into()),
            ..RecordFilter::default()
        };
        let page = list_records(&conn, &filter, &cfg).expect("list");
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].description.as_deref(), Some("Manager approval"));

        let keyword = RecordFilter {
            keyword: Some("po-10".into()),
            ..RecordFilter::default()
        };
        assert_eq!(list_records(&conn, &keyword, &cfg).expect("list").total, 2);

        let target = RecordFilter {
            target_item: Some("tck".into()),
            ..RecordFilter::default()
        };
        assert_eq!(list_records(&conn, &target, &cfg).expect("list").total, 1);
    }

    #[test]
    fn like_wildcards_match_literally() {
        let mut conn = open_in_memory().expect("db");
        seed(&mut conn);
        let cfg = ListConfig::default();

        let literal = RecordFilter {
            keyword: Some("50%_".into()),
            ..RecordFilter::default()
        };
        assert_eq!(list_records(&conn, &literal, &cfg).expect("list").total, 1);

        let wildcard = RecordFilter {
            keyword: Some("%".into()),
            ..RecordFilter::default()
        };
        assert_eq!(list_records(&conn, &wildcard, &cfg).expect("list").total, 1);
    }

    #[test]
    fn total_ignores_limit_offset_and_cursor() {
        let mut conn = open_in_memory().expect("db");
        let seeded = seed(&mut conn);
        let cfg = ListConfig::default();

        let first = RecordFilter {
            limit: Some(2),
            ..RecordFilter::default()
        };
        let page = list_records(&conn, &first, &cfg).expect("page 1");
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, 4);
        let cursor = page.next_cursor.expect("cursor");
        assert_eq!(cursor, PageCursor::after(&seeded[2]));

        let second = RecordFilter {
            limit: Some(2),
            cursor: Some(cursor),
            ..RecordFilter::default()
        };
        let page = list_records(&conn, &second, &cfg).expect("page 2");
        let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, [&seeded[1].id, &seeded[0].id]);
        assert_eq!(page.total, 4);

        let offset = RecordFilter {
            limit: Some(3),
            offset: Some(3),
            ..RecordFilter::default()
        };
        let page = list_records(&conn, &offset, &cfg).expect("offset page");
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total, 4);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn time_bounds_and_invalid_ranges() {
        let mut conn = open_in_memory().expect("db");
        let seeded = seed(&mut conn);
        let cfg = ListConfig::default();

        let bounded = RecordFilter {
            since_us: Some(seeded[1].created_at_us),
            until_us: Some(seeded[3].created_at_us),
            ..RecordFilter::default()
        };
        assert_eq!(list_records(&conn, &bounded, &cfg).expect("list").total, 2);

        let inverted = RecordFilter {
            since_us: Some(10),
            until_us: Some(5),
            ..RecordFilter::default()
        };
        assert!(matches!(
            list_records(&conn, &inverted, &cfg),
            Err(LedgerError::Validation(_))
        ));

        let zero = RecordFilter {
            limit: Some(0),
            ..RecordFilter::default()
        };
        assert!(matches!(
            list_records(&conn, &zero, &cfg),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn like_pattern_escapes() {
        assert_eq!(like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
    }
}
