// Transaction Record Store
// SQLite schema, row insertion, and the read surface the query API sits on:
// filtered lists, per-id lookup, aggregate statistics, substring search.

use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use serde::Serialize;

use crate::model::{StoredTransaction, TransactionDetails, TransactionRecord};

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // One wide table; columns that do not apply to a row's category stay
    // NULL so aggregation can tell "no value" from "zero".
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT,
            transaction_type TEXT NOT NULL,
            amount REAL NOT NULL,
            fee REAL,
            sender TEXT,
            recipient TEXT,
            phone_number TEXT,
            agent_name TEXT,
            agent_phone TEXT,
            bank_name TEXT,
            reference TEXT,
            meter_number TEXT,
            bundle_type TEXT,
            bundle_size TEXT,
            validity_period TEXT,
            date_time TEXT,
            raw_message TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_type ON transactions(transaction_type)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_date_time ON transactions(date_time)",
        [],
    )?;

    Ok(())
}

/// Insert one classified record. Insertions are independent and
/// order-insensitive; returns the new rowid.
pub fn insert_record(conn: &Connection, record: &TransactionRecord) -> Result<i64> {
    let mut fee: Option<f64> = None;
    let mut sender: Option<&str> = None;
    let mut recipient: Option<&str> = None;
    let mut phone_number: Option<&str> = None;
    let mut agent_name: Option<&str> = None;
    let mut agent_phone: Option<&str> = None;
    let mut bank_name: Option<&str> = None;
    let mut reference: Option<&str> = None;
    let mut meter_number: Option<&str> = None;
    let mut bundle_type: Option<&str> = None;
    let mut bundle_size: Option<&str> = None;
    let mut validity_period: Option<&str> = None;

    match &record.details {
        TransactionDetails::IncomingMoney { sender: s } => {
            sender = s.as_deref();
        }
        TransactionDetails::PaymentToCodeHolder { recipient: r } => {
            recipient = r.as_deref();
        }
        TransactionDetails::TransferToMobile {
            phone_number: p,
            fee: f,
        } => {
            phone_number = p.as_deref();
            fee = *f;
        }
        TransactionDetails::BankDeposit {
            bank_name: b,
            reference: r,
        } => {
            bank_name = b.as_deref();
            reference = r.as_deref();
        }
        TransactionDetails::AirtimeBill { fee: f } => {
            fee = *f;
        }
        TransactionDetails::CashPowerBill { meter_number: m } => {
            meter_number = m.as_deref();
        }
        // Third-party initiator lands in the sender column.
        TransactionDetails::ThirdParty { initiator } => {
            sender = initiator.as_deref();
        }
        TransactionDetails::AgentWithdrawal {
            agent_name: n,
            agent_phone: p,
        } => {
            agent_name = n.as_deref();
            agent_phone = p.as_deref();
        }
        TransactionDetails::BankTransfer {
            bank_name: b,
            reference: r,
        } => {
            bank_name = b.as_deref();
            reference = r.as_deref();
        }
        TransactionDetails::BundlePurchase {
            bundle_type: t,
            bundle_size: s,
            validity_period: v,
        } => {
            bundle_type = t.as_deref();
            bundle_size = s.as_deref();
            validity_period = v.as_deref();
        }
    }

    conn.execute(
        "INSERT INTO transactions (
            transaction_id, transaction_type, amount, fee, sender, recipient,
            phone_number, agent_name, agent_phone, bank_name, reference,
            meter_number, bundle_type, bundle_size, validity_period,
            date_time, raw_message
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            record.transaction_id,
            record.transaction_type(),
            record.amount,
            fee,
            sender,
            recipient,
            phone_number,
            agent_name,
            agent_phone,
            bank_name,
            reference,
            meter_number,
            bundle_type,
            bundle_size,
            validity_period,
            record.date_time,
            record.raw_message,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

const SELECT_COLUMNS: &str =
    "id, transaction_id, transaction_type, amount, fee, sender, recipient,
     phone_number, agent_name, agent_phone, bank_name, reference, meter_number,
     bundle_type, bundle_size, validity_period, date_time, raw_message, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<StoredTransaction> {
    Ok(StoredTransaction {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        transaction_type: row.get(2)?,
        amount: row.get(3)?,
        fee: row.get(4)?,
        sender: row.get(5)?,
        recipient: row.get(6)?,
        phone_number: row.get(7)?,
        agent_name: row.get(8)?,
        agent_phone: row.get(9)?,
        bank_name: row.get(10)?,
        reference: row.get(11)?,
        meter_number: row.get(12)?,
        bundle_type: row.get(13)?,
        bundle_size: row.get(14)?,
        validity_period: row.get(15)?,
        date_time: row.get(16)?,
        raw_message: row.get(17)?,
        created_at: row.get(18)?,
    })
}

/// Optional filters for the transaction list; present fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub transaction_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub limit: Option<i64>,
}

/// Filtered list, newest first. SQL is composed clause by clause with bound
/// parameters; limit defaults to 100.
pub fn list_transactions(
    conn: &Connection,
    filter: &TransactionFilter,
) -> Result<Vec<StoredTransaction>> {
    let mut sql = format!("SELECT {SELECT_COLUMNS} FROM transactions WHERE 1=1");
    let mut binds: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(transaction_type) = &filter.transaction_type {
        sql.push_str(" AND transaction_type = ?");
        binds.push(Box::new(transaction_type.clone()));
    }
    if let Some(start_date) = &filter.start_date {
        sql.push_str(" AND date_time >= ?");
        binds.push(Box::new(start_date.clone()));
    }
    if let Some(end_date) = &filter.end_date {
        sql.push_str(" AND date_time <= ?");
        binds.push(Box::new(end_date.clone()));
    }
    if let Some(min_amount) = filter.min_amount {
        sql.push_str(" AND amount >= ?");
        binds.push(Box::new(min_amount));
    }
    if let Some(max_amount) = filter.max_amount {
        sql.push_str(" AND amount <= ?");
        binds.push(Box::new(max_amount));
    }

    sql.push_str(" ORDER BY date_time DESC LIMIT ?");
    binds.push(Box::new(filter.limit.unwrap_or(100)));

    let mut stmt = conn.prepare(&sql)?;
    let transactions = stmt
        .query_map(params_from_iter(binds.iter().map(|b| b.as_ref())), map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

/// Per-id lookup.
pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<StoredTransaction>> {
    let transaction = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM transactions WHERE id = ?1"),
            params![id],
            map_row,
        )
        .optional()?;

    Ok(transaction)
}

/// Substring search over the free-text columns, newest first, capped at 50.
pub fn search_transactions(conn: &Connection, term: &str) -> Result<Vec<StoredTransaction>> {
    let pattern = format!("%{term}%");

    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM transactions
         WHERE raw_message LIKE ?1 OR sender LIKE ?1 OR recipient LIKE ?1
         ORDER BY date_time DESC
         LIMIT 50"
    ))?;

    let transactions = stmt
        .query_map(params![pattern], map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeStat {
    pub transaction_type: String,
    pub count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyStat {
    pub month: String,
    pub count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallStats {
    pub total_transactions: i64,
    pub total_amount: f64,
    pub avg_amount: f64,
    pub max_amount: f64,
    pub min_amount: f64,
}

/// Count and amount total per category.
pub fn type_stats(conn: &Connection) -> Result<Vec<TypeStat>> {
    let mut stmt = conn.prepare(
        "SELECT transaction_type, COUNT(*) as count, COALESCE(SUM(amount), 0) as total_amount
         FROM transactions
         GROUP BY transaction_type
         ORDER BY transaction_type",
    )?;

    let stats = stmt
        .query_map([], |row| {
            Ok(TypeStat {
                transaction_type: row.get(0)?,
                count: row.get(1)?,
                total_amount: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(stats)
}

/// Count and amount total per calendar month, over rows that carry a
/// timestamp at all.
pub fn monthly_stats(conn: &Connection) -> Result<Vec<MonthlyStat>> {
    let mut stmt = conn.prepare(
        "SELECT strftime('%Y-%m', date_time) as month,
                COUNT(*) as count,
                COALESCE(SUM(amount), 0) as total_amount
         FROM transactions
         WHERE date_time IS NOT NULL
         GROUP BY strftime('%Y-%m', date_time)
         ORDER BY month",
    )?;

    let stats = stmt
        .query_map([], |row| {
            Ok(MonthlyStat {
                month: row.get(0)?,
                count: row.get(1)?,
                total_amount: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(stats)
}

pub fn overall_stats(conn: &Connection) -> Result<OverallStats> {
    let stats = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(amount), 0),
                COALESCE(AVG(amount), 0),
                COALESCE(MAX(amount), 0),
                COALESCE(MIN(amount), 0)
         FROM transactions",
        [],
        |row| {
            Ok(OverallStats {
                total_transactions: row.get(0)?,
                total_amount: row.get(1)?,
                avg_amount: row.get(2)?,
                max_amount: row.get(3)?,
                min_amount: row.get(4)?,
            })
        },
    )?;

    Ok(stats)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn insert_message(conn: &Connection, c: &mut Classifier, message: &str) -> i64 {
        let record = c
            .classify(message)
            .unwrap()
            .expect("test message should classify");
        insert_record(conn, &record).unwrap()
    }

    fn seeded_db() -> Connection {
        let conn = test_db();
        let mut c = Classifier::new().unwrap();

        insert_message(
            &conn,
            &mut c,
            "You have received 5,000 RWF from John Doe. Transaction ID: ABC123 at 2024-01-15 10:30:00",
        );
        insert_message(
            &conn,
            &mut c,
            "You have received 12,000 RWF from Alice Umutoni. TxId: A77 at 2024-02-03 08:00:00",
        );
        insert_message(
            &conn,
            &mut c,
            "Your payment of 2,000 RWF to airtime completed. Fee: 20 RWF at 2024-01-20 12:00:00",
        );
        insert_message(
            &conn,
            &mut c,
            "You have sent 3,000 RWF to 250788123456 at 2024-02-10 09:15:00",
        );

        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = seeded_db();
        assert_eq!(verify_count(&conn).unwrap(), 4);
    }

    #[test]
    fn test_null_fields_stay_null() {
        // The mobile transfer above has no fee text: the column must be
        // NULL, not 0, so aggregation can tell "no value" from "zero".
        let conn = seeded_db();
        let rows = list_transactions(
            &conn,
            &TransactionFilter {
                transaction_type: Some("Transfer to Mobile Number".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fee, None);
        assert_eq!(rows[0].sender, None);
        assert_eq!(rows[0].phone_number.as_deref(), Some("250788123456"));
    }

    #[test]
    fn test_filter_by_type() {
        let conn = seeded_db();
        let rows = list_transactions(
            &conn,
            &TransactionFilter {
                transaction_type: Some("Incoming Money".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.transaction_type == "Incoming Money"));
    }

    #[test]
    fn test_filter_by_amount_and_date_range() {
        let conn = seeded_db();
        let rows = list_transactions(
            &conn,
            &TransactionFilter {
                min_amount: Some(2500.0),
                max_amount: Some(6000.0),
                ..Default::default()
            },
        )
        .unwrap();
        // 5,000 incoming and 3,000 transfer
        assert_eq!(rows.len(), 2);

        let rows = list_transactions(
            &conn,
            &TransactionFilter {
                start_date: Some("2024-02-01 00:00:00".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        // Newest first
        assert_eq!(rows[0].date_time.as_deref(), Some("2024-02-10 09:15:00"));
    }

    #[test]
    fn test_filter_limit() {
        let conn = seeded_db();
        let rows = list_transactions(
            &conn,
            &TransactionFilter {
                limit: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_get_transaction_by_id() {
        let conn = test_db();
        let mut c = Classifier::new().unwrap();
        let id = insert_message(
            &conn,
            &mut c,
            "You have received 5,000 RWF from John Doe. Transaction ID: ABC123",
        );

        let row = get_transaction(&conn, id).unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.sender.as_deref(), Some("John Doe"));
        assert_eq!(row.amount, 5000.0);

        assert!(get_transaction(&conn, id + 999).unwrap().is_none());
    }

    #[test]
    fn test_search_by_sender() {
        let conn = seeded_db();
        let rows = search_transactions(&conn, "Umutoni").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sender.as_deref(), Some("Alice Umutoni"));

        let rows = search_transactions(&conn, "no such text").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_type_stats() {
        let conn = seeded_db();
        let stats = type_stats(&conn).unwrap();

        let incoming = stats
            .iter()
            .find(|s| s.transaction_type == "Incoming Money")
            .unwrap();
        assert_eq!(incoming.count, 2);
        assert_eq!(incoming.total_amount, 17000.0);
    }

    #[test]
    fn test_monthly_stats_group_by_month() {
        let conn = seeded_db();
        let stats = monthly_stats(&conn).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].month, "2024-01");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[1].month, "2024-02");
        assert_eq!(stats[1].count, 2);
    }

    #[test]
    fn test_overall_stats_empty_store() {
        let conn = test_db();
        let stats = overall_stats(&conn).unwrap();
        assert_eq!(stats.total_transactions, 0);
        assert_eq!(stats.total_amount, 0.0);
    }

    #[test]
    fn test_overall_stats() {
        let conn = seeded_db();
        let stats = overall_stats(&conn).unwrap();
        assert_eq!(stats.total_transactions, 4);
        assert_eq!(stats.total_amount, 22000.0);
        assert_eq!(stats.max_amount, 12000.0);
        assert_eq!(stats.min_amount, 2000.0);
    }
}
