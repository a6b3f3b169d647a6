//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetAlert;
    use chrono::TimeZone;
    use serde_json::json;

    fn expense(id: &str, account_id: &str, merchant: &str, amount: f64, day: u32) -> Transaction {
        Transaction {
            id: id.to_string(),
            account_id: account_id.to_string(),
            merchant: merchant.to_string(),
            amount,
            date: Utc.with_ymd_and_hms(2026, 1, day, 9, 30, 0).unwrap(),
            transaction_type: TransactionType::Expense,
            category: None,
        }
    }

    fn alert(kind: DetectionKind, transaction_id: &str) -> DetectionAlert {
        DetectionAlert {
            kind,
            account_id: None,
            transaction_id: Some(transaction_id.to_string()),
            severity: Severity::Low,
            title: format!("{} alert", kind),
            message: format!("about {}", transaction_id),
            metadata: json!({ "detectionKind": kind.as_str() }),
        }
    }

    fn budget_alert(category: &str, month: &str) -> BudgetAlert {
        BudgetAlert {
            category_id: category.to_string(),
            severity: Severity::Medium,
            title: "Budget exceeded".to_string(),
            message: format!("{} is over budget", category),
            metadata: json!({ "month": month, "categoryId": category }),
        }
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert!(db.list_accounts("u1").unwrap().is_empty());
        assert!(db.list_transactions_for_user("u1").unwrap().is_empty());
        assert_eq!(db.count_unread_alerts("u1").unwrap(), 0);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");
        let path = path.to_str().unwrap();

        let db = Database::new_unencrypted(path).unwrap();
        db.upsert_account("acc-1", "u1", "Checking").unwrap();
        drop(db);

        let reopened = Database::new_unencrypted(path).unwrap();
        assert_eq!(reopened.list_accounts("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_account_upsert() {
        let db = Database::in_memory().unwrap();

        let account = db.upsert_account("acc-1", "u1", "Checking").unwrap();
        assert_eq!(account.user_id, "u1");
        assert!(!account.archived);

        // Upsert same account keeps the original row
        let again = db.upsert_account("acc-1", "u1", "Renamed").unwrap();
        assert_eq!(again.name, "Checking");
        assert_eq!(db.list_accounts("u1").unwrap().len(), 1);

        // Another user cannot claim the id
        assert!(db.upsert_account("acc-1", "u2", "Checking").is_err());
        assert!(db.list_accounts("u2").unwrap().is_empty());
    }

    #[test]
    fn test_archive_account() {
        let db = Database::in_memory().unwrap();
        db.upsert_account("acc-1", "u1", "Checking").unwrap();
        db.insert_transaction(&expense("t1", "acc-1", "Cafe", 4.5, 2)).unwrap();

        db.archive_account("acc-1").unwrap();
        assert!(db.get_account("acc-1").unwrap().unwrap().archived);

        // Existing history still counts; new rows are refused
        assert_eq!(db.list_transactions_for_user("u1").unwrap().len(), 1);
        assert!(db.insert_transaction(&expense("t2", "acc-1", "Cafe", 4.5, 3)).is_err());

        assert!(db.archive_account("missing").is_err());
    }

    #[test]
    fn test_insert_transaction() {
        let db = Database::in_memory().unwrap();
        db.upsert_account("acc-1", "u1", "Checking").unwrap();

        let mut tx = expense("t1", "acc-1", "Netflix", 15.99, 5);
        tx.category = Some("Subscriptions".to_string());

        assert!(db.insert_transaction(&tx).unwrap());
        // Duplicate id is ignored
        assert!(!db.insert_transaction(&tx).unwrap());

        let stored = db.get_transaction("t1").unwrap().unwrap();
        assert_eq!(stored, tx);

        assert!(db.delete_transaction("t1").unwrap());
        assert!(!db.delete_transaction("t1").unwrap());
    }

    #[test]
    fn test_insert_transaction_requires_account() {
        let db = Database::in_memory().unwrap();
        let result = db.insert_transaction(&expense("t1", "nope", "Cafe", 3.0, 1));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_transactions_for_user_spans_accounts() {
        let db = Database::in_memory().unwrap();
        db.upsert_account("acc-1", "u1", "Checking").unwrap();
        db.upsert_account("acc-2", "u1", "Credit").unwrap();
        db.upsert_account("acc-3", "u2", "Checking").unwrap();

        db.insert_transaction(&expense("t2", "acc-2", "Gym", 40.0, 9)).unwrap();
        db.insert_transaction(&expense("t1", "acc-1", "Cafe", 4.0, 3)).unwrap();
        db.insert_transaction(&expense("t3", "acc-3", "Cafe", 4.0, 4)).unwrap();

        let ids: Vec<String> = db
            .list_transactions_for_user("u1")
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["t1", "t2"]);
    }

    #[test]
    fn test_replace_detection_alerts() {
        let db = Database::in_memory().unwrap();

        let first = vec![
            alert(DetectionKind::Anomaly, "t1"),
            alert(DetectionKind::Recurring, "t2"),
        ];
        assert_eq!(db.replace_detection_alerts("u1", &first).unwrap(), 0);
        assert_eq!(db.list_alerts("u1").unwrap().len(), 2);

        let second = vec![alert(DetectionKind::Recurring, "t9")];
        assert_eq!(db.replace_detection_alerts("u1", &second).unwrap(), 2);

        let all = db.list_alerts("u1").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].transaction_id.as_deref(), Some("t9"));
        assert_eq!(all[0].alert_type, AlertType::Anomaly);
        assert_eq!(all[0].detection_kind(), Some(DetectionKind::Recurring));
        assert!(!all[0].is_read);
    }

    #[test]
    fn test_replace_leaves_other_users_and_budget_alerts() {
        let db = Database::in_memory().unwrap();

        db.replace_budget_alerts("u1", "2026-01", &[budget_alert("Dining", "2026-01")])
            .unwrap();
        db.replace_detection_alerts("u2", &[alert(DetectionKind::Anomaly, "x1")])
            .unwrap();
        db.replace_detection_alerts("u1", &[alert(DetectionKind::Anomaly, "t1")])
            .unwrap();

        // Clearing u1 keeps the budget row and u2's alert
        db.replace_detection_alerts("u1", &[]).unwrap();

        let u1 = db.list_alerts("u1").unwrap();
        assert_eq!(u1.len(), 1);
        assert_eq!(u1[0].alert_type, AlertType::Budget);
        assert_eq!(u1[0].detection_kind(), None);

        assert_eq!(db.list_alerts("u2").unwrap().len(), 1);
    }

    #[test]
    fn test_list_detection_alerts_by_kind() {
        let db = Database::in_memory().unwrap();
        let alerts = vec![
            alert(DetectionKind::Anomaly, "a1"),
            alert(DetectionKind::Anomaly, "a2"),
            alert(DetectionKind::Recurring, "r1"),
            alert(DetectionKind::Anomaly, "a3"),
        ];
        db.replace_detection_alerts("u1", &alerts).unwrap();

        let anomalies: Vec<Option<String>> = db
            .list_detection_alerts("u1", DetectionKind::Anomaly, 50)
            .unwrap()
            .into_iter()
            .map(|a| a.transaction_id)
            .collect();
        // Same sync, so insertion order is kept
        assert_eq!(
            anomalies,
            vec![Some("a1".into()), Some("a2".into()), Some("a3".into())]
        );

        let recurring = db
            .list_detection_alerts("u1", DetectionKind::Recurring, 50)
            .unwrap();
        assert_eq!(recurring.len(), 1);
        assert_eq!(recurring[0].metadata["detectionKind"], "recurring");

        let limited = db
            .list_detection_alerts("u1", DetectionKind::Anomaly, 2)
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_metadata_round_trip() {
        let db = Database::in_memory().unwrap();
        let mut a = alert(DetectionKind::Recurring, "t3");
        a.metadata = json!({
            "detectionKind": "recurring",
            "merchant": "Netflix",
            "transactionIds": ["t1", "t2", "t3"],
            "tolerance": 0.05,
        });
        db.replace_detection_alerts("u1", std::slice::from_ref(&a)).unwrap();

        let stored = db
            .list_detection_alerts("u1", DetectionKind::Recurring, 50)
            .unwrap();
        assert_eq!(stored[0].metadata, a.metadata);
        assert_eq!(stored[0].title, a.title);
        assert_eq!(stored[0].severity, Severity::Low);
    }

    #[test]
    fn test_mark_read_and_unread_count() {
        let db = Database::in_memory().unwrap();
        db.replace_detection_alerts(
            "u1",
            &[
                alert(DetectionKind::Anomaly, "a1"),
                alert(DetectionKind::Recurring, "r1"),
            ],
        )
        .unwrap();
        assert_eq!(db.count_unread_alerts("u1").unwrap(), 2);

        let id = db.list_alerts("u1").unwrap()[0].id;
        db.mark_alert_read(id).unwrap();
        assert_eq!(db.count_unread_alerts("u1").unwrap(), 1);

        assert!(matches!(db.mark_alert_read(9999), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_foreign_keys_enforced_on_every_connection() {
        let db = Database::in_memory().unwrap();

        // Hold two connections so the pool has to open a second one
        let first = db.conn().unwrap();
        let second = db.conn().unwrap();
        for conn in [&first, &second] {
            let enabled: i64 = conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap();
            assert_eq!(enabled, 1);
        }

        let orphan = second.execute(
            "INSERT INTO transactions (id, account_id, merchant, amount, date, type) VALUES ('t1', 'missing', 'Cafe', 4.5, '2026-01-02T09:30:00.000Z', 'expense')",
            [],
        );
        assert!(orphan.is_err());
    }

    #[test]
    fn test_delete_account_cascades() {
        let db = Database::in_memory().unwrap();
        db.upsert_account("acc-1", "u1", "Checking").unwrap();
        db.insert_transaction(&expense("t1", "acc-1", "Cafe", 4.5, 2)).unwrap();

        assert!(db.delete_account("acc-1").unwrap());
        assert!(db.get_transaction("t1").unwrap().is_none());
        assert!(!db.delete_account("acc-1").unwrap());
    }

    #[test]
    fn test_load_transactions_counts() {
        let db = Database::in_memory().unwrap();
        let batch = vec![
            expense("t1", "acc-1", "Cafe", 4.5, 2),
            expense("t2", "acc-2", "Grocer", 40.0, 3),
            expense("t3", "acc-1", "Cafe", 5.0, 4),
        ];

        let first = db.load_transactions("u1", &batch).unwrap();
        assert_eq!(
            first,
            LoadResult {
                accounts: 2,
                imported: 3,
                skipped: 0
            }
        );
        assert_eq!(db.get_account("acc-2").unwrap().unwrap().name, "acc-2");

        // Reloading skips every row by id
        let second = db.load_transactions("u1", &batch).unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(db.list_transactions_for_user("u1").unwrap().len(), 3);
    }

    #[test]
    fn test_load_transactions_is_atomic() {
        let db = Database::in_memory().unwrap();
        db.upsert_account("old", "u1", "Old").unwrap();
        db.archive_account("old").unwrap();

        // The fresh account and its row come first, then the archived one fails
        let batch = vec![
            expense("t1", "fresh", "Cafe", 4.5, 2),
            expense("t2", "old", "Grocer", 40.0, 3),
        ];
        let err = db.load_transactions("u1", &batch).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));

        assert!(db.get_account("fresh").unwrap().is_none());
        assert!(db.get_transaction("t1").unwrap().is_none());
        assert!(db.list_transactions_for_user("u1").unwrap().is_empty());
        assert_eq!(db.list_accounts("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_load_transactions_refuses_foreign_account() {
        let db = Database::in_memory().unwrap();
        db.upsert_account("acc-1", "u2", "Theirs").unwrap();

        let batch = vec![
            expense("t1", "mine", "Cafe", 4.5, 2),
            expense("t2", "acc-1", "Cafe", 4.5, 3),
        ];
        assert!(db.load_transactions("u1", &batch).is_err());
        assert!(db.list_accounts("u1").unwrap().is_empty());
    }

    #[test]
    fn test_set_and_list_budgets() {
        let db = Database::in_memory().unwrap();
        let jan = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();

        db.set_budget("u1", " Food ", jan, 300.0).unwrap();
        db.set_budget("u1", "Dining", jan, 120.0).unwrap();
        db.set_budget("u1", "Food", feb, 250.0).unwrap();
        // Overwrite in place
        db.set_budget("u1", "Food", jan, 320.0).unwrap();

        let budgets = db.list_budgets("u1", jan).unwrap();
        assert_eq!(budgets.len(), 2);
        assert_eq!(budgets[0].category, "Dining");
        assert_eq!(budgets[1].category, "Food");
        assert_eq!(budgets[1].month, "2026-01");
        assert_eq!(budgets[1].amount, 320.0);

        assert_eq!(db.list_budgets("u1", feb).unwrap().len(), 1);
        assert!(db.list_budgets("u2", jan).unwrap().is_empty());
    }

    #[test]
    fn test_set_budget_rejects_bad_input() {
        let db = Database::in_memory().unwrap();
        let jan = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        assert!(matches!(
            db.set_budget("u1", "Food", jan, -1.0),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            db.set_budget("u1", "Food", jan, f64::NAN),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            db.set_budget("u1", "  ", jan, 10.0),
            Err(Error::InvalidData(_))
        ));
        // Zero is a valid budget
        db.set_budget("u1", "Food", jan, 0.0).unwrap();
    }

    #[test]
    fn test_replace_budget_alerts_is_per_month() {
        let db = Database::in_memory().unwrap();
        db.replace_detection_alerts("u1", &[alert(DetectionKind::Anomaly, "t1")])
            .unwrap();
        db.replace_budget_alerts("u1", "2026-01", &[budget_alert("Food", "2026-01")])
            .unwrap();
        db.replace_budget_alerts(
            "u1",
            "2026-02",
            &[budget_alert("Food", "2026-02"), budget_alert("Fuel", "2026-02")],
        )
        .unwrap();

        let deleted = db
            .replace_budget_alerts("u1", "2026-02", &[budget_alert("Fuel", "2026-02")])
            .unwrap();
        assert_eq!(deleted, 2);

        let feb = db.list_budget_alerts("u1", "2026-02").unwrap();
        assert_eq!(feb.len(), 1);
        assert_eq!(feb[0].alert_type, AlertType::Budget);
        assert_eq!(feb[0].metadata["categoryId"], "Fuel");
        assert_eq!(feb[0].account_id, None);

        assert_eq!(db.list_budget_alerts("u1", "2026-01").unwrap().len(), 1);
        assert_eq!(
            db.list_detection_alerts("u1", DetectionKind::Anomaly, 50)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_encrypted_db_requires_matching_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.db");
        let path = path.to_str().unwrap();

        let db = Database::new_with_key(path, Some("correct horse")).unwrap();
        db.upsert_account("acc-1", "u1", "Checking").unwrap();
        drop(db);

        let reopened = Database::new_with_key(path, Some("correct horse")).unwrap();
        assert_eq!(reopened.list_accounts("u1").unwrap().len(), 1);
        drop(reopened);

        assert!(Database::new_with_key(path, Some("wrong")).is_err());
    }

    #[test]
    fn test_derive_key_is_stable() {
        let a = derive_key("passphrase").unwrap();
        let b = derive_key("passphrase").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, derive_key("other").unwrap());
        // 32-byte Argon2 output, hex encoded
        assert_eq!(a.len(), 64);
    }
}
