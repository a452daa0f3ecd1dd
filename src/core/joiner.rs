use crate::domain::model::{ClientRecord, MergedRecord, TransactionRecord};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    pub records: Vec<MergedRecord>,
    pub unmatched: usize,
}

/// 以 client_id 內連接交易與客戶；重複的客戶 id 會產生多筆配對
pub fn merge_tables(transactions: &[TransactionRecord], clients: &[ClientRecord]) -> JoinOutcome {
    let mut by_id: HashMap<&str, Vec<&ClientRecord>> = HashMap::new();
    for client in clients {
        by_id.entry(client.id.as_str()).or_default().push(client);
    }

    let mut outcome = JoinOutcome::default();
    for transaction in transactions {
        match by_id.get(transaction.client_id.as_str()) {
            Some(matches) => outcome.records.extend(matches.iter().map(|client| MergedRecord {
                transaction: transaction.clone(),
                client: (*client).clone(),
            })),
            None => outcome.unmatched += 1,
        }
    }

    if outcome.unmatched > 0 {
        tracing::info!("Merge: {} unmatched transactions found", outcome.unmatched);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn transaction(id: &str, client_id: &str) -> TransactionRecord {
        TransactionRecord {
            transaction_id: id.to_string(),
            client_id: client_id.to_string(),
            amount: 10.0,
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            payment_method: "card".to_string(),
            service: "tax".to_string(),
            city: "Omsk".to_string(),
            consultant: "Petrov".to_string(),
        }
    }

    fn client(id: &str, net_worth: f64) -> ClientRecord {
        ClientRecord {
            id: id.to_string(),
            gender: "F".to_string(),
            net_worth,
            age: Some(30.0),
        }
    }

    #[test]
    fn test_inner_join_drops_and_counts_unmatched() {
        let transactions = vec![transaction("t1", "1"), transaction("t2", "2"), transaction("t3", "9")];
        let clients = vec![client("1", 5.0), client("2", 6.0)];

        let outcome = merge_tables(&transactions, &clients);

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.unmatched, 1);
        for record in &outcome.records {
            let matched = clients.iter().find(|c| c.id == record.transaction.client_id).unwrap();
            assert_eq!(&record.client, matched);
        }
    }

    #[test]
    fn test_duplicate_client_ids_produce_every_pair() {
        let transactions = vec![transaction("t1", "1")];
        let clients = vec![client("1", 5.0), client("1", 7.0)];

        let outcome = merge_tables(&transactions, &clients);

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].client.net_worth, 5.0);
        assert_eq!(outcome.records[1].client.net_worth, 7.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(merge_tables(&[], &[client("1", 0.0)]), JoinOutcome::default());
        let outcome = merge_tables(&[transaction("t1", "1")], &[]);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.unmatched, 1);
    }
}
