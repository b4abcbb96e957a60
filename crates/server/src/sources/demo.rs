//! Bundled sample records served when ERPNext is not reachable

use serde_json::{json, Value};
use template::{flatten_object, Record};

fn sales_invoices() -> Value {
    json!([
        {
            "name": "ACC-SINV-2024-00001",
            "customer": "Acme Corporation",
            "posting_date": "2024-03-01",
            "due_date": "2024-03-31",
            "currency": "USD",
            "grand_total": 1250.0,
            "status": "Paid",
            "items": [
                { "item_code": "WIDGET-01", "qty": 10, "rate": 100.0, "amount": 1000.0 },
                { "item_code": "SERVICE-01", "qty": 1, "rate": 250.0, "amount": 250.0 }
            ]
        },
        {
            "name": "ACC-SINV-2024-00002",
            "customer": "Globex Ltd",
            "posting_date": "2024-03-04",
            "due_date": "2024-04-03",
            "currency": "USD",
            "grand_total": 480.5,
            "status": "Unpaid",
            "items": [
                { "item_code": "WIDGET-02", "qty": 5, "rate": 96.1, "amount": 480.5 }
            ]
        },
        {
            "name": "ACC-SINV-2024-00003",
            "customer": "Initech",
            "posting_date": "2024-03-09",
            "due_date": "2024-04-08",
            "currency": "EUR",
            "grand_total": 89.9,
            "status": "Overdue",
            "items": [
                { "item_code": "CABLE-01", "qty": 2, "rate": 44.95, "amount": 89.9 }
            ]
        }
    ])
}

fn customers() -> Value {
    json!([
        { "name": "Acme Corporation", "customer_group": "Commercial", "territory": "United States", "email_id": "billing@acme.example" },
        { "name": "Globex Ltd", "customer_group": "Commercial", "territory": "United Kingdom", "email_id": "accounts@globex.example" },
        { "name": "Initech", "customer_group": "Individual", "territory": "Germany", "email_id": "ap@initech.example" }
    ])
}

fn report_rows() -> Value {
    json!([
        { "customer": "Acme Corporation", "invoiced_amount": 1250.0, "paid_amount": 1250.0, "outstanding_amount": 0.0 },
        { "customer": "Globex Ltd", "invoiced_amount": 480.5, "paid_amount": 0.0, "outstanding_amount": 480.5 },
        { "customer": "Initech", "invoiced_amount": 89.9, "paid_amount": 0.0, "outstanding_amount": 89.9 }
    ])
}

fn to_records(value: Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(flatten_object(map)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Sample documents for a doctype; unknown doctypes get invoices
pub fn documents(doctype: &str) -> Vec<Record> {
    let mut records = match doctype.to_ascii_lowercase().as_str() {
        "customer" => to_records(customers()),
        _ => to_records(sales_invoices()),
    };
    for record in &mut records {
        record.insert("doctype".to_string(), Value::String(doctype.to_string()));
    }
    records
}

/// One sample document by name
pub fn document(doctype: &str, name: &str) -> Option<Record> {
    documents(doctype)
        .into_iter()
        .find(|r| r.get("name").and_then(Value::as_str) == Some(name))
}

/// Sample rows for any report
pub fn report(_report: &str) -> Vec<Record> {
    to_records(report_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_documents_are_flattened() {
        let docs = documents("Sales Invoice");
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0]["items.0.item_code"], json!("WIDGET-01"));
        assert_eq!(docs[0]["doctype"], json!("Sales Invoice"));
    }

    #[test]
    fn test_document_by_name() {
        assert!(document("Customer", "Initech").is_some());
        assert!(document("Customer", "Nobody").is_none());
    }

    #[test]
    fn test_report() {
        assert_eq!(report("Accounts Receivable").len(), 3);
    }
}
