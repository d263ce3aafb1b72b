//! End-to-end demo: an expense grid backed by an in-memory store.
//!
//! Run with `cargo run --example expense_grid` (set `RUST_LOG=debug` to
//! watch the coordinator's cache and gateway decisions).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tabula_core::{
    Direction, FieldDef, FieldType, FieldValue, GatewayError, Predicate, Record,
    RecordDescriptor, SortKey, SortSpec, Status, ValidationRules,
};
use tabula_view::{CoordinatorConfig, PersistenceGateway, RecordSource, ViewCoordinator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// A store that keeps everything in a mutex-guarded map, keyed by month.
struct MemoryStore {
    rows: Mutex<Vec<(String, Record)>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    fn new(seed: Vec<(&str, Record)>) -> Self {
        let max_id = seed.iter().map(|(_, r)| r.id).max().unwrap_or(0);
        Self {
            rows: Mutex::new(
                seed.into_iter().map(|(k, r)| (k.to_string(), r)).collect(),
            ),
            next_id: AtomicI64::new(max_id + 1),
        }
    }
}

#[async_trait::async_trait]
impl PersistenceGateway for MemoryStore {
    async fn create(&self, record: &Record) -> Result<Record, GatewayError> {
        let mut canonical = record.clone();
        canonical.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .map_err(|_| GatewayError::Transport("store poisoned".into()))?
            .push(("2024-05".to_string(), canonical.clone()));
        Ok(canonical)
    }

    async fn update(&self, record: &Record) -> Result<Record, GatewayError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| GatewayError::Transport("store poisoned".into()))?;
        match rows.iter_mut().find(|(_, r)| r.id == record.id) {
            Some((_, slot)) => {
                *slot = record.clone();
                Ok(record.clone())
            }
            None => Err(GatewayError::Rejected(format!("no row {}", record.id))),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), GatewayError> {
        self.rows
            .lock()
            .map_err(|_| GatewayError::Transport("store poisoned".into()))?
            .retain(|(_, r)| r.id != id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordSource for MemoryStore {
    async fn fetch(&self, key: &String) -> Result<Vec<Record>, GatewayError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| GatewayError::Transport("store poisoned".into()))?;
        Ok(rows
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, r)| r.clone())
            .collect())
    }
}

fn expense(id: i64, status: &str, label: &str, amount: f64) -> Record {
    Record::new(id, Status::new(status))
        .with_field("label", FieldValue::Text(label.into()))
        .with_field("amount", FieldValue::Number(amount))
}

fn print_grid(title: &str, records: &[Record]) {
    println!("--- {title}");
    for record in records {
        let label = record
            .field("label")
            .and_then(|v| v.as_text())
            .unwrap_or("(unnamed)");
        let amount = record
            .field("amount")
            .and_then(|v| v.as_number())
            .unwrap_or(0.0);
        println!("  [{:>3}] {:<20} {:>8.2}  {}", record.id, label, amount, record.status);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabula_view=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let descriptor = Arc::new(
        RecordDescriptor::new(
            "expense",
            vec![
                FieldDef::required("label", FieldType::Text),
                FieldDef::required("amount", FieldType::Number),
            ],
            vec![Status::new("PENDING"), Status::new("PAID")],
            Status::new("PENDING"),
        )?
        .with_transition("PENDING", "PAID"),
    );
    let rules = ValidationRules::for_descriptor(&descriptor);

    let store = Arc::new(MemoryStore::new(vec![
        ("2024-05", expense(1, "PENDING", "Office chairs", 100.0)),
        ("2024-05", expense(2, "PAID", "Team lunch", 50.0)),
        ("2024-04", expense(3, "PAID", "Printer paper", 12.5)),
    ]));

    let config = CoordinatorConfig::from_env()?;
    let mut view = ViewCoordinator::new(
        descriptor,
        rules,
        "2024-05",
        config.new_shared_cache(),
        store.clone(),
        store,
        config,
    );
    view.set_sort(
        SortSpec::by(SortKey::StatusPriority, Direction::Ascending)
            .then(SortKey::Field("amount".into()), Direction::Descending),
    );

    view.refresh("2024-05").await?;
    print_grid("May, all rows", &view.visible_records());

    // narrow to unpaid expenses
    view.set_filter(Predicate::any().with_status("PENDING"));
    print_grid("May, PENDING only", &view.visible_records());

    // inline-create a new expense the way a grid would: keystroke by command
    view.begin_create()?;
    view.input_text("label", "Client dinner")?;
    view.input_text("amount", "abc")?; // nothing survives the filter
    view.input_text("amount", "180.50")?;
    print_grid("May, draft anchored first", &view.visible_records());

    let outcome = view.commit().await;
    println!("commit -> {outcome:?}");
    print_grid("May, after save", &view.visible_records());

    // edit the saved row and mark it paid
    let saved_id = view.visible_records()[0].id;
    view.begin_edit(saved_id)?;
    view.advance_status(Status::new("PAID"))?;
    let outcome = view.commit().await;
    println!("commit -> {outcome:?}");

    // PAID rows no longer match the PENDING filter
    print_grid("May, PENDING only again", &view.visible_records());

    Ok(())
}
