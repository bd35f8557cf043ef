//! Dispatch board, dashboard reads, device store and configuration

mod common;

use std::io::Write;

use chrono::NaiveDate;
use common::job;
use doorflow_field::api::{DispatchDay, DispatchEntry, MobileStatus, Role, Truck, User};
use doorflow_field::backend::users_with_role;
use doorflow_field::config::{ConfigOrigin, EffectiveConfig, LogFormat};
use doorflow_field::mock::MockBackend;
use doorflow_field::store::PendingChange;
use doorflow_field::{Backend, Column, DeviceStore, DispatchBoard};
use tempfile::{NamedTempFile, TempDir};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn entry(job_id: &str, truck: Option<&str>, order: Option<u32>) -> DispatchEntry {
    DispatchEntry {
        job_id: job_id.to_string(),
        job_number: format!("J-{}", job_id),
        customer_name: "Customer".to_string(),
        truck_id: truck.map(str::to_string),
        job_order: order,
        is_visible: true,
    }
}

#[test]
fn test_dispatch_board_save_round_trip() {
    let backend = MockBackend::new();
    backend.insert_dispatch_day(DispatchDay {
        date: date(),
        trucks: vec![
            Truck {
                id: "t1".to_string(),
                name: "North crew".to_string(),
            },
            Truck {
                id: "t2".to_string(),
                name: "South crew".to_string(),
            },
        ],
        jobs: vec![entry("a", Some("t1"), Some(1)), entry("b", None, None), entry("c", Some("t1"), Some(2))],
    });

    let mut board = DispatchBoard::from_day(&backend.dispatch(date()).unwrap());
    board.move_job("b", &Column::Truck("t1".to_string()), 0).unwrap();
    board.move_job("c", &Column::Truck("t2".to_string()), 0).unwrap();
    backend.save_dispatch(&board.to_request()).unwrap();

    let saved = backend.saved_dispatch();
    assert_eq!(saved.len(), 1);
    let rows: Vec<(&str, &str, u32)> = saved[0]
        .assignments
        .iter()
        .map(|a| (a.job_id.as_str(), a.truck_id.as_str(), a.job_order))
        .collect();
    assert_eq!(rows, vec![("b", "t1", 1), ("a", "t1", 2), ("c", "t2", 1)]);

    // Reloading the day shows the saved layout
    let reloaded = DispatchBoard::from_day(&backend.dispatch(date()).unwrap());
    assert_eq!(reloaded.locate("b"), Some((&Column::Truck("t1".to_string()), 0)));
    assert_eq!(reloaded.locate("c"), Some((&Column::Truck("t2".to_string()), 0)));
    assert!(reloaded.column(&Column::Unassigned).unwrap().cards.is_empty());
}

#[test]
fn test_users_filtered_by_role() {
    let backend = MockBackend::new();
    let user = |id: &str, role: Role| User {
        id: id.to_string(),
        username: id.to_string(),
        full_name: None,
        role,
        is_active: true,
    };
    backend.set_users(vec![
        user("u1", Role::Technician),
        user("u2", Role::Dispatcher),
        user("u3", Role::Technician),
    ]);

    let techs = users_with_role(&backend, &Role::Technician).unwrap();
    let ids: Vec<&str> = techs.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["u1", "u3"]);
}

#[test]
fn test_field_summary_counts() {
    let backend = MockBackend::with_jobs([
        job("J1", 1, MobileStatus::NotStarted),
        job("J2", 1, MobileStatus::Started),
        job("J3", 1, MobileStatus::Started),
    ]);
    let summary = backend.field_summary().unwrap();
    assert_eq!(summary.today, 3);
    assert_eq!(summary.not_started, 1);
    assert_eq!(summary.started, 2);
    assert_eq!(summary.completed, 0);
}

#[test]
fn test_cache_round_trip_across_reopen() {
    let dir = TempDir::new().unwrap();
    let original = job("J1", 3, MobileStatus::Started);
    {
        let store = DeviceStore::open(dir.path()).unwrap();
        store.cache().put("J1", &original).unwrap();
    }
    let store = DeviceStore::open(dir.path()).unwrap();
    assert_eq!(store.cache().get("J1").unwrap(), Some(original));
    assert_eq!(store.cache().job_ids().unwrap(), vec!["J1".to_string()]);
}

#[test]
fn test_queue_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = DeviceStore::open(dir.path()).unwrap();
        for (door, completed) in [("door1", true), ("door2", true)] {
            store
                .queue()
                .enqueue(
                    "J1",
                    PendingChange::LineItem {
                        door_id: door.to_string(),
                        line_item_id: "item".to_string(),
                        completed,
                    },
                )
                .unwrap();
        }
    }
    let store = DeviceStore::open(dir.path()).unwrap();
    let seqs: Vec<u64> = store.queue().pending("J1").unwrap().iter().map(|c| c.seq).collect();
    assert_eq!(seqs, vec![1, 2]);
    assert_eq!(store.queue().jobs_with_pending().unwrap(), vec!["J1".to_string()]);
}

#[test]
fn test_config_layers_host_file_and_cli() {
    let mut host = NamedTempFile::new().unwrap();
    writeln!(host, "[api]").unwrap();
    writeln!(host, "base_url = \"https://dispatch.example.com/api\"").unwrap();
    writeln!(host, "token = \"field-token\"").unwrap();
    writeln!(host, "[log]").unwrap();
    writeln!(host, "level = \"debug\"").unwrap();
    writeln!(host, "format = \"json\"").unwrap();

    let cli = serde_json::json!({"log": {"level": "warn"}, "store": {"root": "/var/lib/doorflow"}});
    let config = EffectiveConfig::load(Some(host.path()), Some(cli)).unwrap();

    let origins: Vec<ConfigOrigin> = config.sources.iter().map(|s| s.origin.clone()).collect();
    assert_eq!(origins, vec![ConfigOrigin::Builtin, ConfigOrigin::Host, ConfigOrigin::Cli]);

    let settings = config.settings().unwrap();
    assert_eq!(settings.api.base_url, "https://dispatch.example.com/api");
    assert_eq!(settings.api.token.as_deref(), Some("field-token"));
    assert_eq!(settings.api.timeout_seconds, 30);
    assert_eq!(settings.log.level, "warn");
    assert_eq!(settings.log.format, LogFormat::Json);
    assert_eq!(settings.store_root(), std::path::PathBuf::from("/var/lib/doorflow"));

    let shown = serde_json::to_value(config.redacted()).unwrap();
    assert_eq!(shown["config"]["api"]["token"], "[REDACTED]");
    assert!(!shown.to_string().contains("field-token"));
}
