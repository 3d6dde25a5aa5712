use chrono::{TimeZone, Utc};
use resto_printer::{PrinterConfig, PrinterRegistry, PrinterService};
use shared::models::{ConfiguredPrinter, PrinterDevice, PrinterRole, TransportKind};

fn printer(id: &str, transport: TransportKind, role: PrinterRole, is_default: bool) -> ConfiguredPrinter {
    ConfiguredPrinter::from_device(
        PrinterDevice::new(id, Some(format!("POS {}", id)), transport),
        role,
        is_default,
    )
}

#[test]
fn test_registry_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("printers.redb");
    let at = Utc.with_ymd_and_hms(2024, 1, 22, 14, 32, 15).unwrap();

    {
        let registry = PrinterRegistry::open(&path).unwrap();
        registry
            .upsert(printer("DC:0D:30:AA:BB:CC", TransportKind::Classic, PrinterRole::Kot, false))
            .unwrap();
        registry
            .upsert(printer("AA:BB:CC:DD:EE:FF", TransportKind::Ble, PrinterRole::Bill, true))
            .unwrap();
        registry.touch_connected("AA:BB:CC:DD:EE:FF", at).unwrap();
    }

    let registry = PrinterRegistry::open(&path).unwrap();
    let printers = registry.list().unwrap();

    assert_eq!(printers.len(), 2);
    assert_eq!(printers[0].id, "DC:0D:30:AA:BB:CC");
    assert_eq!(printers[0].transport, TransportKind::Classic);
    assert_eq!(printers[0].role, PrinterRole::Kot);
    assert!(!printers[0].is_default);
    assert_eq!(printers[1].role, PrinterRole::Bill);
    assert!(printers[1].is_default);
    assert_eq!(printers[1].last_connected_at, Some(at));
}

#[test]
fn test_single_default_after_any_sequence() {
    let registry = PrinterRegistry::open_in_memory().unwrap();
    let ids = ["P1", "P2", "P3"];

    for (i, id) in ids.iter().enumerate() {
        registry
            .upsert(printer(id, TransportKind::Ble, PrinterRole::Both, i % 2 == 0))
            .unwrap();
    }
    registry.set_default("P2").unwrap();
    registry
        .upsert(printer("P1", TransportKind::Ble, PrinterRole::Kot, false))
        .unwrap();
    registry
        .upsert(printer("P3", TransportKind::Ble, PrinterRole::Bill, true))
        .unwrap();

    let printers = registry.list().unwrap();
    let defaults: Vec<&str> = printers
        .iter()
        .filter(|p| p.is_default)
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(defaults, vec!["P3"]);
    assert_eq!(printers.len(), 3);
}

#[test]
fn test_stored_as_camel_case_json() {
    let p = printer("AA", TransportKind::Ble, PrinterRole::Kot, true);
    let json = serde_json::to_value(&p).unwrap();

    assert_eq!(json["transport"], "BLE");
    assert_eq!(json["role"], "KOT");
    assert_eq!(json["isDefault"], true);
    assert!(json.get("lastConnectedAt").is_some());
}

#[test]
fn test_service_opens_registry_in_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = PrinterConfig::with_overrides(dir.path().join("nested"));

    {
        let service = PrinterService::open(&config).unwrap();
        service
            .configure(
                PrinterDevice::new("AA:BB:CC:DD:EE:FF", Some("POS-58".into()), TransportKind::Ble),
                PrinterRole::Both,
                true,
            )
            .unwrap();
    }

    assert!(config.registry_path().exists());
    let reopened = PrinterRegistry::open(config.registry_path()).unwrap();
    assert_eq!(reopened.get_default().unwrap().unwrap().id, "AA:BB:CC:DD:EE:FF");
}
