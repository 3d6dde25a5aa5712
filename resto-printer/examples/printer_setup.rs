//! Printer setup walkthrough
//!
//! ```bash
//! cargo run -p resto-printer --example printer_setup -- scan ble
//! cargo run -p resto-printer --example printer_setup -- add DC:0D:30:AA:BB:CC classic kot default
//! cargo run -p resto-printer --example printer_setup -- test DC:0D:30:AA:BB:CC
//! cargo run -p resto-printer --example printer_setup -- kot
//! cargo run -p resto-printer --example printer_setup -- list
//! ```
//!
//! Configuration comes from the environment (and `.env`); see `PrinterConfig`.

use resto_printer::{DocumentKind, PrinterConfig, PrinterService, ScanOutcome, logger};
use shared::models::{Order, OrderItem, PrinterDevice, PrinterRole, Settings, TransportKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = PrinterConfig::from_env();
    logger::init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    let service = PrinterService::open(&config)?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let result = match args.as_slice() {
        ["scan", transport] => scan(&service, parse_transport(transport)?).await,
        ["add", id, transport, role, rest @ ..] => add(
            &service,
            id,
            parse_transport(transport)?,
            parse_role(role)?,
            rest.contains(&"default"),
        ),
        ["default", id] => service.set_default(id).map_err(Into::into),
        ["remove", id] => service.remove(id).await.map(|_| ()).map_err(Into::into),
        ["test", id] => service.test_print(id).await.map(|o| {
            println!("Sent {} bytes to {}", o.bytes, o.device_id);
        }).map_err(Into::into),
        ["kot"] => print_sample(&service, DocumentKind::Kot).await,
        ["bill"] => print_sample(&service, DocumentKind::Bill).await,
        ["list"] | [] => list(&service),
        _ => Err("usage: scan <ble|classic> | add <id> <ble|classic> <kot|bill|both> [default] | default <id> | remove <id> | test <id> | kot | bill | list".into()),
    };

    service.shutdown().await;
    result
}

async fn scan(
    service: &PrinterService,
    transport: TransportKind,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning {} ...", transport);
    let outcome = service
        .scan(transport, |device| {
            println!("  found {} ({})", device.display_name(), device.id);
        })
        .await;

    match outcome {
        Ok(ScanOutcome::Found(devices)) => {
            println!("{} printer(s) found", devices.len());
            Ok(())
        }
        Ok(outcome @ ScanOutcome::NotFound) => {
            println!("{}", outcome.user_message().unwrap_or_default());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}

fn add(
    service: &PrinterService,
    id: &str,
    transport: TransportKind,
    role: PrinterRole,
    is_default: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let device = PrinterDevice::new(id, None, transport);
    let printer = service.configure(device, role, is_default)?;
    println!("Saved {} as {} printer", printer.display_name(), printer.role);
    Ok(())
}

fn list(service: &PrinterService) -> Result<(), Box<dyn std::error::Error>> {
    for p in service.printers()? {
        println!(
            "{} {:<20} {:<8} {:<5} last connected: {}",
            if p.is_default { "*" } else { " " },
            p.display_name(),
            p.transport.to_string(),
            p.role.to_string(),
            p.last_connected_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string()),
        );
    }
    Ok(())
}

async fn print_sample(
    service: &PrinterService,
    kind: DocumentKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut order = Order::dine_in(
        5,
        vec![
            OrderItem::new("Paneer Tikka", 2, 180.0).with_instructions("no onions"),
            OrderItem::new("Butter Naan", 3, 40.0).with_modifier("extra butter"),
        ],
    );
    let settings = Settings::default();
    order.tax = order.subtotal * settings.tax_rate();
    order.total = order.subtotal + order.tax;

    match service.print_order(kind, &order, Some(&settings)).await {
        Ok(outcome) => {
            println!("{} sent to {} ({} bytes)", kind, outcome.device_id, outcome.bytes);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}

fn parse_transport(s: &str) -> Result<TransportKind, Box<dyn std::error::Error>> {
    match s.to_lowercase().as_str() {
        "ble" => Ok(TransportKind::Ble),
        "classic" => Ok(TransportKind::Classic),
        other => Err(format!("unknown transport: {}", other).into()),
    }
}

fn parse_role(s: &str) -> Result<PrinterRole, Box<dyn std::error::Error>> {
    match s.to_lowercase().as_str() {
        "kot" => Ok(PrinterRole::Kot),
        "bill" => Ok(PrinterRole::Bill),
        "both" => Ok(PrinterRole::Both),
        other => Err(format!("unknown role: {}", other).into()),
    }
}
