use chrono::{NaiveDate, NaiveDateTime};
use resto_printer::{
    format_bill, format_kot, DocumentKind, ReceiptFormatter, TextEncoding,
};
use shared::models::{Order, OrderItem, Settings};

fn printed_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 22)
        .and_then(|d| d.and_hms_opt(14, 32, 15))
        .unwrap()
}

fn order() -> Order {
    let mut order = Order::dine_in(
        5,
        vec![
            OrderItem::new("Paneer Tikka", 2, 180.0).with_instructions("no onions"),
            OrderItem::new("Chicken Biryani Special", 1, 250.0),
        ],
    );
    order.id = Some("65f1a2b3c4d5e6f7a8b9c0d1".into());
    order.tax = 30.5;
    order.total = 640.5;
    order
}

fn settings() -> Settings {
    Settings {
        restaurant_name: Some("Spice Route".into()),
        currency: Some("₹".into()),
        tax_rate: Some(0.05),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn takeout_order() -> Order {
    let mut order = Order::takeout(
        42,
        vec![
            OrderItem::new("Masala Dosa", 3, 90.0),
            OrderItem::new("Filter Coffee", 2, 35.0).with_modifier("less sugar"),
        ],
    );
    order.tax = 17.0;
    order.total = 357.0;
    order
}

/// Amount on the printed TOTAL line, without the currency symbol
fn printed_total(order: &Order) -> String {
    let lines = format_bill(order, &settings(), printed_at()).text_lines();
    let total = lines.iter().find(|l| l.starts_with("TOTAL:")).unwrap();
    total.rsplit('₹').next().unwrap().to_string()
}

/// `Some((expected, printed))` when the printed total is not subtotal + tax
fn total_mismatch(order: &Order) -> Option<(String, String)> {
    let expected = format!("{:.2}", order.subtotal + order.tax);
    let printed = printed_total(order);
    (expected != printed).then_some((expected, printed))
}

#[test]
fn test_same_input_same_bytes() {
    let a = format_bill(&order(), &settings(), printed_at()).encode();
    let b = format_bill(&order(), &settings(), printed_at()).encode();
    assert_eq!(a, b);

    let k1 = format_kot(&order(), printed_at()).encode();
    let k2 = format_kot(&order(), printed_at()).encode();
    assert_eq!(k1, k2);
}

#[test]
fn test_documents_start_with_init_and_end_with_cut() {
    for kind in [DocumentKind::Kot, DocumentKind::Bill] {
        let bytes = ReceiptFormatter::default()
            .format(kind, &order(), &settings(), printed_at())
            .encode();
        assert_eq!(&bytes[..2], &[0x1B, 0x40], "{kind} must start with ESC @");
        assert_eq!(&bytes[bytes.len() - 3..], &[0x1D, 0x56, 0x00], "{kind} must end with GS V 0");
    }
}

#[test]
fn test_total_printed_as_given() {
    // 360 + 250 + 30.5 = 640.5, but the order says otherwise
    let mut order = order();
    order.total = 700.0;

    let lines = format_bill(&order, &settings(), printed_at()).text_lines();
    let total = lines.iter().find(|l| l.starts_with("TOTAL:")).unwrap();
    assert!(total.ends_with("₹700.00"));
    assert!(lines.iter().any(|l| l.starts_with("Subtotal:") && l.ends_with("₹610.00")));
}

#[test]
fn test_consistent_orders_total_subtotal_plus_tax() {
    for order in [order(), takeout_order()] {
        assert_eq!(
            total_mismatch(&order),
            None,
            "order {:?} prints a total other than subtotal + tax",
            order.id
        );
    }
}

#[test]
fn test_inconsistent_order_is_flagged() {
    let mut order = order();
    order.total = 700.0;

    let mismatch = total_mismatch(&order);
    assert_eq!(mismatch, Some(("640.50".to_string(), "700.00".to_string())));
}

#[test]
fn test_every_bill_line_fits_the_paper() {
    let lines = format_bill(&order(), &settings(), printed_at()).text_lines();

    assert!(lines.iter().any(|l| l.starts_with("Chicken Birya...")));
    for line in lines {
        assert!(line.chars().count() <= 32, "line too wide: {line:?}");
    }
}

#[test]
fn test_gbk_bill_replaces_rupee_sign() {
    let formatter = ReceiptFormatter::new(32, TextEncoding::Gbk);
    let bytes = formatter
        .format_bill(&order(), &settings(), printed_at())
        .encode();

    assert!(contains(&bytes, b"Rs.640.50"));
    assert!(!contains(&bytes, "₹".as_bytes()));
    // FS & then FS C 1 after init
    assert_eq!(&bytes[2..7], &[0x1C, 0x26, 0x1C, 0x43, 0x01]);
}

#[test]
fn test_wide_paper_bill() {
    let formatter = ReceiptFormatter::new(48, TextEncoding::Utf8);
    let lines = formatter
        .format_bill(&order(), &settings(), printed_at())
        .text_lines();

    let row = lines.iter().find(|l| l.starts_with("Paneer Tikka")).unwrap();
    assert_eq!(row.chars().count(), 48);
    assert!(row.ends_with("₹360.00"));
}
