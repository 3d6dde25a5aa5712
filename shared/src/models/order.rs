//! Order Model
//!
//! Order shape as delivered by the REST API (camelCase fields).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order type: dine-in at a table, or takeout against a token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum OrderType {
    #[default]
    #[serde(rename = "dine-in")]
    DineIn,
    #[serde(rename = "takeout")]
    Takeout,
}

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub menu_item_id: Option<String>,
    pub name: String,
    pub quantity: u32,
    /// Unit price in currency unit
    pub price: f64,
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Kitchen instructions ("no onions")
    #[serde(default)]
    pub instructions: Option<String>,
}

impl OrderItem {
    pub fn new(name: impl Into<String>, quantity: u32, price: f64) -> Self {
        Self {
            menu_item_id: None,
            name: name.into(),
            quantity,
            price,
            modifiers: Vec::new(),
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    /// Line amount (`price * quantity`)
    pub fn amount(&self) -> f64 {
        self.price * self.quantity as f64
    }

    /// Instructions, if present and not blank
    pub fn note(&self) -> Option<&str> {
        self.instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub order_type: OrderType,
    #[serde(default)]
    pub table_number: Option<u32>,
    #[serde(default)]
    pub token_number: Option<u32>,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    #[serde(default)]
    pub tax: f64,
    pub total: f64,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Dine-in order for a table
    pub fn dine_in(table_number: u32, items: Vec<OrderItem>) -> Self {
        Self::with_totals(OrderType::DineIn, Some(table_number), None, items)
    }

    /// Takeout order for a token
    pub fn takeout(token_number: u32, items: Vec<OrderItem>) -> Self {
        Self::with_totals(OrderType::Takeout, None, Some(token_number), items)
    }

    fn with_totals(
        order_type: OrderType,
        table_number: Option<u32>,
        token_number: Option<u32>,
        items: Vec<OrderItem>,
    ) -> Self {
        let subtotal = items.iter().map(OrderItem::amount).sum();
        Self {
            id: None,
            order_type,
            table_number,
            token_number,
            items,
            subtotal,
            tax: 0.0,
            total: subtotal,
            payment_method: None,
            created_at: None,
        }
    }

    /// Bill number: last 8 characters of the order id, uppercased
    pub fn bill_number(&self) -> String {
        match self.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => {
                let chars: Vec<char> = id.chars().collect();
                let start = chars.len().saturating_sub(8);
                chars[start..].iter().collect::<String>().to_uppercase()
            }
            None => "N/A".to_string(),
        }
    }

    /// Table line for dine-in, token line for takeout
    pub fn identity_line(&self) -> String {
        match self.order_type {
            OrderType::DineIn => match self.table_number {
                Some(n) => format!("Table: {}", n),
                None => "Table: -".to_string(),
            },
            OrderType::Takeout => match self.token_number {
                Some(n) => format!("Takeout Token: #{}", n),
                None => "Takeout Token: #-".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_api_order() {
        let json = r#"{
            "_id": "65f1a2b3c4d5e6f7a8b9c0d1",
            "orderType": "dine-in",
            "tableNumber": 5,
            "items": [{"menuItemId": "m1", "name": "Paneer Tikka", "quantity": 2, "price": 180, "instructions": "no onions"}],
            "subtotal": 360,
            "tax": 18,
            "total": 378,
            "paymentMethod": "cash"
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_type, OrderType::DineIn);
        assert_eq!(order.table_number, Some(5));
        assert_eq!(order.items[0].note(), Some("no onions"));
        assert_eq!(order.payment_method.as_deref(), Some("cash"));
    }

    #[test]
    fn test_bill_number() {
        let mut order = Order::takeout(12, vec![]);
        assert_eq!(order.bill_number(), "N/A");

        order.id = Some("65f1a2b3c4d5e6f7a8b9c0d1".to_string());
        assert_eq!(order.bill_number(), "A8B9C0D1");

        order.id = Some("abc".to_string());
        assert_eq!(order.bill_number(), "ABC");
    }

    #[test]
    fn test_identity_line() {
        assert_eq!(Order::dine_in(5, vec![]).identity_line(), "Table: 5");
        assert_eq!(
            Order::takeout(42, vec![]).identity_line(),
            "Takeout Token: #42"
        );
    }

    #[test]
    fn test_blank_instructions_ignored() {
        let item = OrderItem::new("Dal", 1, 120.0).with_instructions("   ");
        assert_eq!(item.note(), None);
    }
}
