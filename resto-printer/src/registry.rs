//! Printer registry
//!
//! The configured printers persist as one JSON array under a single redb key.
//! Every mutation is read-modify-write inside one write transaction, so at
//! most one entry is ever stored with `isDefault = true`.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::models::{ConfiguredPrinter, PrinterRole};
use thiserror::Error;
use tracing::{debug, info};

/// Settings table: key = setting name, value = JSON
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("printer_settings");

/// Key holding the configured printer list
const PRINTERS_KEY: &str = "configured_printers";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Printer not found: {0}")]
    PrinterNotFound(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Persistent list of configured printers
#[derive(Clone)]
pub struct PrinterRegistry {
    db: Arc<Database>,
}

impl PrinterRegistry {
    /// Open or create the registry database
    pub fn open(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Registry that lives only as long as the value (tests, demos)
    pub fn open_in_memory() -> RegistryResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> RegistryResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SETTINGS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// All configured printers, in insertion order
    pub fn list(&self) -> RegistryResult<Vec<ConfiguredPrinter>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;

        match table.get(PRINTERS_KEY)? {
            Some(guard) => Ok(serde_json::from_slice(guard.value())?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get(&self, id: &str) -> RegistryResult<Option<ConfiguredPrinter>> {
        Ok(self.list()?.into_iter().find(|p| p.id == id))
    }

    pub fn get_default(&self) -> RegistryResult<Option<ConfiguredPrinter>> {
        Ok(self.list()?.into_iter().find(|p| p.is_default))
    }

    /// Insert or replace by id
    ///
    /// A default entry clears the flag on every other entry. Replacing keeps
    /// the entry's position.
    pub fn upsert(&self, printer: ConfiguredPrinter) -> RegistryResult<()> {
        let id = printer.id.clone();
        self.mutate(|printers| {
            if printer.is_default {
                for p in printers.iter_mut() {
                    p.is_default = false;
                }
            }
            match printers.iter_mut().find(|p| p.id == printer.id) {
                Some(slot) => *slot = printer,
                None => printers.push(printer),
            }
            Ok(())
        })?;
        info!(printer_id = %id, "Printer saved");
        Ok(())
    }

    /// Remove by id, returning the removed entry
    ///
    /// Removing the default leaves the registry without one.
    pub fn remove(&self, id: &str) -> RegistryResult<Option<ConfiguredPrinter>> {
        let removed = self.mutate(|printers| {
            Ok(printers
                .iter()
                .position(|p| p.id == id)
                .map(|index| printers.remove(index)))
        })?;
        if removed.is_some() {
            info!(printer_id = %id, "Printer removed");
        }
        Ok(removed)
    }

    /// Make `id` the only default
    pub fn set_default(&self, id: &str) -> RegistryResult<()> {
        self.mutate(|printers| {
            if !printers.iter().any(|p| p.id == id) {
                return Err(RegistryError::PrinterNotFound(id.to_string()));
            }
            for p in printers.iter_mut() {
                p.is_default = p.id == id;
            }
            Ok(())
        })?;
        info!(printer_id = %id, "Default printer set");
        Ok(())
    }

    /// Printer that should receive documents for `role`
    ///
    /// The default printer wins when it serves the role; otherwise the first
    /// entry that does.
    pub fn resolve(&self, role: PrinterRole) -> RegistryResult<Option<ConfiguredPrinter>> {
        let printers = self.list()?;
        let chosen = printers
            .iter()
            .find(|p| p.is_default && p.role.serves(role))
            .or_else(|| printers.iter().find(|p| p.role.serves(role)))
            .cloned();
        debug!(%role, printer_id = ?chosen.as_ref().map(|p| &p.id), "Resolved printer");
        Ok(chosen)
    }

    /// Record a successful connection; unknown ids are ignored
    pub fn touch_connected(&self, id: &str, at: DateTime<Utc>) -> RegistryResult<bool> {
        self.mutate(|printers| {
            Ok(match printers.iter_mut().find(|p| p.id == id) {
                Some(p) => {
                    p.last_connected_at = Some(at);
                    true
                }
                None => false,
            })
        })
    }

    /// Read-modify-write the printer list in one transaction
    ///
    /// Nothing is written when `f` fails.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<ConfiguredPrinter>) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let write_txn = self.db.begin_write()?;
        let mut printers = read_printers(&write_txn)?;
        let out = f(&mut printers)?;
        {
            let mut table = write_txn.open_table(SETTINGS_TABLE)?;
            let value = serde_json::to_vec(&printers)?;
            table.insert(PRINTERS_KEY, value.as_slice())?;
        }
        write_txn.commit()?;
        Ok(out)
    }
}

fn read_printers(txn: &WriteTransaction) -> RegistryResult<Vec<ConfiguredPrinter>> {
    let table = txn.open_table(SETTINGS_TABLE)?;
    let printers = match table.get(PRINTERS_KEY)? {
        Some(guard) => serde_json::from_slice(guard.value())?,
        None => Vec::new(),
    };
    Ok(printers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{PrinterDevice, TransportKind};

    fn printer(id: &str, role: PrinterRole, is_default: bool) -> ConfiguredPrinter {
        ConfiguredPrinter::from_device(
            PrinterDevice::new(id, Some(format!("POS-{}", id)), TransportKind::Ble),
            role,
            is_default,
        )
    }

    fn defaults(registry: &PrinterRegistry) -> Vec<String> {
        registry
            .list()
            .unwrap()
            .into_iter()
            .filter(|p| p.is_default)
            .map(|p| p.id)
            .collect()
    }

    #[test]
    fn test_empty_registry() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        assert!(registry.list().unwrap().is_empty());
        assert!(registry.get_default().unwrap().is_none());
        assert!(registry.resolve(PrinterRole::Kot).unwrap().is_none());
    }

    #[test]
    fn test_upsert_default_clears_others() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        registry.upsert(printer("P1", PrinterRole::Both, true)).unwrap();
        registry.upsert(printer("P2", PrinterRole::Both, true)).unwrap();

        assert_eq!(defaults(&registry), vec!["P2".to_string()]);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        registry.upsert(printer("P1", PrinterRole::Kot, false)).unwrap();
        registry.upsert(printer("P2", PrinterRole::Bill, false)).unwrap();
        registry.upsert(printer("P1", PrinterRole::Both, false)).unwrap();

        let list = registry.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "P1");
        assert_eq!(list[0].role, PrinterRole::Both);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        let p = printer("P1", PrinterRole::Kot, true);
        registry.upsert(p.clone()).unwrap();
        let once = registry.list().unwrap();
        registry.upsert(p).unwrap();

        assert_eq!(registry.list().unwrap(), once);
    }

    #[test]
    fn test_set_default_unknown_id() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        registry.upsert(printer("P1", PrinterRole::Both, true)).unwrap();

        let err = registry.set_default("P9").unwrap_err();
        assert!(matches!(err, RegistryError::PrinterNotFound(id) if id == "P9"));
        assert_eq!(defaults(&registry), vec!["P1".to_string()]);
    }

    #[test]
    fn test_remove_default_leaves_none() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        registry.upsert(printer("P1", PrinterRole::Both, true)).unwrap();
        registry.upsert(printer("P2", PrinterRole::Both, false)).unwrap();

        let removed = registry.remove("P1").unwrap();
        assert_eq!(removed.map(|p| p.id).as_deref(), Some("P1"));
        assert!(defaults(&registry).is_empty());
        assert!(registry.remove("P1").unwrap().is_none());
    }

    #[test]
    fn test_resolve_prefers_default() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        registry.upsert(printer("K", PrinterRole::Kot, false)).unwrap();
        registry.upsert(printer("B", PrinterRole::Bill, false)).unwrap();
        registry.upsert(printer("D", PrinterRole::Both, true)).unwrap();

        assert_eq!(registry.resolve(PrinterRole::Kot).unwrap().unwrap().id, "D");
        assert_eq!(registry.resolve(PrinterRole::Bill).unwrap().unwrap().id, "D");
    }

    #[test]
    fn test_resolve_falls_back_to_role_match() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        registry.upsert(printer("K", PrinterRole::Kot, true)).unwrap();
        registry.upsert(printer("B", PrinterRole::Bill, false)).unwrap();

        assert_eq!(registry.resolve(PrinterRole::Kot).unwrap().unwrap().id, "K");
        assert_eq!(registry.resolve(PrinterRole::Bill).unwrap().unwrap().id, "B");
    }

    #[test]
    fn test_resolve_none_for_unserved_role() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        registry.upsert(printer("K", PrinterRole::Kot, true)).unwrap();

        assert!(registry.resolve(PrinterRole::Bill).unwrap().is_none());
    }

    #[test]
    fn test_touch_connected() {
        let registry = PrinterRegistry::open_in_memory().unwrap();
        registry.upsert(printer("P1", PrinterRole::Both, false)).unwrap();
        let at = Utc::now();

        assert!(registry.touch_connected("P1", at).unwrap());
        assert!(!registry.touch_connected("P9", at).unwrap());
        assert_eq!(registry.get("P1").unwrap().unwrap().last_connected_at, Some(at));
    }
}
