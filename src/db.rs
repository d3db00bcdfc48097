use redb::{Database as RedbDatabase, ReadableTable, TableDefinition, WriteTransaction};
use thiserror::Error;

use crate::models::{Drink, Ingredient};

// Table definitions
const DRINKS: TableDefinition<u64, &[u8]> = TableDefinition::new("drinks");
const TITLES: TableDefinition<&str, u64> = TableDefinition::new("drink_titles");
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const DRINK_SEQUENCE: &str = "drinks";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] redb::DatabaseError),

    #[error("Database transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Database table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Database storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Database commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Drink title already taken: {0}")]
    DuplicateTitle(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

pub struct Database {
    db: RedbDatabase,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let db = RedbDatabase::create(path)?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DRINKS)?;
            let _ = write_txn.open_table(TITLES)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Drops every drink and seeds the menu with a single default drink.
    /// The id sequence restarts as well.
    pub fn reset(&self) -> Result<Drink> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(DRINKS)?;
        write_txn.delete_table(TITLES)?;
        write_txn.delete_table(SEQUENCES)?;
        let seeded = insert_drink(
            &write_txn,
            "water",
            &[Ingredient {
                name: "water".into(),
                color: "blue".into(),
                parts: 1,
            }],
        )?;
        write_txn.commit()?;
        Ok(seeded)
    }

    pub fn list_drinks(&self) -> Result<Vec<Drink>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRINKS)?;

        let mut drinks = Vec::new();
        for entry in table.iter()? {
            let (_, data) = entry?;
            drinks.push(serde_json::from_slice(data.value())?);
        }
        Ok(drinks)
    }

    pub fn get_drink(&self, id: u64) -> Result<Option<Drink>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRINKS)?;

        match table.get(id)? {
            Some(data) => Ok(Some(serde_json::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    pub fn create_drink(&self, title: &str, recipe: &[Ingredient]) -> Result<Drink> {
        let write_txn = self.db.begin_write()?;
        let drink = insert_drink(&write_txn, title, recipe)?;
        write_txn.commit()?;
        Ok(drink)
    }

    /// Returns `None` when no drink has this id.
    pub fn rename_drink(&self, id: u64, title: &str) -> Result<Option<Drink>> {
        let write_txn = self.db.begin_write()?;
        let renamed = {
            let mut drinks = write_txn.open_table(DRINKS)?;
            let mut titles = write_txn.open_table(TITLES)?;

            let current: Option<Drink> = match drinks.get(id)? {
                Some(data) => Some(serde_json::from_slice(data.value())?),
                None => None,
            };

            match current {
                None => None,
                Some(mut drink) => {
                    if drink.title != title {
                        if titles.get(title)?.is_some() {
                            return Err(DbError::DuplicateTitle(title.to_string()));
                        }
                        titles.remove(drink.title.as_str())?;
                        titles.insert(title, id)?;
                        drink.title = title.to_string();
                    }

                    let json = serde_json::to_vec(&drink)?;
                    drinks.insert(id, json.as_slice())?;
                    Some(drink)
                }
            }
        };
        write_txn.commit()?;
        Ok(renamed)
    }

    /// Returns whether a drink was removed.
    pub fn delete_drink(&self, id: u64) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut drinks = write_txn.open_table(DRINKS)?;
            let mut titles = write_txn.open_table(TITLES)?;

            let removed: Option<Drink> = match drinks.remove(id)? {
                Some(data) => Some(serde_json::from_slice(data.value())?),
                None => None,
            };

            match removed {
                Some(drink) => {
                    titles.remove(drink.title.as_str())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}

fn insert_drink(txn: &WriteTransaction, title: &str, recipe: &[Ingredient]) -> Result<Drink> {
    let mut titles = txn.open_table(TITLES)?;
    if titles.get(title)?.is_some() {
        return Err(DbError::DuplicateTitle(title.to_string()));
    }

    let id = next_id(txn)?;
    let drink = Drink {
        id,
        title: title.to_string(),
        recipe: serde_json::to_string(recipe)?,
    };

    let json = serde_json::to_vec(&drink)?;
    let mut drinks = txn.open_table(DRINKS)?;
    drinks.insert(id, json.as_slice())?;
    titles.insert(title, id)?;

    Ok(drink)
}

/// Ids come from a persisted counter so deleted ids are never handed out again.
fn next_id(txn: &WriteTransaction) -> Result<u64> {
    let mut sequences = txn.open_table(SEQUENCES)?;
    let next = sequences
        .get(DRINK_SEQUENCE)?
        .map(|current| current.value())
        .unwrap_or(0)
        + 1;
    sequences.insert(DRINK_SEQUENCE, next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drinks.db");
        let db = Database::open(path.to_str().unwrap()).unwrap();
        (db, dir)
    }

    fn latte() -> Vec<Ingredient> {
        vec![
            Ingredient {
                name: "espresso".into(),
                color: "brown".into(),
                parts: 1,
            },
            Ingredient {
                name: "steamed milk".into(),
                color: "white".into(),
                parts: 3,
            },
        ]
    }

    #[test]
    fn create_then_list() {
        let (db, _dir) = open_temp();

        let drink = db.create_drink("latte", &latte()).unwrap();
        assert_eq!(drink.id, 1);
        assert_eq!(drink.ingredients().unwrap(), latte());

        let drinks = db.list_drinks().unwrap();
        assert_eq!(drinks.len(), 1);
        assert_eq!(drinks[0].title, "latte");
    }

    #[test]
    fn duplicate_title_is_rejected() {
        let (db, _dir) = open_temp();

        db.create_drink("latte", &latte()).unwrap();
        let err = db.create_drink("latte", &latte()).unwrap_err();
        assert!(matches!(err, DbError::DuplicateTitle(t) if t == "latte"));
        assert_eq!(db.list_drinks().unwrap().len(), 1);
    }

    #[test]
    fn rename_frees_old_title() {
        let (db, _dir) = open_temp();

        let drink = db.create_drink("latte", &latte()).unwrap();
        let renamed = db.rename_drink(drink.id, "flat white").unwrap().unwrap();
        assert_eq!(renamed.title, "flat white");

        // old title is available again
        db.create_drink("latte", &latte()).unwrap();
        assert!(matches!(
            db.rename_drink(drink.id, "latte"),
            Err(DbError::DuplicateTitle(_))
        ));
    }

    #[test]
    fn rename_missing_drink() {
        let (db, _dir) = open_temp();
        assert!(db.rename_drink(42, "ghost").unwrap().is_none());
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let (db, _dir) = open_temp();

        let first = db.create_drink("latte", &latte()).unwrap();
        assert!(db.delete_drink(first.id).unwrap());
        assert!(!db.delete_drink(first.id).unwrap());
        assert!(db.get_drink(first.id).unwrap().is_none());

        let second = db.create_drink("latte", &latte()).unwrap();
        assert_eq!(second.id, first.id + 1);
    }

    #[test]
    fn reset_seeds_water() {
        let (db, _dir) = open_temp();

        db.create_drink("latte", &latte()).unwrap();
        db.create_drink("mocha", &latte()).unwrap();
        let water = db.reset().unwrap();

        assert_eq!(water.id, 1);
        let drinks = db.list_drinks().unwrap();
        assert_eq!(drinks.len(), 1);
        assert_eq!(drinks[0].title, "water");
        assert_eq!(drinks[0].ingredients().unwrap()[0].color, "blue");
    }
}
