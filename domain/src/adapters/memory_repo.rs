use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{
    CoreError, Greeting, GreetingRepository, NewGreeting, Product, ProductInput,
    ProductRepository,
};

/// Rows keyed by id plus the last id handed out, guarded together so that
/// id assignment and insert happen atomically.
struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Simple in-memory greetings table for tests and the memory storage mode.
pub struct InMemoryGreetingRepo {
    inner: Mutex<Table<Greeting>>,
}

/// In-memory products table.
pub struct InMemoryProductRepo {
    inner: Mutex<Table<Product>>,
}

impl InMemoryGreetingRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Table::new()),
        }
    }
}

impl Default for InMemoryGreetingRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProductRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Table::new()),
        }
    }
}

impl Default for InMemoryProductRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl GreetingRepository for InMemoryGreetingRepo {
    fn find_all(&self) -> Result<Vec<Greeting>, CoreError> {
        let table = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(table.rows.values().cloned().collect())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Greeting>, CoreError> {
        let table = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(table.rows.get(&id).cloned())
    }

    fn save(&self, greeting: NewGreeting) -> Result<Greeting, CoreError> {
        let mut table = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let saved = Greeting {
            id: table.next_id(),
            message: greeting.message,
            language: greeting.language,
        };
        table.rows.insert(saved.id, saved.clone());
        Ok(saved)
    }
}

impl ProductRepository for InMemoryProductRepo {
    fn find_all(&self) -> Result<Vec<Product>, CoreError> {
        let table = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(table.rows.values().cloned().collect())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Product>, CoreError> {
        let table = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(table.rows.get(&id).cloned())
    }

    fn save(&self, product: ProductInput) -> Result<Product, CoreError> {
        let mut table = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let id = match product.id {
            Some(id) if table.rows.contains_key(&id) => id,
            _ => table.next_id(),
        };
        let saved = Product {
            id,
            name: product.name,
            price: product.price,
        };
        table.rows.insert(id, saved.clone());
        Ok(saved)
    }

    fn count(&self) -> Result<usize, CoreError> {
        let table = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(table.rows.len())
    }
}
