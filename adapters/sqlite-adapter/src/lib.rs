//! sqlite-adapter — SQLite implementation of the greeting and product ports.
//!
//! Purpose
//! - Provide the relational store behind `/api/greetings` and `/products`
//!   without an external database server.
//! - Implements `GreetingRepository` and `ProductRepository` from the `domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Tables are created on open with `CREATE TABLE IF NOT EXISTS`; there is no
//!   migration system. Seed rows are the caller's concern (`domain::seed`).
//! - Ids come from `INTEGER PRIMARY KEY AUTOINCREMENT`, so they strictly
//!   increase with insertion order and are never reused.
//! - Every port method runs inside a `tracing` span named after the
//!   operation (`greeting.findAll`, `product.save`, ...).

use std::path::Path;

use domain::{
    CoreError, Greeting, GreetingRepository, NewGreeting, Product, ProductInput,
    ProductRepository,
};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed repository for greetings and products.
pub struct SqliteRepo {
    conn: std::sync::Mutex<Connection>,
}

impl SqliteRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        Self::with_connection(conn)
    }

    /// Private in-memory database; contents vanish with the repo.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(map_sqerr)?;
        Self::with_connection(conn)
    }

    /// Open at `path`, creating missing parent directories first.
    pub fn open_creating_dirs<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| CoreError::Repository(format!("create {}: {e}", dir.display())))?;
            }
        }
        Self::new(path)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        init_schema(&conn)?;
        Ok(Self { conn: std::sync::Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CoreError> {
        self.conn.lock().map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS greetings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message TEXT NOT NULL,
            language TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL
        );
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

fn row_to_greeting(row: &rusqlite::Row) -> rusqlite::Result<Greeting> {
    Ok(Greeting {
        id: row.get(0)?,
        message: row.get(1)?,
        language: row.get(2)?,
    })
}

fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
    })
}

impl GreetingRepository for SqliteRepo {
    #[tracing::instrument(name = "greeting.findAll", skip(self))]
    fn find_all(&self) -> Result<Vec<Greeting>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, message, language FROM greetings ORDER BY id")
            .map_err(map_sqerr)?;
        let rows = stmt.query_map([], row_to_greeting).map_err(map_sqerr)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sqerr)
    }

    #[tracing::instrument(name = "greeting.findById", skip(self))]
    fn find_by_id(&self, id: i64) -> Result<Option<Greeting>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, message, language FROM greetings WHERE id = ?1",
            params![id],
            row_to_greeting,
        )
        .optional()
        .map_err(map_sqerr)
    }

    #[tracing::instrument(name = "greeting.save", skip(self, greeting))]
    fn save(&self, greeting: NewGreeting) -> Result<Greeting, CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO greetings(message, language) VALUES (?1, ?2)",
            params![greeting.message, greeting.language],
        )
        .map_err(map_sqerr)?;
        Ok(Greeting {
            id: conn.last_insert_rowid(),
            message: greeting.message,
            language: greeting.language,
        })
    }
}

impl ProductRepository for SqliteRepo {
    #[tracing::instrument(name = "product.findAll", skip(self))]
    fn find_all(&self) -> Result<Vec<Product>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name, price FROM products ORDER BY id")
            .map_err(map_sqerr)?;
        let rows = stmt.query_map([], row_to_product).map_err(map_sqerr)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sqerr)
    }

    #[tracing::instrument(name = "product.findById", skip(self))]
    fn find_by_id(&self, id: i64) -> Result<Option<Product>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, price FROM products WHERE id = ?1",
            params![id],
            row_to_product,
        )
        .optional()
        .map_err(map_sqerr)
    }

    #[tracing::instrument(name = "product.save", skip(self, product), fields(id = ?product.id))]
    fn save(&self, product: ProductInput) -> Result<Product, CoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        let updated = match product.id {
            Some(id) => tx
                .execute(
                    "UPDATE products SET name = ?1, price = ?2 WHERE id = ?3",
                    params![product.name, product.price, id],
                )
                .map_err(map_sqerr)?,
            None => 0,
        };
        let id = match (product.id, updated) {
            (Some(id), n) if n > 0 => id,
            // Unknown or missing id: the store picks a fresh one.
            _ => {
                tx.execute(
                    "INSERT INTO products(name, price) VALUES (?1, ?2)",
                    params![product.name, product.price],
                )
                .map_err(map_sqerr)?;
                tx.last_insert_rowid()
            }
        };
        tx.commit().map_err(map_sqerr)?;
        Ok(Product {
            id,
            name: product.name,
            price: product.price,
        })
    }

    #[tracing::instrument(name = "product.count", skip(self))]
    fn count(&self) -> Result<usize, CoreError> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
            .map_err(map_sqerr)?;
        Ok(n as usize)
    }
}
