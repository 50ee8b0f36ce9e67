//! Domain library for the greeting services.
//!
//! This crate is dependency-free (inherits workspace metadata only) and holds
//! the records, ports (traits), the in-memory greeting generator, and error
//! definitions. Keep adapters and IO concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

/// A greeting row as stored in the `greetings` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Greeting {
    pub id: i64,
    pub message: String,
    pub language: String,
}

/// Input data for inserting a greeting; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewGreeting {
    pub message: String,
    pub language: String,
}

impl NewGreeting {
    pub fn new<M: Into<String>, L: Into<String>>(message: M, language: L) -> Self {
        Self {
            message: message.into(),
            language: language.into(),
        }
    }
}

/// A greeting produced in memory by [`service::GreetingGenerator`].
///
/// Never persisted; the id comes from a process-wide counter and is lost on
/// restart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedGreeting {
    pub id: u64,
    pub message: String,
    pub timestamp: SystemTime,
}

/// A stored product.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

/// Input for [`ProductRepository::save`].
///
/// When `id` names an existing row that row is updated; otherwise a new row
/// is inserted and the store assigns a fresh id.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductInput {
    pub id: Option<i64>,
    pub name: String,
    pub price: f64,
}

impl ProductInput {
    pub fn new<S: Into<String>>(name: S, price: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
        }
    }
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time source.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Repository port for the persisted greetings table.
pub trait GreetingRepository: Send + Sync {
    /// All greetings ordered by id ascending.
    fn find_all(&self) -> Result<Vec<Greeting>, CoreError>;
    /// `Ok(None)` when no row matches.
    fn find_by_id(&self, id: i64) -> Result<Option<Greeting>, CoreError>;
    /// Insert one row and return it with its assigned id.
    fn save(&self, greeting: NewGreeting) -> Result<Greeting, CoreError>;
}

/// Repository port for products.
pub trait ProductRepository: Send + Sync {
    /// All products ordered by id ascending (insertion order).
    fn find_all(&self) -> Result<Vec<Product>, CoreError>;
    fn find_by_id(&self, id: i64) -> Result<Option<Product>, CoreError>;
    /// Insert or update one row and return the persisted product.
    fn save(&self, product: ProductInput) -> Result<Product, CoreError>;
    fn count(&self) -> Result<usize, CoreError>;
}

/// Core domain errors (no external error crates to keep deps at zero).
#[derive(Debug)]
pub enum CoreError {
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - greeting domain library loaded", pkg, ver)
}

pub mod adapters;
pub mod seed;
pub mod service;
