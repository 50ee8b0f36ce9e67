//! Storage selection for the handlers.
//!
//! The memory backend is always available; SQLite is compiled in with the
//! `sqlite` feature (on by default).

use std::path::Path;
use std::sync::Arc;

use domain::adapters::memory_repo::{InMemoryGreetingRepo, InMemoryProductRepo};
use domain::{CoreError, GreetingRepository, ProductRepository};

enum RepoKind {
    Memory {
        greetings: InMemoryGreetingRepo,
        products: InMemoryProductRepo,
    },
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteRepo),
    #[cfg(test)]
    Failing(failing::FailingRepo),
}

/// Cheaply clonable handle to whichever store the server runs on.
#[derive(Clone)]
pub struct AnyRepo {
    kind: Arc<RepoKind>,
}

impl AnyRepo {
    pub fn memory() -> Self {
        Self {
            kind: Arc::new(RepoKind::Memory {
                greetings: InMemoryGreetingRepo::new(),
                products: InMemoryProductRepo::new(),
            }),
        }
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: &Path) -> Result<Self, CoreError> {
        Ok(Self {
            kind: Arc::new(RepoKind::Sqlite(
                sqlite_adapter::SqliteRepo::open_creating_dirs(path)?,
            )),
        })
    }

    #[cfg(not(feature = "sqlite"))]
    pub fn sqlite(_path: &Path) -> Result<Self, CoreError> {
        Err(CoreError::Repository(
            "built without the `sqlite` feature".into(),
        ))
    }

    /// Store whose every call fails, for exercising the 500 paths.
    #[cfg(test)]
    pub fn failing() -> Self {
        Self {
            kind: Arc::new(RepoKind::Failing(failing::FailingRepo)),
        }
    }

    pub fn backend(&self) -> &'static str {
        match &*self.kind {
            RepoKind::Memory { .. } => "memory",
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(_) => "sqlite",
            #[cfg(test)]
            RepoKind::Failing(_) => "failing",
        }
    }

    pub fn greetings(&self) -> &dyn GreetingRepository {
        match &*self.kind {
            RepoKind::Memory { greetings, .. } => greetings,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r,
            #[cfg(test)]
            RepoKind::Failing(r) => r,
        }
    }

    pub fn products(&self) -> &dyn ProductRepository {
        match &*self.kind {
            RepoKind::Memory { products, .. } => products,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r,
            #[cfg(test)]
            RepoKind::Failing(r) => r,
        }
    }
}
