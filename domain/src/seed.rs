//! Startup seed data.

use crate::{CoreError, GreetingRepository, NewGreeting, ProductInput, ProductRepository};

/// Products inserted into an empty store, in insertion order.
pub const DEFAULT_PRODUCTS: [(&str, f64); 3] =
    [("Laptop", 1200.00), ("Mouse", 25.00), ("Keyboard", 75.00)];

/// Greetings `(message, language)` inserted into an empty greetings table.
pub const DEFAULT_GREETINGS: [(&str, &str); 3] = [
    ("Hello, world!", "en"),
    ("Olá, mundo!", "pt"),
    ("¡Hola, mundo!", "es"),
];

/// Insert [`DEFAULT_PRODUCTS`] when the store holds no products.
///
/// Returns the number of rows inserted (0 when the store was not empty).
pub fn seed_products<R: ProductRepository + ?Sized>(repo: &R) -> Result<usize, CoreError> {
    if repo.count()? > 0 {
        return Ok(0);
    }
    for (name, price) in DEFAULT_PRODUCTS {
        repo.save(ProductInput::new(name, price))?;
    }
    Ok(DEFAULT_PRODUCTS.len())
}

/// Insert [`DEFAULT_GREETINGS`] when the table is empty.
pub fn seed_greetings<R: GreetingRepository + ?Sized>(repo: &R) -> Result<usize, CoreError> {
    if !repo.find_all()?.is_empty() {
        return Ok(0);
    }
    for (message, language) in DEFAULT_GREETINGS {
        repo.save(NewGreeting::new(message, language))?;
    }
    Ok(DEFAULT_GREETINGS.len())
}
