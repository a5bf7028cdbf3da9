// Copyright 2023 Remi Bernotavicius

use crate::database::{ConnectionProvider, DatabaseConfig, RecipeRepository};
use crate::service::RecipeService;
use tempfile::TempDir;

/// A service backed by a fresh database with the schema and seed data loaded. The database goes
/// away with the returned directory.
pub fn bootstrapped() -> (TempDir, RecipeService) {
    let dir = tempfile::tempdir().unwrap();
    let provider = ConnectionProvider::new(DatabaseConfig::new(dir.path().join("recipes.sqlite")));
    let service = RecipeService::new(RecipeRepository::new(provider));
    service.create_and_populate_tables().unwrap();
    (dir, service)
}
