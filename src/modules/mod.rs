pub mod catalog;
pub mod home;

use locallib_kernel::ModuleRegistry;

use catalog::Catalog;

/// Register every application module with the registry
pub fn register_all(registry: &mut ModuleRegistry, catalog: Catalog) {
    registry.register(home::create_module());
    registry.register(catalog::create_module(catalog));
}
