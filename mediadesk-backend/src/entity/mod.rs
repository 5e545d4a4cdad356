pub mod category;
pub mod content;
pub mod extension;
pub mod relation;

pub use category::Entity as Category;
pub use content::Entity as Content;
pub use extension::Entity as Extension;
pub use relation::Entity as Relation;
