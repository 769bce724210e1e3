mod articles;
mod images;
mod schema;
mod types;
mod websites;

pub use schema::Database;
pub use types::{DatabaseError, NewArticle, NewWebsite, StoredArticle, StoredImage, Website};
