pub mod accounts;
pub mod images;

pub use accounts::*;
pub use images::ImageStore;
