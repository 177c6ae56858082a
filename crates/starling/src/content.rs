mod article;
mod category;
mod collections;
mod index;
mod locale;
mod sorting;

pub use article::*;
pub use category::*;
pub use collections::*;
pub use index::*;
pub use locale::*;
pub use sorting::*;
