mod meal;
mod profile;
mod recipe;

pub use meal::*;
pub use profile::*;
pub use recipe::*;
