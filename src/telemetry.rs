mod channel;
mod field;
mod reading;
mod status;

pub use channel::*;
pub use field::*;
pub use reading::*;
pub use status::*;
