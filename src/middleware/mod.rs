pub mod extract;
pub mod logging;
