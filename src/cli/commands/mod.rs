//! One module per subcommand, each exposing an `execute` function.

pub mod delete;
pub mod get;
pub mod keygen;
pub mod list;
pub mod save;
pub mod serve;
