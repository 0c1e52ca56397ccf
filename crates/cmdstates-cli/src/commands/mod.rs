pub mod check;
pub mod cmd_set;
pub mod fetch;
pub mod update;
