//! Embedded SQL migrations

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_cmd_states",
        sql: include_str!("../../migrations/001_cmd_states.sql"),
    }]
}
