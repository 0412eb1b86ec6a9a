//! Operator Roster
//!
//! Who may progress orders. Owned by the lifecycle tracker and injected from
//! configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Telegram identity behind an operator action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
}

impl Actor {
    pub fn new(user_id: i64, chat_id: i64) -> Self {
        Self {
            user_id,
            chat_id,
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// `@username`, or the numeric id when there is none
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(name) => format!("@{}", name),
            None => self.user_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorRoster {
    admin_user_id: i64,
    operator_chat_id: i64,
    operators: BTreeSet<i64>,
}

impl OperatorRoster {
    /// The admin is always an operator
    pub fn new(admin_user_id: i64, operator_chat_id: i64, operators: impl IntoIterator<Item = i64>) -> Self {
        let mut operators: BTreeSet<i64> = operators.into_iter().collect();
        operators.insert(admin_user_id);
        Self {
            admin_user_id,
            operator_chat_id,
            operators,
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.admin_user_id
    }

    pub fn is_operator(&self, user_id: i64) -> bool {
        self.operators.contains(&user_id)
    }

    pub fn is_operator_chat(&self, chat_id: i64) -> bool {
        chat_id == self.operator_chat_id
    }

    /// Operators and the admin, and only inside the operator chat
    pub fn can_handle_orders(&self, actor: &Actor) -> bool {
        (self.is_operator(actor.user_id) || self.is_admin(actor.user_id))
            && self.is_operator_chat(actor.chat_id)
    }

    /// Returns false when already present
    pub fn add(&mut self, user_id: i64) -> bool {
        self.operators.insert(user_id)
    }

    /// The admin cannot be removed
    pub fn remove(&mut self, user_id: i64) -> bool {
        if self.is_admin(user_id) {
            return false;
        }
        self.operators.remove(&user_id)
    }

    /// Swap in a saved operator list; the admin stays
    pub fn replace_operators(&mut self, operators: impl IntoIterator<Item = i64>) {
        self.operators = operators.into_iter().collect();
        self.operators.insert(self.admin_user_id);
    }

    pub fn list(&self) -> Vec<i64> {
        self.operators.iter().copied().collect()
    }

    pub fn operator_chat_id(&self) -> i64 {
        self.operator_chat_id
    }
}
