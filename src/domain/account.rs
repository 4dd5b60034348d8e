#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub telegram_id: Option<i64>,
}

impl UserAccount {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// A freshly issued link token and the bot deep link embedding it.
#[derive(Debug, Clone)]
pub struct LinkInvite {
    pub token: String,
    pub deep_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedProduct {
    pub id: i64,
    pub title: String,
}
