//! Lookup of staff and menu items, used to populate query results.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{MenuItemId, UserId};
use serde::{Deserialize, Serialize};

use crate::access::Role;

/// Public profile of a staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSummary {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

/// Summary of a menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemSummary {
    pub id: MenuItemId,
    pub name: String,
}

/// Source of staff and menu data kept outside the table documents.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Looks up a staff member. Unknown ids yield None.
    async fn staff(&self, id: &UserId) -> Option<StaffSummary>;

    /// Looks up a menu item. Unknown ids yield None.
    async fn menu_item(&self, id: &MenuItemId) -> Option<MenuItemSummary>;
}

/// Seed file contents for [`InMemoryDirectory::from_json`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DirectorySeed {
    #[serde(default)]
    staff: Vec<StaffSummary>,
    #[serde(default)]
    menu_items: Vec<MenuItemSummary>,
}

/// Directory backed by in-process maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    staff: Arc<RwLock<HashMap<UserId, StaffSummary>>>,
    menu: Arc<RwLock<HashMap<MenuItemId, MenuItemSummary>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from a JSON document of the form
    /// `{"staff": [{id, username, role}], "menuItems": [{id, name}]}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let seed: DirectorySeed = serde_json::from_str(json)?;
        let directory = Self::new();
        for staff in seed.staff {
            directory.add_staff(staff.id, staff.username, staff.role);
        }
        for item in seed.menu_items {
            directory.add_menu_item(item.id, item.name);
        }
        Ok(directory)
    }

    pub fn add_staff(&self, id: impl Into<UserId>, username: impl Into<String>, role: Role) {
        let id = id.into();
        if let Ok(mut staff) = self.staff.write() {
            staff.insert(
                id.clone(),
                StaffSummary {
                    id,
                    username: username.into(),
                    role,
                },
            );
        }
    }

    pub fn add_menu_item(&self, id: impl Into<MenuItemId>, name: impl Into<String>) {
        let id = id.into();
        if let Ok(mut menu) = self.menu.write() {
            menu.insert(
                id.clone(),
                MenuItemSummary {
                    id,
                    name: name.into(),
                },
            );
        }
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn staff(&self, id: &UserId) -> Option<StaffSummary> {
        self.staff.read().ok()?.get(id).cloned()
    }

    async fn menu_item(&self, id: &MenuItemId) -> Option<MenuItemSummary> {
        self.menu.read().ok()?.get(id).cloned()
    }
}
