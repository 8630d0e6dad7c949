//! Sidebar menus.
//!
//! Menus form a tree ordered by priority. Positive priorities sort to the
//! front in ascending order, zero keeps insertion order after them, and
//! negative priorities go to the back in ascending order (`-2` before
//! `-1`). Ties keep insertion order.

use backoffice_roles::Permission;
use serde::Serialize;

use crate::permissioner::Permissioner;

/// Where a new menu lands among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Before the first sibling with a greater or non-positive priority
    Front(i32),
    /// After the last sibling with a non-negative priority
    Append,
    /// After the last sibling with a non-negative or lower-or-equal priority
    Back(i32),
}

impl Placement {
    /// Placement of a menu with `priority`.
    pub fn from_priority(priority: i32) -> Self {
        match priority {
            p if p > 0 => Placement::Front(p),
            0 => Placement::Append,
            p => Placement::Back(p),
        }
    }

    /// Insertion index among `siblings`.
    pub fn position(&self, siblings: &[Menu]) -> usize {
        match *self {
            Placement::Front(p) => siblings
                .iter()
                .position(|m| m.priority > p || m.priority <= 0)
                .unwrap_or(siblings.len()),
            Placement::Append => siblings
                .iter()
                .rposition(|m| m.priority >= 0)
                .map_or(0, |i| i + 1),
            Placement::Back(p) => siblings
                .iter()
                .rposition(|m| m.priority >= 0 || m.priority <= p)
                .map_or(0, |i| i + 1),
        }
    }
}

/// A sidebar menu entry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Menu {
    pub name: String,
    pub icon: Option<String>,
    /// Absolute link, used as-is
    pub link: Option<String>,
    /// Path joined to the admin route prefix
    pub relative_path: Option<String>,
    pub priority: i32,
    /// Names of the parent menus, outermost first
    pub ancestors: Vec<String>,
    #[serde(skip)]
    pub permission: Option<Permission>,
    #[serde(skip)]
    pub permissioner: Option<Permissioner>,
    pub invisible: bool,
    /// Name of the resource this menu opens
    pub associated_resource: Option<String>,
    sub_menus: Vec<Menu>,
    #[serde(skip)]
    route_prefix: Option<String>,
}

impl Menu {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Link to an absolute URL.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Link below the admin's route prefix.
    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = Some(path.into());
        self
    }

    /// Order among siblings; see [`Placement`].
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the icon name.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Nest under the given ancestor names, outermost first.
    pub fn under<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ancestors = ancestors.into_iter().map(Into::into).collect();
        self
    }

    /// Gate the menu with a role rule.
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Decide the menu through `permissioner`.
    pub fn with_permissioner(mut self, permissioner: Permissioner) -> Self {
        self.permissioner = Some(permissioner);
        self
    }

    /// Hide from the sidebar.
    pub fn invisible(mut self) -> Self {
        self.invisible = true;
        self
    }

    /// Child menus in display order.
    pub fn sub_menus(&self) -> &[Menu] {
        &self.sub_menus
    }

    /// `link`, else the route prefix joined with `relative_path`, else
    /// `relative_path`.
    pub fn url(&self) -> String {
        if let Some(link) = self.link.as_deref().filter(|l| !l.is_empty()) {
            return link.to_string();
        }
        match (self.route_prefix.as_deref(), self.relative_path.as_deref()) {
            (Some(prefix), Some(path)) if !path.is_empty() => join_path(prefix, path),
            (_, path) => path.unwrap_or_default().to_string(),
        }
    }

    /// Every leaf below this menu, depth first; a menu without children is
    /// its own only leaf.
    pub fn leaves(&self) -> Vec<&Menu> {
        if self.sub_menus.is_empty() {
            return vec![self];
        }
        self.sub_menus.iter().flat_map(Menu::leaves).collect()
    }

    /// Full path: ancestors then own name.
    pub fn path(&self) -> Vec<String> {
        let mut path = self.ancestors.clone();
        path.push(self.name.clone());
        path
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => format!("/{path}"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    }
}

/// The menu forest of an admin.
#[derive(Debug, Clone, Default)]
pub struct MenuTree {
    menus: Vec<Menu>,
    route_prefix: Option<String>,
}

impl MenuTree {
    /// Create an empty tree; relative paths join `route_prefix`.
    pub fn new(route_prefix: Option<String>) -> Self {
        Self {
            menus: Vec::new(),
            route_prefix: route_prefix.filter(|p| !p.is_empty()),
        }
    }

    /// Top-level menus in order.
    pub fn menus(&self) -> &[Menu] {
        &self.menus
    }

    /// Add `menu` under its ancestors, creating missing ones.
    ///
    /// A menu already present at the same path is updated in place
    /// (link, relative path, priority, permission, permissioner) and
    /// keeps its position. A single name only counts as the same path
    /// when the existing menu is top-level.
    pub fn add(&mut self, mut menu: Menu) -> &mut Menu {
        menu.route_prefix = self.route_prefix.clone();
        let path = menu.path();
        let names: Vec<&str> = path.iter().map(String::as_str).collect();
        let existing = index_path(&self.menus, &names).filter(|indices| names.len() > 1 || indices.len() == 1);

        match existing {
            Some(indices) => {
                let old = walk(&mut self.menus, &indices);
                old.link = menu.link;
                old.relative_path = menu.relative_path;
                old.priority = menu.priority;
                old.permission = menu.permission;
                old.permissioner = menu.permissioner;
                old
            }
            None => {
                let ancestors = menu.ancestors.clone();
                let prefix = self.route_prefix.clone();
                append(&mut self.menus, &ancestors, 0, menu, &prefix)
            }
        }
    }

    /// One name searches the whole tree depth first; several names follow
    /// the path from the top level.
    pub fn get(&self, names: &[&str]) -> Option<&Menu> {
        find(&self.menus, names)
    }

    /// Find a menu by its path of names for configuration.
    pub fn get_mut(&mut self, names: &[&str]) -> Option<&mut Menu> {
        let indices = index_path(&self.menus, names)?;
        Some(walk(&mut self.menus, &indices))
    }

    /// Every menu, parents before children.
    pub fn iter(&self) -> impl Iterator<Item = &Menu> {
        let mut stack: Vec<&Menu> = self.menus.iter().rev().collect();
        std::iter::from_fn(move || {
            let menu = stack.pop()?;
            stack.extend(menu.sub_menus.iter().rev());
            Some(menu)
        })
    }
}

fn find<'a>(menus: &'a [Menu], names: &[&str]) -> Option<&'a Menu> {
    let (first, rest) = names.split_first()?;
    if !rest.is_empty() {
        let menu = menus.iter().find(|m| m.name == *first)?;
        return find(&menu.sub_menus, rest);
    }
    for menu in menus {
        if menu.name == *first {
            return Some(menu);
        }
        if let Some(found) = find(&menu.sub_menus, names) {
            return Some(found);
        }
    }
    None
}

/// Index path of the menu `find` would return.
fn index_path(menus: &[Menu], names: &[&str]) -> Option<Vec<usize>> {
    let (first, rest) = names.split_first()?;
    if rest.is_empty() {
        return locate(menus, first);
    }
    let index = menus.iter().position(|m| m.name == *first)?;
    let mut below = index_path(&menus[index].sub_menus, rest)?;
    below.insert(0, index);
    Some(below)
}

/// Follow a non-empty index path from `index_path`.
fn walk<'a>(menus: &'a mut [Menu], indices: &[usize]) -> &'a mut Menu {
    let mut menu = &mut menus[indices[0]];
    for &i in &indices[1..] {
        menu = &mut menu.sub_menus[i];
    }
    menu
}

/// Index path of the first menu named `name`, depth first.
fn locate(menus: &[Menu], name: &str) -> Option<Vec<usize>> {
    for (i, menu) in menus.iter().enumerate() {
        if menu.name == name {
            return Some(vec![i]);
        }
        if let Some(mut below) = locate(&menu.sub_menus, name) {
            below.insert(0, i);
            return Some(below);
        }
    }
    None
}

fn append<'a>(
    menus: &'a mut Vec<Menu>,
    ancestors: &[String],
    depth: usize,
    menu: Menu,
    prefix: &Option<String>,
) -> &'a mut Menu {
    let Some(parent) = ancestors.get(depth) else {
        let index = Placement::from_priority(menu.priority).position(menus);
        menus.insert(index, menu);
        return &mut menus[index];
    };

    if let Some(index) = menus.iter().position(|m| m.name == *parent) {
        return append(&mut menus[index].sub_menus, ancestors, depth + 1, menu, prefix);
    }

    let synthesized = Menu {
        name: parent.clone(),
        ancestors: ancestors[..depth].to_vec(),
        route_prefix: prefix.clone(),
        ..Default::default()
    };
    let index = Placement::Append.position(menus);
    menus.insert(index, synthesized);
    append(&mut menus[index].sub_menus, ancestors, depth + 1, menu, prefix)
}
