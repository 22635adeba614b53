use super::Language;

/// Every message the dashboard shows. Adding a variant without a translation row
/// below does not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Logout,
    Settings,
    Profile,
    Save,
    Dashboard,
    Cameras,
    Alerts,
    Users,
    UserManagement,
    AddUser,
    SearchUsers,
    User,
    Role,
    AssignedCameras,
    Actions,
    GeneralSettings,
    Notifications,
    Detection,
    FullName,
    Email,
    Appearance,
    Language,
    Theme,
    Light,
    Dark,
    French,
    English,
    Arabic,
    EditUser,
    Delete,
    Edit,
}

impl MessageKey {
    pub const ALL: [MessageKey; 31] = [
        MessageKey::Logout,
        MessageKey::Settings,
        MessageKey::Profile,
        MessageKey::Save,
        MessageKey::Dashboard,
        MessageKey::Cameras,
        MessageKey::Alerts,
        MessageKey::Users,
        MessageKey::UserManagement,
        MessageKey::AddUser,
        MessageKey::SearchUsers,
        MessageKey::User,
        MessageKey::Role,
        MessageKey::AssignedCameras,
        MessageKey::Actions,
        MessageKey::GeneralSettings,
        MessageKey::Notifications,
        MessageKey::Detection,
        MessageKey::FullName,
        MessageKey::Email,
        MessageKey::Appearance,
        MessageKey::Language,
        MessageKey::Theme,
        MessageKey::Light,
        MessageKey::Dark,
        MessageKey::French,
        MessageKey::English,
        MessageKey::Arabic,
        MessageKey::EditUser,
        MessageKey::Delete,
        MessageKey::Edit,
    ];

    /// Wire name, as used by the web front end.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKey::Logout => "logout",
            MessageKey::Settings => "settings",
            MessageKey::Profile => "profile",
            MessageKey::Save => "save",
            MessageKey::Dashboard => "dashboard",
            MessageKey::Cameras => "cameras",
            MessageKey::Alerts => "alerts",
            MessageKey::Users => "users",
            MessageKey::UserManagement => "userManagement",
            MessageKey::AddUser => "addUser",
            MessageKey::SearchUsers => "searchUsers",
            MessageKey::User => "user",
            MessageKey::Role => "role",
            MessageKey::AssignedCameras => "assignedCameras",
            MessageKey::Actions => "actions",
            MessageKey::GeneralSettings => "generalSettings",
            MessageKey::Notifications => "notifications",
            MessageKey::Detection => "detection",
            MessageKey::FullName => "fullName",
            MessageKey::Email => "email",
            MessageKey::Appearance => "appearance",
            MessageKey::Language => "language",
            MessageKey::Theme => "theme",
            MessageKey::Light => "light",
            MessageKey::Dark => "dark",
            MessageKey::French => "french",
            MessageKey::English => "english",
            MessageKey::Arabic => "arabic",
            MessageKey::EditUser => "editUser",
            MessageKey::Delete => "delete",
            MessageKey::Edit => "edit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }
}

// (fr, en, ar)
fn row(key: MessageKey) -> (&'static str, &'static str, &'static str) {
    match key {
        MessageKey::Logout => ("Déconnexion", "Logout", "تسجيل خروج"),
        MessageKey::Settings => ("Paramètres", "Settings", "إعدادات"),
        MessageKey::Profile => ("Profil", "Profile", "الملف الشخصي"),
        MessageKey::Save => ("Enregistrer", "Save", "حفظ"),
        MessageKey::Dashboard => ("Tableau de bord", "Dashboard", "لوحة القيادة"),
        MessageKey::Cameras => ("Caméras", "Cameras", "الكاميرات"),
        MessageKey::Alerts => ("Alertes", "Alerts", "إنذارات"),
        MessageKey::Users => ("Utilisateurs", "Users", "المستخدمين"),
        MessageKey::UserManagement => ("Gestion des utilisateurs", "User Management", "إدارة المستخدمين"),
        MessageKey::AddUser => ("Ajouter un utilisateur", "Add User", "إضافة مستخدم"),
        MessageKey::SearchUsers => ("Rechercher des utilisateurs...", "Search users...", "البحث عن المستخدمين..."),
        MessageKey::User => ("Utilisateur", "User", "مستخدم"),
        MessageKey::Role => ("Rôle", "Role", "دور"),
        MessageKey::AssignedCameras => ("Caméras assignées", "Assigned Cameras", "الكاميرات المعينة"),
        MessageKey::Actions => ("Actions", "Actions", "إجراءات"),
        MessageKey::GeneralSettings => ("Paramètres généraux", "General Settings", "الإعدادات العامة"),
        MessageKey::Notifications => ("Notifications", "Notifications", "الإشعارات"),
        MessageKey::Detection => ("Détection", "Detection", "الكشف"),
        MessageKey::FullName => ("Nom complet", "Full Name", "الاسم الكامل"),
        MessageKey::Email => ("Email", "Email", "البريد الإلكتروني"),
        MessageKey::Appearance => ("Apparence", "Appearance", "المظهر"),
        MessageKey::Language => ("Langue", "Language", "اللغة"),
        MessageKey::Theme => ("Thème", "Theme", "السمة"),
        MessageKey::Light => ("Clair", "Light", "فاتح"),
        MessageKey::Dark => ("Sombre", "Dark", "داكن"),
        MessageKey::French => ("Français", "French", "فرنسي"),
        MessageKey::English => ("Anglais", "English", "إنجليزي"),
        MessageKey::Arabic => ("Arabe", "Arabic", "عربي"),
        MessageKey::EditUser => ("Modifier l'utilisateur", "Edit User", "تعديل المستخدم"),
        MessageKey::Delete => ("Supprimer", "Delete", "حذف"),
        MessageKey::Edit => ("Modifier", "Edit", "تعديل"),
    }
}

pub fn translate(key: MessageKey, lang: Language) -> &'static str {
    let (fr, en, ar) = row(key);
    match lang {
        Language::Fr => fr,
        Language::En => en,
        Language::Ar => ar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Exhaustive, so a new variant does not compile until it is given a slot here.
    fn ordinal(k: MessageKey) -> usize {
        match k {
            MessageKey::Logout => 0,
            MessageKey::Settings => 1,
            MessageKey::Profile => 2,
            MessageKey::Save => 3,
            MessageKey::Dashboard => 4,
            MessageKey::Cameras => 5,
            MessageKey::Alerts => 6,
            MessageKey::Users => 7,
            MessageKey::UserManagement => 8,
            MessageKey::AddUser => 9,
            MessageKey::SearchUsers => 10,
            MessageKey::User => 11,
            MessageKey::Role => 12,
            MessageKey::AssignedCameras => 13,
            MessageKey::Actions => 14,
            MessageKey::GeneralSettings => 15,
            MessageKey::Notifications => 16,
            MessageKey::Detection => 17,
            MessageKey::FullName => 18,
            MessageKey::Email => 19,
            MessageKey::Appearance => 20,
            MessageKey::Language => 21,
            MessageKey::Theme => 22,
            MessageKey::Light => 23,
            MessageKey::Dark => 24,
            MessageKey::French => 25,
            MessageKey::English => 26,
            MessageKey::Arabic => 27,
            MessageKey::EditUser => 28,
            MessageKey::Delete => 29,
            MessageKey::Edit => 30,
        }
    }

    #[test]
    fn all_lists_every_variant_once() {
        assert_eq!(MessageKey::ALL.len(), ordinal(MessageKey::Edit) + 1);
        for (i, k) in MessageKey::ALL.iter().enumerate() {
            assert_eq!(ordinal(*k), i, "{:?} out of place in ALL", k);
            assert_eq!(MessageKey::parse(k.as_str()), Some(*k));
        }
    }
}
