use std::fmt;

use crate::account::Secret;

/// Категория команд в нотации Redis (`@all`, `@admin`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclCategory {
    All,
    Admin,
    Dangerous,
    Read,
    Write,
    Keyspace,
    Connection,
    Pubsub,
}

/// Одна инструкция `ACL SETUSER`.
///
/// Порядок директив значим: Redis применяет их слева направо, и последняя
/// директива, касающаяся команды, определяет итоговое право. Поэтому профиль
/// учётной записи хранится как упорядоченный `Vec<Directive>`, а в строки
/// превращается только на границе хранилища.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `>password`
    SetPassword(Secret),
    /// `on`
    Enable,
    /// `+@category`
    AllowCategory(AclCategory),
    /// `-@category`
    DenyCategory(AclCategory),
    /// `allchannels`
    AllChannels,
    /// `allkeys`
    AllKeys,
    /// `+command`
    AllowCommand(&'static str),
    /// `-command`
    DenyCommand(&'static str),
    /// `+command|arg`: разрешает команду только с этим первым аргументом.
    AllowFirstArg { command: &'static str, arg: String },
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl AclCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Admin => "admin",
            Self::Dangerous => "dangerous",
            Self::Read => "read",
            Self::Write => "write",
            Self::Keyspace => "keyspace",
            Self::Connection => "connection",
            Self::Pubsub => "pubsub",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let cat = match name.to_ascii_lowercase().as_str() {
            "all" => Self::All,
            "admin" => Self::Admin,
            "dangerous" => Self::Dangerous,
            "read" => Self::Read,
            "write" => Self::Write,
            "keyspace" => Self::Keyspace,
            "connection" => Self::Connection,
            "pubsub" => Self::Pubsub,
            _ => return None,
        };
        Some(cat)
    }
}

impl Directive {
    /// Токен `ACL SETUSER` для этой директивы.
    pub fn token(&self) -> String {
        match self {
            Self::SetPassword(secret) => format!(">{}", secret.expose()),
            Self::Enable => "on".to_string(),
            Self::AllowCategory(cat) => format!("+@{}", cat.name()),
            Self::DenyCategory(cat) => format!("-@{}", cat.name()),
            Self::AllChannels => "allchannels".to_string(),
            Self::AllKeys => "allkeys".to_string(),
            Self::AllowCommand(cmd) => format!("+{cmd}"),
            Self::DenyCommand(cmd) => format!("-{cmd}"),
            Self::AllowFirstArg { command, arg } => format!("+{command}|{arg}"),
        }
    }

    /// Содержит ли директива секрет. Такие токены нельзя писать в логи.
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Self::SetPassword(_))
    }
}

/// Рендерит директивы в аргументы `ACL SETUSER` в исходном порядке.
pub fn render_tokens(directives: &[Directive]) -> Vec<String> {
    directives.iter().map(Directive::token).collect()
}

impl fmt::Display for Directive {
    /// Безопасное для логов представление: пароль заменён на `***`.
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::SetPassword(_) => f.write_str(">***"),
            other => f.write_str(&other.token()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_match_acl_setuser_syntax() {
        assert_eq!(Directive::SetPassword("pw".into()).token(), ">pw");
        assert_eq!(Directive::Enable.token(), "on");
        assert_eq!(Directive::AllowCategory(AclCategory::All).token(), "+@all");
        assert_eq!(Directive::DenyCategory(AclCategory::Admin).token(), "-@admin");
        assert_eq!(Directive::AllChannels.token(), "allchannels");
        assert_eq!(Directive::AllKeys.token(), "allkeys");
        assert_eq!(Directive::DenyCommand("select").token(), "-select");
        assert_eq!(
            Directive::AllowFirstArg {
                command: "select",
                arg: "3".into()
            }
            .token(),
            "+select|3"
        );
    }

    #[test]
    fn display_hides_password() {
        let d = Directive::SetPassword("hunter2".into());
        assert!(d.is_sensitive());
        assert_eq!(d.to_string(), ">***");
        assert!(!Directive::Enable.is_sensitive());
    }

    #[test]
    fn category_names_round_trip() {
        for cat in [
            AclCategory::All,
            AclCategory::Admin,
            AclCategory::Dangerous,
            AclCategory::Read,
            AclCategory::Write,
            AclCategory::Keyspace,
            AclCategory::Connection,
            AclCategory::Pubsub,
        ] {
            assert_eq!(AclCategory::from_name(cat.name()), Some(cat));
        }
        assert_eq!(AclCategory::from_name("ALL"), Some(AclCategory::All));
        assert_eq!(AclCategory::from_name("nope"), None);
    }
}
