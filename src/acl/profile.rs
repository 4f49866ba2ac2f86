//! Политика построения профиля учётной записи.
//!
//! Каждый пользователь, которого создаёт aclsync, получает один и тот же
//! профиль: разрешено всё, кроме короткого списка административных команд.
//! Если задан индекс базы, SELECT сужается до этого индекса.

use super::directive::{AclCategory, Directive};
use crate::account::{DatabaseScope, Secret};

/// Команды, которые запрещаются после широкого `+@all`.
pub const DENIED_COMMANDS: [&str; 5] = ["acl", "bgrewriteaof", "bgsave", "config", "module"];

/// Команда, которую сужает ограничение по базе.
pub const SELECT_COMMAND: &str = "select";

/// Строит упорядоченный список директив для учётной записи.
///
/// Порядок: пароль, `on`, `+@all`, все каналы, все ключи, запреты из
/// [`DENIED_COMMANDS`], затем (только для `DatabaseScope::Index`) `-select`
/// и `+select|<index>`. Запреты обязаны идти после `+@all`, а сужающий
/// `+select|n` после общего `-select`.
pub fn profile_directives(
    password: &Secret,
    scope: DatabaseScope,
) -> Vec<Directive> {
    let mut directives = Vec::with_capacity(5 + DENIED_COMMANDS.len() + 2);
    directives.push(Directive::SetPassword(password.clone()));
    directives.push(Directive::Enable);
    directives.push(Directive::AllowCategory(AclCategory::All));
    directives.push(Directive::AllChannels);
    directives.push(Directive::AllKeys);
    directives.extend(DENIED_COMMANDS.iter().copied().map(Directive::DenyCommand));

    if let DatabaseScope::Index(db) = scope {
        directives.push(Directive::DenyCommand(SELECT_COMMAND));
        directives.push(Directive::AllowFirstArg {
            command: SELECT_COMMAND,
            arg: db.to_string(),
        });
    }

    directives
}
